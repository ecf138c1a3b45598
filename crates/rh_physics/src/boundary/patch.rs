// crates/rh_physics/src/boundary/patch.rs

//! 边界片
//!
//! 计算域边界由活动单元与非活动单元（或全局盒外）之间的面组成。
//! 每个边界面恰好属于一个边界片；边界片按侧面或自定义判定函数选取，
//! 未被任何边界片选中的面归入默认的零通量片。
//!
//! 每个子网格保存三组面：
//! - 拥有面：内侧单元由该子网格拥有，参与行修正与 JC 抽取
//! - 环面：内侧单元位于幽灵层，仅供坡面漫流通量在幽灵列上求值
//! - 存储面：内侧或外侧单元落在子网格存储区内（全局顺序），用于写入幽灵压力
//!
//! 面的取值槽位 `ival` 在整个边界片内全局编号，同一面在各子网格上一致。

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use glam::IVec3;
use log::debug;

use super::types::{BoundaryCondition, BoundaryError, BoundaryKind};
use crate::grid::{DomainGeometry, Grid};
use crate::stencil::StencilSlot;

// ============================================================
// 侧面与边界面
// ============================================================

/// 边界面的朝向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatchSide {
    /// -x
    West,
    /// +x
    East,
    /// -y
    South,
    /// +y
    North,
    /// -z
    Bottom,
    /// +z
    Top,
}

impl PatchSide {
    /// 全部朝向
    pub const ALL: [PatchSide; 6] = [
        Self::West,
        Self::East,
        Self::South,
        Self::North,
        Self::Bottom,
        Self::Top,
    ];

    /// 外法向单位向量
    pub fn direction(self) -> IVec3 {
        match self {
            Self::West => IVec3::NEG_X,
            Self::East => IVec3::X,
            Self::South => IVec3::NEG_Y,
            Self::North => IVec3::Y,
            Self::Bottom => IVec3::NEG_Z,
            Self::Top => IVec3::Z,
        }
    }
}

/// 一个边界面
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFace {
    /// 内侧单元 x
    pub i: i32,
    /// 内侧单元 y
    pub j: i32,
    /// 内侧单元 z
    pub k: i32,
    /// 外法向
    pub dir: IVec3,
    /// 取值槽位
    pub ival: usize,
}

impl BoundaryFace {
    /// 外法向对应的模板槽位
    pub fn slot(&self) -> StencilSlot {
        if self.dir.x < 0 {
            StencilSlot::West
        } else if self.dir.x > 0 {
            StencilSlot::East
        } else if self.dir.y < 0 {
            StencilSlot::South
        } else if self.dir.y > 0 {
            StencilSlot::North
        } else if self.dir.z < 0 {
            StencilSlot::Lower
        } else {
            StencilSlot::Upper
        }
    }

    /// 是否为顶面
    #[inline]
    pub fn is_top(&self) -> bool {
        self.dir == IVec3::Z
    }

    /// 内侧单元坐标
    #[inline]
    pub fn cell(&self) -> IVec3 {
        IVec3::new(self.i, self.j, self.k)
    }

    /// 面外侧单元坐标
    #[inline]
    pub fn outside(&self) -> IVec3 {
        self.cell() + self.dir
    }
}

/// 单个子网格上的边界面
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchFaces {
    owned: Vec<BoundaryFace>,
    ring: Vec<BoundaryFace>,
    storage: Vec<BoundaryFace>,
}

impl PatchFaces {
    /// 拥有面
    pub fn owned(&self) -> &[BoundaryFace] {
        &self.owned
    }

    /// 幽灵环上的面
    pub fn ring(&self) -> &[BoundaryFace] {
        &self.ring
    }

    /// 内侧或外侧单元在存储区内的面，按取值槽位排序
    ///
    /// 台阶处的侧面可能整体落在幽灵环之外，而它的外侧单元仍是本子网格的幽灵单元。
    pub fn storage(&self) -> &[BoundaryFace] {
        &self.storage
    }

    /// 拥有面与环面
    pub fn all(&self) -> impl Iterator<Item = &BoundaryFace> {
        self.owned.iter().chain(&self.ring)
    }

    /// 面总数
    pub fn len(&self) -> usize {
        self.owned.len() + self.ring.len()
    }

    /// 是否没有面
    pub fn is_empty(&self) -> bool {
        self.owned.is_empty() && self.ring.is_empty()
    }
}

// ============================================================
// 边界片
// ============================================================

/// 具名边界片
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPatch {
    name: String,
    condition: BoundaryCondition,
    global: Vec<BoundaryFace>,
    faces: Vec<PatchFaces>,
}

impl BoundaryPatch {
    /// 名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 边界条件
    pub fn condition(&self) -> &BoundaryCondition {
        &self.condition
    }

    /// 边界类型
    pub fn kind(&self) -> BoundaryKind {
        self.condition.kind
    }

    /// 第 `s` 个子网格上的面
    pub fn faces(&self, s: usize) -> &PatchFaces {
        &self.faces[s]
    }

    /// 全局面列表，按取值槽位排序
    pub fn global_faces(&self) -> &[BoundaryFace] {
        &self.global
    }

    /// 全局面数量（取值槽位数）
    pub fn num_faces(&self) -> usize {
        self.global.len()
    }

    /// 在时刻 `time` 求出每个槽位的给定值
    ///
    /// `elevation` 给出面中心高程，只在给定值随位置变化时调用。
    pub fn face_values(
        &self,
        time: f64,
        gravity: f64,
        elevation: impl Fn(&BoundaryFace) -> f64,
    ) -> Result<Vec<f64>, BoundaryError> {
        let value = &self.condition.value;
        let values: Vec<f64> = if value.is_spatially_varying() {
            self.global
                .iter()
                .map(|f| value.evaluate(time, elevation(f), gravity))
                .collect()
        } else {
            vec![value.evaluate(time, 0.0, gravity); self.global.len()]
        };
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(BoundaryError::InvalidValue {
                patch: self.name.clone(),
                time,
                value: *bad,
            });
        }
        Ok(values)
    }
}

// ============================================================
// 边界片集合
// ============================================================

/// 自定义面选择函数，参数为内侧单元坐标与朝向
pub type FacePredicate = Arc<dyn Fn(i32, i32, i32, PatchSide) -> bool + Send + Sync>;

/// 边界片的面选择方式
#[derive(Clone)]
pub enum PatchSelector {
    /// 某一朝向的全部边界面
    Side(PatchSide),
    /// 自定义判定
    Custom(FacePredicate),
}

impl PatchSelector {
    fn matches(&self, i: i32, j: i32, k: i32, side: PatchSide) -> bool {
        match self {
            Self::Side(s) => *s == side,
            Self::Custom(f) => f(i, j, k, side),
        }
    }
}

impl fmt::Debug for PatchSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Side(s) => write!(f, "Side({:?})", s),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// 默认边界片名称
pub const DEFAULT_PATCH_NAME: &str = "default";

/// 全部边界片
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundaryPatchSet {
    patches: Vec<BoundaryPatch>,
}

impl BoundaryPatchSet {
    /// 创建构建器
    pub fn builder() -> BoundaryPatchSetBuilder {
        BoundaryPatchSetBuilder::default()
    }

    /// 全部边界为零通量
    pub fn no_flux(grid: &Grid, geometry: &DomainGeometry) -> Self {
        let (patches, _) = classify(grid, geometry, &[], &BoundaryCondition::no_flux());
        Self { patches }
    }

    /// 全部边界片
    pub fn patches(&self) -> &[BoundaryPatch] {
        &self.patches
    }

    /// 边界片数量
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// 按名称查找
    pub fn get(&self, name: &str) -> Result<&BoundaryPatch, BoundaryError> {
        self.patches
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| BoundaryError::PatchNotFound(name.to_string()))
    }

    /// 是否存在某类型的边界片
    pub fn has_kind(&self, kind: BoundaryKind) -> bool {
        self.patches.iter().any(|p| p.kind() == kind)
    }

    /// 检查与网格的子网格数一致
    pub fn check_layout(&self, grid: &Grid) -> Result<(), BoundaryError> {
        for p in &self.patches {
            if p.faces.len() != grid.num_subgrids() {
                return Err(BoundaryError::LayoutMismatch {
                    patch: p.name.clone(),
                    expected: grid.num_subgrids(),
                    actual: p.faces.len(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct PatchSpec {
    name: String,
    selector: PatchSelector,
    condition: BoundaryCondition,
}

/// 边界片集合构建器
///
/// 边界面按添加顺序匹配第一个选中它的边界片。
#[derive(Debug, Clone)]
pub struct BoundaryPatchSetBuilder {
    specs: Vec<PatchSpec>,
    default_condition: BoundaryCondition,
}

impl Default for BoundaryPatchSetBuilder {
    fn default() -> Self {
        Self {
            specs: Vec::new(),
            default_condition: BoundaryCondition::no_flux(),
        }
    }
}

impl BoundaryPatchSetBuilder {
    /// 按朝向添加边界片
    pub fn side(mut self, name: impl Into<String>, side: PatchSide, condition: BoundaryCondition) -> Self {
        self.specs.push(PatchSpec {
            name: name.into(),
            selector: PatchSelector::Side(side),
            condition,
        });
        self
    }

    /// 按自定义判定添加边界片
    pub fn custom(
        mut self,
        name: impl Into<String>,
        predicate: impl Fn(i32, i32, i32, PatchSide) -> bool + Send + Sync + 'static,
        condition: BoundaryCondition,
    ) -> Self {
        self.specs.push(PatchSpec {
            name: name.into(),
            selector: PatchSelector::Custom(Arc::new(predicate)),
            condition,
        });
        self
    }

    /// 未选中面的边界条件（默认零通量）
    pub fn default_condition(mut self, condition: BoundaryCondition) -> Self {
        self.default_condition = condition;
        self
    }

    /// 在网格与几何上构建
    pub fn build(self, grid: &Grid, geometry: &DomainGeometry) -> Result<BoundaryPatchSet, BoundaryError> {
        let mut seen = HashSet::new();
        for spec in &self.specs {
            if spec.name == DEFAULT_PATCH_NAME || !seen.insert(spec.name.as_str()) {
                return Err(BoundaryError::DuplicatePatch(spec.name.clone()));
            }
        }
        let (patches, unmatched) = classify(grid, geometry, &self.specs, &self.default_condition);
        debug!(
            "边界片构建完成: {} 个边界片, {} 个面归入默认片",
            patches.len(),
            unmatched
        );
        Ok(BoundaryPatchSet { patches })
    }
}

/// 将全部边界面分类到边界片，返回边界片与落入默认片的面数
fn classify(
    grid: &Grid,
    geometry: &DomainGeometry,
    specs: &[PatchSpec],
    default_condition: &BoundaryCondition,
) -> (Vec<BoundaryPatch>, usize) {
    // 最后一个桶为默认片
    let mut buckets: Vec<Vec<BoundaryFace>> = vec![Vec::new(); specs.len() + 1];

    for (i, j, k) in grid.global_range() {
        if !geometry.is_inside(i, j, k) {
            continue;
        }
        for side in PatchSide::ALL {
            let n = IVec3::new(i, j, k) + side.direction();
            if geometry.is_inside(n.x, n.y, n.z) {
                continue;
            }
            let slot = specs
                .iter()
                .position(|s| s.selector.matches(i, j, k, side))
                .unwrap_or(specs.len());
            let ival = buckets[slot].len();
            buckets[slot].push(BoundaryFace {
                i,
                j,
                k,
                dir: side.direction(),
                ival,
            });
        }
    }

    let unmatched = buckets[specs.len()].len();
    let mut patches = Vec::with_capacity(buckets.len());
    for (idx, global) in buckets.into_iter().enumerate() {
        let (name, condition) = match specs.get(idx) {
            Some(spec) => (spec.name.clone(), spec.condition.clone()),
            None if !global.is_empty() => (DEFAULT_PATCH_NAME.to_string(), default_condition.clone()),
            None => continue,
        };
        let faces = distribute(grid, &global);
        patches.push(BoundaryPatch {
            name,
            condition,
            global,
            faces,
        });
    }
    (patches, unmatched)
}

/// 按子网格拆分为拥有面、幽灵环面与存储面
fn distribute(grid: &Grid, global: &[BoundaryFace]) -> Vec<PatchFaces> {
    grid.subgrids()
        .iter()
        .map(|s| {
            let mut faces = PatchFaces::default();
            let (ix, iy) = (s.ix, s.iy);
            let in_storage = |i: i32, j: i32| i >= ix - 1 && i <= ix + s.nx && j >= iy - 1 && j <= iy + s.ny;
            for f in global {
                if s.owns_column(f.i, f.j) {
                    faces.owned.push(*f);
                } else if in_storage(f.i, f.j) {
                    faces.ring.push(*f);
                }
                let o = f.outside();
                if in_storage(f.i, f.j) || in_storage(o.x, o.y) {
                    faces.storage.push(*f);
                }
            }
            faces
        })
        .collect()
}
