// crates/rh_physics/src/problem.rs

//! 问题数据
//!
//! 组装器消费的全部静态输入：网格、域几何、逐单元的孔隙度/贮水率/渗透率/层厚乘子，
//! 地表上的地形坡度、摩擦坡度、Manning 糙率与列顶层索引，以及边界片。
//!
//! 逐单元量在构造时一次性展开成带幽灵层的分块场：
//! - 全局盒外的幽灵单元取最近的盒内单元值
//! - 渗透率在域外单元上置零，面系数因此在域边界上自然消失
//!
//! # 使用示例
//!
//! ```
//! use rh_physics::grid::{DomainGeometry, Grid};
//! use rh_physics::problem::{ProblemData, Spatial};
//!
//! let grid = Grid::uniform([4, 1, 3], [1.0, 1.0, 0.5]).unwrap();
//! let geometry = DomainGeometry::full(&grid);
//! let problem = ProblemData::builder(grid, geometry)
//!     .porosity(0.4)
//!     .permeability(Spatial::from_fn(|_, _, k| if k == 0 { 0.1 } else { 1.0 }))
//!     .mannings(5.0e-6)
//!     .build()
//!     .unwrap();
//! assert_eq!(problem.perm_z().sub(0).get(0, 0, 0), 0.1);
//! assert_eq!(problem.perm_z().sub(0).get(-1, 0, 0), 0.0);
//! ```

use std::fmt;
use std::sync::Arc;

use log::debug;
use rh_foundation::{RhError, RhResult};

use crate::boundary::{BoundaryFace, BoundaryPatchSet};
use crate::fields::Field;
use crate::grid::{DomainGeometry, Grid};

// ============================================================
// 空间分布
// ============================================================

/// 全局坐标上的取值函数
pub type SpatialFn = Arc<dyn Fn(i32, i32, i32) -> f64 + Send + Sync>;

/// 空间分布的输入量
#[derive(Clone)]
pub enum Spatial {
    /// 常数
    Uniform(f64),
    /// 全局数组，x 最快变化
    Values(Vec<f64>),
    /// 坐标函数
    Function(SpatialFn),
}

impl Spatial {
    /// 由坐标函数创建
    pub fn from_fn(f: impl Fn(i32, i32, i32) -> f64 + Send + Sync + 'static) -> Self {
        Self::Function(Arc::new(f))
    }

    /// 在盒内坐标处取值
    fn sample(&self, extents: [i32; 3], i: i32, j: i32, k: i32) -> f64 {
        match self {
            Self::Uniform(v) => *v,
            Self::Values(values) => {
                let [nx, ny, _] = extents;
                values[(i + nx * (j + ny * k)) as usize]
            }
            Self::Function(f) => f(i, j, k),
        }
    }

    fn check_len(&self, name: &'static str, expected: usize) -> RhResult<()> {
        match self {
            Self::Values(values) if values.len() != expected => {
                Err(RhError::size_mismatch(name, expected, values.len()))
            }
            _ => Ok(()),
        }
    }
}

impl From<f64> for Spatial {
    fn from(v: f64) -> Self {
        Self::Uniform(v)
    }
}

impl From<Vec<f64>> for Spatial {
    fn from(values: Vec<f64>) -> Self {
        Self::Values(values)
    }
}

impl fmt::Debug for Spatial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(v) => write!(f, "Uniform({})", v),
            Self::Values(v) => write!(f, "Values(len={})", v.len()),
            Self::Function(_) => write!(f, "Function"),
        }
    }
}

/// 坐标夹到全局盒内
#[inline]
fn clamp_to_box(extents: [i32; 3], i: i32, j: i32, k: i32) -> (i32, i32, i32) {
    (
        i.clamp(0, extents[0] - 1),
        j.clamp(0, extents[1] - 1),
        k.clamp(0, extents[2] - 1),
    )
}

/// 展开为分块场，并检查每个盒内取值
fn expand(
    grid: &Grid,
    spatial: &Spatial,
    name: &'static str,
    valid: impl Fn(f64) -> bool,
    range: (f64, f64),
) -> RhResult<Field> {
    let extents = grid.extents();
    spatial.check_len(name, (extents[0] * extents[1] * extents[2]) as usize)?;
    if let Some(bad) = grid
        .global_range()
        .iter()
        .map(|(i, j, k)| spatial.sample(extents, i, j, k))
        .find(|v| !valid(*v))
    {
        return Err(RhError::out_of_range(name, bad, range.0, range.1));
    }
    Field::from_fn(grid, |i, j, k| {
        let (ci, cj, ck) = clamp_to_box(extents, i, j, k);
        spatial.sample(extents, ci, cj, ck)
    })
}

// ============================================================
// 问题数据
// ============================================================

/// 组装器的静态输入
#[derive(Debug, Clone)]
pub struct ProblemData {
    grid: Grid,
    surface: Grid,
    geometry: DomainGeometry,
    porosity: Field,
    specific_storage: Field,
    perm_x: Field,
    perm_y: Field,
    perm_z: Field,
    z_mult: Field,
    z_mult_global: Vec<f64>,
    terrain_slope_x: Field,
    terrain_slope_y: Field,
    friction_slope_x: Field,
    friction_slope_y: Field,
    mannings: Field,
    top: Field<i32>,
    patches: BoundaryPatchSet,
}

impl ProblemData {
    /// 创建构建器
    pub fn builder(grid: Grid, geometry: DomainGeometry) -> ProblemDataBuilder {
        ProblemDataBuilder::new(grid, geometry)
    }

    /// 三维网格
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// 地表网格
    pub fn surface(&self) -> &Grid {
        &self.surface
    }

    /// 域几何
    pub fn geometry(&self) -> &DomainGeometry {
        &self.geometry
    }

    /// 孔隙度
    pub fn porosity(&self) -> &Field {
        &self.porosity
    }

    /// 贮水率
    pub fn specific_storage(&self) -> &Field {
        &self.specific_storage
    }

    /// x 方向渗透率（域外为零）
    pub fn perm_x(&self) -> &Field {
        &self.perm_x
    }

    /// y 方向渗透率（域外为零）
    pub fn perm_y(&self) -> &Field {
        &self.perm_y
    }

    /// z 方向渗透率（域外为零）
    pub fn perm_z(&self) -> &Field {
        &self.perm_z
    }

    /// 层厚乘子
    pub fn z_mult(&self) -> &Field {
        &self.z_mult
    }

    /// 地形坡度 x（侧向面重力分量）
    pub fn terrain_slope_x(&self) -> &Field {
        &self.terrain_slope_x
    }

    /// 地形坡度 y
    pub fn terrain_slope_y(&self) -> &Field {
        &self.terrain_slope_y
    }

    /// 摩擦坡度 x（坡面漫流）
    pub fn friction_slope_x(&self) -> &Field {
        &self.friction_slope_x
    }

    /// 摩擦坡度 y
    pub fn friction_slope_y(&self) -> &Field {
        &self.friction_slope_y
    }

    /// Manning 糙率
    pub fn mannings(&self) -> &Field {
        &self.mannings
    }

    /// 列顶层索引
    pub fn top(&self) -> &Field<i32> {
        &self.top
    }

    /// 边界片
    pub fn patches(&self) -> &BoundaryPatchSet {
        &self.patches
    }

    /// 单元中心高程（底面为 0，按层厚乘子累加）
    pub fn cell_elevation(&self, i: i32, j: i32, k: i32) -> f64 {
        let [nx, ny, nz] = self.grid.extents();
        let dz = self.grid.spacing()[2];
        let (ci, cj, ck) = clamp_to_box([nx, ny, nz], i, j, k);
        let zm = |m: i32| self.z_mult_global[(ci + nx * (cj + ny * m)) as usize];
        let below: f64 = (0..ck).map(|m| dz * zm(m)).sum();
        below + 0.5 * dz * zm(ck)
    }

    /// 边界面中心高程
    pub fn face_elevation(&self, face: &BoundaryFace) -> f64 {
        let center = self.cell_elevation(face.i, face.j, face.k);
        if face.dir.z == 0 {
            return center;
        }
        let [nx, ny, nz] = self.grid.extents();
        let (ci, cj, ck) = clamp_to_box([nx, ny, nz], face.i, face.j, face.k);
        let zm = self.z_mult_global[(ci + nx * (cj + ny * ck)) as usize];
        center + face.dir.z as f64 * 0.5 * self.grid.spacing()[2] * zm
    }
}

// ============================================================
// 构建器
// ============================================================

/// [`ProblemData`] 构建器
///
/// 未设置的量取默认值：孔隙度 1、渗透率 1、贮水率 0、层厚乘子 1、坡度 0、
/// 摩擦坡度等于地形坡度、糙率 1、全部边界为零通量。
#[derive(Debug, Clone)]
pub struct ProblemDataBuilder {
    grid: Grid,
    geometry: DomainGeometry,
    porosity: Spatial,
    specific_storage: Spatial,
    perm: [Spatial; 3],
    z_mult: Spatial,
    slope: [Spatial; 2],
    friction_slope: Option<[Spatial; 2]>,
    mannings: Spatial,
    patches: Option<BoundaryPatchSet>,
}

impl ProblemDataBuilder {
    fn new(grid: Grid, geometry: DomainGeometry) -> Self {
        Self {
            grid,
            geometry,
            porosity: Spatial::Uniform(1.0),
            specific_storage: Spatial::Uniform(0.0),
            perm: [Spatial::Uniform(1.0), Spatial::Uniform(1.0), Spatial::Uniform(1.0)],
            z_mult: Spatial::Uniform(1.0),
            slope: [Spatial::Uniform(0.0), Spatial::Uniform(0.0)],
            friction_slope: None,
            mannings: Spatial::Uniform(1.0),
            patches: None,
        }
    }

    /// 孔隙度
    pub fn porosity(mut self, v: impl Into<Spatial>) -> Self {
        self.porosity = v.into();
        self
    }

    /// 贮水率
    pub fn specific_storage(mut self, v: impl Into<Spatial>) -> Self {
        self.specific_storage = v.into();
        self
    }

    /// 各向同性渗透率
    pub fn permeability(mut self, v: impl Into<Spatial>) -> Self {
        let v = v.into();
        self.perm = [v.clone(), v.clone(), v];
        self
    }

    /// 各向异性渗透率
    pub fn permeability_xyz(
        mut self,
        x: impl Into<Spatial>,
        y: impl Into<Spatial>,
        z: impl Into<Spatial>,
    ) -> Self {
        self.perm = [x.into(), y.into(), z.into()];
        self
    }

    /// 层厚乘子
    pub fn z_mult(mut self, v: impl Into<Spatial>) -> Self {
        self.z_mult = v.into();
        self
    }

    /// 地形坡度（地表量，只用 `k = 0`）
    pub fn slopes(mut self, x: impl Into<Spatial>, y: impl Into<Spatial>) -> Self {
        self.slope = [x.into(), y.into()];
        self
    }

    /// 摩擦坡度，未设置时取地形坡度
    pub fn friction_slopes(mut self, x: impl Into<Spatial>, y: impl Into<Spatial>) -> Self {
        self.friction_slope = Some([x.into(), y.into()]);
        self
    }

    /// Manning 糙率
    pub fn mannings(mut self, v: impl Into<Spatial>) -> Self {
        self.mannings = v.into();
        self
    }

    /// 边界片
    pub fn patches(mut self, patches: BoundaryPatchSet) -> Self {
        self.patches = Some(patches);
        self
    }

    /// 展开并校验
    pub fn build(self) -> RhResult<ProblemData> {
        let grid = self.grid;
        let geometry = self.geometry;
        if geometry.extents() != grid.extents() {
            return Err(RhError::invalid_grid(format!(
                "几何尺寸 {:?} 与网格 {:?} 不一致",
                geometry.extents(),
                grid.extents()
            )));
        }
        let surface = grid.surface();

        let finite = |v: f64| v.is_finite();
        let porosity = expand(&grid, &self.porosity, "porosity", |v| (0.0..=1.0).contains(&v), (0.0, 1.0))?;
        let specific_storage = expand(
            &grid,
            &self.specific_storage,
            "specific_storage",
            |v| v.is_finite() && v >= 0.0,
            (0.0, f64::INFINITY),
        )?;

        let perm = |name: &'static str, spatial: &Spatial| -> RhResult<Field> {
            let mut field = expand(&grid, spatial, name, |v| v.is_finite() && v >= 0.0, (0.0, f64::INFINITY))?;
            mask_outside(&mut field, &geometry);
            Ok(field)
        };
        let perm_x = perm("perm_x", &self.perm[0])?;
        let perm_y = perm("perm_y", &self.perm[1])?;
        let perm_z = perm("perm_z", &self.perm[2])?;

        let z_mult = expand(&grid, &self.z_mult, "z_mult", |v| v.is_finite() && v > 0.0, (0.0, f64::INFINITY))?;
        let extents = grid.extents();
        let z_mult_global = grid
            .global_range()
            .iter()
            .map(|(i, j, k)| self.z_mult.sample(extents, i, j, k))
            .collect();

        // 地表量的全局数组长度为 nx·ny
        let any = (f64::NEG_INFINITY, f64::INFINITY);
        let [sx, sy] = &self.slope;
        let terrain_slope_x = expand(&surface, sx, "slope_x", finite, any)?;
        let terrain_slope_y = expand(&surface, sy, "slope_y", finite, any)?;
        let (friction_slope_x, friction_slope_y) = match &self.friction_slope {
            Some([fx, fy]) => (
                expand(&surface, fx, "friction_slope_x", finite, any)?,
                expand(&surface, fy, "friction_slope_y", finite, any)?,
            ),
            None => (terrain_slope_x.clone(), terrain_slope_y.clone()),
        };
        let mannings = expand(
            &surface,
            &self.mannings,
            "mannings",
            |v| v.is_finite() && v > 0.0,
            (0.0, f64::INFINITY),
        )?;
        let top = geometry.top_field(&surface)?;

        let patches = match self.patches {
            Some(p) => {
                p.check_layout(&grid)
                    .map_err(|e| RhError::invalid_input(e.to_string()))?;
                p
            }
            None => BoundaryPatchSet::no_flux(&grid, &geometry),
        };

        debug!(
            "问题数据: 网格 {:?}, {} 个活动单元, {} 个边界片",
            grid.extents(),
            geometry.num_inside(),
            patches.len()
        );

        Ok(ProblemData {
            grid,
            surface,
            geometry,
            porosity,
            specific_storage,
            perm_x,
            perm_y,
            perm_z,
            z_mult,
            z_mult_global,
            terrain_slope_x,
            terrain_slope_y,
            friction_slope_x,
            friction_slope_y,
            mannings,
            top,
            patches,
        })
    }
}

fn mask_outside(field: &mut Field, geometry: &DomainGeometry) {
    for sub in field.subs_mut() {
        let gbox = *sub.gbox();
        for (i, j, k) in gbox.storage() {
            if !geometry.is_inside(i, j, k) {
                sub.set(i, j, k, 0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec3;

    fn column(nz: i32) -> (Grid, DomainGeometry) {
        let grid = Grid::uniform([1, 1, nz], [1.0, 1.0, 2.0]).unwrap();
        let geom = DomainGeometry::full(&grid);
        (grid, geom)
    }

    #[test]
    fn test_defaults() {
        let (grid, geom) = column(3);
        let p = ProblemData::builder(grid, geom).build().unwrap();
        assert_eq!(p.porosity().sub(0).get(0, 0, 1), 1.0);
        assert_eq!(p.specific_storage().sub(0).get(0, 0, 1), 0.0);
        assert_eq!(p.z_mult().sub(0).get(0, 0, 3), 1.0);
        assert_eq!(p.mannings().sub(0).get(0, 0, 0), 1.0);
        assert_eq!(p.top().sub(0).get(0, 0, 0), 2);
        assert_eq!(p.patches().len(), 1);
    }

    #[test]
    fn test_perm_masked_outside() {
        let grid = Grid::uniform([2, 1, 2], [1.0, 1.0, 1.0]).unwrap();
        let geom = DomainGeometry::from_column_tops(&grid, &[1, 0]).unwrap();
        let p = ProblemData::builder(grid, geom).permeability(2.0).build().unwrap();
        assert_eq!(p.perm_x().sub(0).get(0, 0, 1), 2.0);
        assert_eq!(p.perm_x().sub(0).get(1, 0, 1), 0.0);
        assert_eq!(p.perm_z().sub(0).get(0, 0, 2), 0.0);
    }

    #[test]
    fn test_invalid_inputs() {
        let (grid, geom) = column(2);
        assert!(ProblemData::builder(grid.clone(), geom.clone()).porosity(1.5).build().is_err());
        assert!(ProblemData::builder(grid.clone(), geom.clone())
            .z_mult(vec![1.0, 0.0])
            .build()
            .is_err());
        assert!(ProblemData::builder(grid, geom).mannings(vec![1.0, 1.0]).build().is_err());
    }

    #[test]
    fn test_elevation_with_z_mult() {
        let (grid, geom) = column(3);
        let p = ProblemData::builder(grid, geom)
            .z_mult(vec![0.5, 1.0, 2.0])
            .build()
            .unwrap();
        // dz = 2: 层厚 1, 2, 4
        assert!((p.cell_elevation(0, 0, 0) - 0.5).abs() < 1e-12);
        assert!((p.cell_elevation(0, 0, 2) - 5.0).abs() < 1e-12);
        let top = BoundaryFace {
            i: 0,
            j: 0,
            k: 2,
            dir: IVec3::Z,
            ival: 0,
        };
        assert!((p.face_elevation(&top) - 7.0).abs() < 1e-12);
        // 幽灵层取最近单元
        assert_eq!(p.z_mult().sub(0).get(0, 0, 3), 2.0);
    }

    #[test]
    fn test_friction_slope_defaults_to_terrain() {
        let grid = Grid::uniform([2, 2, 1], [1.0, 1.0, 1.0]).unwrap();
        let geom = DomainGeometry::full(&grid);
        let p = ProblemData::builder(grid.clone(), geom.clone())
            .slopes(0.01, -0.02)
            .build()
            .unwrap();
        assert_eq!(p.friction_slope_y().sub(0).get(1, 1, 0), -0.02);
        let q = ProblemData::builder(grid, geom)
            .slopes(0.01, -0.02)
            .friction_slopes(0.0, 0.0)
            .build()
            .unwrap();
        assert_eq!(q.friction_slope_x().sub(0).get(0, 0, 0), 0.0);
        assert_eq!(q.terrain_slope_x().sub(0).get(0, 0, 0), 0.01);
    }
}
