// crates/rh_physics/src/overland/mod.rs

//! 坡面漫流通量求值
//!
//! 在地表网格（`k = 0`）上按 Manning 公式计算顶面之间的侧向通量。
//! 两种模型：
//!
//! - [`KinematicWave`]: 摩擦坡度取地形坡度
//! - [`DiffusiveWave`]: 摩擦坡度计入积水深度梯度，坡度模长用上一时刻压力滞后
//!
//! 每个模型有两种模式：
//! - [`EvalMode::Value`] 写出面通量 `qx, qy` 以及按单元聚合的 `ke, kw, kn, ks`
//! - [`EvalMode::Derivative`] 写出通量对压力的导数
//!
//! 求值遍历拥有列与一圈幽灵列上的顶面，写到存储范围外的结果被丢弃；
//! 再经一次幽灵交换，各子网格的拥有列就得到与整体求值一致的结果。

pub mod diffusive;
pub mod kinematic;

pub use diffusive::DiffusiveWave;
pub use kinematic::KinematicWave;

use rh_config::OverlandModel;
use serde::{Deserialize, Serialize};

use crate::boundary::{BoundaryFace, PatchFaces};
use crate::fields::SubField;
use crate::grid::Subgrid;

/// Manning 公式中积水深度的指数
pub const DEPTH_EXPONENT: f64 = 5.0 / 3.0;

// ============================================================
// 输入与输出
// ============================================================

/// 求值模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    /// 通量值
    Value,
    /// 对压力的导数
    Derivative,
}

/// 地表单元上的坡面通量与导数
///
/// 导数模式下：
/// - `ke`: 东侧面通量对本单元压力的导数
/// - `kw`: 西侧面通量对本单元压力的导数
/// - `kn`, `ks`: y 方向同理
/// - `ke_ns` 等：同一面通量对另一侧单元压力的导数（扩散波使用）
///
/// 取值模式下 `ke, kw, kn, ks` 为四个面上的通量，`qx, qy` 为本单元东、北侧面的通量。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FaceConductance {
    /// 东侧
    pub ke: f64,
    /// 西侧
    pub kw: f64,
    /// 北侧
    pub kn: f64,
    /// 南侧
    pub ks: f64,
    /// 东侧，对邻居
    pub ke_ns: f64,
    /// 西侧，对邻居
    pub kw_ns: f64,
    /// 北侧，对邻居
    pub kn_ns: f64,
    /// 南侧，对邻居
    pub ks_ns: f64,
    /// 东侧面通量
    pub qx: f64,
    /// 北侧面通量
    pub qy: f64,
}

/// 坡面通量求值的输入
///
/// 压力为三维场，其余为地表场。
#[derive(Debug, Clone, Copy)]
pub struct OverlandInputs<'a> {
    /// 所在子网格
    pub subgrid: &'a Subgrid,
    /// 当前压力（已注入 Dirichlet 幽灵值）
    pub pressure: &'a SubField,
    /// 上一时刻压力
    pub old_pressure: &'a SubField,
    /// 摩擦坡度 x 分量
    pub slope_x: &'a SubField,
    /// 摩擦坡度 y 分量
    pub slope_y: &'a SubField,
    /// Manning 糙率
    pub mannings: &'a SubField,
    /// 列顶层索引
    pub top: &'a SubField<i32>,
    /// 坡度模长下限
    pub epsilon: f64,
}

impl OverlandInputs<'_> {
    /// 列顶层索引，不在存储范围或无活动单元时为 `None`
    #[inline]
    pub fn top_of(&self, i: i32, j: i32) -> Option<i32> {
        self.top.try_get(i, j, 0).filter(|&k| k >= 0)
    }

    /// 列顶层索引（不论是否有活动单元）是否可读
    #[inline]
    pub fn column_in_storage(&self, i: i32, j: i32) -> bool {
        self.top.try_get(i, j, 0).is_some()
    }
}

// ============================================================
// 模型接口
// ============================================================

/// 坡面漫流模型
pub trait OverlandFlowModel: Send + Sync {
    /// 对应的配置选项
    fn model(&self) -> OverlandModel;

    /// 在边界片的顶面上求值，结果写入地表场 `out`
    fn evaluate(
        &self,
        inputs: &OverlandInputs<'_>,
        faces: &PatchFaces,
        mode: EvalMode,
        out: &mut SubField<FaceConductance>,
    );
}

static KINEMATIC: KinematicWave = KinematicWave;
static DIFFUSIVE: DiffusiveWave = DiffusiveWave;

/// 按配置选项取模型
pub fn model_for(model: OverlandModel) -> &'static dyn OverlandFlowModel {
    match model {
        OverlandModel::Kinematic => &KINEMATIC,
        OverlandModel::Diffusive => &DIFFUSIVE,
    }
}

// ============================================================
// 共用工具
// ============================================================

/// 边界片中的顶面（拥有与幽灵环）
pub(crate) fn top_faces(faces: &PatchFaces) -> impl Iterator<Item = &BoundaryFace> {
    faces.all().filter(|f| f.is_top())
}

/// Manning 系数 `1 / (sqrt(|Sf|)·n)`
#[inline]
pub(crate) fn manning_coefficient(slope_mag: f64, mannings: f64) -> f64 {
    1.0 / (slope_mag.sqrt() * mannings)
}

/// 取值模式的第二遍：把面通量聚合到单元的四个面
pub(crate) fn gather_face_fluxes(faces: &PatchFaces, out: &mut SubField<FaceConductance>) {
    for f in top_faces(faces) {
        let (i, j) = (f.i, f.j);
        let west = out.try_get(i - 1, j, 0).map(|c| c.qx);
        let south = out.try_get(i, j - 1, 0).map(|c| c.qy);
        if let Some(cell) = out.try_get_mut(i, j, 0) {
            cell.ke = cell.qx;
            cell.kn = cell.qy;
            if let Some(q) = west {
                cell.kw = q;
            }
            if let Some(q) = south {
                cell.ks = q;
            }
        }
    }
}
