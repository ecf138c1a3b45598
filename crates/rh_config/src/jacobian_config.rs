// crates/rh_config/src/jacobian_config.rs

//! JacobianConfig - 雅可比组装配置
//!
//! 配置可以来自 JSON 文件（`from_file`），也可以来自点分键值对
//! （`from_key_values`），后者使用与输入数据库一致的键名，例如
//! `Solver.TerrainFollowingGrid.SlopeUpwindFormulation`。
//! 两条路径最终都经过 `validate`，非法取值在构造阶段即报错。

use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::options::{parse_switch, OverlandModel, SlopeUpwindFormulation};

// ============================================================================
// 键名常量
// ============================================================================

/// 是否启用解析雅可比
pub const KEY_USE_JACOBIAN: &str = "Solver.Nonlinear.UseJacobian";
/// 地形跟随坡度迎风公式
pub const KEY_SLOPE_UPWIND: &str = "Solver.TerrainFollowingGrid.SlopeUpwindFormulation";
/// 坡面流起转模式
pub const KEY_SPINUP: &str = "OverlandFlowSpinUp";
/// 起转阻尼参数 P1
pub const KEY_SPINUP_DAMP_P1: &str = "OverlandSpinupDampP1";
/// 起转阻尼参数 P2
pub const KEY_SPINUP_DAMP_P2: &str = "OverlandSpinupDampP2";
/// 通用 Overland 边界是否使用扩散波
pub const KEY_OVERLAND_DIFFUSIVE: &str = "OverlandFlowDiffusive";
/// 坡度模长下限
pub const KEY_OVERLAND_EPSILON: &str = "Solver.OverlandKinematic.Epsilon";
/// 重力加速度
pub const KEY_GRAVITY: &str = "Gravity";
/// 流体黏度
pub const KEY_VISCOSITY: &str = "Phase.Viscosity";

/// 全部可识别的键
pub const KNOWN_KEYS: [&str; 9] = [
    KEY_USE_JACOBIAN,
    KEY_SLOPE_UPWIND,
    KEY_SPINUP,
    KEY_SPINUP_DAMP_P1,
    KEY_SPINUP_DAMP_P2,
    KEY_OVERLAND_DIFFUSIVE,
    KEY_OVERLAND_EPSILON,
    KEY_GRAVITY,
    KEY_VISCOSITY,
];

// ============================================================================
// 配置结构
// ============================================================================

/// 雅可比组装配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JacobianConfig {
    /// 是否启用解析雅可比
    ///
    /// 关闭时，仅含通用 Overland 边界的问题按简化模式组装，不生成地表矩阵。
    #[serde(default)]
    pub use_jacobian: bool,

    /// 物理参数
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// 地形跟随网格参数
    #[serde(default)]
    pub terrain_following: TerrainFollowingConfig,

    /// 坡面漫流参数
    #[serde(default)]
    pub overland: OverlandConfig,
}

/// 物理参数配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// 重力加速度（与压力水头单位一致）
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// 流体黏度
    #[serde(default = "default_viscosity")]
    pub viscosity: f64,
}

fn default_gravity() -> f64 { 1.0 }
fn default_viscosity() -> f64 { 1.0 }

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            viscosity: default_viscosity(),
        }
    }
}

/// 地形跟随网格配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainFollowingConfig {
    /// 侧向面重力分量公式
    #[serde(default)]
    pub slope_upwind_formulation: SlopeUpwindFormulation,
}

/// 坡面漫流配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlandConfig {
    /// 通用 Overland 边界的坡面流模型
    #[serde(default)]
    pub model: OverlandModel,

    /// 起转模式：以超渗水头损失代替坡面流
    #[serde(default)]
    pub spinup: bool,

    /// 起转阻尼参数 P1
    #[serde(default)]
    pub spinup_damp_p1: f64,

    /// 起转阻尼参数 P2
    #[serde(default)]
    pub spinup_damp_p2: f64,

    /// 摩擦坡度模长下限
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_epsilon() -> f64 { 1.0e-5 }

impl Default for OverlandConfig {
    fn default() -> Self {
        Self {
            model: OverlandModel::default(),
            spinup: false,
            spinup_damp_p1: 0.0,
            spinup_damp_p2: 0.0,
            epsilon: default_epsilon(),
        }
    }
}

impl Default for JacobianConfig {
    fn default() -> Self {
        Self {
            use_jacobian: false,
            physics: PhysicsConfig::default(),
            terrain_following: TerrainFollowingConfig::default(),
            overland: OverlandConfig::default(),
        }
    }
}

impl JacobianConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    /// 从 JSON 字符串解析配置
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: JacobianConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 从点分键值对构建配置
    ///
    /// 未出现的键保持默认值；未知键与非法取值都会返回错误。
    pub fn from_key_values<'a, I>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in pairs {
            config.set_key(key, value)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// 设置单个键
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::invalid(key, value, reason);
        match key {
            KEY_USE_JACOBIAN => {
                self.use_jacobian = parse_switch(value).map_err(|e| invalid(e.to_string()))?;
            }
            KEY_SLOPE_UPWIND => {
                self.terrain_following.slope_upwind_formulation =
                    value.parse().map_err(|e: crate::options::OptionParseError| invalid(e.to_string()))?;
            }
            KEY_SPINUP => {
                self.overland.spinup = parse_switch(value).map_err(|e| invalid(e.to_string()))?;
            }
            KEY_OVERLAND_DIFFUSIVE => {
                self.overland.model =
                    value.parse().map_err(|e: crate::options::OptionParseError| invalid(e.to_string()))?;
            }
            KEY_SPINUP_DAMP_P1 => self.overland.spinup_damp_p1 = parse_number(key, value)?,
            KEY_SPINUP_DAMP_P2 => self.overland.spinup_damp_p2 = parse_number(key, value)?,
            KEY_OVERLAND_EPSILON => self.overland.epsilon = parse_number(key, value)?,
            KEY_GRAVITY => self.physics.gravity = parse_number(key, value)?,
            KEY_VISCOSITY => self.physics.viscosity = parse_number(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        debug!("配置键 {} = {}", key, value);
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.physics.gravity.is_finite() || self.physics.gravity < 0.0 {
            return Err(ConfigError::invalid(
                "physics.gravity",
                self.physics.gravity,
                "重力必须为非负有限值",
            ));
        }

        if !self.physics.viscosity.is_finite() || self.physics.viscosity <= 0.0 {
            return Err(ConfigError::invalid(
                "physics.viscosity",
                self.physics.viscosity,
                "黏度必须为正",
            ));
        }

        if !self.overland.epsilon.is_finite() || self.overland.epsilon <= 0.0 {
            return Err(ConfigError::invalid(
                "overland.epsilon",
                self.overland.epsilon,
                "坡度下限必须为正",
            ));
        }

        for (key, value) in [
            ("overland.spinup_damp_p1", self.overland.spinup_damp_p1),
            ("overland.spinup_damp_p2", self.overland.spinup_damp_p2),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::invalid(key, value, "阻尼参数必须为有限值"));
            }
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| ConfigError::invalid(key, value, e.to_string()))
}
