// crates/rh_config/src/options.rs

//! 数值方案选项
//!
//! 地形跟随网格的重力分量公式与坡面漫流模型都是运行时选择的枚举。
//! 解析接受 JSON 中的蛇形命名，也接受键值输入中的驼峰命名与整数开关。

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 选项解析错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("无效的{option}取值: '{value}', 期望 {expected}")]
pub struct OptionParseError {
    /// 选项名称
    pub option: &'static str,
    /// 输入值
    pub value: String,
    /// 可接受的取值
    pub expected: &'static str,
}

// ============================================================================
// 地形跟随坡度迎风公式
// ============================================================================

/// 地形跟随网格下侧向面重力分量的计算方式
///
/// 侧向面的重力分量由单元及其东/北邻居的地表坡度 `s` 得到：
///
/// | 公式 | 沿坡分量 | 法向分量 |
/// |------|---------|---------|
/// | `Original` | 两单元 `g·sin(atan s)` 的算术平均 | 两单元 `g·cos(atan s)` 的算术平均 |
/// | `UpwindSine` | 本单元 `g·sin(atan s)` | 本单元 `g·cos(atan s)` |
/// | `Upwind` | 本单元 `s` | 1 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SlopeUpwindFormulation {
    /// 两侧平均
    #[default]
    Original,
    /// 本单元正弦/余弦
    UpwindSine,
    /// 本单元坡度直接作为分量
    Upwind,
}

impl SlopeUpwindFormulation {
    /// 获取名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::UpwindSine => "upwind_sine",
            Self::Upwind => "upwind",
        }
    }

    /// 全部取值
    pub fn all() -> [Self; 3] {
        [Self::Original, Self::UpwindSine, Self::Upwind]
    }
}

impl std::fmt::Display for SlopeUpwindFormulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SlopeUpwindFormulation {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" | "0" => Ok(Self::Original),
            "upwindsine" | "upwind_sine" | "1" => Ok(Self::UpwindSine),
            "upwind" | "2" => Ok(Self::Upwind),
            _ => Err(OptionParseError {
                option: "坡度迎风公式",
                value: s.to_string(),
                expected: "'Original', 'UpwindSine' 或 'Upwind'",
            }),
        }
    }
}

// ============================================================================
// 坡面漫流模型
// ============================================================================

/// 通用 Overland 边界使用的坡面流模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OverlandModel {
    /// 运动波：摩擦坡度取地表坡度
    #[default]
    Kinematic,
    /// 扩散波：摩擦坡度计入水面梯度
    Diffusive,
}

impl OverlandModel {
    /// 获取名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kinematic => "kinematic",
            Self::Diffusive => "diffusive",
        }
    }
}

impl std::fmt::Display for OverlandModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OverlandModel {
    type Err = OptionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kinematic" | "0" => Ok(Self::Kinematic),
            "diffusive" | "1" => Ok(Self::Diffusive),
            _ => Err(OptionParseError {
                option: "坡面流模型",
                value: s.to_string(),
                expected: "'kinematic' 或 'diffusive'",
            }),
        }
    }
}

/// 解析开关值，接受 `True/False`、`true/false` 和 `1/0`
pub fn parse_switch(s: &str) -> Result<bool, OptionParseError> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        _ => Err(OptionParseError {
            option: "开关",
            value: s.to_string(),
            expected: "'True' 或 'False'",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formulation_parse() {
        assert_eq!(
            "Original".parse::<SlopeUpwindFormulation>().unwrap(),
            SlopeUpwindFormulation::Original
        );
        assert_eq!(
            "UpwindSine".parse::<SlopeUpwindFormulation>().unwrap(),
            SlopeUpwindFormulation::UpwindSine
        );
        assert_eq!(
            "upwind".parse::<SlopeUpwindFormulation>().unwrap(),
            SlopeUpwindFormulation::Upwind
        );
        assert!("Downwind".parse::<SlopeUpwindFormulation>().is_err());
    }

    #[test]
    fn test_formulation_display_roundtrip() {
        for f in SlopeUpwindFormulation::all() {
            assert_eq!(f.to_string().parse::<SlopeUpwindFormulation>().unwrap(), f);
        }
    }

    #[test]
    fn test_overland_model_parse() {
        assert_eq!(OverlandModel::default(), OverlandModel::Kinematic);
        assert_eq!("1".parse::<OverlandModel>().unwrap(), OverlandModel::Diffusive);
        assert_eq!("Kinematic".parse::<OverlandModel>().unwrap(), OverlandModel::Kinematic);
        let err = "dynamic".parse::<OverlandModel>().unwrap_err();
        assert!(err.to_string().contains("dynamic"));
    }

    #[test]
    fn test_parse_switch() {
        assert!(parse_switch("True").unwrap());
        assert!(!parse_switch("False").unwrap());
        assert!(parse_switch("1").unwrap());
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&SlopeUpwindFormulation::UpwindSine).unwrap();
        assert_eq!(json, "\"upwind_sine\"");
        let model: OverlandModel = serde_json::from_str("\"diffusive\"").unwrap();
        assert_eq!(model, OverlandModel::Diffusive);
    }
}
