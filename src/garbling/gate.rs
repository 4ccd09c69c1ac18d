//! Gate types for the circuit topology

use crate::{BioAuthError, Result};

/// 门类型的 SCD 编码值（二元门取其 4 位真值表编码）
pub const AND_GATE: u8 = 8;
pub const OR_GATE: u8 = 14;
pub const XOR_GATE: u8 = 6;
pub const NOT_GATE: u8 = 5;

/// 门类型枚举
///
/// AND/OR 门产生行缩减后的 3 行混淆表；XOR 门依赖 free-XOR 优化，
/// NOT 门实现为标签交换，两者都不产生表项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    And,
    Or,
    Xor,
    Not,
}

impl GateKind {
    /// SCD 文件中的单字节编码
    pub fn to_scd_byte(self) -> u8 {
        match self {
            GateKind::And => AND_GATE,
            GateKind::Or => OR_GATE,
            GateKind::Xor => XOR_GATE,
            GateKind::Not => NOT_GATE,
        }
    }

    pub fn from_scd_byte(byte: u8) -> Result<Self> {
        match byte {
            AND_GATE => Ok(GateKind::And),
            OR_GATE => Ok(GateKind::Or),
            XOR_GATE => Ok(GateKind::Xor),
            NOT_GATE => Ok(GateKind::Not),
            other => Err(BioAuthError::Serialization(format!(
                "unknown gate type byte {}",
                other
            ))),
        }
    }

    /// 是否需要混淆表项（仅 AND/OR）
    pub fn needs_table(self) -> bool {
        matches!(self, GateKind::And | GateKind::Or)
    }

    /// 对二元门求明文真值
    pub fn eval(self, a: bool, b: bool) -> bool {
        match self {
            GateKind::And => a && b,
            GateKind::Or => a || b,
            GateKind::Xor => a ^ b,
            GateKind::Not => !a,
        }
    }
}

/// 电路中的一个门
///
/// 输入与输出均为线索引；门在构建期按拓扑序追加。NOT 门只使用
/// `input0`，其 `input1` 与 `input0` 相同。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub input0: WireId,
    pub input1: WireId,
    pub output: WireId,
    pub kind: GateKind,
}

use super::WireId;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scd_byte_round_trip() {
        for kind in [GateKind::And, GateKind::Or, GateKind::Xor, GateKind::Not] {
            assert_eq!(GateKind::from_scd_byte(kind.to_scd_byte()).unwrap(), kind);
        }
    }

    #[test]
    fn test_unknown_byte_rejected() {
        assert!(GateKind::from_scd_byte(0).is_err());
        assert!(GateKind::from_scd_byte(255).is_err());
    }

    #[test]
    fn test_truth_tables() {
        assert!(GateKind::And.eval(true, true));
        assert!(!GateKind::And.eval(true, false));
        assert!(GateKind::Or.eval(false, true));
        assert!(!GateKind::Or.eval(false, false));
        assert!(GateKind::Xor.eval(true, false));
        assert!(!GateKind::Xor.eval(true, true));
        assert!(GateKind::Not.eval(false, false));
        assert!(!GateKind::Not.eval(true, true));
    }
}
