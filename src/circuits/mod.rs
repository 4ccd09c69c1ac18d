//! # 电路算术库 (Circuit Arithmetic Libraries)
//!
//! 在电路构建器之上实现完整的整数 ALU、IEEE-754 单精度浮点库与
//! SHA-2/SHA-3 承诺子电路。所有操作接受线索引切片并返回新的线索引
//! 向量，输出从不与输入别名。
//!
//! 乘法与比较按构建器的整数表示模式（有符号/无符号）参数化；
//! 浮点操作在进入时切换到无符号并在退出时恢复。

pub mod float;
pub mod integer;
pub mod sha;

pub use float::*;
pub use integer::*;
pub use sha::*;

/// 比较类型，三位编码：bit0 = 分支（以 A 还是 B 为被比较方），
/// bit1 = 严格/非严格，bit2 = 仅测试相等性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpType {
    Leq = 0,
    Geq = 1,
    Grt = 2,
    Les = 3,
    Neq = 4,
    Eq = 5,
}

impl CmpType {
    pub fn code(self) -> usize {
        self as usize
    }

    pub fn testing_eq_only(self) -> bool {
        self.code() & 4 != 0
    }

    pub fn testing_strict(self) -> bool {
        self.code() & 2 != 0
    }

    /// 分支位：0 以 A 为被比较方，1 以 B 为被比较方
    pub fn branch(self) -> usize {
        self.code() & 1
    }
}

/// 进位/借位保留模式：`Keep` 在输出尾部追加进位位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarryOut {
    Keep,
    Discard,
}

/// 移位方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDir {
    Left,
    Right,
}

/// 移位类型：截断或循环
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftType {
    Trunc,
    Circular,
}

/// 算术右移的填充位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignFill {
    Positive,
    Negative,
}

/// 前缀运算的行进方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixDir {
    FromLsb,
    FromMsb,
}

/// MSB 电路的返回内容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsbReturn {
    MaskOnly,
    MaskAndIndex,
}

/// 指数偏置操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiasTask {
    Add,
    Remove,
}

/// 无穷/NaN 处理模式
///
/// `InftyNeqNan` 在公开 API 处被拒绝（未实现的区分模式）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfinityMode {
    InftyEqNan,
    InftyNeqNan,
}

/// ⌊lg x⌋，x ≤ 1 时为 0
pub fn lg_flr(mut x: usize) -> usize {
    let mut count = 0;
    while x > 1 {
        x >>= 1;
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lg_flr() {
        assert_eq!(lg_flr(0), 0);
        assert_eq!(lg_flr(1), 0);
        assert_eq!(lg_flr(2), 1);
        assert_eq!(lg_flr(3), 1);
        assert_eq!(lg_flr(4), 2);
        assert_eq!(lg_flr(63), 5);
        assert_eq!(lg_flr(64), 6);
    }

    #[test]
    fn test_cmp_type_encoding() {
        assert!(CmpType::Eq.testing_eq_only());
        assert!(CmpType::Neq.testing_eq_only());
        assert!(!CmpType::Leq.testing_eq_only());
        assert!(CmpType::Grt.testing_strict());
        assert!(CmpType::Les.testing_strict());
        assert!(!CmpType::Leq.testing_strict());
        assert_eq!(CmpType::Leq.branch(), 0);
        assert_eq!(CmpType::Geq.branch(), 1);
        assert_eq!(CmpType::Grt.branch(), 0);
        assert_eq!(CmpType::Les.branch(), 1);
    }
}
