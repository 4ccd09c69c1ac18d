//! # 工具模块 (Utilities)
//!
//! 位向量转换与明文参考算术（测试的基准实现），以及客户端侧的
//! 生物特征采样、压缩与 XOR 份额拆分。

pub mod biometric;
pub mod bits;

pub use biometric::*;
pub use bits::*;
