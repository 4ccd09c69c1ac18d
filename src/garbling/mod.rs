//! # 混淆电路引擎 (Garbling Engine)
//!
//! 本模块实现 Yao 混淆电路的标签代数、门内核与构建基底：
//!
//! - **线标签**: 每条线携带两个 128 位标签，分别代表逻辑 0 和 1
//! - **Free XOR**: 全电路共享秘密差值 `R`，`label1 = label0 XOR R`，
//!   XOR 门只需标签异或，不产生混淆表
//! - **Point-and-Permute**: `R` 的最低位强制为 1，使每条线两个标签的
//!   最低位互补，求值方可据此直接选择表行
//! - **行缩减 (Row Reduction)**: 非 XOR 门的混淆表从 4 行缩减为 3 行，
//!   排列位为 (0,0) 的行被强制为全零并省略
//! - **常量折叠**: `MIXED_OP` 门在构建期消解固定 0/1 线与相同输入，
//!   常量自动穿透整个电路库
//!
//! 构建阶段只产生电路拓扑（可序列化为 SCD 文件）；标签与混淆表由独立的
//! 混淆过程按次生成，这与运行时协议一致 —— S1 从 SCD 读回拓扑后才混淆。

pub mod circuit;
pub mod evaluator;
pub mod garbler;
pub mod gate;
pub mod plain;
pub mod scd;

pub use circuit::*;
pub use evaluator::*;
pub use garbler::*;
pub use gate::*;
pub use plain::*;
pub use scd::*;

use rand::RngCore;

/// 线标签类型，128 位随机值
///
/// 每条线有两个标签，分别对应逻辑值 0 和 1。标签的随机性是混淆电路
/// 安全性的基础。
pub type Label = [u8; 16];

/// 线标识符类型
pub type WireId = usize;

/// 计算两个标签的异或
///
/// 这是 Free XOR 优化的核心操作，允许 XOR 门无需混淆表即可求值。
pub fn xor_labels(a: &Label, b: &Label) -> Label {
    let mut result = [0u8; 16];
    for i in 0..16 {
        result[i] = a[i] ^ b[i];
    }
    result
}

/// 读取标签的最低有效位（point-and-permute 排列位）
pub fn label_lsb(label: &Label) -> bool {
    label[0] & 1 == 1
}

/// 生成随机线标签
pub fn generate_random_label<R: RngCore>(rng: &mut R) -> Label {
    let mut label = [0u8; 16];
    rng.fill_bytes(&mut label);
    label
}

/// 生成 free-XOR 差值 `R`，最低位强制为 1 以保持 point-and-permute 性质
pub fn generate_delta<R: RngCore>(rng: &mut R) -> Label {
    let mut delta = generate_random_label(rng);
    delta[0] |= 1;
    delta
}
