//! # Bio Auth MPC - 隐私保护生物特征认证 (Privacy-Preserving Biometric Authentication) 库
//!
//! 这是一个用 Rust 实现的三方隐私保护生物特征认证系统，基于 Yao 混淆电路协议
//! 和不经意传输 (OT) 扩展。协议参与方为两台互不合谋的服务器 (S1, S2) 和一个
//! 客户端 (C)：客户端对新采集的生物特征向量做 XOR 秘密分享并分发给两台服务器，
//! 服务器在不接触明文特征的情况下计算距离函数并与公开阈值比较，最终只向客户端
//! 返回一个接受/拒绝位。
//!
//! ## 核心组件 (Core Components)
//!
//! ### 混淆电路 (Garbled Circuits)
//! - **标签代数与门内核**: 128 位线标签、free-XOR、行缩减、point-and-permute
//! - **电路构建基底**: 线/门分配、电路拓扑、SCD 文件读写
//! - **混淆与求值**: 从电路拓扑生成混淆表，以及镜像的求值过程
//!
//! ### 电路算术库 (Circuit Arithmetic Libraries)
//! - **整数库**: 加/减/乘/比较/移位/点积/Karatsuba/递归平方等完整 ALU
//! - **浮点库**: IEEE-754 单精度的电路化表示与加/乘/平方/比较/移位
//! - **承诺子电路**: SHA-2-256 与 SHA-3-256 的门级实现（恶意模型）
//!
//! ### 距离函数 (Distance Functions)
//! - **汉明距离 (HD)**: XOR 后按位计数，与阈值比较
//! - **欧氏距离 (ED)**: 六项展开式，整数点积 + 浮点求和
//! - **余弦相似度 (CS)**: 四项展开式，同上
//!
//! ### 三方协议 (Three-Party Protocol)
//! - **对等网络**: TCP 可靠有序信道，RSA 会话密钥交换 + AES-128-CBC 加密
//! - **不经意传输**: IKNP（半诚实）/ ALSZ（恶意）OT 扩展接口与实现
//! - **认证驱动**: S1 混淆、S2 求值、C 分发份额并接收判定位
//!
//! ## 设计原则 (Design Principles)
//!
//! 1. **隐私性**: 任何一方都无法获得明文生物特征
//! 2. **常量折叠**: 所有上层电路经由 MIXED_OP 构造，常量自动穿透传播
//! 3. **显式错误**: 统一错误类型贯穿所有签名，没有静默失败
//! 4. **模块化**: 电路库、混淆引擎、协议驱动彼此独立可用

pub mod circuits;
pub mod distance;
pub mod garbling;
pub mod network;
pub mod protocol;
pub mod utils;

pub use circuits::*;
pub use distance::*;
pub use garbling::*;
pub use network::*;
pub use protocol::*;
pub use utils::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BioAuthError {
    #[error("Argument error: {0}")]
    Argument(String),
    #[error("Resource error: {0}")]
    Resource(String),
    #[error("Allocation exceeded: {0}")]
    AllocationExceeded(String),
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Output label matched neither expected label at output wire {0}")]
    LabelMismatch(usize),
    #[error("Cryptographic error: {0}")]
    Crypto(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Unsupported mode: {0}")]
    UnsupportedMode(String),
}

impl From<std::io::Error> for BioAuthError {
    fn from(e: std::io::Error) -> Self {
        BioAuthError::Network(e.to_string())
    }
}

impl From<String> for BioAuthError {
    fn from(s: String) -> Self {
        BioAuthError::Protocol(s)
    }
}

impl From<&str> for BioAuthError {
    fn from(s: &str) -> Self {
        BioAuthError::Protocol(s.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BioAuthError>;
