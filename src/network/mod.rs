//! # 对等网络模块 (Peer Network Module)
//!
//! 三方之间的可靠、保序、面向字节的信道。每对对等方之间建立一条
//! TCP 连接；会话密钥由连接发起方选取并在监听方的 RSA 公钥下投递，
//! 之后的加密消息使用 AES-128-CBC（每条消息新鲜 IV）。
//!
//! 配置文件每行描述一个对等方：`id,ipv4,port,rsa_pubkey_path`。
//! 低 id 方充当监听方。字节计数必须精确：短读/短写是协议错误。
//! `multicast_ack` 提供阶段间唯一的跨信道同步（一字节全互换屏障）。

pub mod peer;
pub mod security;

pub use peer::*;
pub use security::*;
