//! # 三方对等信道 (Three-Party Peer Channel)
//!
//! 每对对等方之间一条 TCP 连接，全序 FIFO。连接模式不对称：低 id 方
//! 监听，高 id 方发起并重试。发起方生成 16 字节会话密钥，在监听方的
//! RSA 公钥下投递；之后双向共享该密钥。
//!
//! 发送/接收的字节计数必须精确；加密消息带 4 字节小端长度帧。
//! 超时是单调递减的期限：每次 I/O 消耗剩余预算，预算耗尽按短计数
//! 处理。屏障 `multicast_ack` 无超时。

use super::security::{aes_cbc_decrypt, aes_cbc_encrypt, RsaPrivateKey, RsaPublicKey};
use crate::{BioAuthError, Result};
use rand::thread_rng;
use rand::RngCore;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// 传输模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmitMode {
    Plaintext,
    Encrypted,
}

/// 屏障确认字节
pub const ACK: u8 = 32;

const CONNECT_RETRY_DELAY_MS: u64 = 100;
const CONNECT_RETRY_LIMIT: usize = 600;

/// 配置文件中的一个对等方
#[derive(Debug, Clone)]
pub struct PeerAddress {
    pub id: usize,
    pub ip: String,
    pub port: u16,
    pub rsa_pubkey_path: String,
}

/// 解析对等网络配置：每行 `id,ipv4,port,rsa_pubkey_path`
pub fn parse_peer_config<P: AsRef<Path>>(path: P) -> Result<Vec<PeerAddress>> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|e| BioAuthError::Resource(format!("{}: {}", path.as_ref().display(), e)))?;
    parse_peer_config_str(&text)
}

pub fn parse_peer_config_str(text: &str) -> Result<Vec<PeerAddress>> {
    let mut peers = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(|f| f.trim()).collect();
        if fields.len() != 4 {
            return Err(BioAuthError::Argument(format!(
                "malformed peer config line '{}'",
                line
            )));
        }
        let id = fields[0]
            .parse()
            .map_err(|_| BioAuthError::Argument(format!("bad peer id '{}'", fields[0])))?;
        let port = fields[2]
            .parse()
            .map_err(|_| BioAuthError::Argument(format!("bad port '{}'", fields[2])))?;
        peers.push(PeerAddress {
            id,
            ip: fields[1].to_string(),
            port,
            rsa_pubkey_path: fields[3].to_string(),
        });
    }
    if peers.is_empty() {
        return Err(BioAuthError::Argument("empty peer config".to_string()));
    }
    Ok(peers)
}

struct PeerLink {
    stream: TcpStream,
    session_key: [u8; 16],
}

/// 三方对等网络
pub struct PeerNet {
    my_id: usize,
    links: HashMap<usize, PeerLink>,
    send_count: usize,
    recv_count: usize,
}

impl std::fmt::Debug for PeerNet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerNet")
            .field("my_id", &self.my_id)
            .field("connected_peers", &self.links.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl PeerNet {
    /// 建立到所有其他对等方的连接并完成会话密钥交换
    ///
    /// 低 id 方在自己的端口监听来自高 id 方的连接；高 id 方带重试
    /// 地发起连接，随后发送自己的 id 与 RSA 加密的会话密钥。
    pub fn connect(
        my_id: usize,
        my_rsa_key: &RsaPrivateKey,
        peers: &[PeerAddress],
    ) -> Result<PeerNet> {
        let me = peers
            .iter()
            .find(|p| p.id == my_id)
            .ok_or_else(|| BioAuthError::Argument(format!("peer {} not in config", my_id)))?
            .clone();

        let mut links = HashMap::new();
        let expect_inbound = peers.iter().filter(|p| p.id > my_id).count();

        // serve lower-numbered side first so both orders interleave cleanly
        if expect_inbound > 0 {
            let listener = TcpListener::bind((me.ip.as_str(), me.port))?;
            info!(my_id, port = me.port, "listening for higher-id peers");
            let mut accepted = 0;
            while accepted < expect_inbound {
                let (mut stream, addr) = listener.accept()?;
                stream.set_nodelay(true)?;
                let mut id_buf = [0u8; 4];
                stream.read_exact(&mut id_buf)?;
                let peer_id = u32::from_le_bytes(id_buf) as usize;

                let mut len_buf = [0u8; 4];
                stream.read_exact(&mut len_buf)?;
                let ct_len = u32::from_le_bytes(len_buf) as usize;
                let mut ct = vec![0u8; ct_len];
                stream.read_exact(&mut ct)?;
                let key_bytes = my_rsa_key.decrypt(&ct, 16)?;
                let mut session_key = [0u8; 16];
                session_key.copy_from_slice(&key_bytes);

                debug!(my_id, peer_id, %addr, "accepted peer connection");
                links.insert(peer_id, PeerLink { stream, session_key });
                accepted += 1;
            }
        }

        // connect out to lower-numbered peers, retrying until they listen
        for peer in peers.iter().filter(|p| p.id < my_id) {
            let pubkey = RsaPublicKey::load_json(&peer.rsa_pubkey_path)?;
            let mut attempts = 0;
            let mut stream = loop {
                match TcpStream::connect((peer.ip.as_str(), peer.port)) {
                    Ok(s) => break s,
                    Err(e) => {
                        attempts += 1;
                        if attempts > CONNECT_RETRY_LIMIT {
                            return Err(BioAuthError::Network(format!(
                                "could not reach peer {}: {}",
                                peer.id, e
                            )));
                        }
                        std::thread::sleep(Duration::from_millis(CONNECT_RETRY_DELAY_MS));
                    }
                }
            };
            stream.set_nodelay(true)?;

            let mut session_key = [0u8; 16];
            thread_rng().fill_bytes(&mut session_key);
            let ct = pubkey.encrypt(&mut thread_rng(), &session_key)?;

            stream.write_all(&(my_id as u32).to_le_bytes())?;
            stream.write_all(&(ct.len() as u32).to_le_bytes())?;
            stream.write_all(&ct)?;

            debug!(my_id, peer_id = peer.id, "connected to peer");
            links.insert(peer.id, PeerLink { stream, session_key });
        }

        info!(my_id, peers = links.len(), "peer network connected");
        Ok(PeerNet {
            my_id,
            links,
            send_count: 0,
            recv_count: 0,
        })
    }

    pub fn my_id(&self) -> usize {
        self.my_id
    }

    pub fn send_count(&self) -> usize {
        self.send_count
    }

    pub fn recv_count(&self) -> usize {
        self.recv_count
    }

    fn link(&mut self, peer_id: usize) -> Result<&mut PeerLink> {
        self.links
            .get_mut(&peer_id)
            .ok_or_else(|| BioAuthError::Network(format!("no link to peer {}", peer_id)))
    }

    fn apply_deadline(stream: &TcpStream, deadline: Option<Instant>) -> Result<()> {
        let timeout = match deadline {
            None => None,
            Some(d) => {
                let now = Instant::now();
                if d <= now {
                    return Err(BioAuthError::Network("deadline expired".to_string()));
                }
                Some(d - now)
            }
        };
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;
        Ok(())
    }

    /// 向对等方发送并返回明文字节数；短写是错误
    pub fn send_to_peer(
        &mut self,
        peer_id: usize,
        send_buf: &[u8],
        mode: TransmitMode,
        deadline: Option<Instant>,
    ) -> Result<usize> {
        let link = self.link(peer_id)?;
        Self::apply_deadline(&link.stream, deadline)?;

        match mode {
            TransmitMode::Plaintext => {
                link.stream.write_all(send_buf)?;
            }
            TransmitMode::Encrypted => {
                let ct = aes_cbc_encrypt(&mut thread_rng(), &link.session_key, send_buf);
                link.stream.write_all(&(ct.len() as u32).to_le_bytes())?;
                link.stream.write_all(&ct)?;
            }
        }
        link.stream.flush()?;
        self.send_count += send_buf.len();
        debug!(
            from = self.my_id,
            to = peer_id,
            bytes = send_buf.len(),
            encrypted = mode == TransmitMode::Encrypted,
            "sent"
        );
        Ok(send_buf.len())
    }

    /// 从对等方接收恰好 `recv_len` 个明文字节；计数不符是错误
    pub fn receive_from_peer(
        &mut self,
        peer_id: usize,
        recv_len: usize,
        mode: TransmitMode,
        deadline: Option<Instant>,
    ) -> Result<Vec<u8>> {
        let link = self.link(peer_id)?;
        Self::apply_deadline(&link.stream, deadline)?;

        let buf = match mode {
            TransmitMode::Plaintext => {
                let mut buf = vec![0u8; recv_len];
                link.stream.read_exact(&mut buf)?;
                buf
            }
            TransmitMode::Encrypted => {
                let mut len_buf = [0u8; 4];
                link.stream.read_exact(&mut len_buf)?;
                let ct_len = u32::from_le_bytes(len_buf) as usize;
                let mut ct = vec![0u8; ct_len];
                link.stream.read_exact(&mut ct)?;
                let pt = aes_cbc_decrypt(&link.session_key, &ct)?;
                if pt.len() != recv_len {
                    return Err(BioAuthError::Protocol(format!(
                        "byte count mismatch from peer {}: expected {}, got {}",
                        peer_id,
                        recv_len,
                        pt.len()
                    )));
                }
                pt
            }
        };
        self.recv_count += buf.len();
        debug!(
            at = self.my_id,
            from = peer_id,
            bytes = buf.len(),
            "received"
        );
        Ok(buf)
    }

    /// 一字节全互换屏障；`rounds` 次往复，无超时
    pub fn multicast_ack(&mut self, roster: &[usize], rounds: usize) -> Result<()> {
        for _ in 0..rounds {
            for &peer in roster {
                if peer != self.my_id {
                    self.send_to_peer(peer, &[ACK], TransmitMode::Plaintext, None)?;
                }
            }
            for &peer in roster {
                if peer != self.my_id {
                    let buf = self.receive_from_peer(peer, 1, TransmitMode::Plaintext, None)?;
                    if buf[0] != ACK {
                        return Err(BioAuthError::Protocol(format!(
                            "unexpected barrier byte {} from peer {}",
                            buf[0], peer
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}
