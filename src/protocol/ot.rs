//! # 不经意传输扩展 (Oblivious Transfer Extension)
//!
//! 向混淆协议提供 2 选 1 的线标签投递：基础 OT 为 Ristretto 群上的
//! Naor-Pinkas 构造（ECC 域），扩展为 IKNP 列置换矩阵加 SHA-256 密钥
//! 派生，掩码为零差值的 XOR。半诚实模型使用 IKNP 口味；恶意模型使用
//! ALSZ 口味，带可配置的基础 OT 数（≥190）与一致性检查数（≥380）。
//!
//! 一致性检查：对每个检查回合由发送方挑战一对列索引，接收方回应
//! `H(t_j ⊕ t_k)` 与 `H(t_j ⊕ t_k ⊕ r)` 两个摘要，发送方核对与其
//! `q_j ⊕ q_k` 相符的一侧。

use crate::garbling::Label;
use crate::network::{PeerNet, TransmitMode};
use crate::utils::bits::bits_to_bytes;
use crate::{BioAuthError, Result};
use curve25519_dalek::constants::RISTRETTO_BASEPOINT_TABLE;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use rand::{thread_rng, Rng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// OT 扩展口味
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtFlavor {
    Iknp,
    Alsz,
}

/// OT 扩展参数
#[derive(Debug, Clone)]
pub struct OtConfig {
    pub flavor: OtFlavor,
    /// 基础 OT 数（= 扩展矩阵宽度 κ'）
    pub num_base_ots: usize,
    /// ALSZ 一致性检查数
    pub num_checks: usize,
    /// 计算安全参数 κ
    pub sec_param: usize,
    /// 统计安全参数 ρ
    pub stat_param: usize,
    /// 工作线程数（参考实现顺序执行）
    pub num_threads: usize,
}

impl OtConfig {
    pub fn semi_honest() -> Self {
        OtConfig {
            flavor: OtFlavor::Iknp,
            num_base_ots: 128,
            num_checks: 0,
            sec_param: 128,
            stat_param: 40,
            num_threads: 1,
        }
    }

    pub fn malicious() -> Self {
        OtConfig {
            flavor: OtFlavor::Alsz,
            num_base_ots: 190,
            num_checks: 380,
            sec_param: 128,
            stat_param: 40,
            num_threads: 1,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_base_ots < self.sec_param {
            return Err(BioAuthError::Argument(format!(
                "{} base OTs below the security parameter {}",
                self.num_base_ots, self.sec_param
            )));
        }
        if self.flavor == OtFlavor::Alsz && self.num_checks < 2 * self.num_base_ots {
            return Err(BioAuthError::Argument(format!(
                "{} consistency checks below twice the base OT count",
                self.num_checks
            )));
        }
        Ok(())
    }
}

fn random_scalar<R: RngCore>(rng: &mut R) -> Scalar {
    let mut wide = [0u8; 64];
    rng.fill_bytes(&mut wide);
    Scalar::from_bytes_mod_order_wide(&wide)
}

fn hash_point(point: &RistrettoPoint) -> [u8; 16] {
    let digest = Sha256::digest(point.compress().as_bytes());
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

fn prg_column(seed: &[u8; 16], column: usize, num_bytes: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(num_bytes);
    let mut counter = 0u64;
    while out.len() < num_bytes {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update((column as u64).to_le_bytes());
        hasher.update(counter.to_le_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(num_bytes);
    out
}

fn hash_row(index: usize, row: &[u8]) -> Label {
    let mut hasher = Sha256::new();
    hasher.update((index as u64).to_le_bytes());
    hasher.update(row);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x ^ y).collect()
}

/// 矩阵行提取：列字节数组中第 i 位拼成 κ 位行
fn extract_row(columns: &[Vec<u8>], i: usize) -> Vec<u8> {
    let kappa = columns.len();
    let mut row = vec![0u8; (kappa + 7) / 8];
    for (j, col) in columns.iter().enumerate() {
        if (col[i / 8] >> (i % 8)) & 1 == 1 {
            row[j / 8] |= 1 << (j % 8);
        }
    }
    row
}

/// 基础 OT 的发送方侧：为每个扩展列取回所选种子
///
/// 扩展协议中角色反转：扩展发送方以随机选择位 `s` 充当基础 OT 的
/// 接收方。
fn base_ot_receive(
    net: &mut PeerNet,
    peer: usize,
    choices: &[bool],
) -> Result<Vec<[u8; 16]>> {
    let count = choices.len();

    // the base-OT sender (the extension receiver) publishes A = a·G
    let a_bytes = net.receive_from_peer(peer, 32, TransmitMode::Plaintext, None)?;
    let a_point = CompressedRistretto::from_slice(&a_bytes)
        .map_err(|e| BioAuthError::Crypto(e.to_string()))?
        .decompress()
        .ok_or_else(|| BioAuthError::Crypto("bad base-OT point".to_string()))?;

    let mut rng = thread_rng();
    let mut blinds = Vec::with_capacity(count);
    let mut b_buf = Vec::with_capacity(count * 32);
    for &choice in choices {
        let b = random_scalar(&mut rng);
        let mut point = &b * RISTRETTO_BASEPOINT_TABLE;
        if choice {
            point += a_point;
        }
        b_buf.extend_from_slice(point.compress().as_bytes());
        blinds.push(b);
    }
    net.send_to_peer(peer, &b_buf, TransmitMode::Plaintext, None)?;

    // sender replies with both encrypted seeds per OT
    let pairs = net.receive_from_peer(peer, count * 32, TransmitMode::Plaintext, None)?;
    let mut seeds = Vec::with_capacity(count);
    for (i, &choice) in choices.iter().enumerate() {
        let key = hash_point(&(a_point * blinds[i]));
        let slot = &pairs[i * 32 + if choice { 16 } else { 0 }..][..16];
        let mut seed = [0u8; 16];
        for (k, byte) in slot.iter().enumerate() {
            seed[k] = byte ^ key[k];
        }
        seeds.push(seed);
    }
    Ok(seeds)
}

/// 基础 OT 的发送方：投递每列的两个种子
fn base_ot_send(net: &mut PeerNet, peer: usize, seed_pairs: &[[[u8; 16]; 2]]) -> Result<()> {
    let count = seed_pairs.len();
    let mut rng = thread_rng();

    let a = random_scalar(&mut rng);
    let a_point = &a * RISTRETTO_BASEPOINT_TABLE;
    net.send_to_peer(
        peer,
        a_point.compress().as_bytes(),
        TransmitMode::Plaintext,
        None,
    )?;

    let b_buf = net.receive_from_peer(peer, count * 32, TransmitMode::Plaintext, None)?;

    let mut pairs = Vec::with_capacity(count * 32);
    for (i, seed_pair) in seed_pairs.iter().enumerate() {
        let b_point = CompressedRistretto::from_slice(&b_buf[i * 32..(i + 1) * 32])
            .map_err(|e| BioAuthError::Crypto(e.to_string()))?
            .decompress()
            .ok_or_else(|| BioAuthError::Crypto("bad base-OT point".to_string()))?;
        let k0 = hash_point(&(b_point * a));
        let k1 = hash_point(&((b_point - a_point) * a));
        for k in 0..16 {
            pairs.push(seed_pair[0][k] ^ k0[k]);
        }
        for k in 0..16 {
            pairs.push(seed_pair[1][k] ^ k1[k]);
        }
    }
    net.send_to_peer(peer, &pairs, TransmitMode::Plaintext, None)?;
    Ok(())
}

/// 从挑战种子确定性派生一致性检查的列索引对
fn check_pair(seed: &[u8; 16], round: usize, kappa: usize) -> (usize, usize) {
    let mut buf = seed.to_vec();
    buf.extend_from_slice(&(round as u64).to_le_bytes());
    let digest = Sha256::digest(&buf);
    let j = u64::from_le_bytes(digest[..8].try_into().unwrap()) as usize % kappa;
    let mut k = u64::from_le_bytes(digest[8..16].try_into().unwrap()) as usize % kappa;
    if j == k {
        k = (k + 1) % kappa;
    }
    (j, k)
}

/// OT 扩展发送方：为每条输入线投递两个 128 位标签之一
///
/// `nsndvals` 固定为 2；掩码为零差值的 XOR。
pub fn ot_extension_send(
    net: &mut PeerNet,
    peer: usize,
    config: &OtConfig,
    pairs: &[[Label; 2]],
) -> Result<()> {
    config.validate()?;
    let num_inputs = pairs.len();
    let kappa = config.num_base_ots;
    let num_bytes = (num_inputs + 7) / 8;

    info!(
        num_inputs,
        kappa,
        flavor = ?config.flavor,
        "engaging OT extension as sender"
    );

    // extension sender takes the base-OT receiver role with random choices s
    let mut rng = thread_rng();
    let s: Vec<bool> = (0..kappa).map(|_| rng.gen()).collect();
    let seeds = base_ot_receive(net, peer, &s)?;

    // u_j columns arrive from the receiver; q_j = PRG(k_{s_j}) xor s_j*u_j
    let mut q_columns = Vec::with_capacity(kappa);
    for j in 0..kappa {
        let u_j = net.receive_from_peer(peer, num_bytes, TransmitMode::Plaintext, None)?;
        let prg = prg_column(&seeds[j], j, num_bytes);
        let q_j = if s[j] { xor_bytes(&prg, &u_j) } else { prg };
        q_columns.push(q_j);
    }

    if config.flavor == OtFlavor::Alsz {
        let mut challenge = [0u8; 16];
        rng.fill_bytes(&mut challenge);
        net.send_to_peer(peer, &challenge, TransmitMode::Plaintext, None)?;

        for round in 0..config.num_checks {
            let (j, k) = check_pair(&challenge, round, kappa);
            let response = net.receive_from_peer(peer, 64, TransmitMode::Plaintext, None)?;
            let q_xor = xor_bytes(&q_columns[j], &q_columns[k]);
            let expected = Sha256::digest(&q_xor);
            let side = (s[j] ^ s[k]) as usize;
            if response[side * 32..(side + 1) * 32] != expected[..] {
                return Err(BioAuthError::Protocol(format!(
                    "OT consistency check {} failed on columns ({}, {})",
                    round, j, k
                )));
            }
        }
        debug!(checks = config.num_checks, "consistency checks passed");
    }

    let s_row = bits_to_bytes(&s);

    // masked label pairs, row by row
    let mut payload = Vec::with_capacity(num_inputs * 32);
    for (i, pair) in pairs.iter().enumerate() {
        let row = extract_row(&q_columns, i);
        let mask0 = hash_row(i, &row);
        let mask1 = hash_row(i, &xor_bytes(&row, &s_row));
        for k in 0..16 {
            payload.push(pair[0][k] ^ mask0[k]);
        }
        for k in 0..16 {
            payload.push(pair[1][k] ^ mask1[k]);
        }
    }
    net.send_to_peer(peer, &payload, TransmitMode::Plaintext, None)?;
    Ok(())
}

/// OT 扩展接收方：按选择位取回每条输入线的标签
pub fn ot_extension_receive(
    net: &mut PeerNet,
    peer: usize,
    config: &OtConfig,
    choices: &[bool],
) -> Result<Vec<Label>> {
    config.validate()?;
    let num_inputs = choices.len();
    let kappa = config.num_base_ots;
    let num_bytes = (num_inputs + 7) / 8;

    info!(
        num_inputs,
        kappa,
        flavor = ?config.flavor,
        "engaging OT extension as receiver"
    );

    // extension receiver takes the base-OT sender role with seed pairs
    let mut rng = thread_rng();
    let mut seed_pairs = Vec::with_capacity(kappa);
    for _ in 0..kappa {
        let mut k0 = [0u8; 16];
        let mut k1 = [0u8; 16];
        rng.fill_bytes(&mut k0);
        rng.fill_bytes(&mut k1);
        seed_pairs.push([k0, k1]);
    }
    base_ot_send(net, peer, &seed_pairs)?;

    let r_bytes = bits_to_bytes(choices);

    // t_j = PRG(k0_j); u_j = t_j xor PRG(k1_j) xor r
    let mut t_columns = Vec::with_capacity(kappa);
    for (j, seed_pair) in seed_pairs.iter().enumerate() {
        let t_j = prg_column(&seed_pair[0], j, num_bytes);
        let t1_j = prg_column(&seed_pair[1], j, num_bytes);
        let u_j = xor_bytes(&xor_bytes(&t_j, &t1_j), &r_bytes);
        net.send_to_peer(peer, &u_j, TransmitMode::Plaintext, None)?;
        t_columns.push(t_j);
    }

    if config.flavor == OtFlavor::Alsz {
        let challenge_buf = net.receive_from_peer(peer, 16, TransmitMode::Plaintext, None)?;
        let challenge: [u8; 16] = challenge_buf.try_into().unwrap();

        for round in 0..config.num_checks {
            let (j, k) = check_pair(&challenge, round, kappa);
            let t_xor = xor_bytes(&t_columns[j], &t_columns[k]);
            let h0 = Sha256::digest(&t_xor);
            let h1 = Sha256::digest(&xor_bytes(&t_xor, &r_bytes));
            let mut response = Vec::with_capacity(64);
            response.extend_from_slice(&h0);
            response.extend_from_slice(&h1);
            net.send_to_peer(peer, &response, TransmitMode::Plaintext, None)?;
        }
    }

    let payload = net.receive_from_peer(peer, num_inputs * 32, TransmitMode::Plaintext, None)?;
    let mut labels = Vec::with_capacity(num_inputs);
    for (i, &choice) in choices.iter().enumerate() {
        let row = extract_row(&t_columns, i);
        let mask = hash_row(i, &row);
        let slot = &payload[i * 32 + if choice { 16 } else { 0 }..][..16];
        let mut label = [0u8; 16];
        for (k, byte) in slot.iter().enumerate() {
            label[k] = byte ^ mask[k];
        }
        labels.push(label);
    }
    Ok(labels)
}
