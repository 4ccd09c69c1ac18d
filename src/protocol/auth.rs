//! # 认证协议驱动 (Authentication Protocol Driver)
//!
//! 每个角色一个状态机：
//!
//! - S1: 离线混淆 → 离线发送 → 屏障 → 收份额 → OT 发送 → 收输出标签
//!   → 映射 → 发判定 → 结束
//! - S2: 收离线数据 → 屏障 → 收份额 → OT 接收 → 求值 → 发输出标签 → 结束
//! - C:  屏障 → 采样 → 发份额 → 收判定 → 结束
//!
//! 任一箭头上的错误对本次认证是致命的：本方干净退出，S1 尽力向 C
//! 发送判定 4。电路本身没有重试的概念。

use super::ot::{ot_extension_receive, ot_extension_send, OtConfig};
use super::{Decision, CLIENT_ID, S1_ID, S2_ID};
use crate::distance::{BioCircuitConfig, COMMIT_NONCE_BITS};
use crate::garbling::{evaluate, garble, map_outputs, Garbling, GarbledCircuit, Label};
use crate::network::{PeerNet, TransmitMode};
use crate::utils::biometric::CompressedBiometric;
use crate::utils::bits::bytes_to_bits;
use crate::{BioAuthError, Result};
use rand::thread_rng;
use tracing::{info, warn};

/// 认证运行参数
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub circuit: BioCircuitConfig,
    pub ot: OtConfig,
    /// 为假时各方在屏障后直接收尾（只测离线阶段）
    pub computing_online: bool,
}

impl AuthConfig {
    pub fn new(circuit: BioCircuitConfig) -> Self {
        let ot = if circuit.is_malicious() {
            OtConfig::malicious()
        } else {
            OtConfig::semi_honest()
        };
        AuthConfig {
            circuit,
            ot,
            computing_online: true,
        }
    }

    fn share_byte_len(&self) -> usize {
        (self.circuit.biometric_input_bits() + 7) / 8
    }

    fn output_label_msg_len(&self) -> usize {
        self.circuit.circuit_output_size() * 16 + 1
    }
}

/// S1 侧的本地秘密
#[derive(Debug, Clone)]
pub struct S1Inputs {
    /// 登记模板的 S1 份额（ℓ·n + 64 位）
    pub enrollment_share: Vec<bool>,
    /// 承诺随机数的 S1 份额（128 位，恶意模型）
    pub nonce_share: Vec<bool>,
    /// 登记承诺的期望摘要（256 位，恶意模型）
    pub expected_digest: Vec<bool>,
}

/// S2 侧的本地秘密
#[derive(Debug, Clone)]
pub struct S2Inputs {
    pub enrollment_share: Vec<bool>,
    pub nonce_share: Vec<bool>,
}

fn verify_circuit_shape(config: &AuthConfig, circuit: &GarbledCircuit) -> Result<()> {
    if circuit.n != config.circuit.circuit_input_size() {
        return Err(BioAuthError::Protocol(format!(
            "circuit has {} inputs, configuration requires {}",
            circuit.n,
            config.circuit.circuit_input_size()
        )));
    }
    if circuit.m != config.circuit.circuit_output_size() {
        return Err(BioAuthError::Protocol(format!(
            "circuit has {} outputs, configuration requires {}",
            circuit.m,
            config.circuit.circuit_output_size()
        )));
    }
    Ok(())
}

/// S1：混淆方
///
/// 返回发往客户端的判定；内部错误被转换为判定 4 并尽力通知客户端。
pub fn run_s1(
    net: &mut PeerNet,
    config: &AuthConfig,
    circuit: &GarbledCircuit,
    inputs: &S1Inputs,
) -> Result<Option<Decision>> {
    match run_s1_inner(net, config, circuit, inputs) {
        Ok(None) => Ok(None),
        Ok(Some(decision)) => {
            info!(decision = decision.to_byte(), "S1 decision");
            net.send_to_peer(
                CLIENT_ID,
                &[decision.to_byte()],
                TransmitMode::Encrypted,
                None,
            )?;
            Ok(Some(decision))
        }
        Err(e) => {
            warn!(error = %e, "S1 aborting authentication");
            // best effort: surface decision 4 to the client
            let _ = net.send_to_peer(
                CLIENT_ID,
                &[Decision::Error.to_byte()],
                TransmitMode::Encrypted,
                None,
            );
            Ok(Some(Decision::Error))
        }
    }
}

fn run_s1_inner(
    net: &mut PeerNet,
    config: &AuthConfig,
    circuit: &GarbledCircuit,
    inputs: &S1Inputs,
) -> Result<Option<Decision>> {
    verify_circuit_shape(config, circuit)?;
    let bio_bits = config.circuit.biometric_input_bits();
    if inputs.enrollment_share.len() != bio_bits {
        return Err(BioAuthError::Argument(format!(
            "enrollment share has {} bits, expected {}",
            inputs.enrollment_share.len(),
            bio_bits
        )));
    }

    info!("S1 garbling circuit");
    let garbling = garble(circuit, &mut thread_rng())?;

    let table_bytes = garbling.tables_to_bytes();
    info!(bytes = table_bytes.len(), "S1 sending garbled table");
    net.send_to_peer(S2_ID, &table_bytes, TransmitMode::Plaintext, None)?;

    if config.circuit.is_malicious() {
        if inputs.expected_digest.len() != 256 || inputs.nonce_share.len() != COMMIT_NONCE_BITS {
            return Err(BioAuthError::Argument(
                "malicious mode requires a 256-bit digest and 128-bit nonce share".to_string(),
            ));
        }
        let digest_start = 2 * bio_bits + COMMIT_NONCE_BITS;
        let mut label_buf = Vec::with_capacity(256 * 16);
        for (i, &bit) in inputs.expected_digest.iter().enumerate() {
            label_buf.extend_from_slice(&garbling.input_labels[digest_start + i][bit as usize]);
        }
        info!("S1 sending commitment labels");
        net.send_to_peer(S2_ID, &label_buf, TransmitMode::Encrypted, None)?;
    }

    net.multicast_ack(&[S1_ID, S2_ID, CLIENT_ID], 1)?;
    if !config.computing_online {
        return Ok(None);
    }

    info!("S1 receiving XOR share from client");
    let bhat1_buf = net.receive_from_peer(
        CLIENT_ID,
        config.share_byte_len(),
        TransmitMode::Encrypted,
        None,
    )?;
    let bhat1 = bytes_to_bits(&bhat1_buf, bio_bits);

    // label pairs for S2's wires, permuted by the locally known share bits so
    // that S2's choice bit lands on the reconstructed plaintext bit
    let mut pairs: Vec<[Label; 2]> = Vec::with_capacity(config.circuit.ot_bit_count());
    for (i, &share_bit) in bhat1.iter().enumerate() {
        let labels = &garbling.input_labels[i];
        pairs.push([labels[share_bit as usize], labels[!share_bit as usize]]);
    }
    for (i, &share_bit) in inputs.enrollment_share.iter().enumerate() {
        let labels = &garbling.input_labels[bio_bits + i];
        pairs.push([labels[share_bit as usize], labels[!share_bit as usize]]);
    }
    if config.circuit.is_malicious() {
        for (i, &share_bit) in inputs.nonce_share.iter().enumerate() {
            let labels = &garbling.input_labels[2 * bio_bits + i];
            pairs.push([labels[share_bit as usize], labels[!share_bit as usize]]);
        }
    }

    info!("S1 engaging in OT with S2");
    ot_extension_send(net, S2_ID, &config.ot, &pairs)?;

    info!("S1 receiving output labels from S2");
    let elln_buf = net.receive_from_peer(
        S2_ID,
        config.output_label_msg_len(),
        TransmitMode::Encrypted,
        None,
    )?;

    let m = config.circuit.circuit_output_size();
    if elln_buf[m * 16] != 1 {
        warn!("S2 signals failure");
        return Ok(Some(Decision::Error));
    }

    let mut output_labels: Vec<Label> = Vec::with_capacity(m);
    for i in 0..m {
        let mut label = [0u8; 16];
        label.copy_from_slice(&elln_buf[i * 16..(i + 1) * 16]);
        output_labels.push(label);
    }

    let bits = map_outputs(&garbling.output_map, &output_labels)?;
    let decision = if bits.iter().all(|&b| b) {
        Decision::Accept
    } else {
        Decision::Reject
    };
    Ok(Some(decision))
}

/// S2：求值方
pub fn run_s2(
    net: &mut PeerNet,
    config: &AuthConfig,
    circuit: &GarbledCircuit,
    inputs: &S2Inputs,
) -> Result<Option<()>> {
    verify_circuit_shape(config, circuit)?;

    info!("S2 receiving garbled table from S1");
    let table_bytes = net.receive_from_peer(
        S1_ID,
        circuit.table_gate_count() * 48,
        TransmitMode::Plaintext,
        None,
    )?;
    let tables = Garbling::tables_from_bytes(&table_bytes)?;

    let mut commitment_labels: Vec<Label> = Vec::new();
    if config.circuit.is_malicious() {
        info!("S2 receiving commitment labels from S1");
        let buf = net.receive_from_peer(S1_ID, 256 * 16, TransmitMode::Encrypted, None)?;
        for chunk in buf.chunks_exact(16) {
            let mut label = [0u8; 16];
            label.copy_from_slice(chunk);
            commitment_labels.push(label);
        }
    }

    net.multicast_ack(&[S1_ID, S2_ID, CLIENT_ID], 1)?;
    if !config.computing_online {
        return Ok(None);
    }

    let result = run_s2_online(net, config, circuit, inputs, &tables, &commitment_labels);

    let m = config.circuit.circuit_output_size();
    let mut elln_buf = vec![0u8; m * 16 + 1];
    match result {
        Ok(output_labels) => {
            for (i, label) in output_labels.iter().enumerate() {
                elln_buf[i * 16..(i + 1) * 16].copy_from_slice(label);
            }
            elln_buf[m * 16] = 1;
        }
        Err(e) => {
            warn!(error = %e, "S2 could not evaluate; signalling failure");
        }
    }
    info!("S2 sending output labels to S1");
    net.send_to_peer(S1_ID, &elln_buf, TransmitMode::Encrypted, None)?;
    Ok(Some(()))
}

fn run_s2_online(
    net: &mut PeerNet,
    config: &AuthConfig,
    circuit: &GarbledCircuit,
    inputs: &S2Inputs,
    tables: &[crate::garbling::GarbledTableEntry],
    commitment_labels: &[Label],
) -> Result<Vec<Label>> {
    let bio_bits = config.circuit.biometric_input_bits();
    if inputs.enrollment_share.len() != bio_bits {
        return Err(BioAuthError::Argument(format!(
            "enrollment share has {} bits, expected {}",
            inputs.enrollment_share.len(),
            bio_bits
        )));
    }

    info!("S2 receiving XOR share from client");
    let bhat2_buf = net.receive_from_peer(
        CLIENT_ID,
        config.share_byte_len(),
        TransmitMode::Encrypted,
        None,
    )?;
    let bhat2 = bytes_to_bits(&bhat2_buf, bio_bits);

    let mut choices = bhat2;
    choices.extend_from_slice(&inputs.enrollment_share);
    if config.circuit.is_malicious() {
        if inputs.nonce_share.len() != COMMIT_NONCE_BITS {
            return Err(BioAuthError::Argument(
                "malicious mode requires a 128-bit nonce share".to_string(),
            ));
        }
        choices.extend_from_slice(&inputs.nonce_share);
    }

    info!("S2 engaging in OT with S1");
    let mut input_labels = ot_extension_receive(net, S1_ID, &config.ot, &choices)?;
    input_labels.extend_from_slice(commitment_labels);

    if input_labels.len() != circuit.n {
        return Err(BioAuthError::Protocol(format!(
            "assembled {} input labels for a circuit with {} inputs",
            input_labels.len(),
            circuit.n
        )));
    }

    info!("S2 evaluating garbled circuit");
    evaluate(circuit, tables, &input_labels)
}

/// C：客户端
///
/// 采样/压缩在外部完成；这里拆分份额、分发并等待判定。
pub fn run_client(
    net: &mut PeerNet,
    config: &AuthConfig,
    biometric: &CompressedBiometric,
) -> Result<Option<Decision>> {
    net.multicast_ack(&[S1_ID, S2_ID, CLIENT_ID], 1)?;
    if !config.computing_online {
        return Ok(None);
    }

    let bits = biometric.to_input_bits();
    if bits.len() != config.circuit.biometric_input_bits() {
        return Err(BioAuthError::Argument(format!(
            "biometric packs to {} bits, circuit expects {}",
            bits.len(),
            config.circuit.biometric_input_bits()
        )));
    }

    let (share1, share2) = crate::utils::biometric::xor_split(&mut thread_rng(), &bits);

    info!("client sending XOR shares");
    net.send_to_peer(S1_ID, &share1, TransmitMode::Encrypted, None)?;
    net.send_to_peer(S2_ID, &share2, TransmitMode::Encrypted, None)?;

    info!("client waiting for decision");
    let decision_buf = net.receive_from_peer(S1_ID, 1, TransmitMode::Encrypted, None)?;
    let decision = Decision::from_byte(decision_buf[0]);
    info!(decision = decision_buf[0], "client received decision");
    Ok(Some(decision))
}

/// 为测试与单机演示准备的零份额
pub fn zero_shares(config: &BioCircuitConfig) -> (S1Inputs, S2Inputs) {
    let bio_bits = config.biometric_input_bits();
    (
        S1Inputs {
            enrollment_share: vec![false; bio_bits],
            nonce_share: vec![false; COMMIT_NONCE_BITS],
            expected_digest: vec![false; 256],
        },
        S2Inputs {
            enrollment_share: vec![false; bio_bits],
            nonce_share: vec![false; COMMIT_NONCE_BITS],
        },
    )
}

/// 由明文登记模板与双方份额构造 S1/S2 输入（登记阶段的辅助：
/// S2 份额随机、S1 份额为模板与之的 XOR）
pub fn split_enrollment<R: rand::RngCore>(
    rng: &mut R,
    template_bits: &[bool],
) -> (Vec<bool>, Vec<bool>) {
    use rand::Rng;
    let share2: Vec<bool> = (0..template_bits.len()).map(|_| rng.gen()).collect();
    let share1: Vec<bool> = template_bits
        .iter()
        .zip(share2.iter())
        .map(|(&a, &b)| a ^ b)
        .collect();
    (share1, share2)
}
