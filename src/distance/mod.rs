//! # 距离函数电路构建 (Distance-Function Circuit Builders)
//!
//! 三种距离/相似度函数共享同一个前导：在输入线数组的偏移 0 与
//! ℓ·n + 64 处解析两份生物特征输入（各含 ℓ·n 位特征向量与 range/min
//! 两个 32 位原始浮点）。恶意模型下额外分配 128 位承诺随机数线与
//! 256 位期望摘要线，并在尾声插入 SHA 承诺验证子电路。
//!
//! 输出束：半诚实 2 条线（距离阈值判定、归一化有效），恶意 3 条
//! （外加承诺验证位）。
//!
//! 原实现用大段文本宏共享各构建器的初始化与收尾；这里重构为带
//! `prelude` / `emit_distance` / `emit_commitment` / `finalize` 方法的
//! 构建器对象，变体即距离函数。

pub mod metrics;

pub use metrics::*;

use crate::circuits::lg_flr;
use crate::garbling::{CircuitBuilder, GarbledCircuit, WireId, CIRCUIT_DIR};
use crate::{BioAuthError, Result};
use tracing::info;

/// 距离函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceFunction {
    Hamming,
    Cosine,
    Euclidean,
}

impl DistanceFunction {
    pub fn tag(self) -> &'static str {
        match self {
            DistanceFunction::Hamming => "hd",
            DistanceFunction::Cosine => "cs",
            DistanceFunction::Euclidean => "ed",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "hd" => Ok(DistanceFunction::Hamming),
            "cs" => Ok(DistanceFunction::Cosine),
            "ed" => Ok(DistanceFunction::Euclidean),
            other => Err(BioAuthError::Argument(format!(
                "unknown distance function '{}'",
                other
            ))),
        }
    }
}

/// 承诺哈希函数（恶意模型）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentHash {
    Sha2_256,
    Sha3_256,
}

impl CommitmentHash {
    pub fn tag(self) -> &'static str {
        match self {
            CommitmentHash::Sha2_256 => "sha2-256",
            CommitmentHash::Sha3_256 => "sha3-256",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag {
            "sha2-256" => Ok(CommitmentHash::Sha2_256),
            "sha3-256" => Ok(CommitmentHash::Sha3_256),
            other => Err(BioAuthError::Argument(format!(
                "unknown commitment hash '{}'",
                other
            ))),
        }
    }
}

/// 威胁模型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatModel {
    SemiHonest,
    Malicious,
}

/// 承诺摘要位数
pub const COMMIT_DIGEST_BITS: usize = 256;
/// 承诺随机数位数
pub const COMMIT_NONCE_BITS: usize = 128;
pub use crate::utils::biometric::FLOAT_PARAM_BITS;

/// 距离电路的构建参数
#[derive(Debug, Clone)]
pub struct BioCircuitConfig {
    pub num_inputs: usize,
    pub input_length: usize,
    pub distance: DistanceFunction,
    pub threat_model: ThreatModel,
    pub commitment: CommitmentHash,
    /// 汉明距离的整数阈值
    pub hamming_threshold: u64,
}

impl BioCircuitConfig {
    pub fn new(num_inputs: usize, input_length: usize, distance: DistanceFunction) -> Self {
        BioCircuitConfig {
            num_inputs,
            input_length,
            distance,
            threat_model: ThreatModel::SemiHonest,
            commitment: CommitmentHash::Sha2_256,
            hamming_threshold: 1,
        }
    }

    pub fn with_threat_model(mut self, tm: ThreatModel) -> Self {
        self.threat_model = tm;
        self
    }

    pub fn with_commitment(mut self, hash: CommitmentHash) -> Self {
        self.commitment = hash;
        self
    }

    pub fn with_hamming_threshold(mut self, threshold: u64) -> Self {
        self.hamming_threshold = threshold;
        self
    }

    pub fn is_malicious(&self) -> bool {
        self.threat_model == ThreatModel::Malicious
    }

    /// ℓ·n：特征向量位数
    pub fn feature_vector_bits(&self) -> usize {
        self.num_inputs * self.input_length
    }

    /// ℓ·n + 64：每侧生物特征输入位数
    pub fn biometric_input_bits(&self) -> usize {
        self.feature_vector_bits() + FLOAT_PARAM_BITS
    }

    /// 电路输入线总数 n
    pub fn circuit_input_size(&self) -> usize {
        let mut n = 2 * self.biometric_input_bits();
        if self.is_malicious() {
            n += COMMIT_DIGEST_BITS + COMMIT_NONCE_BITS;
        }
        n
    }

    /// 电路输出线数 m
    pub fn circuit_output_size(&self) -> usize {
        if self.is_malicious() {
            3
        } else {
            2
        }
    }

    /// S2 经 OT 接收标签的输入线数（两侧全部生物特征位，恶意模型
    /// 外加承诺随机数位）
    pub fn ot_bit_count(&self) -> usize {
        let mut bits = 2 * self.biometric_input_bits();
        if self.is_malicious() {
            bits += COMMIT_NONCE_BITS;
        }
        bits
    }

    /// SCD 缓存文件名
    pub fn scd_file_name(&self) -> String {
        let mut name = format!("{}bio_auth_{}_", CIRCUIT_DIR, self.distance.tag());
        if self.is_malicious() {
            name.push_str(&format!("mal_{}_", self.commitment.tag()));
        }
        name.push_str(&format!("{}_{}.scd", self.num_inputs, self.input_length));
        name
    }

    /// 门数上界估计
    pub fn gate_bound(&self) -> usize {
        let k = self.num_inputs;
        let l = self.input_length;
        let q_float = 262_144;
        let base = match self.distance {
            DistanceFunction::Hamming => k * l * (1 + lg_flr(k)) * (1 + lg_flr(l)) + q_float,
            DistanceFunction::Euclidean | DistanceFunction::Cosine => {
                4 * q_ed_estimate(k, l) + q_float
            }
        };
        let commit = if self.is_malicious() { 1 << 21 } else { 0 };
        base + commit
    }

    /// 线数上界估计
    pub fn wire_bound(&self) -> usize {
        8 * self.gate_bound() + self.circuit_input_size()
    }
}

/// 欧氏距离电路规模的增长递推估计，受可用内存上限裁剪
pub fn q_ed_estimate(num_inputs: usize, input_length: usize) -> usize {
    let mut l = 1usize;
    let mut n = 1usize;
    let mut delta = 63usize;
    let mut epsilon = 5usize;
    let mut estimate = 39usize;

    while l < input_length {
        estimate = (4 * estimate).saturating_sub(delta);
        delta = (2 * delta) + epsilon;
        epsilon = (2 * epsilon) + 9;
        l *= 2;
    }
    while n < num_inputs {
        estimate = (2 * estimate) + (10 * n);
        n *= 2;
    }

    let mem_ceiling = 1usize << 26;
    estimate.min(mem_ceiling)
}

/// 一侧生物特征输入解析出的线束
#[derive(Debug, Clone)]
pub struct BiometricWires {
    /// 压缩特征向量，ℓ·n 条线
    pub feature_vector: Vec<WireId>,
    /// range 浮点束（36 线）
    pub vector_range: Vec<WireId>,
    /// min 浮点束（36 线）
    pub vector_min: Vec<WireId>,
}

/// 恶意模型下的承诺线
#[derive(Debug, Clone)]
pub struct CommitmentWires {
    pub nonce: Vec<WireId>,
    pub expected_digest: Vec<WireId>,
}

/// 距离函数输出
#[derive(Debug, Clone, Copy)]
pub struct DistanceOutputs {
    /// 距离/相似度对阈值的判定位
    pub accept: WireId,
    /// 归一化检查位
    pub norm_valid: WireId,
}

/// 距离电路构建器对象
///
/// `prelude()` 解析两份生物特征输入，`emit_distance()` 按变体发射
/// 距离电路，`emit_commitment()` 在恶意模型下插入承诺验证，
/// `finalize()` 汇集输出并定型拓扑。
#[derive(Debug)]
pub struct BioCircuitBuilder {
    config: BioCircuitConfig,
    builder: CircuitBuilder,
    runtime: BiometricWires,
    enrollment: BiometricWires,
    enrollment_raw: Vec<WireId>,
    commitment: Option<CommitmentWires>,
}

impl BioCircuitBuilder {
    /// 解析输入布局并装配浮点参数束
    pub fn prelude(config: BioCircuitConfig) -> Result<Self> {
        let fv_len = config.feature_vector_bits();
        let bio_len = config.biometric_input_bits();
        let n = config.circuit_input_size();
        let m = config.circuit_output_size();

        let mut builder = CircuitBuilder::new(n, m, config.gate_bound(), config.wire_bound())?;
        let inputs = builder.input_wires();

        let runtime_range = builder.set_raw_float(&inputs[fv_len..fv_len + 32])?;
        let runtime_min = builder.set_raw_float(&inputs[fv_len + 32..fv_len + 64])?;
        let enroll_range = builder.set_raw_float(&inputs[bio_len + fv_len..bio_len + fv_len + 32])?;
        let enroll_min =
            builder.set_raw_float(&inputs[bio_len + fv_len + 32..bio_len + fv_len + 64])?;

        let runtime = BiometricWires {
            feature_vector: inputs[..fv_len].to_vec(),
            vector_range: runtime_range,
            vector_min: runtime_min,
        };
        let enrollment = BiometricWires {
            feature_vector: inputs[bio_len..bio_len + fv_len].to_vec(),
            vector_range: enroll_range,
            vector_min: enroll_min,
        };
        let enrollment_raw = inputs[bio_len..2 * bio_len].to_vec();

        let commitment = if config.is_malicious() {
            let nonce_start = 2 * bio_len;
            let digest_start = nonce_start + COMMIT_NONCE_BITS;
            Some(CommitmentWires {
                nonce: inputs[nonce_start..digest_start].to_vec(),
                expected_digest: inputs[digest_start..digest_start + COMMIT_DIGEST_BITS].to_vec(),
            })
        } else {
            None
        };

        Ok(BioCircuitBuilder {
            config,
            builder,
            runtime,
            enrollment,
            enrollment_raw,
            commitment,
        })
    }

    pub fn config(&self) -> &BioCircuitConfig {
        &self.config
    }

    pub fn builder_mut(&mut self) -> &mut CircuitBuilder {
        &mut self.builder
    }

    /// 按配置的变体发射距离电路
    pub fn emit_distance(&mut self) -> Result<DistanceOutputs> {
        match self.config.distance {
            DistanceFunction::Hamming => self.emit_hamming(),
            DistanceFunction::Euclidean => self.emit_euclidean(),
            DistanceFunction::Cosine => self.emit_cosine(),
        }
    }

    /// 恶意模型下发射承诺验证：SHA(登记输入 ‖ 随机数) 与期望摘要比较
    pub fn emit_commitment(&mut self) -> Result<Option<WireId>> {
        let Some(commitment) = self.commitment.clone() else {
            return Ok(None);
        };

        let mut message = self.enrollment_raw.clone();
        message.extend_from_slice(&commitment.nonce);

        let digest = match self.config.commitment {
            CommitmentHash::Sha2_256 => self.builder.sha2_256_circuit(&message)?,
            CommitmentHash::Sha3_256 => self.builder.sha3_256_circuit(&message)?,
        };

        let verified = self
            .builder
            .cmp_2i(crate::circuits::CmpType::Eq, &digest, &commitment.expected_digest)?[0];
        Ok(Some(verified))
    }

    /// 汇集输出线并定型
    pub fn finalize(
        self,
        distance: DistanceOutputs,
        commitment_ok: Option<WireId>,
    ) -> Result<GarbledCircuit> {
        let mut outputs = vec![distance.accept, distance.norm_valid];
        if self.config.is_malicious() {
            let verified = commitment_ok.ok_or_else(|| {
                BioAuthError::Protocol(
                    "malicious-mode circuit finalized without a commitment output".to_string(),
                )
            })?;
            outputs.push(verified);
        }
        self.builder.finish(&outputs)
    }

    /// 一次完成 prelude → distance → commitment → finalize
    pub fn build(config: BioCircuitConfig) -> Result<GarbledCircuit> {
        info!(
            distance = config.distance.tag(),
            num_inputs = config.num_inputs,
            input_length = config.input_length,
            malicious = config.is_malicious(),
            "building distance circuit"
        );
        let mut b = Self::prelude(config)?;
        let dist = b.emit_distance()?;
        let commit = b.emit_commitment()?;
        let circuit = b.finalize(dist, commit)?;
        info!(
            q = circuit.q,
            r = circuit.r,
            qand = circuit.qand,
            qor = circuit.qor,
            qxor = circuit.qxor,
            qnot = circuit.qnot,
            "circuit finalized"
        );
        Ok(circuit)
    }

    pub(crate) fn runtime(&self) -> BiometricWires {
        self.runtime.clone()
    }

    pub(crate) fn enrollment(&self) -> BiometricWires {
        self.enrollment.clone()
    }
}
