//! # 客户端生物特征处理 (Client-Side Biometric Handling)
//!
//! 客户端在每次认证时采样实值特征向量，推导仿射压缩参数 (min, range)，
//! 将每个特征压缩为 ℓ 位无符号整数，连同 range/min 的 IEEE 位表示打包成
//! 电路输入位串，最后做 XOR 秘密分享。近似还原式为
//! `f_i ≈ range · x_i + min`。

use super::bits::{bits_to_bytes, int_to_bit_vector};
use crate::{BioAuthError, Result};
use rand::Rng;
use rand_core::RngCore;

/// 每侧生物特征输入中 range/min 浮点参数占用的线数（两个 32 位 IEEE 值）
pub const FLOAT_PARAM_BITS: usize = 64;

/// 压缩后的生物特征：ℓ 位整数向量加仿射参数
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedBiometric {
    pub features: Vec<u32>,
    pub input_length: usize,
    pub range: f32,
    pub min: f32,
}

/// 采样一个实值特征向量（每个分量在 [-0.5, 0.5) 内）
pub fn sample_feature_vector<R: RngCore>(rng: &mut R, num_inputs: usize) -> Vec<f32> {
    (0..num_inputs).map(|_| rng.gen::<f32>() - 0.5).collect()
}

/// 将实值特征压缩为 ℓ 位整数并推导 (min, range)
///
/// range 取 (max − min) / (2^ℓ − 1)，使压缩值恰好覆盖整个 ℓ 位范围。
pub fn compress_features(features: &[f32], input_length: usize) -> Result<CompressedBiometric> {
    if features.is_empty() {
        return Err(BioAuthError::Argument("empty feature vector".to_string()));
    }
    if input_length == 0 || input_length > 32 {
        return Err(BioAuthError::Argument(format!(
            "input length {} out of range",
            input_length
        )));
    }

    let mut min = features[0];
    let mut max = features[0];
    for &f in &features[1..] {
        if f < min {
            min = f;
        }
        if f > max {
            max = f;
        }
    }

    let max_compressed = ((1u64 << input_length) - 1) as f32;
    let spread = max - min;
    let range = if spread > 0.0 {
        spread / max_compressed
    } else {
        1.0
    };
    let scale = if spread > 0.0 {
        max_compressed / spread
    } else {
        0.0
    };

    let features = features
        .iter()
        .map(|&f| {
            let c = ((f - min) * scale) as u64;
            c.min(max_compressed as u64) as u32
        })
        .collect();

    Ok(CompressedBiometric {
        features,
        input_length,
        range,
        min,
    })
}

impl CompressedBiometric {
    /// 打包为电路输入位串：特征向量（每个 ℓ 位，LSB 在前），
    /// 然后是 range 与 min 的 32 位 IEEE 表示（LSB 在前）
    pub fn to_input_bits(&self) -> Vec<bool> {
        let mut bits = Vec::with_capacity(self.features.len() * self.input_length + FLOAT_PARAM_BITS);
        for &f in &self.features {
            bits.extend(int_to_bit_vector(f as u64, self.input_length));
        }
        bits.extend(int_to_bit_vector(self.range.to_bits() as u64, 32));
        bits.extend(int_to_bit_vector(self.min.to_bits() as u64, 32));
        bits
    }

    /// 输入位串总长 ℓ·n + 64
    pub fn input_bit_len(&self) -> usize {
        self.features.len() * self.input_length + FLOAT_PARAM_BITS
    }
}

/// 将输入位串 XOR 拆分为两个份额字节串
///
/// 返回 (b̂1, b̂2)，b̂1 = bits ⊕ b̂2，b̂2 为新采样的随机串。
pub fn xor_split<R: RngCore>(rng: &mut R, bits: &[bool]) -> (Vec<u8>, Vec<u8>) {
    let share2: Vec<bool> = (0..bits.len()).map(|_| rng.gen()).collect();
    let share1: Vec<bool> = bits.iter().zip(share2.iter()).map(|(&a, &b)| a ^ b).collect();
    (bits_to_bytes(&share1), bits_to_bytes(&share2))
}
