//! # 承诺哈希子电路 (Commitment Hash Sub-Circuits)
//!
//! SHA-2-256 (FIPS 180-4) 与 SHA-3-256 (FIPS 202) 的门级直译，供恶意
//! 模型下的承诺验证使用。两者都只由 `MIXED_OP` 与固定线构成，填充位
//! 全部在构建期折叠。
//!
//! 位序约定与各自标准的比特串一致：SHA-2 输入线按字节内 MSB 在前排列，
//! SHA-3 按字节内 LSB 在前排列（Keccak 的小端通道序）。电路输出与对
//! 相同字节串运行 `sha2`/`sha3` crate 所得摘要逐位一致。
//!
//! Keccak 状态建模为显式三维数组 `[[[WireId; 64]; 5]; 5]`，行列按
//! `A[x][y][z]` 索引。

use crate::garbling::{CircuitBuilder, GateKind, WireId};
use crate::{BioAuthError, Result};

const SHA2_K: [u32; 64] = [
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5, 0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3, 0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc, 0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7, 0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13, 0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3, 0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5, 0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208, 0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2,
];

const SHA2_H0: [u32; 8] = [
    0x6a09e667, 0xbb67ae85, 0x3c6ef372, 0xa54ff53a, 0x510e527f, 0x9b05688c, 0x1f83d9ab, 0x5be0cd19,
];

const KECCAK_RC: [u64; 24] = [
    0x0000000000000001, 0x0000000000008082, 0x800000000000808a, 0x8000000080008000,
    0x000000000000808b, 0x0000000080000001, 0x8000000080008081, 0x8000000000008009,
    0x000000000000008a, 0x0000000000000088, 0x0000000080008009, 0x000000008000000a,
    0x000000008000808b, 0x800000000000008b, 0x8000000000008089, 0x8000000000008003,
    0x8000000000008002, 0x8000000000000080, 0x000000000000800a, 0x800000008000000a,
    0x8000000080008081, 0x8000000000008080, 0x0000000080000001, 0x8000000080008008,
];

/// SHA-2 的 32 位字：线数组以值的 MSB 为索引 0
type Word = Vec<WireId>;

/// Keccak 状态，`A[x][y][z]` 按 FIPS 202 索引
type KeccakState = [[[WireId; 64]; 5]; 5];

impl CircuitBuilder {
    fn sha_const_word(&mut self, value: u32) -> Result<Word> {
        let mut word = Vec::with_capacity(32);
        for i in 0..32 {
            if (value >> (31 - i)) & 1 == 1 {
                word.push(self.fixed_one()?);
            } else {
                word.push(self.fixed_zero()?);
            }
        }
        Ok(word)
    }

    /// 字加法（mod 2^32）；字内 MSB 在前，临时反转后走行波加法器
    fn sha_add(&mut self, a: &[WireId], b: &[WireId]) -> Result<Word> {
        let a_rev: Vec<WireId> = a.iter().rev().copied().collect();
        let b_rev: Vec<WireId> = b.iter().rev().copied().collect();
        let sum = self.add_2i(&a_rev, &b_rev, super::CarryOut::Discard)?;
        Ok(sum.into_iter().rev().collect())
    }

    fn sha_rotr(word: &[WireId], n: usize) -> Word {
        let w = word.len();
        (0..w).map(|i| word[(i + w - n) % w]).collect()
    }

    fn sha_shr(&mut self, word: &[WireId], n: usize) -> Result<Word> {
        let mut out = Vec::with_capacity(word.len());
        for _ in 0..n {
            out.push(self.fixed_zero()?);
        }
        out.extend_from_slice(&word[..word.len() - n]);
        Ok(out)
    }

    fn sha_xor3(&mut self, a: &[WireId], b: &[WireId], c: &[WireId]) -> Result<Word> {
        let t = self.mixed_op_vec_2i(GateKind::Xor, a, b)?;
        self.mixed_op_vec_2i(GateKind::Xor, &t, c)
    }

    fn sha_big_sigma_0(&mut self, x: &[WireId]) -> Result<Word> {
        let r2 = Self::sha_rotr(x, 2);
        let r13 = Self::sha_rotr(x, 13);
        let r22 = Self::sha_rotr(x, 22);
        self.sha_xor3(&r2, &r13, &r22)
    }

    fn sha_big_sigma_1(&mut self, x: &[WireId]) -> Result<Word> {
        let r6 = Self::sha_rotr(x, 6);
        let r11 = Self::sha_rotr(x, 11);
        let r25 = Self::sha_rotr(x, 25);
        self.sha_xor3(&r6, &r11, &r25)
    }

    fn sha_small_sigma_0(&mut self, x: &[WireId]) -> Result<Word> {
        let r7 = Self::sha_rotr(x, 7);
        let r18 = Self::sha_rotr(x, 18);
        let s3 = self.sha_shr(x, 3)?;
        self.sha_xor3(&r7, &r18, &s3)
    }

    fn sha_small_sigma_1(&mut self, x: &[WireId]) -> Result<Word> {
        let r17 = Self::sha_rotr(x, 17);
        let r19 = Self::sha_rotr(x, 19);
        let s10 = self.sha_shr(x, 10)?;
        self.sha_xor3(&r17, &r19, &s10)
    }

    /// Ch(x, y, z) = (x ∧ y) ⊕ (¬x ∧ z)
    fn sha_ch(&mut self, x: &[WireId], y: &[WireId], z: &[WireId]) -> Result<Word> {
        let not_x = self.not_vec(x)?;
        let xy = self.mixed_op_vec_2i(GateKind::And, x, y)?;
        let nxz = self.mixed_op_vec_2i(GateKind::And, &not_x, z)?;
        self.mixed_op_vec_2i(GateKind::Xor, &xy, &nxz)
    }

    /// Maj(x, y, z) = (x ∧ y) ⊕ (x ∧ z) ⊕ (y ∧ z)
    fn sha_maj(&mut self, x: &[WireId], y: &[WireId], z: &[WireId]) -> Result<Word> {
        let xy = self.mixed_op_vec_2i(GateKind::And, x, y)?;
        let xz = self.mixed_op_vec_2i(GateKind::And, x, z)?;
        let yz = self.mixed_op_vec_2i(GateKind::And, y, z)?;
        self.sha_xor3(&xy, &xz, &yz)
    }

    /// SHA-2-256 电路：任意比特长度消息 → 256 位摘要
    pub fn sha2_256_circuit(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        let n = inputs.len();

        // FIPS 180-4 padding: message, a one bit, k zeros, 64-bit length
        let mut k = 447i64 - n as i64;
        while k < 0 {
            k += 512;
        }
        let k = k as usize;

        let mut padded = inputs.to_vec();
        padded.push(self.fixed_one()?);
        for _ in 0..k {
            padded.push(self.fixed_zero()?);
        }
        for i in 0..64 {
            if (n as u64 >> (63 - i)) & 1 == 1 {
                padded.push(self.fixed_one()?);
            } else {
                padded.push(self.fixed_zero()?);
            }
        }
        debug_assert_eq!(padded.len() % 512, 0);

        let mut h: Vec<Word> = Vec::with_capacity(8);
        for v in SHA2_H0 {
            h.push(self.sha_const_word(v)?);
        }

        let num_blocks = padded.len() / 512;
        for block in 0..num_blocks {
            let mut w: Vec<Word> = Vec::with_capacity(64);
            for t in 0..16 {
                w.push(padded[block * 512 + t * 32..block * 512 + (t + 1) * 32].to_vec());
            }
            for t in 16..64 {
                let s1 = self.sha_small_sigma_1(&w[t - 2])?;
                let s0 = self.sha_small_sigma_0(&w[t - 15])?;
                let sum = self.sha_add(&s1, &w[t - 7])?;
                let sum = self.sha_add(&sum, &s0)?;
                let sum = self.sha_add(&sum, &w[t - 16])?;
                w.push(sum);
            }

            let mut v: Vec<Word> = h.clone();
            for t in 0..64 {
                let sig1 = self.sha_big_sigma_1(&v[4])?;
                let ch = self.sha_ch(&v[4], &v[5], &v[6])?;
                let kt = self.sha_const_word(SHA2_K[t])?;
                let mut t1 = self.sha_add(&v[7], &sig1)?;
                t1 = self.sha_add(&t1, &ch)?;
                t1 = self.sha_add(&t1, &kt)?;
                t1 = self.sha_add(&t1, &w[t])?;

                let sig0 = self.sha_big_sigma_0(&v[0])?;
                let maj = self.sha_maj(&v[0], &v[1], &v[2])?;
                let t2 = self.sha_add(&sig0, &maj)?;

                v[7] = v[6].clone();
                v[6] = v[5].clone();
                v[5] = v[4].clone();
                v[4] = self.sha_add(&v[3], &t1)?;
                v[3] = v[2].clone();
                v[2] = v[1].clone();
                v[1] = v[0].clone();
                v[0] = self.sha_add(&t1, &t2)?;
            }

            for u in 0..8 {
                h[u] = self.sha_add(&h[u], &v[u])?;
            }
        }

        let mut outputs = Vec::with_capacity(256);
        for word in h {
            outputs.extend(word);
        }
        Ok(outputs)
    }

    /// SHA-3-256 电路：任意比特长度消息 → 256 位摘要
    ///
    /// 吸收率 r = 1088，后缀 01 加 pad10*1。
    pub fn sha3_256_circuit(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        const RATE: usize = 1088;

        // message, domain suffix 01, then pad10*1
        let mut padded = inputs.to_vec();
        let zero = self.fixed_zero()?;
        let one = self.fixed_one()?;
        padded.push(zero);
        padded.push(one);
        padded.push(self.fixed_one()?);
        while (padded.len() + 1) % RATE != 0 {
            padded.push(self.fixed_zero()?);
        }
        padded.push(self.fixed_one()?);

        // state A[x][y][z], all lanes zeroed
        let mut state: KeccakState = [[[0; 64]; 5]; 5];
        for x in 0..5 {
            for y in 0..5 {
                for z in 0..64 {
                    state[x][y][z] = self.fixed_zero()?;
                }
            }
        }

        for block in padded.chunks(RATE) {
            // absorb: S ^= block over the first r lane bits
            for (i, &bit) in block.iter().enumerate() {
                let x = (i / 64) % 5;
                let y = i / 320;
                let z = i % 64;
                state[x][y][z] = self.mixed_op_gate(GateKind::Xor, state[x][y][z], bit)?;
            }
            self.keccak_f(&mut state)?;
        }

        // squeeze the first 256 bits in lane order
        let mut outputs = Vec::with_capacity(256);
        'outer: for y in 0..5 {
            for x in 0..5 {
                for z in 0..64 {
                    outputs.push(state[x][y][z]);
                    if outputs.len() == 256 {
                        break 'outer;
                    }
                }
            }
        }
        Ok(outputs)
    }

    fn keccak_f(&mut self, a: &mut KeccakState) -> Result<()> {
        for round in 0..24 {
            self.keccak_theta(a)?;
            Self::keccak_rho(a);
            Self::keccak_pi(a);
            self.keccak_chi(a)?;
            self.keccak_iota(a, round)?;
        }
        Ok(())
    }

    fn keccak_theta(&mut self, a: &mut KeccakState) -> Result<()> {
        let mut c = vec![vec![0; 64]; 5];
        for x in 0..5 {
            for z in 0..64 {
                c[x][z] = a[x][0][z];
            }
        }
        for y in 1..5 {
            for x in 0..5 {
                for z in 0..64 {
                    c[x][z] = self.mixed_op_gate(GateKind::Xor, c[x][z], a[x][y][z])?;
                }
            }
        }
        let mut d = vec![vec![0; 64]; 5];
        for x in 0..5 {
            for z in 0..64 {
                d[x][z] = self.mixed_op_gate(
                    GateKind::Xor,
                    c[(x + 4) % 5][z],
                    c[(x + 1) % 5][(z + 63) % 64],
                )?;
            }
        }
        for y in 0..5 {
            for x in 0..5 {
                for z in 0..64 {
                    a[x][y][z] = self.mixed_op_gate(GateKind::Xor, a[x][y][z], d[x][z])?;
                }
            }
        }
        Ok(())
    }

    /// rho 是纯粹的通道内旋转，只做线重排
    fn keccak_rho(a: &mut KeccakState) {
        let old = *a;
        let (mut x, mut y) = (1usize, 0usize);
        for t in 0..24 {
            let offset = (t + 1) * (t + 2) / 2;
            for z in 0..64 {
                a[x][y][z] = old[x][y][(z + 64 - offset % 64) % 64];
            }
            let next_x = y;
            let next_y = (2 * x + 3 * y) % 5;
            x = next_x;
            y = next_y;
        }
    }

    /// pi 重排通道位置
    fn keccak_pi(a: &mut KeccakState) {
        let old = *a;
        for y in 0..5 {
            for x in 0..5 {
                for z in 0..64 {
                    a[x][y][z] = old[(x + 3 * y) % 5][x][z];
                }
            }
        }
    }

    fn keccak_chi(&mut self, a: &mut KeccakState) -> Result<()> {
        let old = *a;
        for y in 0..5 {
            for x in 0..5 {
                for z in 0..64 {
                    let b = self.not_gate2(old[(x + 1) % 5][y][z])?;
                    let c = self.mixed_op_gate(GateKind::And, b, old[(x + 2) % 5][y][z])?;
                    a[x][y][z] = self.mixed_op_gate(GateKind::Xor, old[x][y][z], c)?;
                }
            }
        }
        Ok(())
    }

    fn keccak_iota(&mut self, a: &mut KeccakState, round: usize) -> Result<()> {
        let rc = KECCAK_RC[round];
        for z in 0..64 {
            if (rc >> z) & 1 == 1 {
                let one = self.fixed_one()?;
                a[0][0][z] = self.mixed_op_gate(GateKind::Xor, a[0][0][z], one)?;
            }
        }
        Ok(())
    }
}

/// 用 `sha2` crate 计算与 `sha2_256_circuit` 位序一致的参考摘要
///
/// 消息长度必须是 8 的倍数（字节对齐）。
pub fn sha2_256_reference(message_bits: &[bool]) -> Result<Vec<bool>> {
    use crate::utils::bits::{bits_to_bytes_msb_first, bytes_to_bits_msb_first};
    use sha2::{Digest, Sha256};

    if message_bits.len() % 8 != 0 {
        return Err(BioAuthError::Argument(
            "sha2 reference digest requires byte-aligned input".to_string(),
        ));
    }
    let bytes = bits_to_bytes_msb_first(message_bits);
    let digest = Sha256::digest(&bytes);
    Ok(bytes_to_bits_msb_first(&digest, 256))
}

/// 用 `sha3` crate 计算与 `sha3_256_circuit` 位序一致的参考摘要
pub fn sha3_256_reference(message_bits: &[bool]) -> Result<Vec<bool>> {
    use crate::utils::bits::{bits_to_bytes, bytes_to_bits};
    use sha3::{Digest, Sha3_256};

    if message_bits.len() % 8 != 0 {
        return Err(BioAuthError::Argument(
            "sha3 reference digest requires byte-aligned input".to_string(),
        ));
    }
    let bytes = bits_to_bytes(message_bits);
    let digest = Sha3_256::digest(&bytes);
    Ok(bytes_to_bits(&digest, 256))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garbling::eval_plain;
    use crate::utils::bits::bytes_to_bits_msb_first;

    fn run_hash<F>(message_bits: &[bool], f: F) -> Vec<bool>
    where
        F: FnOnce(&mut CircuitBuilder, &[WireId]) -> Vec<WireId>,
    {
        let n = message_bits.len();
        let mut bld = CircuitBuilder::new(n.max(1), 1, 1 << 23, 1 << 24).unwrap();
        let wires = bld.input_wires();
        let outs = f(&mut bld, &wires[..n]);
        let circuit = bld.finish_any(&outs).unwrap();
        let mut inputs = message_bits.to_vec();
        inputs.resize(n.max(1), false);
        eval_plain(&circuit, &inputs).unwrap()
    }

    #[test]
    fn test_sha2_circuit_matches_reference() {
        let message = b"abc";
        let bits = bytes_to_bits_msb_first(message, 24);
        let out = run_hash(&bits, |bld, w| bld.sha2_256_circuit(w).unwrap());
        let expected = sha2_256_reference(&bits).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_sha2_circuit_two_blocks() {
        // 520 bits forces a second compression block
        let message: Vec<u8> = (0u8..65).collect();
        let bits = bytes_to_bits_msb_first(&message, 520);
        let out = run_hash(&bits, |bld, w| bld.sha2_256_circuit(w).unwrap());
        let expected = sha2_256_reference(&bits).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_sha3_circuit_matches_reference() {
        let message = b"abc";
        let bits = crate::utils::bits::bytes_to_bits(message, 24);
        let out = run_hash(&bits, |bld, w| bld.sha3_256_circuit(w).unwrap());
        let expected = sha3_256_reference(&bits).unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_sha3_circuit_multi_block() {
        // beyond one 1088-bit rate block
        let message: Vec<u8> = (0u8..200).collect();
        let bits = crate::utils::bits::bytes_to_bits(&message, 1600);
        let out = run_hash(&bits, |bld, w| bld.sha3_256_circuit(w).unwrap());
        let expected = sha3_256_reference(&bits).unwrap();
        assert_eq!(out, expected);
    }
}
