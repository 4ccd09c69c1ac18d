//! # 信道安全原语 (Channel Security Primitives)
//!
//! 会话密钥交换用的 RSA（哈希填充）与消息加密用的 AES-128-CBC。
//! RSA 密钥以 JSON 文件存取，公钥路径写在对等网络配置里。

use crate::{BioAuthError, Result};
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use num_bigint::{BigUint, RandBigInt, ToBigInt};
use num_traits::{One, Zero};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

/// RSA 公钥
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsaPublicKey {
    pub n: BigUint,
    pub e: BigUint,
}

/// RSA 私钥
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsaPrivateKey {
    pub n: BigUint,
    pub d: BigUint,
}

/// RSA 密钥对
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RsaKeypair {
    pub public: RsaPublicKey,
    pub private: RsaPrivateKey,
}

const MILLER_RABIN_ROUNDS: usize = 24;
const RSA_PAD_SEED_LEN: usize = 16;
const RSA_PAD_TAG_LEN: usize = 16;

fn mod_pow(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

fn is_probable_prime<R: RngCore>(rng: &mut R, candidate: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if candidate < &two {
        return false;
    }
    if candidate.bit(0) == false {
        return candidate == &two;
    }

    let one = BigUint::one();
    let n_minus_1 = candidate - &one;
    let mut d = n_minus_1.clone();
    let mut r = 0u32;
    while d.bit(0) == false {
        d >>= 1;
        r += 1;
    }

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = rng.gen_biguint_range(&two, &n_minus_1);
        let mut x = mod_pow(&a, &d, candidate);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 0..r - 1 {
            x = (&x * &x) % candidate;
            if x == n_minus_1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn generate_prime<R: RngCore>(rng: &mut R, bits: u64) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_probable_prime(rng, &candidate) {
            return candidate;
        }
    }
}

fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Result<BigUint> {
    let a = a
        .to_bigint()
        .ok_or_else(|| BioAuthError::Crypto("operand not representable as a signed bignum".to_string()))?;
    let m = modulus
        .to_bigint()
        .ok_or_else(|| BioAuthError::Crypto("modulus not representable as a signed bignum".to_string()))?;
    let (mut old_r, mut r) = (a, m.clone());
    let (mut old_s, mut s) = (num_bigint::BigInt::one(), num_bigint::BigInt::zero());

    while !r.is_zero() {
        let quotient = &old_r / &r;
        let tmp_r = r.clone();
        r = old_r - &quotient * &r;
        old_r = tmp_r;
        let tmp_s = s.clone();
        s = old_s - &quotient * &s;
        old_s = tmp_s;
    }

    if !old_r.is_one() {
        return Err(BioAuthError::Crypto("no modular inverse exists".to_string()));
    }
    let result = ((old_s % &m) + &m) % &m;
    result
        .to_biguint()
        .ok_or_else(|| BioAuthError::Crypto("modular inverse is not a nonnegative residue".to_string()))
}

impl RsaKeypair {
    /// 生成 RSA 密钥对（modulus_bits 位模数，e = 65537）
    pub fn generate<R: RngCore>(rng: &mut R, modulus_bits: u64) -> Result<Self> {
        let half = modulus_bits / 2;
        let e = BigUint::from(65537u32);

        loop {
            let p = generate_prime(rng, half);
            let q = generate_prime(rng, modulus_bits - half);
            if p == q {
                continue;
            }
            let n = &p * &q;
            let phi = (&p - BigUint::one()) * (&q - BigUint::one());
            if (&phi % &e).is_zero() {
                continue;
            }
            let d = mod_inverse(&e, &phi)?;
            return Ok(RsaKeypair {
                public: RsaPublicKey { n: n.clone(), e },
                private: RsaPrivateKey { n, d },
            });
        }
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BioAuthError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| BioAuthError::Resource(e.to_string()))?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| BioAuthError::Resource(e.to_string()))?;
        serde_json::from_str(&data).map_err(|e| BioAuthError::Serialization(e.to_string()))
    }
}

impl RsaPublicKey {
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| BioAuthError::Serialization(e.to_string()))?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| BioAuthError::Resource(e.to_string()))?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| BioAuthError::Resource(e.to_string()))?;
        serde_json::from_str(&data).map_err(|e| BioAuthError::Serialization(e.to_string()))
    }

    /// 哈希填充的 RSA 加密：块为 seed ‖ msg ‖ H(seed ‖ msg) 截断标签
    pub fn encrypt<R: RngCore>(&self, rng: &mut R, message: &[u8]) -> Result<Vec<u8>> {
        let modulus_len = (self.n.bits() as usize + 7) / 8;
        let block_len = RSA_PAD_SEED_LEN + message.len() + RSA_PAD_TAG_LEN;
        if block_len + 1 >= modulus_len {
            return Err(BioAuthError::Crypto(format!(
                "message of {} bytes too long for {}-byte modulus",
                message.len(),
                modulus_len
            )));
        }

        let mut seed = [0u8; RSA_PAD_SEED_LEN];
        rng.fill_bytes(&mut seed);

        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(message);
        let tag = hasher.finalize();

        let mut block = Vec::with_capacity(block_len);
        block.extend_from_slice(&seed);
        block.extend_from_slice(message);
        block.extend_from_slice(&tag[..RSA_PAD_TAG_LEN]);

        let m = BigUint::from_bytes_be(&block);
        let c = mod_pow(&m, &self.e, &self.n);
        let mut out = c.to_bytes_be();
        // fixed-width ciphertext
        while out.len() < modulus_len {
            out.insert(0, 0);
        }
        Ok(out)
    }
}

impl RsaPrivateKey {
    /// 解密并校验填充标签
    pub fn decrypt(&self, ciphertext: &[u8], message_len: usize) -> Result<Vec<u8>> {
        let c = BigUint::from_bytes_be(ciphertext);
        if c >= self.n {
            return Err(BioAuthError::Crypto("ciphertext out of range".to_string()));
        }
        let m = mod_pow(&c, &self.d, &self.n);
        let bytes = m.to_bytes_be();

        let block_len = RSA_PAD_SEED_LEN + message_len + RSA_PAD_TAG_LEN;
        if bytes.len() > block_len {
            return Err(BioAuthError::Crypto("malformed rsa block".to_string()));
        }
        let mut block = vec![0u8; block_len - bytes.len()];
        block.extend_from_slice(&bytes);

        let seed = &block[..RSA_PAD_SEED_LEN];
        let message = &block[RSA_PAD_SEED_LEN..RSA_PAD_SEED_LEN + message_len];
        let tag = &block[RSA_PAD_SEED_LEN + message_len..];

        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(message);
        let expected = hasher.finalize();
        if tag != &expected[..RSA_PAD_TAG_LEN] {
            return Err(BioAuthError::Crypto("rsa padding tag mismatch".to_string()));
        }
        Ok(message.to_vec())
    }
}

/// AES-128-CBC 加密：随机 IV 前缀，PKCS#7 填充
pub fn aes_cbc_encrypt<R: RngCore>(rng: &mut R, key: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let mut iv = [0u8; 16];
    rng.fill_bytes(&mut iv);

    let pad = 16 - plaintext.len() % 16;
    let mut data = plaintext.to_vec();
    data.extend(std::iter::repeat(pad as u8).take(pad));

    let mut out = Vec::with_capacity(16 + data.len());
    out.extend_from_slice(&iv);
    let mut prev = iv;
    for chunk in data.chunks(16) {
        let mut block = [0u8; 16];
        for i in 0..16 {
            block[i] = chunk[i] ^ prev[i];
        }
        let mut ga = GenericArray::from(block);
        cipher.encrypt_block(&mut ga);
        prev.copy_from_slice(&ga);
        out.extend_from_slice(&ga);
    }
    out
}

/// AES-128-CBC 解密
pub fn aes_cbc_decrypt(key: &[u8; 16], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 32 || data.len() % 16 != 0 {
        return Err(BioAuthError::Crypto("malformed cbc ciphertext".to_string()));
    }
    let cipher = Aes128::new(GenericArray::from_slice(key));

    let mut prev: [u8; 16] = data[..16]
        .try_into()
        .map_err(|_| BioAuthError::Crypto("truncated cbc initialization vector".to_string()))?;
    let mut out = Vec::with_capacity(data.len() - 16);
    for chunk in data[16..].chunks(16) {
        let mut block = GenericArray::clone_from_slice(chunk);
        cipher.decrypt_block(&mut block);
        for i in 0..16 {
            out.push(block[i] ^ prev[i]);
        }
        prev.copy_from_slice(chunk);
    }

    let pad = *out
        .last()
        .ok_or_else(|| BioAuthError::Crypto("empty cbc plaintext".to_string()))? as usize;
    if pad == 0 || pad > 16 || pad > out.len() {
        return Err(BioAuthError::Crypto("bad cbc padding".to_string()));
    }
    if !out[out.len() - pad..].iter().all(|&b| b == pad as u8) {
        return Err(BioAuthError::Crypto("bad cbc padding".to_string()));
    }
    out.truncate(out.len() - pad);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn test_rsa_session_key_round_trip() {
        let mut rng = thread_rng();
        let keypair = RsaKeypair::generate(&mut rng, 1024).unwrap();
        let session_key = [0x42u8; 16];
        let ct = keypair.public.encrypt(&mut rng, &session_key).unwrap();
        let pt = keypair.private.decrypt(&ct, 16).unwrap();
        assert_eq!(pt, session_key);
    }

    #[test]
    fn test_rsa_tamper_detected() {
        let mut rng = thread_rng();
        let keypair = RsaKeypair::generate(&mut rng, 1024).unwrap();
        let mut ct = keypair.public.encrypt(&mut rng, &[7u8; 16]).unwrap();
        let idx = ct.len() / 2;
        ct[idx] ^= 1;
        assert!(keypair.private.decrypt(&ct, 16).is_err());
    }

    #[test]
    fn test_rsa_key_file_round_trip() {
        let mut rng = thread_rng();
        let keypair = RsaKeypair::generate(&mut rng, 1024).unwrap();
        let path = std::env::temp_dir().join("bio_auth_mpc_rsa_test.json");
        keypair.save_json(&path).unwrap();
        let loaded = RsaKeypair::load_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.public.n, keypair.public.n);
        assert_eq!(loaded.private.d, keypair.private.d);
    }

    #[test]
    fn test_aes_cbc_round_trip() {
        let mut rng = thread_rng();
        let key = [9u8; 16];
        for len in [0usize, 1, 15, 16, 17, 100, 4096] {
            let plaintext: Vec<u8> = (0..len).map(|i| i as u8).collect();
            let ct = aes_cbc_encrypt(&mut rng, &key, &plaintext);
            assert_eq!(ct.len() % 16, 0);
            let pt = aes_cbc_decrypt(&key, &ct).unwrap();
            assert_eq!(pt, plaintext, "length {}", len);
        }
    }

    #[test]
    fn test_aes_cbc_fresh_iv_randomizes() {
        let mut rng = thread_rng();
        let key = [1u8; 16];
        let ct1 = aes_cbc_encrypt(&mut rng, &key, b"same message");
        let ct2 = aes_cbc_encrypt(&mut rng, &key, b"same message");
        assert_ne!(ct1, ct2);
    }

    #[test]
    fn test_aes_cbc_wrong_key_fails_or_garbles() {
        let mut rng = thread_rng();
        let ct = aes_cbc_encrypt(&mut rng, &[1u8; 16], b"secret payload bytes");
        match aes_cbc_decrypt(&[2u8; 16], &ct) {
            Ok(pt) => assert_ne!(pt, b"secret payload bytes"),
            Err(_) => {}
        }
    }
}
