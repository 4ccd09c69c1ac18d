//! # 混淆过程 (Garbler)
//!
//! 对已定型的电路拓扑执行一次混淆：采样 free-XOR 差值与输入标签，
//! 按拓扑序为每个门派生输出标签。XOR 门只做标签异或；NOT 门交换
//! 两个标签；AND/OR 门在 point-and-permute 排列下产生行缩减后的
//! 3 行混淆表，排列位 (0,0) 行被强制为全零并省略。
//!
//! 门混淆使用可调随机预言 `H(la ‖ lb ‖ gate_index)`，以 SHA-256
//! 实现并截断到 128 位。

use super::circuit::GarbledCircuit;
use super::gate::GateKind;
use super::{generate_delta, generate_random_label, label_lsb, xor_labels, Label, WireId};
use crate::{BioAuthError, Result};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 单个 AND/OR 门的行缩减混淆表（3 行，按排列序 (0,1), (1,0), (1,1)）
pub type GarbledTableEntry = [Label; 3];

/// 一次混淆的全部产物
///
/// 标签按线成对存放：`[label0, label1]`，满足 `label1 = label0 XOR delta`。
/// 输出映射记录每条输出线的两个标签，供 S1 还原布尔输出。
/// 可整体序列化，供混淆方离线预混淆后缓存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Garbling {
    /// 每条输入线的标签对
    pub input_labels: Vec<[Label; 2]>,
    /// 每条输出线的标签对（输出映射）
    pub output_map: Vec<[Label; 2]>,
    /// 行缩减混淆表，每个 AND/OR 门一项，按门序排列
    pub tables: Vec<GarbledTableEntry>,
    /// free-XOR 差值（最低位为 1）
    pub delta: Label,
}

/// 可调随机预言：`H(la ‖ lb ‖ tweak)` 截断到 128 位
///
/// tweak 是门在门列表中的索引，保证不同门的预言输出互相独立。
pub fn gate_oracle(la: &Label, lb: &Label, gate_index: usize) -> Label {
    let mut hasher = Sha256::new();
    hasher.update(la);
    hasher.update(lb);
    hasher.update((gate_index as u64).to_le_bytes());
    hasher.update([0u8; 8]);
    let digest = hasher.finalize();
    let mut out = [0u8; 16];
    out.copy_from_slice(&digest[..16]);
    out
}

/// 混淆一个电路拓扑
///
/// 为输入线与固定线采样新标签，再按拓扑序处理每个门。由于常量折叠，
/// 固定线从不作为已混淆门的输入出现，它们的标签只占位。
pub fn garble<R: RngCore>(circuit: &GarbledCircuit, rng: &mut R) -> Result<Garbling> {
    let delta = generate_delta(rng);

    // label0 per wire; gate outputs get overwritten in the topological pass
    let mut label0: Vec<Label> = Vec::with_capacity(circuit.r);
    for _ in 0..circuit.r {
        label0.push(generate_random_label(rng));
    }

    let mut tables = Vec::with_capacity(circuit.table_gate_count());

    for (gate_index, gate) in circuit.gates.iter().enumerate() {
        match gate.kind {
            GateKind::Xor => {
                label0[gate.output] = xor_labels(&label0[gate.input0], &label0[gate.input1]);
            }
            GateKind::Not => {
                // label swap: out.label0 = in.label1
                label0[gate.output] = xor_labels(&label0[gate.input0], &delta);
            }
            GateKind::And | GateKind::Or => {
                let a0 = label0[gate.input0];
                let b0 = label0[gate.input1];
                let pa = label_lsb(&a0);
                let pb = label_lsb(&b0);

                // label carrying permute bit s on a wire whose label0 has permute bit p
                let label_with_point = |l0: &Label, p: bool, s: bool| -> Label {
                    if p == s {
                        *l0
                    } else {
                        xor_labels(l0, &delta)
                    }
                };

                // row (0,0) is forced to zero: it defines the output label
                let k00 = gate_oracle(
                    &label_with_point(&a0, pa, false),
                    &label_with_point(&b0, pb, false),
                    gate_index,
                );
                let v00 = gate.kind.eval(pa, pb);
                let out0 = if v00 { xor_labels(&k00, &delta) } else { k00 };
                label0[gate.output] = out0;

                let mut entry: GarbledTableEntry = [[0u8; 16]; 3];
                let mut row = 0;
                for (sa, sb) in [(false, true), (true, false), (true, true)] {
                    let k = gate_oracle(
                        &label_with_point(&a0, pa, sa),
                        &label_with_point(&b0, pb, sb),
                        gate_index,
                    );
                    let v = gate.kind.eval(sa ^ pa, sb ^ pb);
                    let c = if v { xor_labels(&out0, &delta) } else { out0 };
                    entry[row] = xor_labels(&k, &c);
                    row += 1;
                }
                tables.push(entry);
            }
        }
    }

    let input_labels = (0..circuit.n)
        .map(|w| [label0[w], xor_labels(&label0[w], &delta)])
        .collect();

    let output_map = circuit
        .outputs
        .iter()
        .map(|&w| [label0[w], xor_labels(&label0[w], &delta)])
        .collect();

    Ok(Garbling {
        input_labels,
        output_map,
        tables,
        delta,
    })
}

impl Garbling {
    /// 将混淆表打包为线格式（每门 3 x 16 字节，按门序）
    pub fn tables_to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.tables.len() * 48);
        for entry in &self.tables {
            for row in entry {
                buf.extend_from_slice(row);
            }
        }
        buf
    }

    /// 从线格式恢复混淆表
    pub fn tables_from_bytes(buf: &[u8]) -> Result<Vec<GarbledTableEntry>> {
        if buf.len() % 48 != 0 {
            return Err(BioAuthError::Protocol(format!(
                "garbled table byte count {} not a multiple of 48",
                buf.len()
            )));
        }
        let mut tables = Vec::with_capacity(buf.len() / 48);
        for chunk in buf.chunks_exact(48) {
            let mut entry: GarbledTableEntry = [[0u8; 16]; 3];
            for (i, row) in chunk.chunks_exact(16).enumerate() {
                entry[i].copy_from_slice(row);
            }
            tables.push(entry);
        }
        Ok(tables)
    }

    /// 序列化整个混淆产物（离线预混淆缓存）
    pub fn to_cache_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| BioAuthError::Serialization(e.to_string()))
    }

    /// 从缓存字节恢复混淆产物
    pub fn from_cache_bytes(bytes: &[u8]) -> Result<Garbling> {
        bincode::deserialize(bytes).map_err(|e| BioAuthError::Serialization(e.to_string()))
    }

    /// 按布尔输入选取相应标签（混淆方侧的辅助）
    pub fn extract_labels(&self, inputs: &[bool]) -> Result<Vec<Label>> {
        if inputs.len() != self.input_labels.len() {
            return Err(BioAuthError::Argument(format!(
                "expected {} input bits, got {}",
                self.input_labels.len(),
                inputs.len()
            )));
        }
        Ok(inputs
            .iter()
            .zip(self.input_labels.iter())
            .map(|(&bit, pair)| pair[bit as usize])
            .collect())
    }
}
