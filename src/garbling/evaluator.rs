//! # 求值过程 (Evaluator)
//!
//! 混淆的镜像：给定每条输入线的一个标签，按拓扑序逐门推进。XOR 门做
//! 标签异或，NOT 门直接传递标签（混淆侧已交换），AND/OR 门用两个
//! 排列位选表行、哈希后恢复输出标签。
//!
//! 求值方只见到标签与混淆表，见不到任何布尔值；输出标签由混淆方持有的
//! 输出映射还原为布尔输出，两个期望标签都不匹配即为标签不匹配错误。

use super::circuit::GarbledCircuit;
use super::garbler::{gate_oracle, GarbledTableEntry};
use super::gate::GateKind;
use super::{label_lsb, xor_labels, Label};
use crate::{BioAuthError, Result};

/// 对混淆电路求值
///
/// `input_labels` 为每条输入线恰好一个标签（来自份额选取与 OT）。
/// 返回 `m` 个输出标签。
pub fn evaluate(
    circuit: &GarbledCircuit,
    tables: &[GarbledTableEntry],
    input_labels: &[Label],
) -> Result<Vec<Label>> {
    if input_labels.len() != circuit.n {
        return Err(BioAuthError::Protocol(format!(
            "expected {} input labels, got {}",
            circuit.n,
            input_labels.len()
        )));
    }
    if tables.len() != circuit.table_gate_count() {
        return Err(BioAuthError::Protocol(format!(
            "expected {} garbled table entries, got {}",
            circuit.table_gate_count(),
            tables.len()
        )));
    }

    let mut labels: Vec<Label> = vec![[0u8; 16]; circuit.r];
    labels[..circuit.n].copy_from_slice(input_labels);

    let mut table_cursor = 0;
    for (gate_index, gate) in circuit.gates.iter().enumerate() {
        match gate.kind {
            GateKind::Xor => {
                labels[gate.output] = xor_labels(&labels[gate.input0], &labels[gate.input1]);
            }
            GateKind::Not => {
                labels[gate.output] = labels[gate.input0];
            }
            GateKind::And | GateKind::Or => {
                let la = labels[gate.input0];
                let lb = labels[gate.input1];
                let sa = label_lsb(&la);
                let sb = label_lsb(&lb);
                let k = gate_oracle(&la, &lb, gate_index);
                labels[gate.output] = match (sa, sb) {
                    (false, false) => k,
                    (false, true) => xor_labels(&k, &tables[table_cursor][0]),
                    (true, false) => xor_labels(&k, &tables[table_cursor][1]),
                    (true, true) => xor_labels(&k, &tables[table_cursor][2]),
                };
                table_cursor += 1;
            }
        }
    }

    Ok(circuit.outputs.iter().map(|&w| labels[w]).collect())
}

/// 用输出映射将输出标签还原为布尔值
///
/// 任一标签与对应输出线的两个期望标签都不匹配时返回标签不匹配错误；
/// 在 free-XOR + 行缩减下这意味着混淆表损坏或 OT 响应有误。
pub fn map_outputs(output_map: &[[Label; 2]], output_labels: &[Label]) -> Result<Vec<bool>> {
    if output_map.len() != output_labels.len() {
        return Err(BioAuthError::Protocol(format!(
            "output map has {} wires, got {} labels",
            output_map.len(),
            output_labels.len()
        )));
    }
    let mut bits = Vec::with_capacity(output_labels.len());
    for (i, (pair, label)) in output_map.iter().zip(output_labels.iter()).enumerate() {
        if *label == pair[0] {
            bits.push(false);
        } else if *label == pair[1] {
            bits.push(true);
        } else {
            return Err(BioAuthError::LabelMismatch(i));
        }
    }
    Ok(bits)
}
