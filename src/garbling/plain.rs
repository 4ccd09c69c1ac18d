//! Plaintext circuit evaluation over bools, for circuit-correctness checks
//!
//! 与混淆求值不同，这里直接在布尔域上推进拓扑。固定线的公开值取自
//! 构建产物中的标记，因此只适用于本进程构建的电路（从 SCD 读回的
//! 拓扑不携带固定线标记）。

use super::circuit::{FixedWire, GarbledCircuit};
use super::gate::GateKind;
use crate::{BioAuthError, Result};

/// 对电路做明文求值
pub fn eval_plain(circuit: &GarbledCircuit, inputs: &[bool]) -> Result<Vec<bool>> {
    if inputs.len() != circuit.n {
        return Err(BioAuthError::Argument(format!(
            "expected {} input bits, got {}",
            circuit.n,
            inputs.len()
        )));
    }
    if circuit.fixed_wires.len() != circuit.r {
        return Err(BioAuthError::Argument(
            "circuit lacks fixed-wire tags; plain evaluation requires a freshly built circuit"
                .to_string(),
        ));
    }

    let mut values = vec![false; circuit.r];
    values[..circuit.n].copy_from_slice(inputs);
    for (w, tag) in circuit.fixed_wires.iter().enumerate() {
        if *tag == FixedWire::One {
            values[w] = true;
        }
    }

    for gate in &circuit.gates {
        values[gate.output] = match gate.kind {
            GateKind::Not => !values[gate.input0],
            kind => kind.eval(values[gate.input0], values[gate.input1]),
        };
    }

    Ok(circuit.outputs.iter().map(|&w| values[w]).collect())
}
