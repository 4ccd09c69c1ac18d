//! # 电路拓扑与构建基底 (Circuit Topology and Builder Substrate)
//!
//! `GarbledCircuit` 保存最终的电路拓扑：输入/输出线数、门列表、线总数与
//! 按门类统计的计数。`GarblingContext` 是仅存在于构建期的暂存状态：
//! 线游标、固定线标记数组以及整数符号表示模式。二者由 `CircuitBuilder`
//! 配对持有，`finish()` 之后只剩下可序列化的拓扑。
//!
//! 超出预分配的门数或线数上界是致命错误（allocation-exceeded）。

use super::gate::{Gate, GateKind};
use super::WireId;
use crate::{BioAuthError, Result};

/// 固定线标记
///
/// 固定 0/1 线是求值方先验可知公开布尔值的唯二线类；它们按需创建并在
/// 构建期参与常量折叠。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedWire {
    None,
    Zero,
    One,
}

/// 进程内整数表示模式
///
/// 乘法与比较按此模式参数化。浮点库的每个入口都会切换到 `Unsigned`
/// 并在退出时恢复，因此该状态作为构建器的显式字段而非进程全局量。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRepr {
    Unsigned,
    Signed,
}

/// 混淆电路拓扑
///
/// `n` 输入线数、`m` 输出线数、`q` 门数、`r` 线总数。`fixed_wires`
/// 仅在构建产物中填充（从 SCD 读回的电路不含固定线信息，明文求值
/// 需要构建期产物）。
#[derive(Debug, Clone)]
pub struct GarbledCircuit {
    pub n: usize,
    pub m: usize,
    pub q: usize,
    pub r: usize,
    pub gates: Vec<Gate>,
    pub outputs: Vec<WireId>,
    pub fixed_wires: Vec<FixedWire>,
    pub qand: usize,
    pub qor: usize,
    pub qxor: usize,
    pub qnot: usize,
}

impl GarbledCircuit {
    /// 需要混淆表项的门数（AND + OR）
    pub fn table_gate_count(&self) -> usize {
        self.qand + self.qor
    }
}

/// 构建期暂存状态
#[derive(Debug)]
pub struct GarblingContext {
    pub wire_index: usize,
    pub max_gates: usize,
    pub max_wires: usize,
    pub int_repr: IntRepr,
}

/// 电路构建器
///
/// 创建时给定输入/输出线数与门/线数上界，随后由电路库逐门填充，
/// 最终 `finish()` 记录输出线并裁剪计数。
#[derive(Debug)]
pub struct CircuitBuilder {
    circuit: GarbledCircuit,
    ctx: GarblingContext,
}

impl CircuitBuilder {
    /// 创建空电路并初始化构建上下文
    ///
    /// 输入线占据索引 `0..n`，后续线（包括固定线与门输出线）从 `n` 起
    /// 单调分配。
    pub fn new(n: usize, m: usize, max_gates: usize, max_wires: usize) -> Result<Self> {
        if max_wires < n {
            return Err(BioAuthError::Argument(format!(
                "wire bound {} below input count {}",
                max_wires, n
            )));
        }
        Ok(CircuitBuilder {
            circuit: GarbledCircuit {
                n,
                m,
                q: 0,
                r: n,
                gates: Vec::with_capacity(max_gates.min(1 << 20)),
                outputs: Vec::new(),
                fixed_wires: vec![FixedWire::None; n],
                qand: 0,
                qor: 0,
                qxor: 0,
                qnot: 0,
            },
            ctx: GarblingContext {
                wire_index: n,
                max_gates,
                max_wires,
                int_repr: IntRepr::Unsigned,
            },
        })
    }

    pub fn int_repr(&self) -> IntRepr {
        self.ctx.int_repr
    }

    pub fn set_int_repr(&mut self, repr: IntRepr) {
        self.ctx.int_repr = repr;
    }

    /// 电路输入线索引 `0..n`
    pub fn input_wires(&self) -> Vec<WireId> {
        (0..self.circuit.n).collect()
    }

    pub fn input_count(&self) -> usize {
        self.circuit.n
    }

    pub fn gate_count(&self) -> usize {
        self.circuit.gates.len()
    }

    pub fn wire_count(&self) -> usize {
        self.ctx.wire_index
    }

    /// 分配下一条线；超出上界是致命错误
    pub fn next_wire(&mut self) -> Result<WireId> {
        if self.ctx.wire_index >= self.ctx.max_wires {
            return Err(BioAuthError::AllocationExceeded(format!(
                "wire bound {} exhausted",
                self.ctx.max_wires
            )));
        }
        let ind = self.ctx.wire_index;
        self.ctx.wire_index += 1;
        self.circuit.fixed_wires.push(FixedWire::None);
        Ok(ind)
    }

    /// 创建固定 0 线并打标
    pub fn fixed_zero(&mut self) -> Result<WireId> {
        let ind = self.next_wire()?;
        self.circuit.fixed_wires[ind] = FixedWire::Zero;
        Ok(ind)
    }

    /// 创建固定 1 线并打标
    pub fn fixed_one(&mut self) -> Result<WireId> {
        let ind = self.next_wire()?;
        self.circuit.fixed_wires[ind] = FixedWire::One;
        Ok(ind)
    }

    pub fn is_fixed_zero(&self, wire: WireId) -> bool {
        self.circuit.fixed_wires[wire] == FixedWire::Zero
    }

    pub fn is_fixed_one(&self, wire: WireId) -> bool {
        self.circuit.fixed_wires[wire] == FixedWire::One
    }

    fn push_gate(&mut self, kind: GateKind, input0: WireId, input1: WireId) -> Result<WireId> {
        if self.circuit.gates.len() >= self.ctx.max_gates {
            return Err(BioAuthError::AllocationExceeded(format!(
                "gate bound {} exhausted",
                self.ctx.max_gates
            )));
        }
        let output = self.next_wire()?;
        self.circuit.gates.push(Gate {
            input0,
            input1,
            output,
            kind,
        });
        match kind {
            GateKind::And => self.circuit.qand += 1,
            GateKind::Or => self.circuit.qor += 1,
            GateKind::Xor => self.circuit.qxor += 1,
            GateKind::Not => self.circuit.qnot += 1,
        }
        Ok(output)
    }

    /// 常量折叠门：所有上层电路统一经由此函数发射 AND/OR/XOR
    ///
    /// 若任一输入为固定 0/1 线，门在构建期被消解；若两输入为同一条线，
    /// AND/OR 坍缩为输入本身、XOR 坍缩为固定 0。只有两种优化都不适用时
    /// 才真正分配一个门。
    pub fn mixed_op_gate(&mut self, op: GateKind, input0: WireId, input1: WireId) -> Result<WireId> {
        debug_assert!(op != GateKind::Not, "use not_gate2 for negation");

        let input0_is_zero = self.is_fixed_zero(input0);
        let input1_is_zero = self.is_fixed_zero(input1);
        let input0_is_one = self.is_fixed_one(input0);
        let input1_is_one = self.is_fixed_one(input1);

        if input0_is_zero || input0_is_one || input1_is_zero || input1_is_one {
            return match op {
                GateKind::And => {
                    if input0_is_zero || input1_is_zero {
                        self.fixed_zero()
                    } else if input0_is_one {
                        Ok(input1)
                    } else {
                        Ok(input0)
                    }
                }
                GateKind::Or => {
                    if input0_is_one || input1_is_one {
                        self.fixed_one()
                    } else if input0_is_zero {
                        Ok(input1)
                    } else {
                        Ok(input0)
                    }
                }
                GateKind::Xor => {
                    if input0_is_zero {
                        Ok(input1)
                    } else if input1_is_zero {
                        Ok(input0)
                    } else if input0_is_one && input1_is_one {
                        self.fixed_zero()
                    } else if input0_is_one {
                        self.push_gate(GateKind::Not, input1, input1)
                    } else {
                        self.push_gate(GateKind::Not, input0, input0)
                    }
                }
                GateKind::Not => unreachable!(),
            };
        }

        if input0 == input1 {
            return match op {
                GateKind::And | GateKind::Or => Ok(input0),
                GateKind::Xor => self.fixed_zero(),
                GateKind::Not => unreachable!(),
            };
        }

        self.push_gate(op, input0, input1)
    }

    /// 常量折叠取反
    pub fn not_gate2(&mut self, input0: WireId) -> Result<WireId> {
        if self.is_fixed_zero(input0) {
            self.fixed_one()
        } else if self.is_fixed_one(input0) {
            self.fixed_zero()
        } else {
            self.push_gate(GateKind::Not, input0, input0)
        }
    }

    /// 对两个等长线向量逐位应用 `MIXED_OP`
    pub fn mixed_op_vec_2i(
        &mut self,
        op: GateKind,
        input_a: &[WireId],
        input_b: &[WireId],
    ) -> Result<Vec<WireId>> {
        debug_assert_eq!(input_a.len(), input_b.len());
        let mut outputs = Vec::with_capacity(input_a.len());
        for (&a, &b) in input_a.iter().zip(input_b.iter()) {
            outputs.push(self.mixed_op_gate(op, a, b)?);
        }
        Ok(outputs)
    }

    /// 逐位取反
    pub fn not_vec(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        let mut outputs = Vec::with_capacity(inputs.len());
        for &w in inputs {
            outputs.push(self.not_gate2(w)?);
        }
        Ok(outputs)
    }

    /// 以输出线数取代声明的 `m` 并结束构建（输出元数由操作决定时使用）
    pub fn finish_any(mut self, outputs: &[WireId]) -> Result<GarbledCircuit> {
        self.circuit.m = outputs.len();
        self.finish(outputs)
    }

    /// 记录输出线并结束构建，产出最终拓扑
    pub fn finish(mut self, outputs: &[WireId]) -> Result<GarbledCircuit> {
        if outputs.len() != self.circuit.m {
            return Err(BioAuthError::Argument(format!(
                "expected {} outputs, got {}",
                self.circuit.m,
                outputs.len()
            )));
        }
        for &o in outputs {
            if o >= self.ctx.wire_index {
                return Err(BioAuthError::Argument(format!(
                    "output wire {} was never allocated",
                    o
                )));
            }
        }
        self.circuit.outputs = outputs.to_vec();
        self.circuit.q = self.circuit.gates.len();
        self.circuit.r = self.ctx.wire_index;
        Ok(self.circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_op_folds_fixed_inputs() {
        let mut b = CircuitBuilder::new(2, 1, 16, 64).unwrap();
        let zero = b.fixed_zero().unwrap();
        let one = b.fixed_one().unwrap();

        // AND with fixed zero collapses without allocating a gate
        let before = b.gate_count();
        let w = b.mixed_op_gate(GateKind::And, 0, zero).unwrap();
        assert!(b.is_fixed_zero(w));
        assert_eq!(b.gate_count(), before);

        // AND with fixed one passes the live input through
        let w = b.mixed_op_gate(GateKind::And, one, 1).unwrap();
        assert_eq!(w, 1);
        assert_eq!(b.gate_count(), before);

        // XOR with fixed one becomes a NOT gate
        let w = b.mixed_op_gate(GateKind::Xor, 0, one).unwrap();
        assert!(!b.is_fixed_zero(w) && !b.is_fixed_one(w));
        assert_eq!(b.gate_count(), before + 1);
    }

    #[test]
    fn test_mixed_op_xor_with_zero_is_identity() {
        let mut b = CircuitBuilder::new(1, 1, 16, 64).unwrap();
        let zero = b.fixed_zero().unwrap();
        let before = b.gate_count();
        let w = b.mixed_op_gate(GateKind::Xor, 0, zero).unwrap();
        assert_eq!(w, 0);
        assert_eq!(b.gate_count(), before);
    }

    #[test]
    fn test_mixed_op_collapses_equal_inputs() {
        let mut b = CircuitBuilder::new(1, 1, 16, 64).unwrap();
        assert_eq!(b.mixed_op_gate(GateKind::And, 0, 0).unwrap(), 0);
        assert_eq!(b.mixed_op_gate(GateKind::Or, 0, 0).unwrap(), 0);
        let w = b.mixed_op_gate(GateKind::Xor, 0, 0).unwrap();
        assert!(b.is_fixed_zero(w));
    }

    #[test]
    fn test_gate_bound_is_fatal() {
        let mut b = CircuitBuilder::new(2, 1, 1, 64).unwrap();
        b.mixed_op_gate(GateKind::And, 0, 1).unwrap();
        let err = b.mixed_op_gate(GateKind::Or, 0, 1).unwrap_err();
        assert!(matches!(err, BioAuthError::AllocationExceeded(_)));
    }

    #[test]
    fn test_wire_bound_is_fatal() {
        let mut b = CircuitBuilder::new(2, 1, 16, 3).unwrap();
        b.fixed_zero().unwrap();
        assert!(matches!(
            b.fixed_one().unwrap_err(),
            BioAuthError::AllocationExceeded(_)
        ));
    }

    #[test]
    fn test_fixed_tags_survive_building() {
        let mut b = CircuitBuilder::new(2, 1, 16, 64).unwrap();
        let zero = b.fixed_zero().unwrap();
        let one = b.fixed_one().unwrap();
        let out = b.mixed_op_gate(GateKind::And, 0, 1).unwrap();
        let circuit = b.finish(&[out]).unwrap();
        assert_eq!(circuit.fixed_wires[zero], FixedWire::Zero);
        assert_eq!(circuit.fixed_wires[one], FixedWire::One);
        assert_eq!(circuit.q, 1);
        assert_eq!(circuit.r, 5);
    }
}
