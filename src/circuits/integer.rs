//! # 整数算术电路库 (Integer Arithmetic Circuit Library)
//!
//! 所有操作接受线索引切片并产出新的线索引向量（LSB 在前），统一经由
//! `MIXED_OP` 常量折叠门发射，因此固定常量会自动穿透所有层级。
//!
//! 有符号模式下乘法使用 Baugh-Wooley 布局避免符号扩展，比较在入口翻转
//! 符号位、按无符号比较。带别名的乘法输入自动分派到递归平方例程。

use super::{lg_flr, CarryOut, CmpType, MsbReturn, PrefixDir, ShiftDir, ShiftType, SignFill};
use crate::garbling::{CircuitBuilder, GateKind, IntRepr, WireId};
use crate::{BioAuthError, Result};

/// MSB 电路的输出
#[derive(Debug, Clone)]
pub struct MsbOutputs {
    /// 仅最高置位处为 1 的掩码，宽度与输入一致
    pub mask: Vec<WireId>,
    /// 最高置位索引的不经意二进制编码（`MaskAndIndex` 时存在）
    pub index: Option<Vec<WireId>>,
    /// 至少一位被置位
    pub is_not_zero: WireId,
}

fn step(idx: usize, dir: PrefixDir, n: usize) -> usize {
    match dir {
        PrefixDir::FromLsb => (idx + 1) % n,
        PrefixDir::FromMsb => (idx + n - 1) % n,
    }
}

impl CircuitBuilder {
    /// 将编译期常量硬接线为 `n` 条固定线
    ///
    /// 位模式取二进制补码；有符号模式下最高位取反（与 C 的符号转换
    /// 约定一致）。
    pub fn set_const(&mut self, n: usize, value: i64) -> Result<Vec<WireId>> {
        let signed = self.int_repr() == IntRepr::Signed;
        let mut outputs = Vec::with_capacity(n);
        for i in 0..n {
            let bit = if i < 64 {
                (value >> i) & 1 == 1
            } else {
                value < 0
            };
            let is_msb = i == n - 1;
            if bit ^ (is_msb && signed) {
                outputs.push(self.fixed_one()?);
            } else {
                outputs.push(self.fixed_zero()?);
            }
        }
        Ok(outputs)
    }

    /// 半加器：(和, 进位)
    fn add22(&mut self, a: WireId, b: WireId) -> Result<(WireId, WireId)> {
        let sum = self.mixed_op_gate(GateKind::Xor, a, b)?;
        let carry = self.mixed_op_gate(GateKind::And, a, b)?;
        Ok((sum, carry))
    }

    /// 全加器：(和, 进位)
    fn add32(&mut self, a: WireId, b: WireId, cin: WireId) -> Result<(WireId, WireId)> {
        let w1 = self.mixed_op_gate(GateKind::Xor, a, cin)?;
        let w2 = self.mixed_op_gate(GateKind::Xor, a, b)?;
        let sum = self.mixed_op_gate(GateKind::Xor, cin, w2)?;
        let w3 = self.mixed_op_gate(GateKind::And, w1, w2)?;
        let cout = self.mixed_op_gate(GateKind::Xor, a, w3)?;
        Ok((sum, cout))
    }

    /// 半减器：(差, 借位)
    fn sub22(&mut self, a: WireId, b: WireId) -> Result<(WireId, WireId)> {
        let not_a = self.not_gate2(a)?;
        let diff = self.mixed_op_gate(GateKind::Xor, a, b)?;
        let borrow = self.mixed_op_gate(GateKind::And, not_a, b)?;
        Ok((diff, borrow))
    }

    /// 全减器：(差, 借位)
    fn sub32(&mut self, a: WireId, b: WireId, bin: WireId) -> Result<(WireId, WireId)> {
        let not_a = self.not_gate2(a)?;
        let w1 = self.mixed_op_gate(GateKind::And, bin, b)?;
        let w2 = self.mixed_op_gate(GateKind::Xor, bin, b)?;
        let diff = self.mixed_op_gate(GateKind::Xor, a, w2)?;
        let w3 = self.mixed_op_gate(GateKind::And, not_a, w2)?;
        let borrow = self.mixed_op_gate(GateKind::Xor, w1, w3)?;
        Ok((diff, borrow))
    }

    /// 行波进位加法；`CarryOut::Keep` 在尾部追加末进位
    pub fn add_2i(&mut self, a: &[WireId], b: &[WireId], carry: CarryOut) -> Result<Vec<WireId>> {
        if a.len() != b.len() || a.is_empty() {
            return Err(BioAuthError::Argument("operand length mismatch in add".to_string()));
        }
        let split = a.len();
        let mut outputs = Vec::with_capacity(split + 1);

        if split == 1 {
            outputs.push(self.mixed_op_gate(GateKind::Xor, a[0], b[0])?);
            if carry == CarryOut::Keep {
                outputs.push(self.mixed_op_gate(GateKind::And, a[0], b[0])?);
            }
            return Ok(outputs);
        }

        let (s, mut cin) = self.add22(a[0], b[0])?;
        outputs.push(s);
        for i in 1..split - 1 {
            let (s, c) = self.add32(a[i], b[i], cin)?;
            outputs.push(s);
            cin = c;
        }
        if carry == CarryOut::Keep {
            let (s, c) = self.add32(a[split - 1], b[split - 1], cin)?;
            outputs.push(s);
            outputs.push(c);
        } else {
            let t = self.mixed_op_gate(GateKind::Xor, a[split - 1], cin)?;
            outputs.push(self.mixed_op_gate(GateKind::Xor, b[split - 1], t)?);
        }
        Ok(outputs)
    }

    /// 单比特加法（只用半加器的行波）
    pub fn bitadd_2i(&mut self, a: &[WireId], b: WireId, carry: CarryOut) -> Result<Vec<WireId>> {
        let split = a.len();
        let mut outputs = Vec::with_capacity(split + 1);
        if split == 1 {
            outputs.push(self.mixed_op_gate(GateKind::Xor, a[0], b)?);
            if carry == CarryOut::Keep {
                outputs.push(self.mixed_op_gate(GateKind::And, a[0], b)?);
            }
            return Ok(outputs);
        }
        let (s, mut cin) = self.add22(a[0], b)?;
        outputs.push(s);
        for i in 1..split - 1 {
            let (s, c) = self.add22(a[i], cin)?;
            outputs.push(s);
            cin = c;
        }
        if carry == CarryOut::Keep {
            let (s, c) = self.add22(a[split - 1], cin)?;
            outputs.push(s);
            outputs.push(c);
        } else {
            outputs.push(self.mixed_op_gate(GateKind::Xor, a[split - 1], cin)?);
        }
        Ok(outputs)
    }

    /// 单比特减法
    pub fn bitsub_2i(&mut self, a: &[WireId], b: WireId, carry: CarryOut) -> Result<Vec<WireId>> {
        let split = a.len();
        let mut outputs = Vec::with_capacity(split + 1);
        if split == 1 {
            let (d, bo) = self.sub22(a[0], b)?;
            outputs.push(d);
            if carry == CarryOut::Keep {
                outputs.push(bo);
            }
            return Ok(outputs);
        }
        let (d, mut bin) = self.sub22(a[0], b)?;
        outputs.push(d);
        for i in 1..split - 1 {
            let (d, bo) = self.sub22(a[i], bin)?;
            outputs.push(d);
            bin = bo;
        }
        if carry == CarryOut::Keep {
            let (d, bo) = self.sub22(a[split - 1], bin)?;
            outputs.push(d);
            outputs.push(bo);
        } else {
            outputs.push(self.mixed_op_gate(GateKind::Xor, a[split - 1], bin)?);
        }
        Ok(outputs)
    }

    /// 自增
    pub fn inc(&mut self, a: &[WireId], carry: CarryOut) -> Result<Vec<WireId>> {
        let one = self.fixed_one()?;
        self.bitadd_2i(a, one, carry)
    }

    /// 自减
    pub fn dec(&mut self, a: &[WireId], carry: CarryOut) -> Result<Vec<WireId>> {
        let one = self.fixed_one()?;
        self.bitsub_2i(a, one, carry)
    }

    /// 二进制补码取负（NOT 后自增）
    pub fn neg(&mut self, a: &[WireId]) -> Result<Vec<WireId>> {
        let inverted = self.not_vec(a)?;
        let one = self.fixed_one()?;
        self.bitadd_2i(&inverted, one, CarryOut::Discard)
    }

    /// 减法：`a + (−b)`
    pub fn sub_2i(&mut self, a: &[WireId], b: &[WireId], carry: CarryOut) -> Result<Vec<WireId>> {
        let neg_b = self.neg(b)?;
        self.add_2i(a, &neg_b, carry)
    }

    /// 直接行波借位减法（两输入均为无符号时使用）
    ///
    /// `CarryOut::Keep` 在尾部追加借位位（a < b 时为 1）。
    pub fn sub3_2i(&mut self, a: &[WireId], b: &[WireId], carry: CarryOut) -> Result<Vec<WireId>> {
        if a.len() != b.len() || a.is_empty() {
            return Err(BioAuthError::Argument("operand length mismatch in sub".to_string()));
        }
        let split = a.len();
        let mut outputs = Vec::with_capacity(split + 1);
        if split == 1 {
            let (d, bo) = self.sub22(a[0], b[0])?;
            outputs.push(d);
            if carry == CarryOut::Keep {
                outputs.push(bo);
            }
            return Ok(outputs);
        }
        let (d, mut bin) = self.sub22(a[0], b[0])?;
        outputs.push(d);
        for i in 1..split - 1 {
            let (d, bo) = self.sub32(a[i], b[i], bin)?;
            outputs.push(d);
            bin = bo;
        }
        if carry == CarryOut::Keep {
            let (d, bo) = self.sub32(a[split - 1], b[split - 1], bin)?;
            outputs.push(d);
            outputs.push(bo);
        } else {
            let t = self.mixed_op_gate(GateKind::Xor, a[split - 1], bin)?;
            outputs.push(self.mixed_op_gate(GateKind::Xor, b[split - 1], t)?);
        }
        Ok(outputs)
    }

    /// 有符号/无符号表示切换：翻转每个字的最高位
    pub fn repr_sw(&mut self, word_length: usize, inputs: &[WireId]) -> Result<Vec<WireId>> {
        let mut outputs = inputs.to_vec();
        let num_words = inputs.len() / word_length;
        for i in 0..num_words {
            let msb = (i + 1) * word_length - 1;
            outputs[msb] = self.not_gate2(inputs[msb])?;
        }
        Ok(outputs)
    }

    /// 对 `k` 个 ℓ 位输入求和，输出宽度 ℓ + 1 + ⌊lg(k−1)⌋
    ///
    /// 平衡二叉树相加；奇数个输入时先把末项折进位置 0 再对半。
    pub fn sum(&mut self, input_length: usize, inputs: &[WireId]) -> Result<Vec<WireId>> {
        if input_length == 0 || inputs.len() % input_length != 0 {
            return Err(BioAuthError::Argument("sum input not a whole number of words".to_string()));
        }
        let num_inputs = inputs.len() / input_length;
        if num_inputs < 2 {
            return Ok(inputs.to_vec());
        }
        let num_overflow_bits = 1 + lg_flr(num_inputs - 1);
        let mut items: Vec<Vec<WireId>> = Vec::with_capacity(num_inputs);
        for i in 0..num_inputs {
            let mut v = inputs[i * input_length..(i + 1) * input_length].to_vec();
            let pad = self.set_const(num_overflow_bits, 0)?;
            v.extend(pad);
            items.push(v);
        }
        while items.len() > 1 {
            if items.len() % 2 == 1 {
                let last = items.pop().unwrap();
                items[0] = self.add_2i(&items[0], &last, CarryOut::Discard)?;
            }
            let mut next = Vec::with_capacity(items.len() / 2);
            for pair in items.chunks(2) {
                next.push(self.add_2i(&pair[0], &pair[1], CarryOut::Discard)?);
            }
            items = next;
        }
        Ok(items.remove(0))
    }

    /// 统计置位个数，输出宽度 ⌈lg(n+1)⌉
    ///
    /// 每轮把一个“单例”位留在加法器外、事后补加，使每轮宽度只增 1。
    /// 非 2 的幂长度退化为按 1 位宽求和（两者等价）。
    pub fn countbits(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        let n = inputs.len();
        if n < 4 || !n.is_power_of_two() {
            return self.sum(1, inputs);
        }

        let mut work = inputs.to_vec();
        let mut in_len = 2;
        let mut num = n / 4;
        let mut singleton = n / 2;

        while num > 0 {
            let w = in_len / 2;
            let mut out = Vec::with_capacity(num * (w + 1));
            for i in 0..num {
                let a = work[i * in_len..i * in_len + w].to_vec();
                let b = work[i * in_len + w..(i + 1) * in_len].to_vec();
                let t = self.add_2i(&a, &b, CarryOut::Keep)?;
                let t = self.bitadd_2i(&t, work[singleton + i], CarryOut::Discard)?;
                out.extend(t);
            }
            work[..out.len()].copy_from_slice(&out);
            singleton += num;
            in_len += 2;
            num /= 2;
        }

        let w = in_len / 2;
        let final_in = work[..w].to_vec();
        self.bitadd_2i(&final_in, inputs[n - 1], CarryOut::Keep)
    }

    /// 循环前缀运算（AND/OR/XOR）
    ///
    /// 从 `input_begin` 起沿 `in_dir` 行进至 `input_end`，累积值写入沿
    /// `out_dir` 行进的输出位置，索引按模回绕。
    pub fn prefix(
        &mut self,
        op: GateKind,
        input_begin: usize,
        input_end: usize,
        output_begin: usize,
        in_dir: PrefixDir,
        out_dir: PrefixDir,
        inputs: &[WireId],
    ) -> Result<Vec<WireId>> {
        let n = inputs.len();
        let input_copy = inputs.to_vec();
        let mut outputs = vec![0; n];

        let mut out_idx = output_begin;
        let mut in_idx = input_begin;
        let mut next_wire = input_copy[in_idx];
        while in_idx != input_end {
            outputs[out_idx] = next_wire;
            in_idx = step(in_idx, in_dir, n);
            next_wire = self.mixed_op_gate(op, outputs[out_idx], input_copy[in_idx])?;
            out_idx = step(out_idx, out_dir, n);
        }
        outputs[out_idx] = next_wire;
        Ok(outputs)
    }

    /// 循环前缀 XOR 的逆：相邻位对的 XOR
    pub fn inv_prefix_xor(
        &mut self,
        input_begin: usize,
        input_end: usize,
        output_begin: usize,
        in_dir: PrefixDir,
        out_dir: PrefixDir,
        inputs: &[WireId],
    ) -> Result<Vec<WireId>> {
        let n = inputs.len();
        let input_copy = inputs.to_vec();
        let mut outputs = vec![0; n];

        let mut out_idx = output_begin;
        let mut next_in_idx = input_begin;
        let mut next_wire = input_copy[next_in_idx];
        while next_in_idx != input_end {
            outputs[out_idx] = next_wire;
            let prev = next_in_idx;
            next_in_idx = step(prev, in_dir, n);
            next_wire = self.mixed_op_gate(GateKind::Xor, input_copy[prev], input_copy[next_in_idx])?;
            out_idx = step(out_idx, out_dir, n);
        }
        outputs[out_idx] = next_wire;
        Ok(outputs)
    }

    /// 编译期定量移位
    pub fn shift(
        &mut self,
        shift_amount: usize,
        direction: ShiftDir,
        shift_type: ShiftType,
        sign: SignFill,
        inputs: &[WireId],
    ) -> Result<Vec<WireId>> {
        let n = inputs.len();
        let mut outputs = vec![0; n];
        for i in 0..n {
            let (j, wrapped) = match direction {
                ShiftDir::Left => ((i + shift_amount) % n, i + shift_amount >= n),
                ShiftDir::Right => {
                    let raw = i as isize - shift_amount as isize;
                    (raw.rem_euclid(n as isize) as usize, raw < 0)
                }
            };
            if !wrapped || shift_type == ShiftType::Circular {
                outputs[j] = inputs[i];
            } else if sign == SignFill::Negative && direction == ShiftDir::Right {
                outputs[j] = self.fixed_one()?;
            } else {
                outputs[j] = self.fixed_zero()?;
            }
        }
        Ok(outputs)
    }

    /// 不经意移位：对数级 MUX 阶段组成的桶形移位器
    ///
    /// `oblv_shift_amt` 至少需要 1 + ⌊lg max_shift⌋ 条线（LSB 在前）。
    pub fn oblv_shift(
        &mut self,
        direction: ShiftDir,
        shift_type: ShiftType,
        sign: SignFill,
        max_shift: usize,
        oblv_shift_amt: &[WireId],
        inputs: &[WireId],
    ) -> Result<Vec<WireId>> {
        let shift_bits = 1 + lg_flr(max_shift);
        if oblv_shift_amt.len() < shift_bits {
            return Err(BioAuthError::Argument(format!(
                "oblivious shift amount needs {} wires, got {}",
                shift_bits,
                oblv_shift_amt.len()
            )));
        }
        let not_amt = self.not_vec(&oblv_shift_amt[..shift_bits])?;

        let mut shifted = inputs.to_vec();
        let mut shift_amount = 1;
        for i in 0..shift_bits {
            let prev = shifted.clone();
            let moved = self.shift(shift_amount, direction, shift_type, sign, &shifted)?;
            let set_case = self.bitmul_2i(&moved, oblv_shift_amt[i])?;
            let unset_case = self.bitmul_2i(&prev, not_amt[i])?;
            shifted = self.mixed_op_vec_2i(GateKind::Xor, &set_case, &unset_case)?;
            shift_amount *= 2;
        }
        Ok(shifted)
    }

    /// 最高置位检测
    ///
    /// 输出最高置位掩码、（可选）其索引的不经意二进制编码，以及
    /// 至少一位置位的标志。由 MSB 方向前缀 OR、LSB 方向逆前缀 XOR
    /// 和右移一位组合而成。
    pub fn msb(&mut self, return_val: MsbReturn, inputs: &[WireId]) -> Result<MsbOutputs> {
        let n = inputs.len();
        let mut pref1 = self.prefix(
            GateKind::Or,
            n - 1,
            0,
            n - 1,
            PrefixDir::FromMsb,
            PrefixDir::FromMsb,
            inputs,
        )?;
        let is_not_zero = pref1[0];
        let zero = self.fixed_zero()?;
        pref1.push(zero);
        let pref2 = self.inv_prefix_xor(0, n, 0, PrefixDir::FromLsb, PrefixDir::FromLsb, &pref1)?;
        let shifted = self.shift(1, ShiftDir::Right, ShiftType::Trunc, SignFill::Positive, &pref2)?;
        let mask = shifted[..n].to_vec();

        if return_val == MsbReturn::MaskOnly {
            return Ok(MsbOutputs {
                mask,
                index: None,
                is_not_zero,
            });
        }

        let l = 1 + lg_flr(n - 1);
        let mut index = self.set_const(l, 0)?;
        for (i, &mask_bit) in mask.iter().enumerate() {
            let repr = self.set_const(l, i as i64)?;
            let masked = self.bitmul_2i(&repr, mask_bit)?;
            index = self.mixed_op_vec_2i(GateKind::Xor, &masked, &index)?;
        }

        Ok(MsbOutputs {
            mask,
            index: Some(index),
            is_not_zero,
        })
    }

    /// 比较电路，按 `CmpType` 的三位编码处理全部六种关系
    ///
    /// EQ/NEQ 返回单条线；其余返回 `[所求关系, A ≠ B]` 两条线。
    /// 有符号模式下先翻转两操作数符号位再按无符号比较。
    pub fn cmp_2i(&mut self, comp_type: CmpType, input_a: &[WireId], input_b: &[WireId]) -> Result<Vec<WireId>> {
        if input_a.len() != input_b.len() || input_a.is_empty() {
            return Err(BioAuthError::Argument("operand length mismatch in cmp".to_string()));
        }
        let split = input_a.len();

        let toggling_sign = self.int_repr() == IntRepr::Signed;
        let (a_work, b_work) = if toggling_sign {
            (
                self.repr_sw(split, input_a)?,
                self.repr_sw(split, input_b)?,
            )
        } else {
            (input_a.to_vec(), input_b.to_vec())
        };

        let out_xor = self.mixed_op_vec_2i(GateKind::Xor, &a_work, &b_work)?;
        let mut pref1 = self.prefix(
            GateKind::Or,
            split - 1,
            0,
            split - 1,
            PrefixDir::FromMsb,
            PrefixDir::FromMsb,
            &out_xor,
        )?;
        let is_not_eq = pref1[0];

        if comp_type.testing_eq_only() {
            let out = if comp_type == CmpType::Eq {
                self.not_gate2(is_not_eq)?
            } else {
                is_not_eq
            };
            return Ok(vec![out]);
        }

        let zero = self.fixed_zero()?;
        pref1.push(zero);
        let pref2 = self.inv_prefix_xor(0, split, 0, PrefixDir::FromLsb, PrefixDir::FromLsb, &pref1)?;
        let shifted = self.shift(1, ShiftDir::Right, ShiftType::Trunc, SignFill::Positive, &pref2)?;
        let msb_mask = &shifted[..split];

        let branch_operand = if comp_type.branch() == 0 { &a_work } else { &b_work };
        let out_conj = self.mixed_op_vec_2i(GateKind::And, msb_mask, branch_operand)?;
        // XOR works in place of OR here because at most one bit of out_conj is set
        let pref3 = self.prefix(
            GateKind::Xor,
            split - 1,
            0,
            split - 1,
            PrefixDir::FromMsb,
            PrefixDir::FromMsb,
            &out_conj,
        )?;

        let requested = if comp_type.testing_strict() {
            pref3[0]
        } else {
            self.not_gate2(pref3[0])?
        };

        Ok(vec![requested, is_not_eq])
    }

    /// 一次比较加位选，同时产出 (min, max)
    pub fn minimax_2i(
        &mut self,
        input_a: &[WireId],
        input_b: &[WireId],
    ) -> Result<(Vec<WireId>, Vec<WireId>)> {
        let cmp = self.cmp_2i(CmpType::Les, input_a, input_b)?;
        let a_les_b = cmp[0];
        let a_geq_b = self.not_gate2(a_les_b)?;

        let min_case_1 = self.bitmul_2i(input_a, a_les_b)?;
        let min_case_2 = self.bitmul_2i(input_b, a_geq_b)?;
        let min = self.mixed_op_vec_2i(GateKind::Xor, &min_case_1, &min_case_2)?;

        let max_case_1 = self.bitmul_2i(input_b, a_les_b)?;
        let max_case_2 = self.bitmul_2i(input_a, a_geq_b)?;
        let max = self.mixed_op_vec_2i(GateKind::Xor, &max_case_1, &max_case_2)?;

        Ok((min, max))
    }

    /// n 位乘单比特：广播 AND
    pub fn bitmul_2i(&mut self, input_a: &[WireId], input_b: WireId) -> Result<Vec<WireId>> {
        let mut outputs = Vec::with_capacity(input_a.len());
        for &a in input_a {
            outputs.push(self.mixed_op_gate(GateKind::And, a, input_b)?);
        }
        Ok(outputs)
    }

    /// 乘法：两个等长操作数 → 双倍宽度积
    ///
    /// 输入别名（相同线向量）且无符号时分派到递归平方；有符号时
    /// 使用 Baugh-Wooley 布局。
    pub fn mul_2i(&mut self, input_a: &[WireId], input_b: &[WireId]) -> Result<Vec<WireId>> {
        if input_a == input_b && self.int_repr() == IntRepr::Unsigned {
            let stop = square_stop_for(input_a.len());
            return self.square_2r_g(input_a, stop);
        }
        self.mul_schoolbook(input_a, input_b)
    }

    fn mul_schoolbook(&mut self, input_a: &[WireId], input_b: &[WireId]) -> Result<Vec<WireId>> {
        if input_a.len() != input_b.len() || input_a.is_empty() {
            return Err(BioAuthError::Argument("operand length mismatch in mul".to_string()));
        }
        let split = input_a.len();
        let signed = self.int_repr() == IntRepr::Signed;
        let ext = signed as usize;
        let w = split + ext;

        let mut rows: Vec<Vec<WireId>> = Vec::with_capacity(split);
        for i in 0..split {
            rows.push(self.bitmul_2i(input_a, input_b[i])?);
        }

        if signed {
            // Baugh-Wooley: invert last column and last row except the diagonal
            // cell, then force two correction ones
            if split > 1 {
                for i in 0..split - 1 {
                    rows[i][split - 1] = self.not_gate2(rows[i][split - 1])?;
                    let v = self.not_gate2(rows[split - 1][i])?;
                    rows[split - 1][i] = v;
                }
            }
            for i in 0..split {
                let ext_bit = if i == 0 || i == split - 1 {
                    self.fixed_one()?
                } else {
                    self.fixed_zero()?
                };
                rows[i].push(ext_bit);
            }
        }

        let mut acc: Vec<WireId> = Vec::with_capacity(2 * w);
        acc.extend_from_slice(&rows[0]);
        for _ in 0..w {
            acc.push(self.fixed_zero()?);
        }

        for i in 1..split {
            let lo = acc[i..i + w].to_vec();
            let s = self.add_2i(&lo, &rows[i], CarryOut::Keep)?;
            for (j, &wire) in s.iter().enumerate() {
                acc[i + j] = wire;
            }
        }

        Ok(acc[..2 * split].to_vec())
    }

    /// 点积：逐对相乘（别名时走平方）后树形求和
    ///
    /// 输出宽度 2ℓ + ⌈lg k⌉。
    pub fn dotprod_2i(
        &mut self,
        input_length: usize,
        input_a: &[WireId],
        input_b: &[WireId],
    ) -> Result<Vec<WireId>> {
        if input_a.len() != input_b.len() || input_a.len() % input_length != 0 {
            return Err(BioAuthError::Argument("dotprod operand shape mismatch".to_string()));
        }
        let num_inputs = input_a.len() / input_length;
        let mut flat = Vec::with_capacity(num_inputs * 2 * input_length);
        for i in 0..num_inputs {
            let a_i = &input_a[i * input_length..(i + 1) * input_length];
            let b_i = &input_b[i * input_length..(i + 1) * input_length];
            let prod = self.mul_2i(a_i, b_i)?;
            flat.extend(prod);
        }
        self.sum(2 * input_length, &flat)
    }

    /// 递归平方：拆半后 `xL²`、`xH²` 递归，交叉项走普通乘法，最后
    /// 一次大加法重组。在 `stop` 或奇数拆分处停止递归
    pub fn square_2r_g(&mut self, inputs: &[WireId], stopping_split: usize) -> Result<Vec<WireId>> {
        let split = inputs.len();
        if split == 0 {
            return Err(BioAuthError::Argument("empty square operand".to_string()));
        }
        if split <= stopping_split || split % 2 != 0 {
            return self.mul_schoolbook(inputs, inputs);
        }

        let half = split / 2;
        let lo = &inputs[..half];
        let hi = &inputs[half..];

        let lo_sq = self.square_2r_g(lo, stopping_split)?;
        let hi_sq = self.square_2r_g(hi, stopping_split)?;
        let cross = self.mul_schoolbook(lo, hi)?;

        // x² = hi²·2^split + 2·lo·hi·2^half + lo²
        let mut a_op = lo_sq;
        a_op.extend(hi_sq);
        let mut b_op = Vec::with_capacity(2 * split);
        for _ in 0..half + 1 {
            b_op.push(self.fixed_zero()?);
        }
        b_op.extend(cross);
        while b_op.len() < 2 * split {
            b_op.push(self.fixed_zero()?);
        }

        self.add_2i(&a_op, &b_op, CarryOut::Discard)
    }

    /// Karatsuba 乘法：三次递归积加重组，仅在输入较宽时占优
    pub fn kmul(
        &mut self,
        input_a: &[WireId],
        input_b: &[WireId],
        stopping_split: usize,
    ) -> Result<Vec<WireId>> {
        if input_a.len() != input_b.len() || input_a.is_empty() {
            return Err(BioAuthError::Argument("operand length mismatch in kmul".to_string()));
        }
        let split = input_a.len();
        if split <= stopping_split || split % 2 != 0 {
            return self.mul_schoolbook(input_a, input_b);
        }

        let half = split / 2;
        let (a_lo, a_hi) = input_a.split_at(half);
        let (b_lo, b_hi) = input_b.split_at(half);

        let lo_prod = self.kmul(a_lo, b_lo, stopping_split)?;
        let hi_prod = self.kmul(a_hi, b_hi, stopping_split)?;

        let mid_a = self.add_2i(a_lo, a_hi, CarryOut::Keep)?;
        let mid_b = self.add_2i(b_lo, b_hi, CarryOut::Keep)?;
        let mid_prod = self.kmul(&mid_a, &mid_b, stopping_split)?;

        // M = (aL+aH)(bL+bH) − (aL·bL + aH·bH)
        let mut hilo_sum = self.add_2i(&lo_prod, &hi_prod, CarryOut::Keep)?;
        hilo_sum.push(self.fixed_zero()?);
        let m = self.sub3_2i(&mid_prod, &hilo_sum, CarryOut::Discard)?;

        // result = lo_prod + hi_prod·2^split + M·2^half
        let mut a_op = lo_prod;
        a_op.extend(hi_prod);
        let mut b_op = Vec::with_capacity(2 * split);
        for _ in 0..half {
            b_op.push(self.fixed_zero()?);
        }
        let keep = (2 * split - half).min(m.len());
        b_op.extend_from_slice(&m[..keep]);
        while b_op.len() < 2 * split {
            b_op.push(self.fixed_zero()?);
        }

        self.add_2i(&a_op, &b_op, CarryOut::Discard)
    }
}

/// 平方递归的默认停止拆分，对 8..=32 位输入接近 ⌊√n⌋ 最优
pub fn square_stop_for(split: usize) -> usize {
    split >> (1 + (lg_flr(split) >> 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garbling::{eval_plain, CircuitBuilder};
    use crate::utils::bits::{bit_vector_to_int, int_to_bit_vector};

    fn builder(n: usize) -> CircuitBuilder {
        CircuitBuilder::new(n, 1, 1 << 20, 1 << 22).unwrap()
    }

    /// run a two-operand op over plain evaluation
    fn run_binary<F>(width: usize, a: u64, b: u64, f: F) -> Vec<bool>
    where
        F: FnOnce(&mut CircuitBuilder, &[WireId], &[WireId]) -> Vec<WireId>,
    {
        let mut bld = CircuitBuilder::new(2 * width, 1, 1 << 20, 1 << 22).unwrap();
        let wires = bld.input_wires();
        let (wa, wb) = wires.split_at(width);
        let outs = f(&mut bld, wa, wb);
        let circuit = bld.finish_any(&outs).unwrap();
        let mut inputs = int_to_bit_vector(a, width);
        inputs.extend(int_to_bit_vector(b, width));
        eval_plain(&circuit, &inputs).unwrap()
    }

    #[test]
    fn test_add_with_and_without_carry() {
        for (a, b) in [(0u64, 0u64), (1, 1), (200, 100), (255, 255), (17, 4)] {
            let out = run_binary(8, a, b, |bld, wa, wb| {
                bld.add_2i(&wa, &wb, CarryOut::Keep).unwrap()
            });
            assert_eq!(out.len(), 9);
            assert_eq!(bit_vector_to_int(&out), a + b);

            let out = run_binary(8, a, b, |bld, wa, wb| {
                bld.add_2i(&wa, &wb, CarryOut::Discard).unwrap()
            });
            assert_eq!(out.len(), 8);
            assert_eq!(bit_vector_to_int(&out), (a + b) & 0xff);
        }
    }

    #[test]
    fn test_sub_both_variants() {
        for (a, b) in [(5u64, 3u64), (3, 5), (255, 1), (0, 0), (128, 127)] {
            let expected = a.wrapping_sub(b) & 0xff;
            let out = run_binary(8, a, b, |bld, wa, wb| {
                bld.sub_2i(&wa, &wb, CarryOut::Discard).unwrap()
            });
            assert_eq!(bit_vector_to_int(&out), expected, "sub {} - {}", a, b);

            let out = run_binary(8, a, b, |bld, wa, wb| {
                bld.sub3_2i(&wa, &wb, CarryOut::Keep).unwrap()
            });
            assert_eq!(bit_vector_to_int(&out[..8]), expected, "sub3 {} - {}", a, b);
            assert_eq!(out[8], a < b, "borrow of {} - {}", a, b);
        }
    }

    #[test]
    fn test_neg_round_trip() {
        for a in [0u64, 1, 5, 127, 128, 255] {
            let out = run_binary(8, a, 0, |bld, wa, _| {
                let n1 = bld.neg(&wa).unwrap();
                bld.neg(&n1).unwrap()
            });
            assert_eq!(bit_vector_to_int(&out), a);
        }
    }

    #[test]
    fn test_inc_dec() {
        let out = run_binary(8, 255, 0, |bld, wa, _| bld.inc(&wa, CarryOut::Keep).unwrap());
        assert_eq!(bit_vector_to_int(&out), 256);
        let out = run_binary(8, 0, 0, |bld, wa, _| bld.dec(&wa, CarryOut::Discard).unwrap());
        assert_eq!(bit_vector_to_int(&out), 255);
    }

    #[test]
    fn test_mul_unsigned() {
        for (a, b) in [(0u64, 0u64), (1, 1), (15, 15), (12, 10), (255, 255), (17, 3)] {
            let out = run_binary(8, a, b, |bld, wa, wb| bld.mul_2i(&wa, &wb).unwrap());
            assert_eq!(out.len(), 16);
            assert_eq!(bit_vector_to_int(&out), a * b, "{} * {}", a, b);
        }
    }

    #[test]
    fn test_mul_signed_baugh_wooley() {
        // exercises sign handling without sign extension
        let cases: [(i64, i64); 7] = [(-8, -8), (-8, 7), (7, -8), (-1, -1), (-1, 1), (3, -2), (0, -5)];
        for (a, b) in cases {
            let an = (a as u64) & 0xf;
            let bn = (b as u64) & 0xf;
            let out = run_binary(4, an, bn, |bld, wa, wb| {
                bld.set_int_repr(IntRepr::Signed);
                let r = bld.mul_2i(&wa, &wb).unwrap();
                bld.set_int_repr(IntRepr::Unsigned);
                r
            });
            let expected = ((a * b) as u64) & 0xff;
            assert_eq!(bit_vector_to_int(&out), expected, "{} * {}", a, b);
        }
    }

    #[test]
    fn test_square_matches_mul() {
        for a in [0u64, 1, 3, 77, 255, 100] {
            let out = run_binary(8, a, a, |bld, wa, _| {
                bld.square_2r_g(&wa, square_stop_for(8)).unwrap()
            });
            assert_eq!(bit_vector_to_int(&out), a * a, "{}^2", a);
        }
    }

    #[test]
    fn test_square_wide_input() {
        // 24-bit squaring is the float-mantissa path
        for a in [0u64, 1, (1 << 23) + 12345, (1 << 24) - 1] {
            let out = run_binary(24, a, a, |bld, wa, _| {
                bld.square_2r_g(&wa, square_stop_for(24)).unwrap()
            });
            assert_eq!(bit_vector_to_int(&out), a * a, "{}^2", a);
        }
    }

    #[test]
    fn test_kmul_matches_schoolbook() {
        for (a, b) in [(0u64, 0u64), (65535, 65535), (40000, 3), (12345, 54321)] {
            let out = run_binary(16, a, b, |bld, wa, wb| bld.kmul(&wa, &wb, 4).unwrap());
            assert_eq!(bit_vector_to_int(&out), a * b, "kmul {} * {}", a, b);
        }
    }

    #[test]
    fn test_cmp_all_types_unsigned() {
        let pairs = [(3u64, 5u64), (5, 3), (7, 7), (0, 255), (255, 0)];
        for (a, b) in pairs {
            for (cmp, expected) in [
                (CmpType::Leq, a <= b),
                (CmpType::Geq, a >= b),
                (CmpType::Grt, a > b),
                (CmpType::Les, a < b),
                (CmpType::Eq, a == b),
                (CmpType::Neq, a != b),
            ] {
                let out = run_binary(8, a, b, |bld, wa, wb| bld.cmp_2i(cmp, &wa, &wb).unwrap());
                assert_eq!(out[0], expected, "{} {:?} {}", a, cmp, b);
                if !cmp.testing_eq_only() {
                    assert_eq!(out[1], a != b, "neq side output for {} {:?} {}", a, cmp, b);
                }
            }
        }
    }

    #[test]
    fn test_cmp_signed() {
        let pairs: [(i64, i64); 5] = [(-1, 0), (0, -1), (-128, 127), (-5, -3), (-3, -3)];
        for (a, b) in pairs {
            let an = (a as u64) & 0xff;
            let bn = (b as u64) & 0xff;
            for (cmp, expected) in [
                (CmpType::Les, a < b),
                (CmpType::Geq, a >= b),
                (CmpType::Eq, a == b),
            ] {
                let out = run_binary(8, an, bn, |bld, wa, wb| {
                    bld.set_int_repr(IntRepr::Signed);
                    let r = bld.cmp_2i(cmp, &wa, &wb).unwrap();
                    bld.set_int_repr(IntRepr::Unsigned);
                    r
                });
                assert_eq!(out[0], expected, "{} {:?} {}", a, cmp, b);
            }
        }
    }

    #[test]
    fn test_cmp_equal_wires_folds_to_constant() {
        let mut bld = builder(8);
        let wires = bld.input_wires();
        let before = bld.gate_count();
        let out = bld.cmp_2i(CmpType::Eq, &wires, &wires).unwrap();
        assert!(bld.is_fixed_one(out[0]));
        assert_eq!(bld.gate_count(), before);
    }

    #[test]
    fn test_minimax() {
        for (a, b) in [(3u64, 9u64), (9, 3), (4, 4), (0, 255)] {
            let out = run_binary(8, a, b, |bld, wa, wb| {
                let (min, max) = bld.minimax_2i(&wa, &wb).unwrap();
                let mut v = min;
                v.extend(max);
                v
            });
            assert_eq!(bit_vector_to_int(&out[..8]), a.min(b));
            assert_eq!(bit_vector_to_int(&out[8..]), a.max(b));
        }
    }

    #[test]
    fn test_shift_directions() {
        let out = run_binary(8, 0b10110, 0, |bld, wa, _| {
            bld.shift(2, ShiftDir::Left, ShiftType::Trunc, SignFill::Positive, &wa)
                .unwrap()
        });
        assert_eq!(bit_vector_to_int(&out), 0b1011000);

        let out = run_binary(8, 0b10110, 0, |bld, wa, _| {
            bld.shift(2, ShiftDir::Right, ShiftType::Trunc, SignFill::Positive, &wa)
                .unwrap()
        });
        assert_eq!(bit_vector_to_int(&out), 0b101);

        let out = run_binary(8, 0x81, 0, |bld, wa, _| {
            bld.shift(1, ShiftDir::Right, ShiftType::Circular, SignFill::Positive, &wa)
                .unwrap()
        });
        assert_eq!(bit_vector_to_int(&out), 0xc0);

        let out = run_binary(8, 0x80, 0, |bld, wa, _| {
            bld.shift(1, ShiftDir::Right, ShiftType::Trunc, SignFill::Negative, &wa)
                .unwrap()
        });
        assert_eq!(bit_vector_to_int(&out), 0xc0);
    }

    #[test]
    fn test_oblv_shift_matches_static_shift() {
        for amount in 0..8u64 {
            let out = run_binary(8, 0b1101, amount, |bld, wa, wb| {
                bld.oblv_shift(
                    ShiftDir::Left,
                    ShiftType::Trunc,
                    SignFill::Positive,
                    7,
                    &wb,
                    &wa,
                )
                .unwrap()
            });
            assert_eq!(
                bit_vector_to_int(&out),
                (0b1101u64 << amount) & 0xff,
                "left shift by {}",
                amount
            );
        }
    }

    #[test]
    fn test_msb_mask_index_and_zero_flag() {
        for a in [0u64, 1, 0b100, 0b10110101, 0x80] {
            let out = run_binary(8, a, 0, |bld, wa, _| {
                let m = bld.msb(MsbReturn::MaskAndIndex, &wa).unwrap();
                let mut v = m.mask;
                v.extend(m.index.unwrap());
                v.push(m.is_not_zero);
                v
            });
            let mask = bit_vector_to_int(&out[..8]);
            let index = bit_vector_to_int(&out[8..11]);
            let nonzero = out[11];
            if a == 0 {
                assert_eq!(mask, 0);
                assert!(!nonzero);
            } else {
                let msb = 63 - a.leading_zeros() as u64;
                assert_eq!(mask, 1 << msb, "mask of {:#b}", a);
                assert_eq!(index, msb, "index of {:#b}", a);
                assert!(nonzero);
            }
        }
    }

    #[test]
    fn test_sum_boundaries() {
        // SUM of k zeros is zero; SUM of k maximal values is k*(2^l - 1)
        let k = 5;
        let l = 4;
        let width = l + 1 + lg_flr(k - 1);
        for val in [0u64, 15] {
            let mut bld = CircuitBuilder::new(k * l, 1, 1 << 20, 1 << 22).unwrap();
            let wires = bld.input_wires();
            let outs = bld.sum(l, &wires).unwrap();
            assert_eq!(outs.len(), width);
            let circuit = bld.finish_any(&outs).unwrap();
            let mut inputs = Vec::new();
            for _ in 0..k {
                inputs.extend(int_to_bit_vector(val, l));
            }
            let result = eval_plain(&circuit, &inputs).unwrap();
            assert_eq!(bit_vector_to_int(&result), k as u64 * val);
        }
    }

    #[test]
    fn test_countbits() {
        for (n, val) in [(8usize, 0b10110101u64), (8, 0), (8, 0xff), (64, u64::MAX), (64, 0x8000000000000001)] {
            let mut bld = CircuitBuilder::new(n, 1, 1 << 20, 1 << 22).unwrap();
            let wires = bld.input_wires();
            let outs = bld.countbits(&wires).unwrap();
            let circuit = bld.finish_any(&outs).unwrap();
            let inputs = int_to_bit_vector(val, n);
            let result = eval_plain(&circuit, &inputs).unwrap();
            assert_eq!(
                bit_vector_to_int(&result),
                val.count_ones() as u64,
                "countbits of {:#x}",
                val
            );
        }
    }

    #[test]
    fn test_prefix_xor_inverse_law() {
        // inv_prefix_xor then prefix-xor is the identity
        for val in [0b1011u64, 0b1111, 0, 0b1000] {
            let out = run_binary(4, val, 0, |bld, wa, _| {
                let inv = bld
                    .inv_prefix_xor(0, 3, 0, PrefixDir::FromLsb, PrefixDir::FromLsb, &wa)
                    .unwrap();
                bld.prefix(
                    GateKind::Xor,
                    0,
                    3,
                    0,
                    PrefixDir::FromLsb,
                    PrefixDir::FromLsb,
                    &inv,
                )
                .unwrap()
            });
            assert_eq!(bit_vector_to_int(&out), val, "round trip of {:#b}", val);
        }
    }

    #[test]
    fn test_dotprod() {
        // <a, b> for 3 components of 4 bits
        let a = [3u64, 7, 15];
        let b = [2u64, 5, 15];
        let expected: u64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();

        let mut bld = CircuitBuilder::new(24, 1, 1 << 20, 1 << 22).unwrap();
        let wires = bld.input_wires();
        let (wa, wb) = wires.split_at(12);
        let outs = bld.dotprod_2i(4, wa, wb).unwrap();
        let circuit = bld.finish_any(&outs).unwrap();

        let mut inputs = Vec::new();
        for &x in &a {
            inputs.extend(int_to_bit_vector(x, 4));
        }
        for &x in &b {
            inputs.extend(int_to_bit_vector(x, 4));
        }
        let result = eval_plain(&circuit, &inputs).unwrap();
        assert_eq!(bit_vector_to_int(&result), expected);
    }

    #[test]
    fn test_set_const_signed_toggles_msb() {
        let mut bld = builder(1);
        let c = bld.set_const(4, 5).unwrap();
        assert!(bld.is_fixed_one(c[0]));
        assert!(bld.is_fixed_zero(c[1]));
        assert!(bld.is_fixed_one(c[2]));
        assert!(bld.is_fixed_zero(c[3]));

        bld.set_int_repr(IntRepr::Signed);
        let c = bld.set_const(4, 5).unwrap();
        assert!(bld.is_fixed_one(c[3])); // msb toggled under signed
    }
}
