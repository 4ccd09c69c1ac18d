//! # IEEE-754 单精度浮点电路库 (Single-Precision Float Circuit Library)
//!
//! 浮点值在电路中占 36 条线：
//!
//! - `[0..23)` 尾数（23 位，隐含前导 1 不存储）
//! - `[23]` 尾数为零标志
//! - `[24..32)` 带 127 偏置的指数（8 位）
//! - `[32]` 指数为零标志，`[33]` 指数全一标志，`[34]` 整体为零标志
//! - `[35]` 符号
//!
//! 三个标志位是冗余副本，由每个浮点操作维护，下游操作无需重算。
//! 每个操作入口把构建器的整数表示切换为无符号并在出口恢复；操作
//! 末尾的零检查把非规格化结果折叠为规范零。
//!
//! 变宽求和（`float_sum`）内部使用带 Δ 个溢出位的加宽尾数束，仅在
//! 树归约结束后做一次规格化。

use super::{
    lg_flr, BiasTask, CarryOut, CmpType, InfinityMode, MsbReturn, ShiftDir, ShiftType, SignFill,
};
use crate::garbling::{CircuitBuilder, GateKind, IntRepr, WireId};
use crate::{BioAuthError, Result};

/// 浮点线束内的位置
pub const MANTISSA: usize = 0;
pub const MANT_ZERO_FLAG: usize = 23;
pub const EXPONENT: usize = 24;
pub const EXP_ZERO_FLAG: usize = 32;
pub const EXP_SPEC_FLAG: usize = 33;
pub const ZERO_FLAG: usize = 34;
pub const SIGN: usize = 35;

/// 浮点线束总宽
pub const SINGLE_LENGTH: usize = SIGN + 1;

/// 原始 32 位 IEEE 输入内的位置
pub const RAW_MANTISSA: usize = 0;
pub const RAW_EXPONENT: usize = 23;
pub const RAW_SIGN: usize = 31;

/// 加宽尾数的浮点束，`float_sum` 的树归约中间形式
#[derive(Debug, Clone)]
struct VarFloat {
    mantissa: Vec<WireId>,
    exponent: Vec<WireId>,
    sign: WireId,
    exp_zero: WireId,
    exp_spec: WireId,
    mant_zero: WireId,
    zero: WireId,
}

fn check_single(inputs: &[WireId]) -> Result<()> {
    if inputs.len() != SINGLE_LENGTH {
        return Err(BioAuthError::Argument(format!(
            "float bundle has {} wires, expected {}",
            inputs.len(),
            SINGLE_LENGTH
        )));
    }
    Ok(())
}

impl CircuitBuilder {
    /// 指数加/去偏置（±127）
    pub fn float_exp_bias(&mut self, task: BiasTask, inputs: &[WireId]) -> Result<Vec<WireId>> {
        check_single(inputs)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let bias = match task {
            BiasTask::Add => 127,
            BiasTask::Remove => -127,
        };
        let bias_bits = self.set_const(8, bias)?;
        let new_exp = self.add_2i(&bias_bits, &inputs[EXPONENT..EXPONENT + 8], CarryOut::Discard)?;

        let mut outputs = inputs.to_vec();
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&new_exp);

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 从 32 位原始 IEEE 输入装配浮点线束并计算三个标志位
    pub fn set_raw_float(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        if inputs.len() != 32 {
            return Err(BioAuthError::Argument(format!(
                "raw float has {} wires, expected 32",
                inputs.len()
            )));
        }
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let zero23 = self.set_const(23, 0)?;
        let zero8 = self.set_const(8, 0)?;
        let ones8 = self.set_const(8, -1)?;

        let mant = &inputs[RAW_MANTISSA..RAW_MANTISSA + 23];
        let exp = &inputs[RAW_EXPONENT..RAW_EXPONENT + 8];

        let mant_zero = self.cmp_2i(CmpType::Eq, mant, &zero23)?[0];
        let exp_zero = self.cmp_2i(CmpType::Eq, exp, &zero8)?[0];
        let exp_spec = self.cmp_2i(CmpType::Eq, exp, &ones8)?[0];
        let zero = self.mixed_op_gate(GateKind::And, exp_zero, mant_zero)?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(mant);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(exp);
        outputs[SIGN] = inputs[RAW_SIGN];
        outputs[MANT_ZERO_FLAG] = mant_zero;
        outputs[EXP_ZERO_FLAG] = exp_zero;
        outputs[EXP_SPEC_FLAG] = exp_spec;
        outputs[ZERO_FLAG] = zero;

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 由编译期部件装配浮点常量；`exponent == -1` 表示全一指数
    pub fn set_const_float(
        &mut self,
        mantissa: i64,
        exponent: i64,
        sign: i64,
    ) -> Result<Vec<WireId>> {
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let mant = self.set_const(23, mantissa)?;
        let exp = self.set_const(8, exponent)?;
        let sgn = self.set_const(1, sign)?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(&mant);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exp);
        outputs[SIGN] = sgn[0];
        outputs[EXP_ZERO_FLAG] = if exponent == 0 {
            self.fixed_one()?
        } else {
            self.fixed_zero()?
        };
        outputs[EXP_SPEC_FLAG] = if exponent == -1 || exponent == 0xff {
            self.fixed_one()?
        } else {
            self.fixed_zero()?
        };
        outputs[MANT_ZERO_FLAG] = if mantissa == 0 {
            self.fixed_one()?
        } else {
            self.fixed_zero()?
        };
        outputs[ZERO_FLAG] = if mantissa == 0 && exponent == 0 {
            self.fixed_one()?
        } else {
            self.fixed_zero()?
        };

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 由 f32 常量装配浮点线束
    pub fn set_const_float_cast(&mut self, value: f32) -> Result<Vec<WireId>> {
        let bits = value.to_bits();
        let mantissa = (bits & 0x7f_ffff) as i64;
        let exponent = ((bits >> 23) & 0xff) as i64;
        let sign = (bits >> 31) as i64;
        let exponent = if exponent == 0xff { -1 } else { exponent };
        self.set_const_float(mantissa, exponent, sign)
    }

    /// 规范 NaN 常量
    pub fn float_nan(&mut self) -> Result<Vec<WireId>> {
        self.set_const_float(1, -1, 0)
    }

    /// 规范零常量
    pub fn float_zero(&mut self) -> Result<Vec<WireId>> {
        self.set_const_float(0, 0, 0)
    }

    /// 重排为 32 位原始 IEEE 位（丢弃标志位）
    pub fn float_to_raw_bits(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        check_single(inputs)?;
        let mut outputs = Vec::with_capacity(32);
        outputs.extend_from_slice(&inputs[MANTISSA..MANTISSA + 23]);
        outputs.extend_from_slice(&inputs[EXPONENT..EXPONENT + 8]);
        outputs.push(inputs[SIGN]);
        Ok(outputs)
    }

    /// 整数到浮点的转换
    ///
    /// 取最高 23 位（不足补零），MSB 检测给出隐含一的位置与指数；
    /// 有符号输入在符号位下条件取负。`n > 128` 返回 NaN。
    pub fn int_to_float(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        let n = inputs.len();
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        if n == 0 || n > 128 {
            let nan = self.float_nan()?;
            self.set_int_repr(saved);
            return Ok(nan);
        }

        let k = n.min(23);

        // top k bits of the input, zero-padded to the 23-bit window
        let mut shifted: Vec<WireId> = inputs[n - k..].to_vec();
        while shifted.len() < 23 {
            shifted.push(self.fixed_zero()?);
        }

        let msb_out = self.msb(MsbReturn::MaskAndIndex, &shifted[..k].to_vec())?;
        let nonzero_mant = msb_out.is_not_zero;
        let mut oblv_index = msb_out.index.unwrap();
        while oblv_index.len() < 8 {
            oblv_index.push(self.fixed_zero()?);
        }

        let mut exponent = oblv_index.clone();
        if n > k {
            let offset = self.set_const(8, (n - k) as i64)?;
            exponent = self.add_2i(&offset, &exponent, CarryOut::Discard)?;
        }

        if k < 23 {
            shifted = self.shift(
                23 - k,
                ShiftDir::Left,
                ShiftType::Trunc,
                SignFill::Positive,
                &shifted,
            )?;
        }

        let sign = if saved == IntRepr::Signed {
            let sign = inputs[n - 1];
            let pos = self.not_gate2(sign)?;
            let negative = self.neg(&shifted)?;
            let pos_case = self.bitmul_2i(&shifted, pos)?;
            let neg_case = self.bitmul_2i(&negative, sign)?;
            shifted = self.mixed_op_vec_2i(GateKind::Xor, &pos_case, &neg_case)?;
            sign
        } else {
            self.fixed_zero()?
        };

        // shift left so the leading one falls just off the 23-bit window,
        // leaving the fraction bits aligned beneath it
        let offset_bits = self.set_const(8, k as i64)?;
        let shift_amt = self.sub_2i(&offset_bits, &oblv_index, CarryOut::Discard)?;
        let mantissa = self.oblv_shift(
            ShiftDir::Left,
            ShiftType::Trunc,
            SignFill::Positive,
            k,
            &shift_amt,
            &shifted,
        )?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(&mantissa[..23]);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exponent);
        outputs[SIGN] = sign;
        outputs[MANT_ZERO_FLAG] = self.not_gate2(nonzero_mant)?;
        outputs[EXP_ZERO_FLAG] = outputs[MANT_ZERO_FLAG];
        outputs[EXP_SPEC_FLAG] = self.fixed_zero()?;
        outputs[ZERO_FLAG] = outputs[MANT_ZERO_FLAG];

        let outputs = self.float_exp_bias(BiasTask::Add, &outputs)?;
        let biased = self.bitmul_2i(&outputs[EXPONENT..EXPONENT + 8], nonzero_mant)?;
        let mut outputs = outputs;
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&biased);

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 零检查：尾数为零时折叠为规范零并重建标志位
    ///
    /// 只应在对尾数做过原语运算后调用；对已检查的值重复调用会破坏
    /// 非零指数、零尾数的组合。
    pub fn float_check_zero(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        check_single(inputs)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let zero23 = self.set_const(23, 0)?;
        let nonzero_mant = self.cmp_2i(CmpType::Neq, &inputs[MANTISSA..MANTISSA + 23], &zero23)?[0];
        let exponent = self.bitmul_2i(&inputs[EXPONENT..EXPONENT + 8], nonzero_mant)?;

        let mut outputs = inputs.to_vec();
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exponent);
        outputs[MANT_ZERO_FLAG] = self.not_gate2(nonzero_mant)?;
        outputs[EXP_ZERO_FLAG] = outputs[MANT_ZERO_FLAG];
        outputs[EXP_SPEC_FLAG] = inputs[EXP_SPEC_FLAG];
        outputs[ZERO_FLAG] = outputs[EXP_ZERO_FLAG];

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 特殊值检查：输出 (NaN·至少一个特殊输入, 两输入均正常)
    ///
    /// 第一个返回值在两输入均正常时为全零向量，约定与正常路径结果
    /// 按位 XOR 合并。`InftyNeqNan` 模式未被支持。
    pub fn float_check_special_2i(
        &mut self,
        infinity_mode: InfinityMode,
        input_a: &[WireId],
        input_b: &[WireId],
    ) -> Result<(Vec<WireId>, WireId)> {
        if infinity_mode == InfinityMode::InftyNeqNan {
            return Err(BioAuthError::UnsupportedMode(
                "INFTY_NEQ_NAN special-value handling".to_string(),
            ));
        }
        check_single(input_a)?;
        check_single(input_b)?;

        let at_least_one = self.mixed_op_gate(
            GateKind::Or,
            input_a[EXP_SPEC_FLAG],
            input_b[EXP_SPEC_FLAG],
        )?;
        let neither = self.not_gate2(at_least_one)?;
        let nan = self.float_nan()?;
        let masked = self.bitmul_2i(&nan, at_least_one)?;
        Ok((masked, neither))
    }

    /// 批量特殊值检查（`float_sum` 的前置）
    pub fn float_check_special_batch(
        &mut self,
        infinity_mode: InfinityMode,
        inputs: &[WireId],
    ) -> Result<(Vec<WireId>, WireId)> {
        if infinity_mode == InfinityMode::InftyNeqNan {
            return Err(BioAuthError::UnsupportedMode(
                "INFTY_NEQ_NAN special-value handling".to_string(),
            ));
        }
        let num_inputs = inputs.len() / SINGLE_LENGTH;
        let mut at_least_one = inputs[EXP_SPEC_FLAG];
        for i in 1..num_inputs {
            at_least_one = self.mixed_op_gate(
                GateKind::Or,
                at_least_one,
                inputs[i * SINGLE_LENGTH + EXP_SPEC_FLAG],
            )?;
        }
        let neither = self.not_gate2(at_least_one)?;
        let nan = self.float_nan()?;
        let masked = self.bitmul_2i(&nan, at_least_one)?;
        Ok((masked, neither))
    }

    /// 取负：翻转符号位
    pub fn float_neg(&mut self, input_a: &[WireId]) -> Result<Vec<WireId>> {
        check_single(input_a)?;
        let mut outputs = input_a.to_vec();
        outputs[SIGN] = self.not_gate2(input_a[SIGN])?;
        Ok(outputs)
    }

    /// 加宽尾数束上的一次加法，不做中间规格化（`float_sum` 的内核）
    ///
    /// 情况多路选择：双侧过移时传递较大者；同号求和；异号以较大
    /// 数量级为被减数。数量级比较无条件求值以保持统一深度。
    fn float_add_raw(&mut self, a: &VarFloat, b: &VarFloat) -> Result<VarFloat> {
        let ms = a.mantissa.len();

        let diff_ab = self.sub_2i(&a.exponent, &b.exponent, CarryOut::Discard)?;
        let diff_ba = self.neg(&diff_ab)?;

        let geq_out = self.cmp_2i(CmpType::Geq, &a.exponent, &b.exponent)?;
        let a_geq_b = geq_out[0];
        let exp_neq = geq_out[1];
        let a_les_b = self.not_gate2(a_geq_b)?;
        let exp_eq = self.not_gate2(exp_neq)?;

        let mixed_sign = self.mixed_op_gate(GateKind::Xor, a.sign, b.sign)?;
        let same_sign = self.not_gate2(mixed_sign)?;

        let case_ab = self.bitmul_2i(&diff_ab, a_geq_b)?;
        let case_ba = self.bitmul_2i(&diff_ba, a_les_b)?;
        let abs_diff = self.mixed_op_vec_2i(GateKind::Xor, &case_ab, &case_ba)?;

        let max_shift_bits = self.set_const(8, ms as i64)?;
        let overshift = self.cmp_2i(CmpType::Geq, &abs_diff, &max_shift_bits)?[0];
        let no_overshift = self.not_gate2(overshift)?;

        // output exponent is the max of the two
        let exp_case_a = self.bitmul_2i(&a.exponent, a_geq_b)?;
        let exp_case_b = self.bitmul_2i(&b.exponent, a_les_b)?;
        let out_exponent = self.mixed_op_vec_2i(GateKind::Xor, &exp_case_a, &exp_case_b)?;

        let shr_mant_b = self.oblv_shift(
            ShiftDir::Right,
            ShiftType::Trunc,
            SignFill::Positive,
            ms - 1,
            &abs_diff,
            &b.mantissa,
        )?;
        let shr_mant_a = self.oblv_shift(
            ShiftDir::Right,
            ShiftType::Trunc,
            SignFill::Positive,
            ms - 1,
            &abs_diff,
            &a.mantissa,
        )?;

        let a_plus_shrb = self.add_2i(&a.mantissa, &shr_mant_b, CarryOut::Discard)?;
        let b_plus_shra = self.add_2i(&b.mantissa, &shr_mant_a, CarryOut::Discard)?;
        let a_minus_shrb = self.sub_2i(&a.mantissa, &shr_mant_b, CarryOut::Discard)?;
        let b_minus_shra = self.sub_2i(&b.mantissa, &shr_mant_a, CarryOut::Discard)?;

        // magnitude compare is only decisive when the exponents are equal,
        // but is evaluated unconditionally for uniform depth
        let mant_a_grt_b = self.cmp_2i(CmpType::Grt, &a.mantissa, &b.mantissa)?[0];

        // case: overshift passes the larger operand through
        let big_case_a = self.bitmul_2i(&a.mantissa, a_geq_b)?;
        let big_case_b = self.bitmul_2i(&b.mantissa, a_les_b)?;
        let bigger_mant = self.mixed_op_vec_2i(GateKind::Xor, &big_case_a, &big_case_b)?;
        let mut candidate = self.bitmul_2i(&bigger_mant, overshift)?;

        // case: same sign
        let cond_1 = self.mixed_op_gate(GateKind::And, a_geq_b, same_sign)?;
        let cond_1 = self.mixed_op_gate(GateKind::And, cond_1, no_overshift)?;
        let cond_2 = self.mixed_op_gate(GateKind::And, a_les_b, same_sign)?;
        let cond_2 = self.mixed_op_gate(GateKind::And, cond_2, no_overshift)?;
        let case_1 = self.bitmul_2i(&a_plus_shrb, cond_1)?;
        let case_2 = self.bitmul_2i(&b_plus_shra, cond_2)?;
        candidate = self.mixed_op_vec_2i(GateKind::Xor, &candidate, &case_1)?;
        candidate = self.mixed_op_vec_2i(GateKind::Xor, &candidate, &case_2)?;

        // case: mixed sign, minuend is the larger magnitude
        let strict_exp_a = self.mixed_op_gate(GateKind::And, a_geq_b, exp_neq)?;
        let eq_and_mant = self.mixed_op_gate(GateKind::And, exp_eq, mant_a_grt_b)?;
        let a_is_minuend = self.mixed_op_gate(GateKind::Or, strict_exp_a, eq_and_mant)?;
        let b_is_minuend = self.not_gate2(a_is_minuend)?;

        let mixed_live = self.mixed_op_gate(GateKind::And, mixed_sign, no_overshift)?;
        let cond_3 = self.mixed_op_gate(GateKind::And, mixed_live, a_is_minuend)?;
        let cond_4 = self.mixed_op_gate(GateKind::And, mixed_live, b_is_minuend)?;
        let case_3 = self.bitmul_2i(&a_minus_shrb, cond_3)?;
        let case_4 = self.bitmul_2i(&b_minus_shra, cond_4)?;
        candidate = self.mixed_op_vec_2i(GateKind::Xor, &candidate, &case_3)?;
        candidate = self.mixed_op_vec_2i(GateKind::Xor, &candidate, &case_4)?;

        // sign follows the same branch selection
        let sign_same = self.mixed_op_gate(GateKind::And, same_sign, b.sign)?;
        let big_sign_a = self.mixed_op_gate(GateKind::And, a_geq_b, a.sign)?;
        let big_sign_b = self.mixed_op_gate(GateKind::And, a_les_b, b.sign)?;
        let bigger_sign = self.mixed_op_gate(GateKind::Xor, big_sign_a, big_sign_b)?;
        let minuend_sign_a = self.mixed_op_gate(GateKind::And, a_is_minuend, a.sign)?;
        let minuend_sign_b = self.mixed_op_gate(GateKind::And, b_is_minuend, b.sign)?;
        let minuend_sign = self.mixed_op_gate(GateKind::Xor, minuend_sign_a, minuend_sign_b)?;

        let mixed_over = self.mixed_op_gate(GateKind::And, mixed_sign, overshift)?;
        let sign_over = self.mixed_op_gate(GateKind::And, mixed_over, bigger_sign)?;
        let sign_mixed = self.mixed_op_gate(GateKind::And, mixed_live, minuend_sign)?;
        let out_sign = self.mixed_op_gate(GateKind::Xor, sign_same, sign_over)?;
        let out_sign = self.mixed_op_gate(GateKind::Xor, out_sign, sign_mixed)?;

        // flag slots are placeholders until the final zero check
        let exp_spec = self.fixed_zero()?;
        Ok(VarFloat {
            mantissa: candidate,
            exponent: out_exponent,
            sign: out_sign,
            exp_zero: a.exp_zero,
            exp_spec,
            mant_zero: a.mant_zero,
            zero: a.zero,
        })
    }

    /// 浮点向量求和：加宽尾数树归约加单次末端规格化
    ///
    /// 输入为 k 个依次排列的 36 线浮点束；Δ = 1 + ⌊lg(k−1)⌋ 个溢出位。
    pub fn float_sum(&mut self, inputs: &[WireId]) -> Result<Vec<WireId>> {
        if inputs.len() % SINGLE_LENGTH != 0 || inputs.is_empty() {
            return Err(BioAuthError::Argument(
                "float sum input is not a whole number of bundles".to_string(),
            ));
        }
        let num_inputs = inputs.len() / SINGLE_LENGTH;
        if num_inputs < 2 {
            return Ok(inputs.to_vec());
        }

        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let num_overflow_bits = 1 + lg_flr(num_inputs - 1);

        let (special_outputs, inputs_are_normal) =
            self.float_check_special_batch(InfinityMode::InftyEqNan, inputs)?;

        let mut items: Vec<VarFloat> = Vec::with_capacity(num_inputs);
        for i in 0..num_inputs {
            let f = &inputs[i * SINGLE_LENGTH..(i + 1) * SINGLE_LENGTH];
            let mut mantissa = f[MANTISSA..MANTISSA + 23].to_vec();
            // reconstruct the hidden leading one, then the overflow headroom
            mantissa.push(self.not_gate2(f[EXP_ZERO_FLAG])?);
            for _ in 0..num_overflow_bits {
                mantissa.push(self.fixed_zero()?);
            }
            items.push(VarFloat {
                mantissa,
                exponent: f[EXPONENT..EXPONENT + 8].to_vec(),
                sign: f[SIGN],
                exp_zero: f[EXP_ZERO_FLAG],
                exp_spec: f[EXP_SPEC_FLAG],
                mant_zero: f[MANT_ZERO_FLAG],
                zero: f[ZERO_FLAG],
            });
        }

        while items.len() > 1 {
            if items.len() % 2 == 1 {
                let last = items.pop().unwrap();
                items[0] = {
                    let first = items[0].clone();
                    self.float_add_raw(&first, &last)?
                };
            }
            let mut next = Vec::with_capacity(items.len() / 2);
            for pair in items.chunks(2) {
                next.push(self.float_add_raw(&pair[0], &pair[1])?);
            }
            items = next;
        }
        let v = items.remove(0);

        // single final normalization over the overflow block
        let overflow_block = v.mantissa[24..24 + num_overflow_bits].to_vec();
        let msb_out = self.msb(MsbReturn::MaskAndIndex, &overflow_block)?;
        let overflow = msb_out.is_not_zero;
        let index = msb_out.index.unwrap();

        // top set bit at block offset j sits at mantissa bit 24+j, so the
        // normalizing shift is j+1 (and zero when no overflow bit is set)
        let mut shift_amt = self.bitadd_2i(&index, overflow, CarryOut::Keep)?;
        let shift_bits_needed = 1 + lg_flr(num_overflow_bits);
        while shift_amt.len() < shift_bits_needed {
            shift_amt.push(self.fixed_zero()?);
        }
        let shifted = self.oblv_shift(
            ShiftDir::Right,
            ShiftType::Trunc,
            SignFill::Positive,
            num_overflow_bits,
            &shift_amt,
            &v.mantissa,
        )?;

        let mut amt8 = shift_amt.clone();
        while amt8.len() < 8 {
            amt8.push(self.fixed_zero()?);
        }
        let exp9 = self.add_2i(&v.exponent, &amt8[..8].to_vec(), CarryOut::Keep)?;
        let exp_overflow = exp9[8];
        let no_exp_overflow = self.not_gate2(exp_overflow)?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(&shifted[..23]);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exp9[..8]);
        outputs[SIGN] = v.sign;
        outputs[EXP_ZERO_FLAG] = v.exp_zero;
        outputs[MANT_ZERO_FLAG] = v.mant_zero;
        outputs[EXP_SPEC_FLAG] = v.exp_spec;
        outputs[ZERO_FLAG] = v.zero;

        let nan = self.float_nan()?;
        let nan_out = self.bitmul_2i(&nan, exp_overflow)?;
        let gated = self.bitmul_2i(&outputs, no_exp_overflow)?;
        let merged = self.mixed_op_vec_2i(GateKind::Xor, &nan_out, &gated)?;

        let checked = self.float_check_zero(&merged)?;
        let gated = self.bitmul_2i(&checked, inputs_are_normal)?;
        let outputs = self.mixed_op_vec_2i(GateKind::Xor, &special_outputs, &gated)?;

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 浮点乘法
    ///
    /// 指数相加去偏置并做越界检测；重建隐含一后用整数乘法库乘 24 位
    /// 尾数，按积的最高位条件规格化；符号为两符号的 XOR。
    pub fn float_mul_2i(&mut self, input_a: &[WireId], input_b: &[WireId]) -> Result<Vec<WireId>> {
        check_single(input_a)?;
        check_single(input_b)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let (special_outputs, inputs_are_normal) =
            self.float_check_special_2i(InfinityMode::InftyEqNan, input_a, input_b)?;

        let inc_exponent = self.add_2i(
            &input_a[EXPONENT..EXPONENT + 8],
            &input_b[EXPONENT..EXPONENT + 8],
            CarryOut::Keep,
        )?;

        let exp_upper = self.set_const(9, 384)?;
        let exp_lower = self.set_const(9, 126)?;
        let exp_overflow = self.cmp_2i(CmpType::Geq, &inc_exponent, &exp_upper)?[0];
        let exp_underflow = self.cmp_2i(CmpType::Leq, &inc_exponent, &exp_lower)?[0];
        let exp_abnormal = self.mixed_op_gate(GateKind::Or, exp_overflow, exp_underflow)?;
        let exp_normal = self.not_gate2(exp_abnormal)?;

        let bias = self.set_const(8, -127)?;
        let exponent = self.add_2i(&bias, &inc_exponent[..8].to_vec(), CarryOut::Discard)?;

        let mut in_mul_a = input_a[MANTISSA..MANTISSA + 23].to_vec();
        in_mul_a.push(self.not_gate2(input_a[EXP_ZERO_FLAG])?);
        let mut in_mul_b = input_b[MANTISSA..MANTISSA + 23].to_vec();
        in_mul_b.push(self.not_gate2(input_b[EXP_ZERO_FLAG])?);

        let out_mul = self.mul_2i(&in_mul_a, &in_mul_b)?;

        let (mantissa, exponent) = self.float_mul_normalize(&out_mul, &exponent)?;

        let sign = self.mixed_op_gate(GateKind::Xor, input_a[SIGN], input_b[SIGN])?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(&mantissa);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exponent);
        outputs[SIGN] = sign;
        outputs[EXP_ZERO_FLAG] = input_a[EXP_ZERO_FLAG];
        outputs[MANT_ZERO_FLAG] = input_a[MANT_ZERO_FLAG];
        outputs[EXP_SPEC_FLAG] = self.fixed_zero()?;
        outputs[ZERO_FLAG] = input_a[ZERO_FLAG];

        let outputs =
            self.float_finalize_bounds(&outputs, exp_overflow, exp_underflow, exp_normal, inputs_are_normal, &special_outputs)?;

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 48 位尾数积的条件规格化：最高位置位则右移一位并指数加一
    fn float_mul_normalize(
        &mut self,
        out_mul: &[WireId],
        exponent: &[WireId],
    ) -> Result<(Vec<WireId>, Vec<WireId>)> {
        let mant_overflow = out_mul[47];
        let no_overflow = self.not_gate2(mant_overflow)?;

        let frac_low = self.bitmul_2i(&out_mul[23..46], no_overflow)?;
        let frac_high = self.bitmul_2i(&out_mul[24..47], mant_overflow)?;
        let mantissa = self.mixed_op_vec_2i(GateKind::Xor, &frac_low, &frac_high)?;
        let exponent = self.bitadd_2i(exponent, mant_overflow, CarryOut::Discard)?;
        Ok((mantissa, exponent))
    }

    /// 指数越界与特殊输入的统一收尾
    fn float_finalize_bounds(
        &mut self,
        outputs: &[WireId],
        exp_overflow: WireId,
        exp_underflow: WireId,
        exp_normal: WireId,
        inputs_are_normal: WireId,
        special_outputs: &[WireId],
    ) -> Result<Vec<WireId>> {
        let nan = self.float_nan()?;
        let zero = self.float_zero()?;
        let nan_out = self.bitmul_2i(&nan, exp_overflow)?;
        let zero_out = self.bitmul_2i(&zero, exp_underflow)?;
        let gated = self.bitmul_2i(outputs, exp_normal)?;
        let merged = self.mixed_op_vec_2i(GateKind::Xor, &nan_out, &gated)?;
        let merged = self.mixed_op_vec_2i(GateKind::Xor, &zero_out, &merged)?;

        let checked = self.float_check_zero(&merged)?;
        let gated = self.bitmul_2i(&checked, inputs_are_normal)?;
        self.mixed_op_vec_2i(GateKind::Xor, special_outputs, &gated)
    }

    /// 浮点平方：乘法骨架加递归平方例程，符号恒正，指数加倍去偏置
    pub fn float_square(&mut self, input_a: &[WireId]) -> Result<Vec<WireId>> {
        check_single(input_a)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let (special_outputs, inputs_are_normal) =
            self.float_check_special_2i(InfinityMode::InftyEqNan, input_a, input_a)?;

        // doubled exponent held in 9 bits so the range checks see the carry
        let mut inc_exponent = vec![self.fixed_zero()?];
        inc_exponent.extend_from_slice(&input_a[EXPONENT..EXPONENT + 8]);

        let exp_upper = self.set_const(9, 384)?;
        let exp_lower = self.set_const(9, 126)?;
        let exp_overflow = self.cmp_2i(CmpType::Geq, &inc_exponent, &exp_upper)?[0];
        let exp_underflow = self.cmp_2i(CmpType::Leq, &inc_exponent, &exp_lower)?[0];
        let exp_abnormal = self.mixed_op_gate(GateKind::Or, exp_overflow, exp_underflow)?;
        let exp_normal = self.not_gate2(exp_abnormal)?;

        let bias = self.set_const(8, -127)?;
        let exponent = self.add_2i(&bias, &inc_exponent[..8].to_vec(), CarryOut::Discard)?;

        let mut in_mul = input_a[MANTISSA..MANTISSA + 23].to_vec();
        in_mul.push(self.not_gate2(input_a[EXP_ZERO_FLAG])?);

        let stop = super::integer::square_stop_for(24);
        let out_mul = self.square_2r_g(&in_mul, stop)?;

        let (mantissa, exponent) = self.float_mul_normalize(&out_mul, &exponent)?;

        let mut outputs = vec![0; SINGLE_LENGTH];
        outputs[MANTISSA..MANTISSA + 23].copy_from_slice(&mantissa);
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&exponent);
        outputs[SIGN] = self.fixed_zero()?;
        outputs[EXP_ZERO_FLAG] = input_a[EXP_ZERO_FLAG];
        outputs[MANT_ZERO_FLAG] = input_a[MANT_ZERO_FLAG];
        outputs[EXP_SPEC_FLAG] = self.fixed_zero()?;
        outputs[ZERO_FLAG] = input_a[ZERO_FLAG];

        let outputs =
            self.float_finalize_bounds(&outputs, exp_overflow, exp_underflow, exp_normal, inputs_are_normal, &special_outputs)?;

        self.set_int_repr(saved);
        Ok(outputs)
    }

    /// 浮点比较
    ///
    /// 指数与尾数（带隐含一）分开按无符号比较再组合：同号下按分支
    /// 取指数或尾数的比较结果，异号下负操作数为小。NaN/Inf 输入按
    /// `infinity_mode` 产出固定值。EQ/NEQ 返回单条线，其余返回
    /// `[所求关系, A ≠ B]`。
    pub fn float_cmp_2i(
        &mut self,
        comp_type: CmpType,
        infinity_mode: InfinityMode,
        input_a: &[WireId],
        input_b: &[WireId],
    ) -> Result<Vec<WireId>> {
        if infinity_mode == InfinityMode::InftyNeqNan {
            return Err(BioAuthError::UnsupportedMode(
                "INFTY_NEQ_NAN comparison".to_string(),
            ));
        }
        check_single(input_a)?;
        check_single(input_b)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let mixed_sign = self.mixed_op_gate(GateKind::Xor, input_a[SIGN], input_b[SIGN])?;
        let same_sign = self.not_gate2(mixed_sign)?;

        let mut mant_a = input_a[MANTISSA..MANTISSA + 23].to_vec();
        mant_a.push(self.not_gate2(input_a[EXP_ZERO_FLAG])?);
        let mut mant_b = input_b[MANTISSA..MANTISSA + 23].to_vec();
        mant_b.push(self.not_gate2(input_b[EXP_ZERO_FLAG])?);

        let nan_detected = self.mixed_op_gate(
            GateKind::Or,
            input_a[EXP_SPEC_FLAG],
            input_b[EXP_SPEC_FLAG],
        )?;
        let no_nan = self.not_gate2(nan_detected)?;

        // branch selects which operand is read as the left-hand side
        let (x_exp, y_exp, x_mant, y_mant, x_sign) = if comp_type.branch() == 0 {
            (
                input_a[EXPONENT..EXPONENT + 8].to_vec(),
                input_b[EXPONENT..EXPONENT + 8].to_vec(),
                mant_a.clone(),
                mant_b.clone(),
                input_a[SIGN],
            )
        } else {
            (
                input_b[EXPONENT..EXPONENT + 8].to_vec(),
                input_a[EXPONENT..EXPONENT + 8].to_vec(),
                mant_b.clone(),
                mant_a.clone(),
                input_b[SIGN],
            )
        };

        if comp_type.testing_eq_only() {
            let exp_neq = self.cmp_2i(CmpType::Neq, &x_exp, &y_exp)?[0];
            let mant_neq = self.cmp_2i(CmpType::Neq, &x_mant, &y_mant)?[0];
            let mut a_neq_b = self.mixed_op_gate(GateKind::Or, mixed_sign, exp_neq)?;
            a_neq_b = self.mixed_op_gate(GateKind::Or, a_neq_b, mant_neq)?;

            let mut out = if comp_type == CmpType::Eq {
                self.not_gate2(a_neq_b)?
            } else {
                a_neq_b
            };
            out = self.mixed_op_gate(GateKind::And, out, no_nan)?;
            out = self.mixed_op_gate(GateKind::Xor, out, nan_detected)?;

            self.set_int_repr(saved);
            return Ok(vec![out]);
        }

        let exp_cmp = self.cmp_2i(CmpType::Grt, &x_exp, &y_exp)?;
        let exp_grt = exp_cmp[0];
        let exp_neq = exp_cmp[1];
        let exp_eq = self.not_gate2(exp_neq)?;
        let mant_cmp = self.cmp_2i(CmpType::Grt, &x_mant, &y_mant)?;
        let mant_grt = mant_cmp[0];
        let mant_neq = mant_cmp[1];

        let mut a_neq_b = self.mixed_op_gate(GateKind::Or, mixed_sign, exp_neq)?;
        a_neq_b = self.mixed_op_gate(GateKind::Or, a_neq_b, mant_neq)?;

        let mag_neq = self.mixed_op_gate(GateKind::Or, exp_neq, mant_neq)?;
        let mant_decides = self.mixed_op_gate(GateKind::And, exp_eq, mant_grt)?;
        let mag_grt = self.mixed_op_gate(GateKind::Or, exp_grt, mant_decides)?;
        let not_mag_grt = self.not_gate2(mag_grt)?;
        let mag_les = self.mixed_op_gate(GateKind::And, not_mag_grt, mag_neq)?;

        let x_pos = self.not_gate2(x_sign)?;
        let pos_case = self.mixed_op_gate(GateKind::And, same_sign, x_pos)?;
        let pos_case = self.mixed_op_gate(GateKind::And, pos_case, mag_grt)?;
        let neg_case = self.mixed_op_gate(GateKind::And, same_sign, x_sign)?;
        let neg_case = self.mixed_op_gate(GateKind::And, neg_case, mag_les)?;
        let mixed_case = self.mixed_op_gate(GateKind::And, mixed_sign, x_pos)?;

        let mut x_grt_y = self.mixed_op_gate(GateKind::Xor, pos_case, neg_case)?;
        x_grt_y = self.mixed_op_gate(GateKind::Xor, x_grt_y, mixed_case)?;

        let requested = if comp_type.testing_strict() {
            x_grt_y
        } else {
            self.not_gate2(x_grt_y)?
        };

        let out0 = self.mixed_op_gate(GateKind::And, requested, no_nan)?;
        let out0 = self.mixed_op_gate(GateKind::Xor, out0, nan_detected)?;
        let out1 = self.mixed_op_gate(GateKind::And, a_neq_b, no_nan)?;
        let out1 = self.mixed_op_gate(GateKind::Xor, out1, nan_detected)?;

        self.set_int_repr(saved);
        Ok(vec![out0, out1])
    }

    /// 浮点定量移位：指数加减常量并做越界检测
    ///
    /// 上溢折叠为 NaN、下溢折叠为零（`InftyEqNan` 模式）；符号与
    /// 尾数不变。
    pub fn float_shift(
        &mut self,
        shift_amount: usize,
        direction: ShiftDir,
        infinity_mode: InfinityMode,
        input_a: &[WireId],
    ) -> Result<Vec<WireId>> {
        if infinity_mode == InfinityMode::InftyNeqNan {
            return Err(BioAuthError::UnsupportedMode(
                "INFTY_NEQ_NAN float shift".to_string(),
            ));
        }
        check_single(input_a)?;
        let saved = self.int_repr();
        self.set_int_repr(IntRepr::Unsigned);

        let amount_bits = self.set_const(8, shift_amount as i64)?;
        let exp = input_a[EXPONENT..EXPONENT + 8].to_vec();

        let (adj_exponent, flow) = match direction {
            ShiftDir::Left => {
                let raised = self.add_2i(&exp, &amount_bits, CarryOut::Keep)?;
                // increment so that the flow bit also fires on exponent 0xff,
                // then undo it
                let bumped = self.inc(&raised[..8].to_vec(), CarryOut::Keep)?;
                let flow = self.mixed_op_gate(GateKind::Or, raised[8], bumped[8])?;
                let restored = self.dec(&bumped[..8].to_vec(), CarryOut::Discard)?;
                (restored, flow)
            }
            ShiftDir::Right => {
                let lowered = self.sub3_2i(&exp, &amount_bits, CarryOut::Keep)?;
                let flow = lowered[8];
                (lowered[..8].to_vec(), flow)
            }
        };
        let no_flow = self.not_gate2(flow)?;

        let mut outputs = input_a.to_vec();
        outputs[EXPONENT..EXPONENT + 8].copy_from_slice(&adj_exponent);

        let flowed = match direction {
            ShiftDir::Left => {
                let nan = self.float_nan()?;
                self.bitmul_2i(&nan, flow)?
            }
            ShiftDir::Right => {
                let zero = self.float_zero()?;
                self.bitmul_2i(&zero, flow)?
            }
        };
        let gated = self.bitmul_2i(&outputs, no_flow)?;
        let outputs = self.mixed_op_vec_2i(GateKind::Xor, &flowed, &gated)?;

        self.set_int_repr(saved);
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garbling::eval_plain;
    use crate::utils::bits::{bit_vector_to_int, int_to_bit_vector, pack_f32_bits, unpack_float_wire_bits};

    fn builder(n: usize) -> CircuitBuilder {
        CircuitBuilder::new(n, 1, 1 << 22, 1 << 24).unwrap()
    }

    /// run a float unary/binary op over plain evaluation with f32 operands
    fn run_float2<F>(a: f32, b: f32, f: F) -> Vec<bool>
    where
        F: FnOnce(&mut CircuitBuilder, &[WireId], &[WireId]) -> Vec<WireId>,
    {
        let mut bld = builder(64);
        let wires = bld.input_wires();
        let fa = bld.set_raw_float(&wires[..32]).unwrap();
        let fb = bld.set_raw_float(&wires[32..]).unwrap();
        let outs = f(&mut bld, &fa, &fb);
        let circuit = bld.finish_any(&outs).unwrap();
        let mut inputs = pack_f32_bits(a);
        inputs.extend(pack_f32_bits(b));
        eval_plain(&circuit, &inputs).unwrap()
    }

    fn as_f32(bits: &[bool]) -> f32 {
        unpack_float_wire_bits(bits)
    }

    #[test]
    fn test_set_raw_float_round_trip() {
        for v in [1.0f32, -2.5, 0.0, 3.14159, 1e-20, 6.02e23] {
            let out = run_float2(v, 0.0, |bld, fa, _| bld.float_to_raw_bits(fa).unwrap());
            assert_eq!(bit_vector_to_int(&out) as u32, v.to_bits(), "{}", v);
        }
    }

    #[test]
    fn test_set_raw_float_flags() {
        let out = run_float2(0.0, 0.0, |_, fa, _| fa.to_vec());
        assert!(out[MANT_ZERO_FLAG] && out[EXP_ZERO_FLAG] && out[ZERO_FLAG]);
        assert!(!out[EXP_SPEC_FLAG]);

        let out = run_float2(f32::NAN, 0.0, |_, fa, _| fa.to_vec());
        assert!(out[EXP_SPEC_FLAG]);
        assert!(!out[ZERO_FLAG]);
    }

    #[test]
    fn test_float_neg_involution() {
        for v in [1.5f32, -0.25, 1e10] {
            let out = run_float2(v, 0.0, |bld, fa, _| {
                let n1 = bld.float_neg(fa).unwrap();
                bld.float_neg(&n1).unwrap()
            });
            assert_eq!(as_f32(&out), v);
        }
        let out = run_float2(2.0, 0.0, |bld, fa, _| bld.float_neg(fa).unwrap());
        assert_eq!(as_f32(&out), -2.0);
    }

    #[test]
    fn test_int_to_float_exact_small_values() {
        for k in [0u64, 1, 2, 5, 255, 1023, (1 << 23) - 1] {
            let width = 19;
            if k >= 1 << width {
                continue;
            }
            let mut bld = builder(width);
            let wires = bld.input_wires();
            let f = bld.int_to_float(&wires).unwrap();
            let circuit = bld.finish_any(&f).unwrap();
            let inputs = int_to_bit_vector(k, width);
            let out = eval_plain(&circuit, &inputs).unwrap();
            assert_eq!(as_f32(&out), k as f32, "int_to_float({})", k);
        }
    }

    #[test]
    fn test_int_to_float_wide_input() {
        // 30-bit input: top 23 bits kept, low bits truncated
        let k: u64 = 0x2000_0001;
        let mut bld = builder(30);
        let wires = bld.input_wires();
        let f = bld.int_to_float(&wires).unwrap();
        let circuit = bld.finish_any(&f).unwrap();
        let out = eval_plain(&circuit, &int_to_bit_vector(k, 30)).unwrap();
        assert_eq!(as_f32(&out), (1u64 << 29) as f32);
    }

    #[test]
    fn test_float_mul_basic() {
        let cases = [
            (2.0f32, 3.0f32),
            (1.5, 1.5),
            (0.5, 0.25),
            (-2.0, 4.0),
            (-3.0, -5.0),
            (1.0, 1.0),
        ];
        for (a, b) in cases {
            let out = run_float2(a, b, |bld, fa, fb| bld.float_mul_2i(fa, fb).unwrap());
            assert_eq!(as_f32(&out), a * b, "{} * {}", a, b);
        }
    }

    #[test]
    fn test_float_mul_zero_absorbs() {
        for v in [1.0f32, -7.25, 1e20] {
            let out = run_float2(v, 0.0, |bld, fa, fb| bld.float_mul_2i(fa, fb).unwrap());
            assert_eq!(as_f32(&out), 0.0, "{} * 0", v);
            assert!(out[ZERO_FLAG]);
        }
    }

    #[test]
    fn test_float_mul_nan_propagates() {
        let out = run_float2(f32::NAN, 3.0, |bld, fa, fb| bld.float_mul_2i(fa, fb).unwrap());
        assert!(as_f32(&out).is_nan());
        let out = run_float2(2.0, f32::INFINITY, |bld, fa, fb| bld.float_mul_2i(fa, fb).unwrap());
        assert!(as_f32(&out).is_nan()); // INFTY_EQ_NAN mode
    }

    #[test]
    fn test_float_square() {
        for v in [1.0f32, 1.5, 2.0, -3.0, 0.5, 12.25] {
            let out = run_float2(v, 0.0, |bld, fa, _| bld.float_square(fa).unwrap());
            assert_eq!(as_f32(&out), v * v, "{}^2", v);
            assert!(!out[SIGN]);
        }
    }

    #[test]
    fn test_float_sum_exact() {
        // four ones sum to exactly 4.0
        let mut bld = builder(128);
        let wires = bld.input_wires();
        let mut flat = Vec::new();
        for i in 0..4 {
            let f = bld.set_raw_float(&wires[i * 32..(i + 1) * 32]).unwrap();
            flat.extend(f);
        }
        let s = bld.float_sum(&flat).unwrap();
        let circuit = bld.finish_any(&s).unwrap();
        let mut inputs = Vec::new();
        for _ in 0..4 {
            inputs.extend(pack_f32_bits(1.0));
        }
        let out = eval_plain(&circuit, &inputs).unwrap();
        assert_eq!(as_f32(&out).to_bits(), 0x4080_0000);
    }

    #[test]
    fn test_float_sum_mixed_values() {
        let vals = [1.0f32, 2.0, 3.0, -1.5, 0.5, 8.0];
        let mut bld = builder(32 * vals.len());
        let wires = bld.input_wires();
        let mut flat = Vec::new();
        for i in 0..vals.len() {
            let f = bld.set_raw_float(&wires[i * 32..(i + 1) * 32]).unwrap();
            flat.extend(f);
        }
        let s = bld.float_sum(&flat).unwrap();
        let circuit = bld.finish_any(&s).unwrap();
        let mut inputs = Vec::new();
        for &v in &vals {
            inputs.extend(pack_f32_bits(v));
        }
        let out = eval_plain(&circuit, &inputs).unwrap();
        let expected: f32 = vals.iter().sum();
        assert_eq!(as_f32(&out), expected);
    }

    #[test]
    fn test_float_sum_with_zeros() {
        let vals = [0.0f32, 5.0, 0.0];
        let mut bld = builder(32 * vals.len());
        let wires = bld.input_wires();
        let mut flat = Vec::new();
        for i in 0..vals.len() {
            let f = bld.set_raw_float(&wires[i * 32..(i + 1) * 32]).unwrap();
            flat.extend(f);
        }
        let s = bld.float_sum(&flat).unwrap();
        let circuit = bld.finish_any(&s).unwrap();
        let mut inputs = Vec::new();
        for &v in &vals {
            inputs.extend(pack_f32_bits(v));
        }
        let out = eval_plain(&circuit, &inputs).unwrap();
        assert_eq!(as_f32(&out), 5.0);
    }

    #[test]
    fn test_float_cmp() {
        let cases = [
            (1.0f32, 2.0f32),
            (2.0, 1.0),
            (1.5, 1.5),
            (-1.0, 1.0),
            (1.0, -1.0),
            (-2.0, -1.0),
            (0.0, 1.0),
        ];
        for (a, b) in cases {
            for (cmp, expected) in [
                (CmpType::Leq, a <= b),
                (CmpType::Geq, a >= b),
                (CmpType::Grt, a > b),
                (CmpType::Les, a < b),
                (CmpType::Eq, a == b),
                (CmpType::Neq, a != b),
            ] {
                let out = run_float2(a, b, |bld, fa, fb| {
                    bld.float_cmp_2i(cmp, InfinityMode::InftyEqNan, fa, fb).unwrap()
                });
                assert_eq!(out[0], expected, "{} {:?} {}", a, cmp, b);
            }
        }
    }

    #[test]
    fn test_float_cmp_rejects_unsupported_mode() {
        let mut bld = builder(64);
        let wires = bld.input_wires();
        let fa = bld.set_raw_float(&wires[..32]).unwrap();
        let fb = bld.set_raw_float(&wires[32..]).unwrap();
        let err = bld
            .float_cmp_2i(CmpType::Les, InfinityMode::InftyNeqNan, &fa, &fb)
            .unwrap_err();
        assert!(matches!(err, BioAuthError::UnsupportedMode(_)));
    }

    #[test]
    fn test_float_shift_doubles_and_halves() {
        for v in [1.0f32, 3.5, -2.0] {
            let out = run_float2(v, 0.0, |bld, fa, _| {
                bld.float_shift(1, ShiftDir::Left, InfinityMode::InftyEqNan, fa)
                    .unwrap()
            });
            assert_eq!(as_f32(&out), v * 2.0, "{} << 1", v);

            let out = run_float2(v, 0.0, |bld, fa, _| {
                bld.float_shift(2, ShiftDir::Right, InfinityMode::InftyEqNan, fa)
                    .unwrap()
            });
            assert_eq!(as_f32(&out), v / 4.0, "{} >> 2", v);
        }
    }

    #[test]
    fn test_float_exp_bias_round_trip() {
        let out = run_float2(6.5, 0.0, |bld, fa, _| {
            let up = bld.float_exp_bias(BiasTask::Add, fa).unwrap();
            bld.float_exp_bias(BiasTask::Remove, &up).unwrap()
        });
        assert_eq!(as_f32(&out), 6.5);
    }
}
