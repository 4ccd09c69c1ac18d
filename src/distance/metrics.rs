//! # 距离度量发射 (Distance Metric Emission)
//!
//! 三个变体的电路主体：
//!
//! - 汉明距离：两特征向量 XOR 后按位计数，LEQ 比较整数阈值
//! - 欧氏距离：六项展开式（三次整数点积、两次整数求和、五次
//!   int→float、一次六项浮点求和），LES 比较浮点阈值 2^6
//! - 余弦相似度：四项展开式，GRT 比较浮点阈值 1 − 2^6
//!
//! 欧氏/余弦的归一化检查只读取运行时侧的 (range, min) 与特征向量；
//! 登记侧是否也应校验仍是悬而未决的性质，这里保留观察到的行为。

use super::{BioCircuitBuilder, DistanceOutputs};
use crate::circuits::{CmpType, InfinityMode, ShiftDir};
use crate::garbling::{GateKind, WireId};
use crate::Result;

/// 浮点距离阈值 2^6
pub const ED_THRESHOLD: f32 = 64.0;
/// 余弦相似度阈值 1 − 2^6
pub const CS_THRESHOLD: f32 = 1.0 - 64.0;

impl BioCircuitBuilder {
    /// 把一条判定线配上一条恒为真的活跃线（无归一化约束的变体使用；
    /// 经过一个真实 OR 门以保证求值方能产出标签）
    fn live_true(&mut self, seed: WireId) -> Result<WireId> {
        let b = self.builder_mut();
        let inverted = b.not_gate2(seed)?;
        b.mixed_op_gate(GateKind::Or, seed, inverted)
    }

    pub(super) fn emit_hamming(&mut self) -> Result<DistanceOutputs> {
        let runtime = self.runtime();
        let enrollment = self.enrollment();
        let threshold = self.config().hamming_threshold;

        let b = self.builder_mut();
        let out_xor =
            b.mixed_op_vec_2i(GateKind::Xor, &runtime.feature_vector, &enrollment.feature_vector)?;
        let count = b.countbits(&out_xor)?;
        let threshold_bits = b.set_const(count.len(), threshold as i64)?;
        let cmp = b.cmp_2i(CmpType::Leq, &count, &threshold_bits)?;
        let accept = cmp[0];

        // Hamming has no compression parameters to validate
        let norm_valid = self.live_true(accept)?;

        Ok(DistanceOutputs { accept, norm_valid })
    }

    pub(super) fn emit_euclidean(&mut self) -> Result<DistanceOutputs> {
        let runtime = self.runtime();
        let enrollment = self.enrollment();
        let num_inputs = self.config().num_inputs;
        let input_length = self.config().input_length;

        let b = self.builder_mut();

        // integer aggregates of both sides
        let sum_rt = b.sum(input_length, &runtime.feature_vector)?;
        let sum_en = b.sum(input_length, &enrollment.feature_vector)?;
        let dp_rt_rt = b.dotprod_2i(input_length, &runtime.feature_vector, &runtime.feature_vector)?;
        let dp_rt_en =
            b.dotprod_2i(input_length, &runtime.feature_vector, &enrollment.feature_vector)?;
        let dp_en_en =
            b.dotprod_2i(input_length, &enrollment.feature_vector, &enrollment.feature_vector)?;

        let f_sum_rt = b.int_to_float(&sum_rt)?;
        let f_sum_en = b.int_to_float(&sum_en)?;
        let f_dp_rt_rt = b.int_to_float(&dp_rt_rt)?;
        let f_dp_rt_en = b.int_to_float(&dp_rt_en)?;
        let f_dp_en_en = b.int_to_float(&dp_en_en)?;

        // compression parameters
        let rx_sq = b.float_square(&runtime.vector_range)?;
        let ry_sq = b.float_square(&enrollment.vector_range)?;

        // mindiff = runtime_min − enrollment_min
        let neg_en_min = b.float_neg(&enrollment.vector_min)?;
        let mut diff_in = runtime.vector_min.clone();
        diff_in.extend_from_slice(&neg_en_min);
        let mindiff = b.float_sum(&diff_in)?;
        let shl_mindiff = b.float_shift(1, ShiftDir::Left, InfinityMode::InftyEqNan, &mindiff)?;
        let mindiff_sq = b.float_square(&mindiff)?;

        // D² = rx²·Σx² + ry²·Σy² − 2·rx·ry·Σxy
        //      + 2·rx·(mx−my)·Σx − 2·ry·(mx−my)·Σy + n·(mx−my)²
        let mut in_sum = Vec::with_capacity(6 * crate::circuits::SINGLE_LENGTH);

        let term = b.float_mul_2i(&rx_sq, &f_dp_rt_rt)?;
        in_sum.extend(term);
        let term = b.float_mul_2i(&ry_sq, &f_dp_en_en)?;
        in_sum.extend(term);

        let rx_ry = b.float_mul_2i(&runtime.vector_range, &enrollment.vector_range)?;
        let two_rx_ry = b.float_shift(1, ShiftDir::Left, InfinityMode::InftyEqNan, &rx_ry)?;
        let cross = b.float_mul_2i(&two_rx_ry, &f_dp_rt_en)?;
        let term = b.float_neg(&cross)?;
        in_sum.extend(term);

        let rx_shl = b.float_mul_2i(&runtime.vector_range, &shl_mindiff)?;
        let term = b.float_mul_2i(&rx_shl, &f_sum_rt)?;
        in_sum.extend(term);

        let ry_shl = b.float_mul_2i(&enrollment.vector_range, &shl_mindiff)?;
        let prod = b.float_mul_2i(&ry_shl, &f_sum_en)?;
        let term = b.float_neg(&prod)?;
        in_sum.extend(term);

        let f_n = b.set_const_float_cast(num_inputs as f32)?;
        let term = b.float_mul_2i(&f_n, &mindiff_sq)?;
        in_sum.extend(term);

        let distance = b.float_sum(&in_sum)?;

        let threshold = b.set_const_float_cast(ED_THRESHOLD)?;
        let cmp = b.float_cmp_2i(CmpType::Les, InfinityMode::InftyEqNan, &distance, &threshold)?;
        let accept = cmp[0];

        let norm_valid = self.emit_normalization_check(&f_sum_rt, &f_dp_rt_rt)?;

        Ok(DistanceOutputs { accept, norm_valid })
    }

    pub(super) fn emit_cosine(&mut self) -> Result<DistanceOutputs> {
        let runtime = self.runtime();
        let enrollment = self.enrollment();
        let num_inputs = self.config().num_inputs;
        let input_length = self.config().input_length;

        let b = self.builder_mut();

        let sum_rt = b.sum(input_length, &runtime.feature_vector)?;
        let sum_en = b.sum(input_length, &enrollment.feature_vector)?;
        let dp_rt_en =
            b.dotprod_2i(input_length, &runtime.feature_vector, &enrollment.feature_vector)?;

        let f_sum_rt = b.int_to_float(&sum_rt)?;
        let f_sum_en = b.int_to_float(&sum_en)?;
        let f_dp = b.int_to_float(&dp_rt_en)?;

        // ⟨x,y⟩ = rx·ry·Σxy + rx·my·Σx + ry·mx·Σy + n·mx·my
        let mut in_sum = Vec::with_capacity(4 * crate::circuits::SINGLE_LENGTH);

        let rx_dp = b.float_mul_2i(&runtime.vector_range, &f_dp)?;
        let term = b.float_mul_2i(&enrollment.vector_range, &rx_dp)?;
        in_sum.extend(term);

        let my_sum = b.float_mul_2i(&enrollment.vector_min, &f_sum_rt)?;
        let term = b.float_mul_2i(&runtime.vector_range, &my_sum)?;
        in_sum.extend(term);

        let mx_sum = b.float_mul_2i(&runtime.vector_min, &f_sum_en)?;
        let term = b.float_mul_2i(&enrollment.vector_range, &mx_sum)?;
        in_sum.extend(term);

        let f_n = b.set_const_float_cast(num_inputs as f32)?;
        let mins = b.float_mul_2i(&runtime.vector_min, &enrollment.vector_min)?;
        let term = b.float_mul_2i(&f_n, &mins)?;
        in_sum.extend(term);

        let similarity = b.float_sum(&in_sum)?;

        let threshold = b.set_const_float_cast(CS_THRESHOLD)?;
        let cmp = b.float_cmp_2i(CmpType::Grt, InfinityMode::InftyEqNan, &similarity, &threshold)?;
        let accept = cmp[0];

        // the cosine normalization check recomputes the runtime self dot product
        let dp_rt_rt = {
            let b = self.builder_mut();
            b.dotprod_2i(input_length, &runtime.feature_vector, &runtime.feature_vector)?
        };
        let f_dp_rt_rt = self.builder_mut().int_to_float(&dp_rt_rt)?;
        let norm_valid = self.emit_normalization_check(&f_sum_rt, &f_dp_rt_rt)?;

        Ok(DistanceOutputs { accept, norm_valid })
    }

    /// 归一化检查：rx²·Σx² + 2·rx·mx·Σx + n·mx² 与 1.0 的相等比较
    ///
    /// 只使用运行时侧的参数与向量。
    fn emit_normalization_check(
        &mut self,
        f_sum_rt: &[WireId],
        f_dp_rt_rt: &[WireId],
    ) -> Result<WireId> {
        let runtime = self.runtime();
        let num_inputs = self.config().num_inputs;
        let b = self.builder_mut();

        let rx_sq = b.float_square(&runtime.vector_range)?;
        let mx_sq = b.float_square(&runtime.vector_min)?;
        let rx_mx = b.float_mul_2i(&runtime.vector_range, &runtime.vector_min)?;
        let two_rx_mx = b.float_shift(1, ShiftDir::Left, InfinityMode::InftyEqNan, &rx_mx)?;

        let mut in_sum = Vec::with_capacity(3 * crate::circuits::SINGLE_LENGTH);
        let term = b.float_mul_2i(&rx_sq, f_dp_rt_rt)?;
        in_sum.extend(term);
        let term = b.float_mul_2i(&two_rx_mx, f_sum_rt)?;
        in_sum.extend(term);
        let f_n = b.set_const_float_cast(num_inputs as f32)?;
        let term = b.float_mul_2i(&mx_sq, &f_n)?;
        in_sum.extend(term);

        let norm = b.float_sum(&in_sum)?;
        let one = b.set_const_float_cast(1.0)?;
        let valid = b.float_cmp_2i(CmpType::Eq, InfinityMode::InftyEqNan, &one, &norm)?;
        Ok(valid[0])
    }
}
