//! Float circuit library laws: raw-bit round trips, int conversion
//! exactness, negation involution, and summation stability under
//! permutation.

use bio_auth_mpc::circuits::{CmpType, InfinityMode};
use bio_auth_mpc::garbling::{eval_plain, CircuitBuilder, WireId};
use bio_auth_mpc::utils::bits::{
    bit_vector_to_int, int_to_bit_vector, pack_f32_bits, unpack_float_wire_bits,
};

fn builder(n: usize) -> CircuitBuilder {
    CircuitBuilder::new(n, 1, 1 << 23, 1 << 25).unwrap()
}

fn eval_float_sum(values: &[f32]) -> f32 {
    let mut bld = builder(32 * values.len());
    let wires = bld.input_wires();
    let mut flat = Vec::new();
    for i in 0..values.len() {
        let f = bld.set_raw_float(&wires[i * 32..(i + 1) * 32]).unwrap();
        flat.extend(f);
    }
    let s = bld.float_sum(&flat).unwrap();
    let circuit = bld.finish_any(&s).unwrap();
    let mut inputs = Vec::new();
    for &v in values {
        inputs.extend(pack_f32_bits(v));
    }
    let out = eval_plain(&circuit, &inputs).unwrap();
    unpack_float_wire_bits(&out)
}

#[test]
fn set_raw_float_bits_round_trip() {
    for v in [1.0f32, -1.0, 0.5, 123.456, 1e-10, 3.4e38, 0.0] {
        let mut bld = builder(32);
        let wires = bld.input_wires();
        let f = bld.set_raw_float(&wires).unwrap();
        let raw = bld.float_to_raw_bits(&f).unwrap();
        let circuit = bld.finish_any(&raw).unwrap();
        let out = eval_plain(&circuit, &pack_f32_bits(v)).unwrap();
        assert_eq!(bit_vector_to_int(&out) as u32, v.to_bits(), "{}", v);
    }
}

#[test]
fn int_to_float_is_exact_below_two_to_the_23() {
    // unsigned integers below 2^23 convert without rounding
    for k in [0u64, 1, 2, 1023, 65535, (1 << 23) - 1] {
        let width = 23;
        let mut bld = builder(width);
        let wires = bld.input_wires();
        let f = bld.int_to_float(&wires).unwrap();
        let circuit = bld.finish_any(&f).unwrap();
        let out = eval_plain(&circuit, &int_to_bit_vector(k, width)).unwrap();
        assert_eq!(unpack_float_wire_bits(&out), k as f32, "int_to_float({})", k);
    }
}

#[test]
fn float_neg_is_an_involution() {
    for v in [2.5f32, -1e20, 0.125] {
        let mut bld = builder(32);
        let wires = bld.input_wires();
        let f = bld.set_raw_float(&wires).unwrap();
        let n1 = bld.float_neg(&f).unwrap();
        let n2 = bld.float_neg(&n1).unwrap();
        let raw = bld.float_to_raw_bits(&n2).unwrap();
        let circuit = bld.finish_any(&raw).unwrap();
        let out = eval_plain(&circuit, &pack_f32_bits(v)).unwrap();
        assert_eq!(f32::from_bits(bit_vector_to_int(&out) as u32), v);
    }
}

#[test]
fn float_sum_of_four_ones_is_exactly_four() {
    let result = eval_float_sum(&[1.0, 1.0, 1.0, 1.0]);
    assert_eq!(result.to_bits(), 0x4080_0000);
}

#[test]
fn float_sum_is_permutation_stable_for_identical_inputs() {
    // identical inputs summed in any order agree to the last bit
    let a = eval_float_sum(&[2.5, 2.5, 2.5, 2.5, 2.5]);
    let b = eval_float_sum(&[2.5, 2.5, 2.5, 2.5, 2.5]);
    assert_eq!(a.to_bits(), b.to_bits());
    assert_eq!(a, 12.5);
}

#[test]
fn float_sum_permutations_agree_within_one_ulp() {
    let values = [1.5f32, 8.0, 2.25, 4.0];
    let permuted = [4.0f32, 2.25, 1.5, 8.0];
    let a = eval_float_sum(&values);
    let b = eval_float_sum(&permuted);
    let ulp_distance = (a.to_bits() as i64 - b.to_bits() as i64).abs();
    assert!(ulp_distance <= 1, "{} vs {}", a, b);
}

#[test]
fn float_mul_handles_zero_and_nan() {
    let cases: [(f32, f32, fn(f32) -> bool); 3] = [
        (7.5, 0.0, |r| r == 0.0),
        (f32::NAN, 2.0, f32::is_nan),
        (f32::INFINITY, 2.0, f32::is_nan), // INFTY_EQ_NAN mode
    ];
    for (a, b, check) in cases {
        let mut bld = builder(64);
        let wires = bld.input_wires();
        let fa = bld.set_raw_float(&wires[..32]).unwrap();
        let fb = bld.set_raw_float(&wires[32..]).unwrap();
        let prod = bld.float_mul_2i(&fa, &fb).unwrap();
        let circuit = bld.finish_any(&prod).unwrap();
        let mut inputs = pack_f32_bits(a);
        inputs.extend(pack_f32_bits(b));
        let out = eval_plain(&circuit, &inputs).unwrap();
        assert!(check(unpack_float_wire_bits(&out)), "{} * {}", a, b);
    }
}

#[test]
fn float_cmp_nan_mode_is_rejected_at_the_api() {
    let mut bld = builder(64);
    let wires = bld.input_wires();
    let fa = bld.set_raw_float(&wires[..32]).unwrap();
    let fb = bld.set_raw_float(&wires[32..]).unwrap();
    assert!(bld
        .float_cmp_2i(CmpType::Grt, InfinityMode::InftyNeqNan, &fa, &fb)
        .is_err());
    assert!(bld
        .float_check_special_2i(InfinityMode::InftyNeqNan, &fa, &fb)
        .is_err());
}

#[test]
fn float_square_of_negative_is_positive() {
    let mut bld = builder(32);
    let wires = bld.input_wires();
    let f = bld.set_raw_float(&wires).unwrap();
    let sq = bld.float_square(&f).unwrap();
    let circuit = bld.finish_any(&sq).unwrap();
    let out = eval_plain(&circuit, &pack_f32_bits(-3.5)).unwrap();
    assert_eq!(unpack_float_wire_bits(&out), 12.25);
}
