//! Randomized round-trip and agreement laws via proptest.

use bio_auth_mpc::circuits::{CarryOut, CmpType};
use bio_auth_mpc::garbling::{eval_plain, CircuitBuilder};
use bio_auth_mpc::utils::bits::{
    bit_vector_to_int, bits_to_bytes, bytes_to_bits, int_to_bit_vector, twos_complement,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn bit_vector_round_trips(x in any::<u64>()) {
        prop_assert_eq!(bit_vector_to_int(&int_to_bit_vector(x, 64)), x);
    }

    #[test]
    fn byte_packing_round_trips(x in any::<u64>(), width in 1usize..64) {
        let bits = int_to_bit_vector(x & ((1u64 << width) - 1), width);
        prop_assert_eq!(bytes_to_bits(&bits_to_bytes(&bits), width), bits);
    }

    #[test]
    fn twos_complement_is_an_involution(x in any::<u8>()) {
        let v = int_to_bit_vector(x as u64, 8);
        prop_assert_eq!(twos_complement(&twos_complement(&v)), v);
    }

    #[test]
    fn circuit_addition_matches_machine_addition(a in any::<u8>(), b in any::<u8>()) {
        let mut bld = CircuitBuilder::new(16, 1, 1 << 12, 1 << 14).unwrap();
        let wires = bld.input_wires();
        let out = bld.add_2i(&wires[..8], &wires[8..], CarryOut::Keep).unwrap();
        let circuit = bld.finish_any(&out).unwrap();

        let mut inputs = int_to_bit_vector(a as u64, 8);
        inputs.extend(int_to_bit_vector(b as u64, 8));
        let result = eval_plain(&circuit, &inputs).unwrap();
        prop_assert_eq!(bit_vector_to_int(&result), a as u64 + b as u64);
    }

    #[test]
    fn circuit_comparison_matches_machine_comparison(a in any::<u8>(), b in any::<u8>()) {
        let mut bld = CircuitBuilder::new(16, 1, 1 << 12, 1 << 14).unwrap();
        let wires = bld.input_wires();
        let out = bld.cmp_2i(CmpType::Leq, &wires[..8], &wires[8..]).unwrap();
        let circuit = bld.finish_any(&out).unwrap();

        let mut inputs = int_to_bit_vector(a as u64, 8);
        inputs.extend(int_to_bit_vector(b as u64, 8));
        let result = eval_plain(&circuit, &inputs).unwrap();
        prop_assert_eq!(result[0], a <= b);
        prop_assert_eq!(result[1], a != b);
    }

    #[test]
    fn circuit_multiplication_matches_machine_multiplication(a in any::<u8>(), b in any::<u8>()) {
        let mut bld = CircuitBuilder::new(16, 1, 1 << 14, 1 << 16).unwrap();
        let wires = bld.input_wires();
        let out = bld.mul_2i(&wires[..8], &wires[8..]).unwrap();
        let circuit = bld.finish_any(&out).unwrap();

        let mut inputs = int_to_bit_vector(a as u64, 8);
        inputs.extend(int_to_bit_vector(b as u64, 8));
        let result = eval_plain(&circuit, &inputs).unwrap();
        prop_assert_eq!(bit_vector_to_int(&result), a as u64 * b as u64);
    }
}
