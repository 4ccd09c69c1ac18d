//! # SCD 文件读写 (Serialized Circuit Description)
//!
//! 逐字节精确的磁盘格式，不含任何标签：
//!
//! - 小端头部 `{n, m, q, r}`，各为 32 位整数
//! - `q` 条门记录 `{input0: i32, input1: i32, output: i32, type: u8}`
//! - `m` 个输出线索引，各为 32 位整数
//!
//! 读写失败均为致命的资源错误。

use super::circuit::{FixedWire, GarbledCircuit};
use super::gate::{Gate, GateKind};
use crate::{BioAuthError, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 电路文件目录
pub const CIRCUIT_DIR: &str = "./circuit_files/";

fn resource_err<E: std::fmt::Display>(path: &Path, e: E) -> BioAuthError {
    BioAuthError::Resource(format!("{}: {}", path.display(), e))
}

/// 将电路拓扑写入 SCD 文件
pub fn write_circuit_to_file<P: AsRef<Path>>(circuit: &GarbledCircuit, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir).map_err(|e| resource_err(path, e))?;
        }
    }
    let file = File::create(path).map_err(|e| resource_err(path, e))?;
    let mut w = BufWriter::new(file);

    let header = [
        circuit.n as i32,
        circuit.m as i32,
        circuit.q as i32,
        circuit.r as i32,
    ];
    for v in header {
        w.write_all(&v.to_le_bytes()).map_err(|e| resource_err(path, e))?;
    }
    for gate in &circuit.gates {
        w.write_all(&(gate.input0 as i32).to_le_bytes())
            .map_err(|e| resource_err(path, e))?;
        w.write_all(&(gate.input1 as i32).to_le_bytes())
            .map_err(|e| resource_err(path, e))?;
        w.write_all(&(gate.output as i32).to_le_bytes())
            .map_err(|e| resource_err(path, e))?;
        w.write_all(&[gate.kind.to_scd_byte()])
            .map_err(|e| resource_err(path, e))?;
    }
    for &o in &circuit.outputs {
        w.write_all(&(o as i32).to_le_bytes())
            .map_err(|e| resource_err(path, e))?;
    }
    w.flush().map_err(|e| resource_err(path, e))?;
    Ok(())
}

/// 从 SCD 文件读回电路拓扑
///
/// 固定线标记不持久化，读回的电路不支持明文求值。
pub fn read_circuit_from_file<P: AsRef<Path>>(path: P) -> Result<GarbledCircuit> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| resource_err(path, e))?;
    let mut r = BufReader::new(file);

    let mut i32_buf = [0u8; 4];
    let mut read_i32 = |r: &mut BufReader<File>| -> Result<i32> {
        r.read_exact(&mut i32_buf).map_err(|e| resource_err(path, e))?;
        Ok(i32::from_le_bytes(i32_buf))
    };

    let n = read_i32(&mut r)? as usize;
    let m = read_i32(&mut r)? as usize;
    let q = read_i32(&mut r)? as usize;
    let wires = read_i32(&mut r)? as usize;

    let mut gates = Vec::with_capacity(q);
    let mut qand = 0;
    let mut qor = 0;
    let mut qxor = 0;
    let mut qnot = 0;
    for _ in 0..q {
        let input0 = read_i32(&mut r)? as usize;
        let input1 = read_i32(&mut r)? as usize;
        let output = read_i32(&mut r)? as usize;
        let mut kind_buf = [0u8; 1];
        r.read_exact(&mut kind_buf).map_err(|e| resource_err(path, e))?;
        let kind = GateKind::from_scd_byte(kind_buf[0])?;
        match kind {
            GateKind::And => qand += 1,
            GateKind::Or => qor += 1,
            GateKind::Xor => qxor += 1,
            GateKind::Not => qnot += 1,
        }
        gates.push(Gate {
            input0,
            input1,
            output,
            kind,
        });
    }

    let mut outputs = Vec::with_capacity(m);
    for _ in 0..m {
        outputs.push(read_i32(&mut r)? as usize);
    }

    // reject trailing garbage: byte counts are exact
    let mut probe = [0u8; 1];
    match r.read(&mut probe) {
        Ok(0) => {}
        Ok(_) => {
            return Err(BioAuthError::Resource(format!(
                "{}: trailing bytes after circuit description",
                path.display()
            )))
        }
        Err(e) => return Err(resource_err(path, e)),
    }

    Ok(GarbledCircuit {
        n,
        m,
        q,
        r: wires,
        gates,
        outputs,
        fixed_wires: vec![FixedWire::None; 0],
        qand,
        qor,
        qxor,
        qnot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garbling::circuit::CircuitBuilder;

    #[test]
    fn test_scd_round_trip_preserves_topology() {
        let mut b = CircuitBuilder::new(4, 1, 32, 64).unwrap();
        let x = b.mixed_op_gate(GateKind::Xor, 0, 1).unwrap();
        let y = b.mixed_op_gate(GateKind::And, 2, 3).unwrap();
        let z = b.mixed_op_gate(GateKind::Or, x, y).unwrap();
        let circuit = b.finish(&[z]).unwrap();

        let dir = std::env::temp_dir().join("bio_auth_mpc_scd_test");
        let path = dir.join("round_trip.scd");
        write_circuit_to_file(&circuit, &path).unwrap();
        let read_back = read_circuit_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(read_back.n, circuit.n);
        assert_eq!(read_back.m, circuit.m);
        assert_eq!(read_back.q, circuit.q);
        assert_eq!(read_back.r, circuit.r);
        assert_eq!(read_back.gates, circuit.gates);
        assert_eq!(read_back.outputs, circuit.outputs);
    }

    #[test]
    fn test_scd_byte_layout() {
        let mut b = CircuitBuilder::new(2, 1, 8, 16).unwrap();
        let out = b.mixed_op_gate(GateKind::And, 0, 1).unwrap();
        let circuit = b.finish(&[out]).unwrap();

        let dir = std::env::temp_dir().join("bio_auth_mpc_scd_test");
        let path = dir.join("layout.scd");
        write_circuit_to_file(&circuit, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();

        // header (16) + one gate record (13) + one output index (4)
        assert_eq!(bytes.len(), 16 + 13 + 4);
        assert_eq!(&bytes[0..4], &2i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1i32.to_le_bytes());
        assert_eq!(bytes[28], super::super::gate::AND_GATE);
    }

    #[test]
    fn test_missing_file_is_resource_error() {
        let err = read_circuit_from_file("/nonexistent/no_such.scd").unwrap_err();
        assert!(matches!(err, BioAuthError::Resource(_)));
    }
}
