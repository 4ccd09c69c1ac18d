//! 电路生成与仿真驱动
//!
//! `circuit_test_and_gen <alg> <num inputs> <input length> [opts...]`
//!
//! alg ∈ {hd, cs, ed, file, all}；opts ⊇ {new, mal, sha3-256}。
//! 构建（或从缓存读取）SCD 电路文件，然后做混淆/求值仿真并打印
//! 门统计与耗时。

use anyhow::Result;
use bio_auth_mpc::distance::{
    BioCircuitBuilder, BioCircuitConfig, CommitmentHash, DistanceFunction, ThreatModel,
};
use bio_auth_mpc::garbling::{
    evaluate, garble, map_outputs, read_circuit_from_file, write_circuit_to_file, GarbledCircuit,
};
use rand::{thread_rng, Rng};
use std::time::Instant;

const ALG_STRS: [&str; 5] = ["hd", "cs", "ed", "file", "all"];

const ALG_DESCRS: [&str; 5] = [
    "Hamming Distance",
    "Cosine Similarity",
    "Euclidean Distance",
    "Alg loaded from file",
    "All Algs",
];

fn describe_usage() {
    println!("\nUsage: circuit_test_and_gen <algorithm> <num inputs> <input length> <opts...>");
    println!("\n<algorithm> can be one of: ");
    for (tag, descr) in ALG_STRS.iter().zip(ALG_DESCRS.iter()) {
        println!("\t{} - {}", tag, descr);
    }
    println!("\nIf <algorithm> == file, the next argument is an .scd filename in the circuit file directory.");
    println!("\n<num inputs> and <input length> must be unsigned integers appropriate for the chosen algorithm.");
    println!("\n<opts...> may be:");
    println!("\tnew - force a new circuit build rather than reading from file.");
    println!("\tmal - include commitment checking and output the result as a third bit.");
    println!("\tsha3-256 - use SHA3-256 as the commitment function (default is SHA2-256).");
    println!();
}

struct Options {
    algs: Vec<DistanceFunction>,
    file: Option<String>,
    num_inputs: usize,
    input_length: usize,
    new_build: bool,
    malicious: bool,
    commitment: CommitmentHash,
}

fn parse_args(args: &[String]) -> Option<Options> {
    if args.len() < 2 {
        return None;
    }
    let alg = args[1].as_str();
    if !ALG_STRS.contains(&alg) {
        return None;
    }

    if alg == "file" {
        let file = args.get(2)?.clone();
        return Some(Options {
            algs: Vec::new(),
            file: Some(file),
            num_inputs: 0,
            input_length: 0,
            new_build: false,
            malicious: false,
            commitment: CommitmentHash::Sha2_256,
        });
    }

    let num_inputs: usize = args.get(2)?.parse().ok()?;
    let input_length: usize = args.get(3)?.parse().ok()?;
    if num_inputs == 0 || input_length == 0 || input_length > 32 {
        return None;
    }

    let mut new_build = false;
    let mut malicious = false;
    let mut commitment = CommitmentHash::Sha2_256;
    for opt in &args[4..] {
        match opt.as_str() {
            "new" => new_build = true,
            "mal" => malicious = true,
            "sha3-256" => commitment = CommitmentHash::Sha3_256,
            _ => return None,
        }
    }

    let algs = match alg {
        "hd" => vec![DistanceFunction::Hamming],
        "cs" => vec![DistanceFunction::Cosine],
        "ed" => vec![DistanceFunction::Euclidean],
        "all" => vec![
            DistanceFunction::Hamming,
            DistanceFunction::Cosine,
            DistanceFunction::Euclidean,
        ],
        _ => unreachable!(),
    };

    Some(Options {
        algs,
        file: None,
        num_inputs,
        input_length,
        new_build,
        malicious,
        commitment,
    })
}

fn simulate(circuit: &GarbledCircuit, label: &str) -> Result<()> {
    let num_trials = 10usize.max(100_000_000 / circuit.q.max(1)).min(100);
    println!("\n****************************************");
    println!("\nSimulating {} over {} trials", label, num_trials);

    let mut rng = thread_rng();
    let mut garble_total = std::time::Duration::ZERO;
    let mut eval_total = std::time::Duration::ZERO;

    for _ in 0..num_trials {
        let start = Instant::now();
        let garbling = garble(circuit, &mut rng)?;
        garble_total += start.elapsed();

        let inputs: Vec<bool> = (0..circuit.n).map(|_| rng.gen()).collect();
        let extracted = garbling.extract_labels(&inputs)?;

        let start = Instant::now();
        let out_labels = evaluate(circuit, &garbling.tables, &extracted)?;
        eval_total += start.elapsed();

        // every output label must map cleanly back to a boolean
        map_outputs(&garbling.output_map, &out_labels)?;
    }

    let per_gate = |total: std::time::Duration| {
        total.as_nanos() as f64 / num_trials as f64 / circuit.q.max(1) as f64
    };
    println!("\nResults:\n");
    println!("Garbling time (ns/gate): {:.2}", per_gate(garble_total));
    println!("Evaluation time (ns/gate): {:.2}", per_gate(eval_total));
    println!("Num gates: {}", circuit.q);
    println!("Num wires: {}", circuit.r);
    println!(
        "AND: {}  OR: {}  XOR: {}  NOT: {}",
        circuit.qand, circuit.qor, circuit.qxor, circuit.qnot
    );
    println!("Garbled table rows: {}", 3 * circuit.table_gate_count());
    println!("****************************************");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(opts) = parse_args(&args) else {
        describe_usage();
        std::process::exit(1);
    };

    if let Some(file) = &opts.file {
        let path = format!("{}{}", bio_auth_mpc::garbling::CIRCUIT_DIR, file);
        match read_circuit_from_file(&path) {
            Ok(circuit) => {
                if let Err(e) = simulate(&circuit, &path) {
                    eprintln!("simulation failed: {}", e);
                    std::process::exit(2);
                }
            }
            Err(e) => {
                eprintln!("could not read circuit file {}: {}", path, e);
                std::process::exit(2);
            }
        }
        return;
    }

    for alg in &opts.algs {
        let mut config = BioCircuitConfig::new(opts.num_inputs, opts.input_length, *alg)
            .with_commitment(opts.commitment);
        if opts.malicious {
            config = config.with_threat_model(ThreatModel::Malicious);
        }
        let file_name = config.scd_file_name();

        let needs_build = opts.new_build || !std::path::Path::new(&file_name).exists();
        if needs_build {
            println!("\nBuilding circuit file {}", file_name);
            let circuit = match BioCircuitBuilder::build(config.clone()) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("circuit build failed: {}", e);
                    std::process::exit(2);
                }
            };
            if let Err(e) = write_circuit_to_file(&circuit, &file_name) {
                eprintln!("could not write {}: {}", file_name, e);
                std::process::exit(2);
            }
        }

        let circuit = match read_circuit_from_file(&file_name) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("could not read circuit file {}: {}", file_name, e);
                std::process::exit(2);
            }
        };
        if let Err(e) = simulate(&circuit, &file_name) {
            eprintln!("simulation failed: {}", e);
            std::process::exit(2);
        }
    }
}
