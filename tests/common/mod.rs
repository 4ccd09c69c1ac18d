//! Shared helpers for the integration suites: cached RSA keypairs and
//! loopback peer rosters.

use bio_auth_mpc::network::{PeerAddress, PeerNet, RsaKeypair};
use std::sync::OnceLock;

static KEYS: OnceLock<Vec<RsaKeypair>> = OnceLock::new();

pub fn test_keypairs() -> &'static Vec<RsaKeypair> {
    KEYS.get_or_init(|| {
        let mut rng = rand::thread_rng();
        (0..3)
            .map(|_| RsaKeypair::generate(&mut rng, 1024).unwrap())
            .collect()
    })
}

/// Build a localhost roster on consecutive ports and materialize the public
/// key files the connect handshake reads.
pub fn make_roster(base_port: u16, count: usize) -> Vec<PeerAddress> {
    let keys = test_keypairs();
    let dir = std::env::temp_dir();
    (0..count)
        .map(|id| {
            let path = dir.join(format!("bio_auth_mpc_test_pub_{}_{}.json", base_port, id));
            keys[id].public.save_json(&path).unwrap();
            PeerAddress {
                id,
                ip: "127.0.0.1".to_string(),
                port: base_port + id as u16,
                rsa_pubkey_path: path.to_string_lossy().into_owned(),
            }
        })
        .collect()
}

pub fn connect(id: usize, roster: &[PeerAddress]) -> PeerNet {
    PeerNet::connect(id, &test_keypairs()[id].private, roster).unwrap()
}
