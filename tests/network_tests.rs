//! Peer-channel behavior over localhost: session-key handshake, exact
//! byte counts, encryption, and the barrier.

mod common;

use bio_auth_mpc::network::TransmitMode;
use std::thread;

#[test]
fn two_party_plaintext_and_encrypted_round_trip() {
    let roster = common::make_roster(38110, 2);
    let roster2 = roster.clone();

    let server = thread::spawn(move || {
        let mut net = common::connect(0, &roster);
        let msg = net
            .receive_from_peer(1, 5, TransmitMode::Plaintext, None)
            .unwrap();
        assert_eq!(msg, b"hello");
        net.send_to_peer(1, b"goodbye", TransmitMode::Encrypted, None)
            .unwrap();
        let big = net
            .receive_from_peer(1, 4096, TransmitMode::Encrypted, None)
            .unwrap();
        assert!(big.iter().enumerate().all(|(i, &b)| b == (i % 251) as u8));
    });

    let client = thread::spawn(move || {
        let mut net = common::connect(1, &roster2);
        net.send_to_peer(0, b"hello", TransmitMode::Plaintext, None)
            .unwrap();
        let msg = net
            .receive_from_peer(0, 7, TransmitMode::Encrypted, None)
            .unwrap();
        assert_eq!(msg, b"goodbye");
        let big: Vec<u8> = (0..4096).map(|i| (i % 251) as u8).collect();
        net.send_to_peer(0, &big, TransmitMode::Encrypted, None)
            .unwrap();
    });

    server.join().unwrap();
    client.join().unwrap();
}

#[test]
fn encrypted_byte_count_mismatch_is_an_error() {
    let roster = common::make_roster(38120, 2);
    let roster2 = roster.clone();

    let server = thread::spawn(move || {
        let mut net = common::connect(0, &roster);
        // expect 10 bytes but the peer sends 9
        let err = net
            .receive_from_peer(1, 10, TransmitMode::Encrypted, None)
            .unwrap_err();
        let text = err.to_string();
        assert!(text.contains("byte count mismatch"), "{}", text);
    });

    let client = thread::spawn(move || {
        let mut net = common::connect(1, &roster2);
        net.send_to_peer(0, &[0u8; 9], TransmitMode::Encrypted, None)
            .unwrap();
    });

    server.join().unwrap();
    client.join().unwrap();
}

#[test]
fn three_party_barrier_and_counts() {
    let roster = common::make_roster(38130, 3);

    let mut handles = Vec::new();
    for id in 0..3 {
        let roster = roster.clone();
        handles.push(thread::spawn(move || {
            let mut net = common::connect(id, &roster);
            net.multicast_ack(&[0, 1, 2], 2).unwrap();
            // 2 rounds of 1-byte acks to 2 peers each way
            assert_eq!(net.send_count(), 4);
            assert_eq!(net.recv_count(), 4);
        }));
    }
    for h in handles {
        h.join().unwrap();
    }
}
