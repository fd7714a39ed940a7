use std::thread;

use crate::test::mock::{connected, from_peer, wait_until};
use crate::wire::TcpFlags;

#[test]
fn receiver_acks_are_running_sums_of_payload_lengths() {
    let conn = connected(1000, 5000);
    let mut peer_seq = 5001u32;
    let mut expected = Vec::new();
    for len in 1..=10usize {
        let payload = vec![b'x'; len];
        conn.transport()
            .inject(from_peer(TcpFlags::PSH_ACK, peer_seq, 1001, &payload));
        peer_seq += len as u32;
        expected.push(peer_seq);
    }

    assert!(wait_until(|| conn.transport().sent_count() == 12));
    let acks: Vec<u32> = conn.transport().sent()[2..].iter().map(|s| s.ack).collect();
    assert_eq!(acks, expected);
    assert_eq!(conn.snapshot().ack, 5056);
}

#[test]
fn concurrent_sends_reserve_disjoint_sequence_ranges() {
    const SENDERS: usize = 8;
    let conn = connected(1000, 5000);
    for _ in 0..SENDERS {
        conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 0, b""));
    }

    thread::scope(|s| {
        for _ in 0..SENDERS {
            s.spawn(|| conn.send(b"abc").expect("send"));
        }
    });

    let mut seqs: Vec<u32> = conn
        .transport()
        .sent()
        .into_iter()
        .filter(|s| s.flags == TcpFlags::PSH_ACK)
        .map(|s| s.seq)
        .collect();
    seqs.sort_unstable();
    let expected: Vec<u32> = (0..SENDERS as u32).map(|i| 1001 + 3 * i).collect();
    assert_eq!(seqs, expected);
    assert_eq!(conn.snapshot().seq, 1001 + 3 * SENDERS as u32);
}

#[test]
fn receiver_and_sender_update_independent_counters() {
    let conn = connected(1000, 5000);
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 1005, b""));
    conn.transport().inject(from_peer(TcpFlags::PSH_ACK, 5001, 1001, b"pong"));

    conn.send(b"ping").expect("send");
    assert!(wait_until(|| conn.snapshot().ack == 5005));
    assert_eq!(conn.snapshot().seq, 1005);
}
