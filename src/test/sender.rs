use crate::proto::{Connection, ConnError, ErrorKind, ProtocolViolation};
use crate::test::mock::{ScriptedTransport, connected, from_peer, params, udp_from_peer};
use crate::wire::TcpFlags;

#[test]
fn send_advances_seq_by_payload_length() {
    let conn = connected(1000, 5000);
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 1006, b""));

    conn.send(b"hello").expect("send");

    let data = conn.transport().last_sent();
    assert_eq!(data.flags, TcpFlags::PSH_ACK);
    assert_eq!((data.seq, data.ack), (1001, 5001));
    assert_eq!(data.payload, b"hello");

    let snap = conn.snapshot();
    assert!(snap.connected);
    assert_eq!((snap.seq, snap.ack), (1006, 5001));
    assert_eq!(snap.relative_seq, 6);
}

#[test]
fn consecutive_sends_use_consecutive_sequence_numbers() {
    let conn = connected(1000, 5000);
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 1004, b""));
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 1008, b""));

    conn.send(b"abc").expect("first");
    conn.send(b"defg").expect("second");

    let data: Vec<_> = conn
        .transport()
        .sent()
        .into_iter()
        .filter(|s| s.flags == TcpFlags::PSH_ACK)
        .map(|s| s.seq)
        .collect();
    assert_eq!(data, vec![1001, 1004]);
    assert_eq!(conn.snapshot().seq, 1008);
}

#[test]
fn send_while_disconnected_transmits_nothing() {
    let conn = Connection::new(params(1000), ScriptedTransport::default());

    let err = conn.send(b"hello").expect_err("not connected");
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(conn.transport().sent_count(), 0);
    assert_eq!(conn.snapshot().seq, 1000);
}

#[test]
fn missing_ack_resets_with_advanced_seq() {
    let conn = connected(1000, 5000);
    conn.transport().reply_silence();

    let err = conn.send(b"hello").expect_err("no ACK");
    assert_eq!(err.kind(), ErrorKind::Timeout);

    let rst = conn.transport().last_sent();
    assert_eq!(rst.flags, TcpFlags::RST);
    assert_eq!(rst.seq, 1006);

    let snap = conn.snapshot();
    assert_eq!((snap.connected, snap.seq, snap.ack, snap.base_ack), (false, 1000, 0, 0));
    assert!(!conn.has_receiver());
}

#[test]
fn reply_without_ack_flag_is_a_protocol_error() {
    let conn = connected(1000, 5000);
    conn.transport().reply(from_peer(TcpFlags::PSH, 5001, 0, b"x"));

    let err = conn.send(b"hello").expect_err("no ACK flag");
    assert!(matches!(
        err,
        ConnError::Protocol(ProtocolViolation::UnexpectedFlags { got, .. }) if got == TcpFlags::PSH
    ));
    assert!(!conn.is_connected());
}

#[test]
fn non_tcp_reply_resets_the_connection() {
    let conn = connected(1000, 5000);
    conn.transport().reply_raw(udp_from_peer());

    let err = conn.send(b"hello").expect_err("udp reply");
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(conn.transport().last_sent().flags, TcpFlags::RST);
    assert_eq!(conn.snapshot().seq, 1000);
}

#[test]
fn send_of_empty_payload_keeps_seq() {
    let conn = connected(1000, 5000);
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 1001, b""));

    conn.send(b"").expect("empty send");
    assert_eq!(conn.snapshot().seq, 1001);
    assert!(conn.transport().last_sent().payload.is_empty());
}

#[test]
fn seq_wraps_when_sending_across_the_boundary() {
    let conn = connected(u32::MAX - 3, 5000);
    assert_eq!(conn.snapshot().seq, u32::MAX - 2);
    conn.transport().reply(from_peer(TcpFlags::ACK, 5001, 2, b""));

    conn.send(b"hello").expect("send");
    assert_eq!(conn.snapshot().seq, 2);
}
