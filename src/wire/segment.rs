//! IPv4 + TCP 报文段
//!
//! [`Segment`] 是会话核心构造/检查的唯一报文形态：地址头（源/目的地址）
//! 加传输头（端口、seq、ack、标志位、窗口）和载荷。

use std::fmt;
use std::net::Ipv4Addr;

use etherparse::{IpNumber, Ipv4HeaderSlice, PacketBuilder, TcpHeaderSlice};
use thiserror::Error;

use super::TcpFlags;

/// 构造报文时使用的 TTL
pub const DEFAULT_TTL: u8 = 64;
/// 构造报文时通告的接收窗口（字节）
pub const DEFAULT_WINDOW: u16 = 8192;

/// 报文编解码错误
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed IPv4 header: {0}")]
    Ipv4(String),
    #[error("IPv4 packet carries protocol {0}, not TCP")]
    NotTcp(u8),
    #[error("malformed TCP header: {0}")]
    Tcp(String),
    #[error("failed to build segment: {0}")]
    Build(String),
}

/// 一个 IPv4 承载的 TCP 报文段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub payload: Vec<u8>,
}

impl Segment {
    /// 载荷长度（按 32 位序号空间计）
    pub fn payload_len(&self) -> u32 {
        self.payload.len() as u32
    }

    /// 编码为完整的 IPv4 报文（校验和由 `etherparse` 计算）。
    ///
    /// 仅当标志位含 ACK 时才写入确认号；其余情况确认号字段为 0。
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut builder = PacketBuilder::ipv4(self.src_addr.octets(), self.dst_addr.octets(), DEFAULT_TTL)
            .tcp(self.src_port, self.dst_port, self.seq, self.window);
        if self.flags.contains(TcpFlags::FIN) {
            builder = builder.fin();
        }
        if self.flags.contains(TcpFlags::SYN) {
            builder = builder.syn();
        }
        if self.flags.contains(TcpFlags::RST) {
            builder = builder.rst();
        }
        if self.flags.contains(TcpFlags::PSH) {
            builder = builder.psh();
        }
        if self.flags.contains(TcpFlags::URG) {
            builder = builder.urg(0);
        }
        if self.flags.contains(TcpFlags::ACK) {
            builder = builder.ack(self.ack);
        }

        let mut buf = Vec::with_capacity(builder.size(self.payload.len()));
        builder
            .write(&mut buf, &self.payload)
            .map_err(|e| WireError::Build(e.to_string()))?;
        Ok(buf)
    }

    /// 从捕获到的 IPv4 报文解析。
    ///
    /// 以 IPv4 总长度截断，链路层填充（以太网最短帧补齐）不会被当成载荷。
    pub fn parse(bytes: &[u8]) -> Result<Self, WireError> {
        let ip = Ipv4HeaderSlice::from_slice(bytes).map_err(|e| WireError::Ipv4(e.to_string()))?;
        if ip.protocol() != IpNumber::TCP {
            return Err(WireError::NotTcp(ip.protocol().0));
        }

        let hdr_len = ip.slice().len();
        let total = usize::from(ip.total_len()).clamp(hdr_len, bytes.len());
        let tcp_bytes = &bytes[hdr_len..total];
        let tcp = TcpHeaderSlice::from_slice(tcp_bytes).map_err(|e| WireError::Tcp(e.to_string()))?;

        let mut flags = TcpFlags::NONE;
        for (set, flag) in [
            (tcp.fin(), TcpFlags::FIN),
            (tcp.syn(), TcpFlags::SYN),
            (tcp.rst(), TcpFlags::RST),
            (tcp.psh(), TcpFlags::PSH),
            (tcp.ack(), TcpFlags::ACK),
            (tcp.urg(), TcpFlags::URG),
        ] {
            if set {
                flags = flags | flag;
            }
        }

        Ok(Segment {
            src_addr: ip.source_addr(),
            dst_addr: ip.destination_addr(),
            src_port: tcp.source_port(),
            dst_port: tcp.destination_port(),
            seq: tcp.sequence_number(),
            ack: tcp.acknowledgment_number(),
            flags,
            window: tcp.window_size(),
            payload: tcp_bytes[tcp.slice().len()..].to_vec(),
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} [{}] seq={} ack={} win={} len={}",
            self.src_addr,
            self.src_port,
            self.dst_addr,
            self.dst_port,
            self.flags,
            self.seq,
            self.ack,
            self.window,
            self.payload.len()
        )
    }
}
