//! 传输协作者
//!
//! 会话核心只通过 [`Transport`] 收发报文：发送一个完整的 IPv4 报文，
//! 或在有限时间窗口内捕获匹配过滤条件的入站报文。

mod raw;

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use etherparse::{IpNumber, Ipv4HeaderSlice, TcpHeaderSlice};
use thiserror::Error;

pub use raw::RawSocketTransport;

/// 底层收发失败
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

/// 入站报文过滤条件（对端地址 + 会话端口对）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureFilter {
    pub peer_addr: Ipv4Addr,
    pub peer_port: u16,
    pub local_port: u16,
}

impl CaptureFilter {
    /// 判断一个原始 IPv4 报文是否属于本会话。
    ///
    /// 来自对端的非 TCP 报文同样放行，由上层判定为缺少 TCP 头。
    pub fn matches(&self, bytes: &[u8]) -> bool {
        let Ok(ip) = Ipv4HeaderSlice::from_slice(bytes) else {
            return false;
        };
        if ip.source_addr() != self.peer_addr {
            return false;
        }
        if ip.protocol() != IpNumber::TCP {
            return true;
        }
        let Some(tcp_bytes) = bytes.get(ip.slice().len()..) else {
            return false;
        };
        match TcpHeaderSlice::from_slice(tcp_bytes) {
            Ok(tcp) => tcp.source_port() == self.peer_port && tcp.destination_port() == self.local_port,
            Err(_) => false,
        }
    }
}

/// 报文收发抽象
///
/// 每次 `capture` 都是一次独立、可重复的捕获（不是持久流）。
pub trait Transport: Send + Sync + 'static {
    /// 发送一个完整的 IPv4 报文
    fn transmit(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 在 `window` 内捕获至多 `max_count` 个匹配 `filter` 的报文；超时返回已捕获部分（可能为空）
    fn capture(&self, filter: &CaptureFilter, max_count: usize, window: Duration) -> Result<Vec<Vec<u8>>, TransportError>;

    /// 发送并等待单个应答；`window` 内无应答返回 `Ok(None)`
    fn request(&self, bytes: &[u8], filter: &CaptureFilter, window: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        self.transmit(bytes)?;
        Ok(self.capture(filter, 1, window)?.into_iter().next())
    }
}
