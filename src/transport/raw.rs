//! 基于原始套接字的传输实现
//!
//! 发送走 `IPPROTO_RAW`（报文自带 IPv4 头），捕获走 `IPPROTO_TCP` 原始套接字。
//! 每次捕获都单独打开一个套接字，内核会把入站 TCP 报文复制给每个原始套接字，
//! 因此前台控制器与后台接收循环都能看到同一个应答。
//!
//! 需要 `CAP_NET_RAW`。内核并不知道这条连接，会对对端的 SYN/ACK 回 RST，
//! 运行前需屏蔽本机发往对端端口的 RST，例如：
//! `iptables -A OUTPUT -p tcp --tcp-flags RST RST -d <peer> --dport <peer_port> -j DROP`

use std::io::{self, Read};
use std::net::SocketAddrV4;
use std::time::{Duration, Instant};

use etherparse::Ipv4HeaderSlice;
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tracing::{debug, trace};

use super::{CaptureFilter, Transport, TransportError};

const IPPROTO_RAW: i32 = 255;
const MAX_PACKET: usize = 65_535;
/// 低于该值的读超时会被内核/socket2 当成 0，即“永远阻塞”
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// 本次读操作可用的超时；剩余时间不足 [`MIN_READ_TIMEOUT`] 时返回 `None`，
/// 捕获随即结束
fn read_timeout(deadline: Instant, now: Instant) -> Option<Duration> {
    deadline
        .checked_duration_since(now)
        .filter(|left| *left >= MIN_READ_TIMEOUT)
}

/// 原始套接字传输
#[derive(Debug)]
pub struct RawSocketTransport {
    tx: Socket,
}

impl RawSocketTransport {
    /// 打开发送套接字
    pub fn open() -> Result<Self, TransportError> {
        let tx = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::from(IPPROTO_RAW)))?;
        debug!("原始发送套接字已打开");
        Ok(Self { tx })
    }

    fn open_capture() -> io::Result<Socket> {
        Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::TCP))
    }

    fn drain(sock: &Socket, filter: &CaptureFilter, max_count: usize, window: Duration) -> Result<Vec<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + window;
        let mut out = Vec::new();
        let mut buf = vec![0u8; MAX_PACKET];

        while out.len() < max_count {
            let Some(timeout) = read_timeout(deadline, Instant::now()) else {
                break;
            };
            sock.set_read_timeout(Some(timeout))?;
            match (&*sock).read(&mut buf) {
                Ok(n) => {
                    if filter.matches(&buf[..n]) {
                        trace!(len = n, "捕获到匹配报文");
                        out.push(buf[..n].to_vec());
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(out)
    }
}

impl Transport for RawSocketTransport {
    fn transmit(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let ip = Ipv4HeaderSlice::from_slice(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        let dest = SockAddr::from(SocketAddrV4::new(ip.destination_addr(), 0));
        self.tx.send_to(bytes, &dest)?;
        Ok(())
    }

    fn capture(&self, filter: &CaptureFilter, max_count: usize, window: Duration) -> Result<Vec<Vec<u8>>, TransportError> {
        let sock = Self::open_capture()?;
        Self::drain(&sock, filter, max_count, window)
    }

    fn request(&self, bytes: &[u8], filter: &CaptureFilter, window: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        // 先开捕获再发送，避免应答先于捕获到达
        let sock = Self::open_capture()?;
        self.transmit(bytes)?;
        Ok(Self::drain(&sock, filter, 1, window)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_timeout_is_the_time_left() {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(250);
        assert_eq!(read_timeout(deadline, now), Some(Duration::from_millis(250)));
        assert_eq!(read_timeout(deadline, now + Duration::from_millis(249)), Some(MIN_READ_TIMEOUT));
    }

    #[test]
    fn read_timeout_ends_capture_below_one_millisecond() {
        let now = Instant::now();
        // 亚微秒级的剩余时间传给 SO_RCVTIMEO 会变成无限等待
        assert_eq!(read_timeout(now + Duration::from_nanos(500), now), None);
        assert_eq!(read_timeout(now + Duration::from_micros(999), now), None);
        assert_eq!(read_timeout(now, now), None);
        assert_eq!(read_timeout(now, now + Duration::from_secs(1)), None);
    }
}
