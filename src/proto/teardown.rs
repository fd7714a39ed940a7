//! 主动关闭：FIN+ACK → ACK → 等待对端 FIN → 最后的 ACK

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use super::connection::Connection;
use super::error::{ConnError, LinkState, ProtocolViolation};
use crate::log::Direction;
use crate::transport::{CaptureFilter, Transport};
use crate::wire::{Segment, TcpFlags};

impl<T: Transport> Connection<T> {
    /// 主动关闭连接。
    ///
    /// 先停止并回收接收线程，再完成 FIN 交换。未连接时返回 [`ConnError::State`]
    /// 且不发送任何报文；其余失败都会改为复位连接。
    #[tracing::instrument(skip(self))]
    pub fn disconnect(&self) -> Result<(), ConnError> {
        {
            let mut s = self.shared.lock();
            if !s.is_connected() {
                return Err(ConnError::State {
                    op: "disconnect",
                    state: LinkState::Disconnected,
                });
            }
            s.set_connected(false);
        }
        self.join_receiver();

        if let Err(e) = self.teardown() {
            warn!(error = %e, "关闭失败，改为复位");
            self.abort();
            return Err(e);
        }
        info!("✅ 连接已关闭");
        Ok(())
    }

    fn teardown(&self) -> Result<(), ConnError> {
        let (fin, filter, timeout) = {
            let s = self.shared.lock();
            (s.outbound(TcpFlags::FIN_ACK, Vec::new()), s.filter(), s.params().timeout)
        };

        let reply = self.shared.exchange(&fin, &filter, timeout, "ACK of FIN")?;
        if reply.flags != TcpFlags::ACK {
            return Err(ProtocolViolation::UnexpectedFlags {
                expected: TcpFlags::ACK,
                got: reply.flags,
            }
            .into());
        }
        self.shared.lock().advance_seq(1);

        let peer_fin = self.await_peer_fin(&filter, timeout)?;
        let last_ack = {
            let mut s = self.shared.lock();
            s.advance_ack(peer_fin.payload_len().wrapping_add(1));
            s.outbound(TcpFlags::ACK, Vec::new())
        };
        self.shared.emit(&last_ack)
    }

    /// 在总时限 `timeout` 内等待对端的 FIN / FIN+ACK
    fn await_peer_fin(&self, filter: &CaptureFilter, timeout: Duration) -> Result<Segment, ConnError> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ConnError::Timeout {
                    waiting_for: "peer FIN",
                    after: timeout,
                });
            }
            for bytes in self.shared.transport.capture(filter, 1, remaining)? {
                match Segment::parse(&bytes) {
                    Ok(seg) if seg.flags.contains(TcpFlags::FIN) => {
                        self.shared.log.record(Direction::Received, &seg);
                        debug!(seq = seg.seq, "收到对端 FIN");
                        return Ok(seg);
                    }
                    Ok(seg) => trace!(flags = %seg.flags, "等待 FIN 时忽略报文"),
                    Err(e) => trace!(error = %e, "等待 FIN 时忽略无法解析的报文"),
                }
            }
        }
    }
}
