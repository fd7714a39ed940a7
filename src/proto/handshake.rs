//! 主动打开：SYN → SYN/ACK → ACK

use std::time::Duration;

use tracing::{info, warn};

use super::connection::Connection;
use super::error::{ConnError, LinkState, ProtocolViolation};
use crate::transport::{CaptureFilter, Transport};
use crate::wire::{Segment, TcpFlags};

impl<T: Transport> Connection<T> {
    /// 三次握手。成功后 `connected = true` 并启动接收循环。
    ///
    /// 已连接时返回 [`ConnError::State`] 且不改动状态。握手任何一步失败都会
    /// 发送 RST 并把会话恢复到基线，再返回触发失败的错误；不会自动重试。
    #[tracing::instrument(skip(self))]
    pub fn connect(&self) -> Result<(), ConnError> {
        if self.is_connected() {
            return Err(ConnError::State {
                op: "connect",
                state: LinkState::Connected,
            });
        }
        // 对端关闭后接收线程会自行退出，这里回收它
        self.join_receiver();

        let (syn, filter, timeout) = {
            let mut s = self.shared.lock();
            s.restore_baseline();
            let base_seq = s.params().base_seq;
            (
                s.outbound_at(TcpFlags::SYN, base_seq, 0, Vec::new()),
                s.filter(),
                s.params().timeout,
            )
        };
        self.shared.log.session_started();
        info!(seq = syn.seq, peer = %syn.dst_addr, port = syn.dst_port, "发送 SYN");

        let opened = self
            .handshake(&syn, &filter, timeout)
            .and_then(|()| self.spawn_receiver());
        if let Err(e) = opened {
            warn!(error = %e, "握手失败，发送 RST");
            self.abort();
            return Err(e);
        }
        Ok(())
    }

    fn handshake(&self, syn: &Segment, filter: &CaptureFilter, timeout: Duration) -> Result<(), ConnError> {
        let reply = self.shared.exchange(syn, filter, timeout, "SYN/ACK")?;
        if !reply.flags.contains(TcpFlags::SYN_ACK) {
            return Err(ProtocolViolation::UnexpectedFlags {
                expected: TcpFlags::SYN_ACK,
                got: reply.flags,
            }
            .into());
        }

        let ack = {
            let mut s = self.shared.lock();
            s.establish(reply.seq);
            if reply.ack != s.seq() {
                return Err(ProtocolViolation::AckMismatch {
                    expected: s.seq(),
                    got: reply.ack,
                }
                .into());
            }
            s.outbound(TcpFlags::ACK, Vec::new())
        };
        self.shared.emit(&ack)?;

        self.shared.lock().set_connected(true);
        info!(seq = ack.seq, ack = ack.ack, "✅ 连接已建立");
        Ok(())
    }
}
