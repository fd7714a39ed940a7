//! 数据发送：PSH+ACK 并等待确认

use tracing::{debug, warn};

use super::connection::Connection;
use super::error::{ConnError, LinkState, ProtocolViolation};
use crate::transport::Transport;
use crate::wire::TcpFlags;

impl<T: Transport> Connection<T> {
    /// 发送一段载荷并等待对端的 ACK。
    ///
    /// `seq` 在报文交给传输层时即前进 `payload.len()`，不等应答校验。
    /// 超时、应答缺少 TCP 头或缺少 ACK 标志时会复位连接（`seq` 随之回到 `base_seq`）。
    #[tracing::instrument(skip(self, payload), fields(len = payload.len()))]
    pub fn send(&self, payload: &[u8]) -> Result<(), ConnError> {
        let (seg, filter, timeout) = {
            let mut s = self.shared.lock();
            if !s.is_connected() {
                return Err(ConnError::State {
                    op: "send",
                    state: LinkState::Disconnected,
                });
            }
            let seg = s.outbound(TcpFlags::PSH_ACK, payload.to_vec());
            s.advance_seq(seg.payload_len());
            (seg, s.filter(), s.params().timeout)
        };

        let acked = self
            .shared
            .exchange(&seg, &filter, timeout, "ACK of data")
            .and_then(|reply| {
                if reply.flags.contains(TcpFlags::ACK) {
                    Ok(reply)
                } else {
                    Err(ProtocolViolation::UnexpectedFlags {
                        expected: TcpFlags::ACK,
                        got: reply.flags,
                    }
                    .into())
                }
            });

        match acked {
            Ok(reply) => {
                debug!(seq = seg.seq, peer_ack = reply.ack, "数据已确认");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "发送失败，复位连接");
                self.abort();
                Err(e)
            }
        }
    }
}
