//! 伪造报文：在配置的四元组上发送任意报文段，不读写会话计数器

use tracing::warn;

use super::connection::Connection;
use super::error::ConnError;
use crate::transport::Transport;
use crate::wire::TcpFlags;

/// 待发送报文的可控字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgeSpec {
    pub flags: TcpFlags,
    pub seq: u32,
    pub ack: u32,
    pub payload: Vec<u8>,
}

impl<T: Transport> Connection<T> {
    /// 任何状态下都可以调用；已连接时对端看到的序号会与会话记录脱节
    #[tracing::instrument(skip(self, spec), fields(flags = %spec.flags, seq = spec.seq, ack = spec.ack))]
    pub fn forge(&self, spec: ForgeSpec) -> Result<(), ConnError> {
        let seg = {
            let s = self.shared.lock();
            if s.is_connected() {
                warn!("连接中发送伪造报文，对端的 seq/ack 可能与会话记录不一致");
            }
            s.outbound_at(spec.flags, spec.seq, spec.ack, spec.payload)
        };
        self.shared.emit(&seg)
    }
}
