//! 复位：发送 RST 并把会话无条件打回基线

use tracing::{info, warn};

use super::connection::Connection;
use super::error::ConnError;
use crate::transport::Transport;
use crate::wire::TcpFlags;

impl<T: Transport> Connection<T> {
    /// 发送 RST（序号为 `seq`，缺省用当前 seq），然后恢复
    /// `connected = false, seq = base_seq, ack = 0, base_ack = 0`，并回收接收线程。
    ///
    /// 无论起始状态如何都会回到基线；RST 发送失败时仍完成清理，再返回该错误。
    /// 可重复调用。
    #[tracing::instrument(skip(self))]
    pub fn reset(&self, seq: Option<u32>) -> Result<(), ConnError> {
        let rst = {
            let s = self.shared.lock();
            s.outbound_at(TcpFlags::RST, seq.unwrap_or(s.seq()), 0, Vec::new())
        };
        let sent = self.shared.emit(&rst);

        self.shared.lock().restore_baseline();
        // 接收线程在下一轮开头看到 connected == false 后退出
        self.join_receiver();

        match &sent {
            Ok(()) => info!(seq = rst.seq, "连接已复位"),
            Err(e) => warn!(error = %e, "RST 发送失败，会话已恢复基线"),
        }
        sent
    }

    /// 应用退出时调用：仅在已连接时复位
    pub fn close(&self) -> Result<(), ConnError> {
        if self.is_connected() {
            info!("关闭前向打开的连接发送 RST");
            return self.reset(None);
        }
        Ok(())
    }

    /// 失败路径上的复位，RST 发送失败只记录日志
    pub(crate) fn abort(&self) {
        if let Err(e) = self.reset(None) {
            warn!(error = %e, "复位时发送 RST 失败");
        }
    }
}
