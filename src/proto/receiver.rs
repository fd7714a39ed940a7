//! 后台接收循环
//!
//! 只在 `connected == true` 时运行。每轮在一个捕获窗口内等待入站报文：
//! 数据段逐段确认，对端 FIN 就地完成被动关闭，对端 RST 把会话打回基线。
//! 单个报文的处理错误只记录日志，不会终止循环。
//!
//! 退出是协作式的：每轮开头检查一次 `connected`，因此停止延迟不超过一个捕获窗口。
//!
//! 应答在锁内构造、锁外发送。每发一个应答前都会确认会话没有在此期间被复位，
//! 复位之后不会再发出旧会话的 ACK/FIN。

use std::sync::Arc;
use std::thread;

use tracing::{debug, info, trace, warn};

use super::connection::{Connection, Shared};
use super::error::{ConnError, ProtocolViolation};
use crate::log::Direction;
use crate::session::Deduplicator;
use crate::transport::Transport;
use crate::wire::{Segment, TcpFlags};

/// 每轮最多取的报文数；取到即返回，不必等满窗口
const CAPTURE_BATCH: usize = 1;

impl<T: Transport> Connection<T> {
    pub(crate) fn spawn_receiver(&self) -> Result<(), ConnError> {
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("rawtcp-receiver".into())
            .spawn(move || run(shared))
            .map_err(ConnError::Spawn)?;
        self.install_receiver(handle);
        Ok(())
    }
}

fn run<T: Transport>(shared: Arc<Shared<T>>) {
    let (filter, window, dedup) = {
        let s = shared.lock();
        (s.filter(), s.params().capture_window, s.params().dedup_captures)
    };
    let mut dedup = Deduplicator::new(dedup);
    info!(?window, "📡 接收循环启动");

    while shared.is_connected() {
        let captured = match shared.transport.capture(&filter, CAPTURE_BATCH, window) {
            Ok(captured) => captured,
            Err(e) => {
                warn!(error = %e, "捕获失败");
                thread::sleep(window);
                continue;
            }
        };
        for bytes in captured {
            if let Err(e) = handle_inbound(&shared, &mut dedup, &bytes) {
                warn!(error = %e, "处理入站报文失败，继续接收");
            }
        }
    }

    info!("接收循环退出");
}

fn handle_inbound<T: Transport>(shared: &Shared<T>, dedup: &mut Deduplicator, bytes: &[u8]) -> Result<(), ConnError> {
    let seg = Segment::parse(bytes).map_err(ProtocolViolation::MissingTcp)?;
    if dedup.is_repeat(&seg) {
        trace!(seq = seg.seq, flags = %seg.flags, "重复交付，丢弃");
        return Ok(());
    }
    shared.log.record(Direction::Received, &seg);

    let (replies, epoch) = {
        let mut s = shared.lock();
        if !s.is_connected() {
            debug!(flags = %seg.flags, "会话已结束，忽略报文");
            return Ok(());
        }

        if seg.flags.contains(TcpFlags::RST) {
            s.restore_baseline();
            warn!("⚠️ 连接被对端重置");
            return Ok(());
        }

        if seg.flags.contains(TcpFlags::FIN) {
            // 被动关闭：确认对端 FIN，随即发出自己的 FIN
            s.advance_ack(seg.payload_len().wrapping_add(1));
            let ack = s.outbound(TcpFlags::ACK, Vec::new());
            s.advance_seq(1);
            let fin = s.outbound(TcpFlags::FIN_ACK, Vec::new());
            s.set_connected(false);
            info!(seq = fin.seq, ack = fin.ack, "对端关闭连接");
            (vec![ack, fin], s.epoch())
        } else if seg.payload.is_empty() {
            trace!(ack = seg.ack, "纯 ACK，无需确认");
            return Ok(());
        } else {
            s.advance_ack(seg.payload_len());
            debug!(len = seg.payload.len(), ack = s.ack(), "确认数据段");
            (vec![s.outbound(TcpFlags::ACK, Vec::new())], s.epoch())
        }
    };

    for reply in &replies {
        if shared.lock().epoch() != epoch {
            debug!(flags = %reply.flags, "会话已复位，丢弃待发应答");
            return Ok(());
        }
        shared.emit(reply)?;
    }
    Ok(())
}
