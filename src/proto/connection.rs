//! 连接对象与共享状态
//!
//! [`Connection`] 独占一条会话记录；记录与传输、日志一起放在 `Shared` 里，
//! 由前台线程和接收线程通过 `Arc` 共享。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{error, trace, warn};

use super::error::{ConnError, LinkState, ProtocolViolation};
use crate::log::{Direction, PacketLog, TracingPacketLog};
use crate::session::{Session, SessionParams, SessionSnapshot};
use crate::transport::{CaptureFilter, Transport};
use crate::wire::Segment;

pub(crate) struct Shared<T> {
    pub(crate) transport: T,
    pub(crate) log: Box<dyn PacketLog>,
    session: Mutex<Session>,
}

impl<T: Transport> Shared<T> {
    /// 会话锁；持锁线程 panic 后记录依然可用
    pub(crate) fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.lock().is_connected()
    }

    /// 编码、记录并发送一个报文段
    pub(crate) fn emit(&self, seg: &Segment) -> Result<(), ConnError> {
        let bytes = seg.encode()?;
        self.log.record(Direction::Sent, seg);
        self.transport.transmit(&bytes)?;
        trace!(flags = %seg.flags, seq = seg.seq, ack = seg.ack, "已发送");
        Ok(())
    }

    /// 发送一个报文段并等待单个应答（必须带 TCP 头）
    pub(crate) fn exchange(
        &self,
        seg: &Segment,
        filter: &CaptureFilter,
        timeout: Duration,
        waiting_for: &'static str,
    ) -> Result<Segment, ConnError> {
        let bytes = seg.encode()?;
        self.log.record(Direction::Sent, seg);
        let reply = self
            .transport
            .request(&bytes, filter, timeout)?
            .ok_or(ConnError::Timeout {
                waiting_for,
                after: timeout,
            })?;
        let reply = Segment::parse(&reply).map_err(ProtocolViolation::MissingTcp)?;
        self.log.record(Direction::Received, &reply);
        Ok(reply)
    }
}

/// 单会话用户态 TCP 端点
///
/// 所有操作都是 `&self`，可以在多个线程间共享，但同一时刻只应有一个线程
/// 调用 `connect()`：`connected` 的检查与置位不是原子的。
pub struct Connection<T: Transport> {
    pub(crate) shared: Arc<Shared<T>>,
    receiver: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Transport> Connection<T> {
    pub fn new(params: SessionParams, transport: T) -> Self {
        Self::with_packet_log(params, transport, TracingPacketLog::default())
    }

    pub fn with_packet_log(params: SessionParams, transport: T, log: impl PacketLog + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                transport,
                log: Box::new(log),
                session: Mutex::new(Session::new(params)),
            }),
            receiver: Mutex::new(None),
        }
    }

    pub fn transport(&self) -> &T {
        &self.shared.transport
    }

    /// 当前 seq/ack/连接状态的只读快照
    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.is_connected()
    }

    pub fn params(&self) -> SessionParams {
        self.shared.lock().params().clone()
    }

    /// 替换地址/初始序号/超时等参数，计数器回到基线；已连接时拒绝
    pub fn reconfigure(&self, params: SessionParams) -> Result<(), ConnError> {
        let mut s = self.shared.lock();
        if s.is_connected() {
            return Err(ConnError::State {
                op: "reconfigure",
                state: LinkState::Connected,
            });
        }
        s.set_params(params);
        Ok(())
    }

    pub(crate) fn install_receiver(&self, handle: JoinHandle<()>) {
        let mut slot = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.replace(handle).is_some() {
            warn!("覆盖了一个未回收的接收线程句柄");
        }
    }

    /// 等待接收线程退出并清掉句柄；调用前 `connected` 必须已为 false
    pub(crate) fn join_receiver(&self) {
        let handle = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                error!("接收线程 panic");
            }
        }
    }

    pub(crate) fn has_receiver(&self) -> bool {
        self.receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T: Transport> Drop for Connection<T> {
    fn drop(&mut self) {
        // 不发送任何报文，只让接收线程退出
        self.shared.lock().set_connected(false);
        self.join_receiver();
    }
}
