//! 报文日志
//!
//! 会话核心对每个发出的、以及每个被处理的入站报文调用一次 [`PacketLog::record`]。
//! 日志失败不会影响连接：实现方自行吞掉错误。

mod file;

use std::fmt;

use tracing::{debug, info};

use crate::wire::Segment;

pub use file::FilePacketLog;

/// 报文方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Sent => f.write_str("SENT"),
            Direction::Received => f.write_str("RECEIVED"),
        }
    }
}

/// 报文日志接口
pub trait PacketLog: Send + Sync {
    /// 每次 `connect()` 开始时调用一次
    fn session_started(&self) {}

    fn record(&self, direction: Direction, segment: &Segment);
}

/// 载荷的可读形式：可打印文本原样输出，否则输出十六进制
pub fn render_payload(payload: &[u8]) -> String {
    if payload.is_empty() {
        return String::from("-");
    }
    match std::str::from_utf8(payload) {
        Ok(text) if text.chars().all(|c| !c.is_control() || c == '\n' || c == '\r' || c == '\t') => {
            format!("{text:?}")
        }
        _ => payload.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" "),
    }
}

/// 输出到 tracing（verbose 时为 info 级别，否则 debug）
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPacketLog {
    pub verbose: bool,
}

impl PacketLog for TracingPacketLog {
    fn record(&self, direction: Direction, segment: &Segment) {
        let payload = render_payload(&segment.payload);
        if self.verbose {
            info!(%direction, flags = %segment.flags, seq = segment.seq, ack = segment.ack, len = segment.payload.len(), %payload, "{segment}");
        } else {
            debug!(%direction, flags = %segment.flags, seq = segment.seq, ack = segment.ack, len = segment.payload.len(), %payload, "{segment}");
        }
    }
}

/// 同时写入两个日志
impl<A: PacketLog, B: PacketLog> PacketLog for (A, B) {
    fn session_started(&self) {
        self.0.session_started();
        self.1.session_started();
    }

    fn record(&self, direction: Direction, segment: &Segment) {
        self.0.record(direction, segment);
        self.1.record(direction, segment);
    }
}
