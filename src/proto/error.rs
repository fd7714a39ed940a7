//! 连接错误

use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::transport::TransportError;
use crate::wire::{TcpFlags, WireError};

/// 连接标志的两种取值（用于错误信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Connected => f.write_str("connected"),
            LinkState::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 当前连接状态下不允许该操作
    State,
    /// 超时未收到应答
    Timeout,
    /// 应答缺少 TCP 头、标志位不符或确认号不符
    Protocol,
    /// 底层收发失败
    Transport,
}

#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("reply carries no TCP header: {0}")]
    MissingTcp(#[source] WireError),
    #[error("expected flags {expected}, got {got}")]
    UnexpectedFlags { expected: TcpFlags, got: TcpFlags },
    #[error("acknowledgment number {got} does not match seq {expected}")]
    AckMismatch { expected: u32, got: u32 },
}

#[derive(Debug, Error)]
pub enum ConnError {
    #[error("cannot {op} while {state}")]
    State { op: &'static str, state: LinkState },
    #[error("timed out after {after:?} waiting for {waiting_for}")]
    Timeout { waiting_for: &'static str, after: Duration },
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("failed to start receiver thread: {0}")]
    Spawn(#[source] io::Error),
}

impl ConnError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnError::State { .. } => ErrorKind::State,
            ConnError::Timeout { .. } => ErrorKind::Timeout,
            ConnError::Protocol(_) => ErrorKind::Protocol,
            ConnError::Transport(_) | ConnError::Wire(_) | ConnError::Spawn(_) => ErrorKind::Transport,
        }
    }
}
