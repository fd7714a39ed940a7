//! 会话记录
//!
//! 所有计数器运算都在 32 位序号空间内回绕（mod 2^32）。
//! [`Session`] 只在 `proto` 内部、且只在会话互斥锁保护下被修改。

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::transport::CaptureFilter;
use crate::wire::{DEFAULT_WINDOW, Segment, TcpFlags};

/// 构造会话时提供的参数（来自配置）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    pub local_addr: Ipv4Addr,
    pub peer_addr: Ipv4Addr,
    pub local_port: u16,
    pub peer_port: u16,
    /// 本端初始序号
    pub base_seq: u32,
    /// 每一步“等待应答”的上限
    pub timeout: Duration,
    /// 接收循环单次捕获窗口，同时也是停止接收循环的最大延迟
    pub capture_window: Duration,
    /// 丢弃与上一个已接受报文完全相同的重复捕获
    pub dedup_captures: bool,
}

impl Default for SessionParams {
    fn default() -> Self {
        SessionParams::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionParams {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            local_addr: cfg.local_addr,
            peer_addr: cfg.peer_addr,
            local_port: cfg.local_port,
            peer_port: cfg.peer_port,
            base_seq: cfg.base_seq,
            timeout: Duration::from_secs(cfg.timeout_secs),
            capture_window: Duration::from_millis(cfg.capture_window_ms),
            dedup_captures: cfg.dedup_captures,
        }
    }
}

/// 会话状态快照（只读，可序列化，用于状态查询与持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub local_addr: Ipv4Addr,
    pub peer_addr: Ipv4Addr,
    pub local_port: u16,
    pub peer_port: u16,
    pub connected: bool,
    pub base_seq: u32,
    pub seq: u32,
    pub base_ack: u32,
    pub ack: u32,
    /// `seq - base_seq`（回绕）
    pub relative_seq: u32,
    /// `ack - base_ack`（回绕）
    pub relative_ack: u32,
}

impl fmt::Display for SessionSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "local:       {}:{}", self.local_addr, self.local_port)?;
        writeln!(f, "peer:        {}:{}", self.peer_addr, self.peer_port)?;
        writeln!(f, "connected:   {}", self.connected)?;
        writeln!(f, "base seq:    {}", self.base_seq)?;
        writeln!(f, "seq:         {} ({})", self.seq, self.relative_seq)?;
        writeln!(f, "base ack:    {}", self.base_ack)?;
        write!(f, "ack:         {} ({})", self.ack, self.relative_ack)
    }
}

/// 会话记录：一次逻辑连接的可变状态
#[derive(Debug)]
pub(crate) struct Session {
    params: SessionParams,
    seq: u32,
    base_ack: u32,
    ack: u32,
    connected: bool,
    /// 每次回到基线加一；锁外发送前据此判断期间是否发生过复位
    epoch: u64,
}

impl Session {
    pub(crate) fn new(params: SessionParams) -> Self {
        let seq = params.base_seq;
        Self {
            params,
            seq,
            base_ack: 0,
            ack: 0,
            connected: false,
            epoch: 0,
        }
    }

    pub(crate) fn params(&self) -> &SessionParams {
        &self.params
    }

    /// 替换参数并回到基线
    pub(crate) fn set_params(&mut self, params: SessionParams) {
        self.params = params;
        self.restore_baseline();
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connected
    }

    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub(crate) fn seq(&self) -> u32 {
        self.seq
    }

    pub(crate) fn ack(&self) -> u32 {
        self.ack
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    /// 回到基线：`connected = false, seq = base_seq, ack = 0, base_ack = 0`
    pub(crate) fn restore_baseline(&mut self) {
        self.base_ack = 0;
        self.ack = 0;
        self.seq = self.params.base_seq;
        self.connected = false;
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub(crate) fn advance_seq(&mut self, n: u32) {
        self.seq = self.seq.wrapping_add(n);
    }

    pub(crate) fn advance_ack(&mut self, n: u32) {
        self.ack = self.ack.wrapping_add(n);
    }

    /// 记录握手结果：本端 SYN 消耗一个序号，对端初始序号为 `peer_isn`
    pub(crate) fn establish(&mut self, peer_isn: u32) {
        self.advance_seq(1);
        self.base_ack = peer_isn;
        self.ack = peer_isn.wrapping_add(1);
    }

    /// 以当前 seq/ack 构造一个发往对端的报文段
    pub(crate) fn outbound(&self, flags: TcpFlags, payload: Vec<u8>) -> Segment {
        self.outbound_at(flags, self.seq, self.ack, payload)
    }

    pub(crate) fn outbound_at(&self, flags: TcpFlags, seq: u32, ack: u32, payload: Vec<u8>) -> Segment {
        Segment {
            src_addr: self.params.local_addr,
            dst_addr: self.params.peer_addr,
            src_port: self.params.local_port,
            dst_port: self.params.peer_port,
            seq,
            ack,
            flags,
            window: DEFAULT_WINDOW,
            payload,
        }
    }

    pub(crate) fn filter(&self) -> CaptureFilter {
        CaptureFilter {
            peer_addr: self.params.peer_addr,
            peer_port: self.params.peer_port,
            local_port: self.params.local_port,
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            local_addr: self.params.local_addr,
            peer_addr: self.params.peer_addr,
            local_port: self.params.local_port,
            peer_port: self.params.peer_port,
            connected: self.connected,
            base_seq: self.params.base_seq,
            seq: self.seq,
            base_ack: self.base_ack,
            ack: self.ack,
            relative_seq: self.seq.wrapping_sub(self.params.base_seq),
            relative_ack: self.ack.wrapping_sub(self.base_ack),
        }
    }
}
