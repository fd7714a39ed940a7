//! 报文格式模块
//!
//! 定义 TCP 标志位集合与 IPv4+TCP 报文段的构造/解析。
//! 编解码全部委托给 `etherparse`，本模块只负责把字段映射到 [`Segment`]。

mod flags;
mod segment;

pub use flags::{FlagParseError, TcpFlags};
pub use segment::{DEFAULT_TTL, DEFAULT_WINDOW, Segment, WireError};
