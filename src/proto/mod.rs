//! 协议引擎
//!
//! 单会话的用户态 TCP 端点：握手、数据发送、后台接收循环、主动关闭与复位。
//! 前台线程与接收线程共享同一条会话记录，所有读改写都在一把互斥锁内完成，
//! 任何阻塞的收发都在锁外进行。
//!
//! ```text
//! DISCONNECTED ──connect──▶ CONNECTED
//!      ▲                        │ disconnect / 对端 FIN / 对端 RST
//!      └────────────────────────┘
//! 任意状态 ──reset──▶ DISCONNECTED
//! ```

mod connection;
mod error;
mod forge;
mod handshake;
mod receiver;
mod reset;
mod sender;
mod teardown;

pub use connection::Connection;
pub use error::{ConnError, ErrorKind, LinkState, ProtocolViolation};
pub use forge::ForgeSpec;
