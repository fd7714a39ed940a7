//! 会话记录模块
//!
//! 一条连接的全部可变状态（地址四元组、seq/ack 计数器、连接标志）
//! 以及捕获去重逻辑。

mod dedup;
mod record;

pub use dedup::Deduplicator;
pub(crate) use record::Session;
pub use record::{SessionParams, SessionSnapshot};
