//! 捕获去重
//!
//! 某些捕获机制会把同一个入站报文交付两次。开启后，与上一个已接受报文
//! 身份（seq、ack、标志位、载荷长度）完全相同的报文会被丢弃；默认关闭。

use crate::wire::{Segment, TcpFlags};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SegmentKey {
    seq: u32,
    ack: u32,
    flags: TcpFlags,
    len: usize,
}

impl SegmentKey {
    fn of(seg: &Segment) -> Self {
        Self {
            seq: seg.seq,
            ack: seg.ack,
            flags: seg.flags,
            len: seg.payload.len(),
        }
    }
}

/// 按报文身份去重
#[derive(Debug, Default)]
pub struct Deduplicator {
    enabled: bool,
    last: Option<SegmentKey>,
}

impl Deduplicator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, last: None }
    }

    /// 是否为紧接着的重复交付；不是则记为最近一次接受的报文
    pub fn is_repeat(&mut self, seg: &Segment) -> bool {
        if !self.enabled {
            return false;
        }
        let key = SegmentKey::of(seg);
        if self.last == Some(key) {
            return true;
        }
        self.last = Some(key);
        false
    }
}
