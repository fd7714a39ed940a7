//! TCP 标志位

use std::fmt;
use std::ops::BitOr;

use thiserror::Error;

/// 标志位字母串解析失败
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagParseError {
    #[error("empty flag set (use \".\" for none)")]
    Empty,
    #[error("unknown tcp flag: {0:?}")]
    Unknown(char),
}

/// TCP 控制位集合（低 6 位：FIN/SYN/RST/PSH/ACK/URG）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TcpFlags(u8);

impl TcpFlags {
    pub const NONE: TcpFlags = TcpFlags(0);
    pub const FIN: TcpFlags = TcpFlags(0x01);
    pub const SYN: TcpFlags = TcpFlags(0x02);
    pub const RST: TcpFlags = TcpFlags(0x04);
    pub const PSH: TcpFlags = TcpFlags(0x08);
    pub const ACK: TcpFlags = TcpFlags(0x10);
    pub const URG: TcpFlags = TcpFlags(0x20);

    pub const SYN_ACK: TcpFlags = TcpFlags(0x12);
    pub const FIN_ACK: TcpFlags = TcpFlags(0x11);
    pub const RST_ACK: TcpFlags = TcpFlags(0x14);
    pub const PSH_ACK: TcpFlags = TcpFlags(0x18);

    /// 显示顺序与字母（和常见抓包工具一致："FA"、"SA"、"PA"）
    const LETTERS: [(TcpFlags, char); 6] = [
        (TcpFlags::FIN, 'F'),
        (TcpFlags::SYN, 'S'),
        (TcpFlags::RST, 'R'),
        (TcpFlags::PSH, 'P'),
        (TcpFlags::ACK, 'A'),
        (TcpFlags::URG, 'U'),
    ];

    pub const fn from_bits(bits: u8) -> TcpFlags {
        TcpFlags(bits & 0x3f)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// `other` 中的每一位都被置位
    pub const fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 解析字母形式的标志位，例如 `"SA"`、`"pa"`；`"."` 表示无标志。
    pub fn parse(raw: &str) -> Result<Self, FlagParseError> {
        let raw = raw.trim();
        if raw == "." {
            return Ok(Self::NONE);
        }
        if raw.is_empty() {
            return Err(FlagParseError::Empty);
        }
        let mut flags = Self::NONE;
        for ch in raw.chars() {
            let upper = ch.to_ascii_uppercase();
            let Some((flag, _)) = Self::LETTERS.iter().find(|(_, l)| *l == upper) else {
                return Err(FlagParseError::Unknown(ch));
            };
            flags = flags | *flag;
        }
        Ok(flags)
    }
}

impl BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str(".");
        }
        for (flag, letter) in Self::LETTERS {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}
