//! 交互式控制台
//!
//! 一行一条命令，驱动一个 [`Connection`]。命令出错只打印，不会结束会话。

use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::proto::{Connection, ForgeSpec};
use crate::transport::Transport;
use crate::wire::TcpFlags;

pub const HELP: &str = "\
commands:
  connect                              three-way handshake
  send <text>                          send text (escapes: \\n \\r \\t \\\\)
  disconnect                           graceful close
  reset [seq]                          send RST and reset the session
  status                               show session counters
  forge <flags> <seq> <ack> [text]     send a raw segment (flags: F S R P A U, '.' for none)
  help                                 show this text
  quit                                 reset an open connection and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Send(Vec<u8>),
    Disconnect,
    Reset(Option<u32>),
    Status,
    Forge(ForgeSpec),
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim_start();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim_start()),
            None => (line.trim_end(), ""),
        };
        match word.to_ascii_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "send" => {
                if rest.is_empty() {
                    return Err("usage: send <text>".to_string());
                }
                Ok(Self::Send(unescape(rest.trim_end_matches(['\r', '\n']))))
            }
            "disconnect" => Ok(Self::Disconnect),
            "reset" => match rest.trim() {
                "" => Ok(Self::Reset(None)),
                raw => parse_u32(raw, "seq").map(|seq| Self::Reset(Some(seq))),
            },
            "status" => Ok(Self::Status),
            "forge" => parse_forge(rest),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "" => Err("empty command".to_string()),
            other => Err(format!("unknown command: {other} (try `help`)")),
        }
    }
}

fn parse_u32(raw: &str, what: &str) -> Result<u32, String> {
    raw.parse::<u32>()
        .map_err(|e| format!("invalid {what} {raw:?}: {e}"))
}

fn parse_forge(rest: &str) -> Result<Command, String> {
    const USAGE: &str = "usage: forge <flags> <seq> <ack> [text]";
    let mut parts = rest.splitn(4, char::is_whitespace);
    let flags = parts.next().filter(|s| !s.is_empty()).ok_or(USAGE)?;
    let seq = parts.next().ok_or(USAGE)?;
    let ack = parts.next().ok_or(USAGE)?;
    let payload = parts.next().map(|p| unescape(p.trim_end_matches(['\r', '\n']))).unwrap_or_default();
    Ok(Command::Forge(ForgeSpec {
        flags: TcpFlags::parse(flags).map_err(|e| e.to_string())?,
        seq: parse_u32(seq, "seq")?,
        ack: parse_u32(ack, "ack")?,
        payload,
    }))
}

fn unescape(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('\\') => out.push(b'\\'),
            Some(other) => {
                out.push(b'\\');
                let mut buf = [0u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => out.push(b'\\'),
        }
    }
    out
}

/// 执行一条命令之后是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'a, T: Transport> {
    conn: &'a Connection<T>,
}

impl<'a, T: Transport> Console<'a, T> {
    pub fn new(conn: &'a Connection<T>) -> Self {
        Self { conn }
    }

    pub fn execute(&self, cmd: Command, out: &mut impl Write) -> io::Result<Flow> {
        debug!(?cmd, "执行命令");
        let result = match cmd {
            Command::Connect => self.conn.connect(),
            Command::Send(payload) => self.conn.send(&payload),
            Command::Disconnect => self.conn.disconnect(),
            Command::Reset(seq) => self.conn.reset(seq),
            Command::Forge(spec) => self.conn.forge(spec),
            Command::Status => {
                writeln!(out, "{}", self.conn.snapshot())?;
                return Ok(Flow::Continue);
            }
            Command::Help => {
                writeln!(out, "{HELP}")?;
                return Ok(Flow::Continue);
            }
            Command::Quit => {
                if let Err(e) = self.conn.close() {
                    writeln!(out, "error: {e}")?;
                }
                return Ok(Flow::Quit);
            }
        };
        match result {
            Ok(()) => {
                let snap = self.conn.snapshot();
                writeln!(out, "ok (connected={}, seq={}, ack={})", snap.connected, snap.seq, snap.ack)?;
            }
            Err(e) => writeln!(out, "error: {e}")?,
        }
        Ok(Flow::Continue)
    }

    /// 逐行读取并执行，直到 `quit` 或输入结束（结束时同样关闭连接）
    pub fn run(&self, input: impl BufRead, mut out: impl Write) -> io::Result<()> {
        write!(out, "rawtcp> ")?;
        out.flush()?;
        for line in input.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                let flow = match Command::parse(&line) {
                    Ok(cmd) => self.execute(cmd, &mut out)?,
                    Err(e) => {
                        writeln!(out, "error: {e}")?;
                        Flow::Continue
                    }
                };
                if flow == Flow::Quit {
                    return Ok(());
                }
            }
            write!(out, "rawtcp> ")?;
            out.flush()?;
        }
        writeln!(out)?;
        if let Err(e) = self.conn.close() {
            writeln!(out, "error: {e}")?;
        }
        Ok(())
    }
}
