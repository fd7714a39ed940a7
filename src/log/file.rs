//! 按会话写入的文本日志
//!
//! 每次 `connect()` 新开一个 `session-<unix 毫秒>.txt`，每条记录是一个
//! `SENT` / `RECEIVED` 块。

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use super::{Direction, PacketLog, render_payload};
use crate::wire::Segment;

#[derive(Debug)]
pub struct FilePacketLog {
    dir: PathBuf,
    current: Mutex<Option<PathBuf>>,
}

impl FilePacketLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            current: Mutex::new(None),
        }
    }

    /// 当前会话的日志文件（尚未开始会话时为 `None`）
    pub fn current_file(&self) -> Option<PathBuf> {
        self.current.lock().ok().and_then(|cur| cur.clone())
    }

    fn new_session_file(&self) -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        self.dir.join(format!("session-{millis}.txt"))
    }

    fn append(path: &Path, direction: Direction, segment: &Segment) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = OpenOptions::new().create(true).append(true).open(path)?;
        let title = format!(" {direction} ");
        writeln!(f, "{title:=^30}")?;
        writeln!(f, "{segment}")?;
        writeln!(f, "payload: {}", render_payload(&segment.payload))?;
        writeln!(f, "{}", "=".repeat(30))?;
        Ok(())
    }
}

impl PacketLog for FilePacketLog {
    fn session_started(&self) {
        let path = self.new_session_file();
        debug!(path = %path.display(), "新会话日志文件");
        if let Ok(mut cur) = self.current.lock() {
            *cur = Some(path);
        }
    }

    fn record(&self, direction: Direction, segment: &Segment) {
        let path = {
            let Ok(mut cur) = self.current.lock() else {
                return;
            };
            cur.get_or_insert_with(|| self.new_session_file()).clone()
        };
        if let Err(e) = Self::append(&path, direction, segment) {
            warn!(path = %path.display(), error = %e, "写入报文日志失败");
        }
    }
}
