//! 配置文件
//!
//! JSON 格式，所有字段都有默认值；文件不存在时使用默认配置。

use std::fmt;
use std::fs;
use std::io;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub local_addr: Ipv4Addr,
    pub peer_addr: Ipv4Addr,
    pub local_port: u16,
    pub peer_port: u16,
    /// 等待应答的超时（秒）
    pub timeout_secs: u64,
    /// 本端初始序号
    pub base_seq: u32,
    /// 以 info 级别输出每个收发报文
    pub verbose: bool,
    /// 接收循环捕获窗口（毫秒）
    pub capture_window_ms: u64,
    /// 丢弃重复交付的入站报文
    pub dedup_captures: bool,
    /// 每个会话的报文日志目录
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            local_addr: Ipv4Addr::new(1, 1, 1, 1),
            peer_addr: Ipv4Addr::new(1, 1, 1, 1),
            local_port: 10_000,
            peer_port: 10_000,
            timeout_secs: 5,
            base_seq: 1000,
            verbose: false,
            capture_window_ms: 1000,
            dedup_captures: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// 对配置的部分修改（`None` 表示保持不变）
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub local_addr: Option<Ipv4Addr>,
    pub peer_addr: Option<Ipv4Addr>,
    pub local_port: Option<u16>,
    pub peer_port: Option<u16>,
    pub timeout_secs: Option<u64>,
    pub base_seq: Option<u32>,
    pub verbose: Option<bool>,
    pub capture_window_ms: Option<u64>,
    pub dedup_captures: Option<bool>,
    pub log_dir: Option<PathBuf>,
}

impl AppConfig {
    /// 读取配置；文件不存在时返回默认配置
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "配置文件不存在，使用默认配置");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 写回配置文件
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "配置已保存");
        Ok(())
    }

    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(v) = update.local_addr {
            self.local_addr = v;
        }
        if let Some(v) = update.peer_addr {
            self.peer_addr = v;
        }
        if let Some(v) = update.local_port {
            self.local_port = v;
        }
        if let Some(v) = update.peer_port {
            self.peer_port = v;
        }
        if let Some(v) = update.timeout_secs {
            self.timeout_secs = v;
        }
        if let Some(v) = update.base_seq {
            self.base_seq = v;
        }
        if let Some(v) = update.verbose {
            self.verbose = v;
        }
        if let Some(v) = update.capture_window_ms {
            self.capture_window_ms = v;
        }
        if let Some(v) = update.dedup_captures {
            self.dedup_captures = v;
        }
        if let Some(v) = &update.log_dir {
            self.log_dir = v.clone();
        }
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "local_addr:        {}", self.local_addr)?;
        writeln!(f, "peer_addr:         {}", self.peer_addr)?;
        writeln!(f, "local_port:        {}", self.local_port)?;
        writeln!(f, "peer_port:         {}", self.peer_port)?;
        writeln!(f, "timeout_secs:      {}", self.timeout_secs)?;
        writeln!(f, "base_seq:          {}", self.base_seq)?;
        writeln!(f, "verbose:           {}", self.verbose)?;
        writeln!(f, "capture_window_ms: {}", self.capture_window_ms)?;
        writeln!(f, "dedup_captures:    {}", self.dedup_captures)?;
        write!(f, "log_dir:           {}", self.log_dir.display())
    }
}
