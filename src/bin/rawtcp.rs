//! rawtcp 命令行
//!
//! `shell`：交互式会话（需要原始套接字权限）；`config`：查看/修改/保存配置。

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rawtcp::config::{AppConfig, ConfigUpdate, DEFAULT_CONFIG_FILE};
use rawtcp::console::{Console, HELP};
use rawtcp::log::{FilePacketLog, TracingPacketLog};
use rawtcp::proto::Connection;
use rawtcp::session::SessionParams;
use rawtcp::transport::RawSocketTransport;

#[derive(Debug, Parser)]
#[command(name = "rawtcp", about = "用户态 TCP 端点：手工构造报文完成握手、收发与关闭")]
struct Cli {
    /// 配置文件路径（JSON）
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// 打开交互式会话
    Shell,
    /// 查看或修改配置
    Config(ConfigArgs),
}

#[derive(Debug, clap::Args)]
struct ConfigArgs {
    #[arg(long)]
    local_addr: Option<Ipv4Addr>,
    #[arg(long)]
    peer_addr: Option<Ipv4Addr>,
    #[arg(long)]
    local_port: Option<u16>,
    #[arg(long)]
    peer_port: Option<u16>,
    /// 等待应答的超时（秒）
    #[arg(long)]
    timeout_secs: Option<u64>,
    /// 本端初始序号
    #[arg(long)]
    base_seq: Option<u32>,
    #[arg(long)]
    verbose: Option<bool>,
    /// 接收循环捕获窗口（毫秒）
    #[arg(long)]
    capture_window_ms: Option<u64>,
    #[arg(long)]
    dedup_captures: Option<bool>,
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// 把修改后的配置写回文件
    #[arg(long, default_value_t = false)]
    save: bool,
}

impl ConfigArgs {
    fn update(&self) -> ConfigUpdate {
        ConfigUpdate {
            local_addr: self.local_addr,
            peer_addr: self.peer_addr,
            local_port: self.local_port,
            peer_port: self.peer_port,
            timeout_secs: self.timeout_secs,
            base_seq: self.base_seq,
            verbose: self.verbose,
            capture_window_ms: self.capture_window_ms,
            dedup_captures: self.dedup_captures,
            log_dir: self.log_dir.clone(),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut cfg = match AppConfig::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(cfg.verbose);

    match cli.cmd {
        Cmd::Config(args) => {
            cfg.apply(&args.update());
            println!("{cfg}");
            if args.save {
                if let Err(e) = cfg.save(&cli.config) {
                    eprintln!("{e}");
                    return ExitCode::FAILURE;
                }
                println!("configuration saved to {}", cli.config.display());
            }
        }
        Cmd::Shell => {
            let transport = match RawSocketTransport::open() {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("{e} (raw sockets need CAP_NET_RAW)");
                    return ExitCode::FAILURE;
                }
            };
            let log = (
                TracingPacketLog { verbose: cfg.verbose },
                FilePacketLog::new(cfg.log_dir.clone()),
            );
            let conn = Connection::with_packet_log(SessionParams::from(&cfg), transport, log);
            println!("{HELP}");
            if let Err(e) = Console::new(&conn).run(io::stdin().lock(), io::stdout()) {
                eprintln!("console error: {e}");
                return ExitCode::FAILURE;
            }
        }
    }
    ExitCode::SUCCESS
}
