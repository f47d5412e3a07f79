use clap::{Parser, Subcommand};
use std::path::PathBuf;
use warden_core::constants::{rollback, timeout};

/// 服务恢复相关命令
#[derive(Subcommand, Debug)]
pub enum ServiceCommand {
    /// 显示全部注册服务的存活状态
    Status,
    /// 对指定服务执行恢复预案
    Recover {
        /// 需要恢复的服务名称列表
        services: Vec<String>,
        /// 实际执行重启命令（默认只做演练）
        #[arg(long)]
        live: bool,
    },
    /// 显示本进程内的重启尝试历史
    History,
}

/// 回滚相关命令
#[derive(Subcommand, Debug)]
pub enum RollbackCommand {
    /// 查询最近的版本历史
    History {
        /// 查询的版本数量
        #[arg(long, default_value_t = rollback::DEFAULT_HISTORY_COUNT)]
        count: usize,
    },
    /// 回滚到指定版本
    To {
        /// 目标版本号
        revision: String,
        /// 实际执行回滚（默认只做演练）
        #[arg(long)]
        live: bool,
    },
}

/// Warden CLI - 备份、恢复与服务韧性管理工具
#[derive(Parser)]
#[command(name = "warden-cli")]
#[command(about = "备份、恢复与服务韧性管理工具")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 首次使用时初始化，创建配置文件和备份目录
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 创建一次备份
    Backup {
        /// 备份类型：full / config / incremental / test
        #[arg(long, default_value = "full")]
        kind: String,
    },
    /// 列出所有备份
    ListBackups,
    /// 验证指定备份的完整性
    Verify {
        /// 备份 ID
        backup_id: String,
    },
    /// 从指定备份恢复（恢复前自动创建安全备份）
    Restore {
        /// 备份 ID
        backup_id: String,
        /// 自定义恢复目标目录（默认为配置的应用根目录）
        #[arg(long)]
        target: Option<PathBuf>,
        /// 跳过交互确认
        #[arg(long)]
        yes: bool,
    },
    /// 显示备份子系统的恢复就绪状态
    Status,
    /// 服务恢复相关命令
    #[command(subcommand)]
    Service(ServiceCommand),
    /// 回滚相关命令
    #[command(subcommand)]
    Rollback(RollbackCommand),
    /// 启动轮询循环：健康检查喂给恢复监控器
    Watch {
        /// 轮询间隔（秒）
        #[arg(long, default_value_t = timeout::DEFAULT_POLL_INTERVAL)]
        interval: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backup_defaults() {
        let cli = Cli::try_parse_from(["warden-cli", "backup"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Backup { kind } => assert_eq!(kind, "full"),
            _ => panic!("期望 backup 子命令"),
        }
    }

    #[test]
    fn test_parse_service_recover() {
        let cli =
            Cli::try_parse_from(["warden-cli", "service", "recover", "api", "worker", "--live"])
                .unwrap();
        match cli.command {
            Commands::Service(ServiceCommand::Recover { services, live }) => {
                assert_eq!(services, vec!["api", "worker"]);
                assert!(live);
            }
            _ => panic!("期望 service recover 子命令"),
        }
    }

    #[test]
    fn test_parse_rollback_dry_run_by_default() {
        let cli = Cli::try_parse_from(["warden-cli", "rollback", "to", "abc123"]).unwrap();
        match cli.command {
            Commands::Rollback(RollbackCommand::To { revision, live }) => {
                assert_eq!(revision, "abc123");
                assert!(!live);
            }
            _ => panic!("期望 rollback to 子命令"),
        }
    }

    #[test]
    fn test_parse_watch_interval() {
        let cli = Cli::try_parse_from(["warden-cli", "watch", "--interval", "10"]).unwrap();
        match cli.command {
            Commands::Watch { interval } => assert_eq!(interval, 10),
            _ => panic!("期望 watch 子命令"),
        }
    }

    #[test]
    fn test_default_values_come_from_constants() {
        let cli = Cli::try_parse_from(["warden-cli", "watch"]).unwrap();
        match cli.command {
            Commands::Watch { interval } => {
                assert_eq!(interval, timeout::DEFAULT_POLL_INTERVAL)
            }
            _ => panic!("期望 watch 子命令"),
        }

        let cli = Cli::try_parse_from(["warden-cli", "rollback", "history"]).unwrap();
        match cli.command {
            Commands::Rollback(RollbackCommand::History { count }) => {
                assert_eq!(count, rollback::DEFAULT_HISTORY_COUNT)
            }
            _ => panic!("期望 rollback history 子命令"),
        }
    }
}
