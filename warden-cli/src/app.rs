use warden_core::{
    backup::BackupStore, config::AppConfig, error::Result, monitor::RecoveryMonitor,
    recovery::ServiceRecovery, restore::RestoreEngine,
};

use crate::cli::{Commands, RollbackCommand, ServiceCommand};
use crate::commands;

pub struct CliApp {
    pub config: AppConfig,
    pub backup_store: BackupStore,
    pub restore_engine: RestoreEngine,
    pub service_recovery: ServiceRecovery,
    pub monitor: RecoveryMonitor,
}

impl CliApp {
    /// 使用智能配置查找初始化CLI应用
    ///
    /// 优先使用命令行指定的配置文件，否则按默认顺序查找。
    pub async fn new_with_auto_config(config_path: &std::path::Path) -> Result<Self> {
        let config = if config_path.exists() {
            AppConfig::load_from_file(config_path)?
        } else {
            AppConfig::find_and_load_config()?
        };

        // 确保备份目录存在
        config.ensure_backup_dirs()?;

        let backup_store = BackupStore::new(&config.backup)?;
        let restore_engine = RestoreEngine::new(backup_store.clone(), config.get_source_dir());
        let service_recovery = ServiceRecovery::new(&config.services);
        let monitor = RecoveryMonitor::new(backup_store.clone(), config.monitor.failure_threshold);

        Ok(Self {
            config,
            backup_store,
            restore_engine,
            service_recovery,
            monitor,
        })
    }

    /// 运行应用命令
    pub async fn run_command(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Backup { kind } => commands::run_backup(self, &kind).await,
            Commands::ListBackups => commands::run_list_backups(self).await,
            Commands::Verify { backup_id } => commands::run_verify(self, &backup_id).await,
            Commands::Restore {
                backup_id,
                target,
                yes,
            } => commands::run_restore(self, &backup_id, target.as_deref(), yes).await,
            Commands::Status => commands::run_status(self).await,
            Commands::Service(service_cmd) => match service_cmd {
                ServiceCommand::Status => commands::run_service_status(self).await,
                ServiceCommand::Recover { services, live } => {
                    commands::run_service_recover(self, &services, live).await
                }
                ServiceCommand::History => commands::run_service_history(self).await,
            },
            Commands::Rollback(rollback_cmd) => match rollback_cmd {
                RollbackCommand::History { count } => {
                    commands::run_rollback_history(self, count).await
                }
                RollbackCommand::To { revision, live } => {
                    commands::run_rollback_to(self, &revision, live).await
                }
            },
            Commands::Watch { interval } => commands::run_watch(self, interval).await,
        }
    }
}
