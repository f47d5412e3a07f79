use tracing::{info, warn};
use warden_core::config::AppConfig;
use warden_core::constants::config as config_consts;
use warden_core::error::Result;

/// 初始化工作目录：生成默认配置并创建备份目录
pub async fn run_init(force: bool) -> Result<()> {
    info!("🚀 初始化 Warden 工作目录");

    let config_path = config_consts::get_config_file_path();

    if config_path.exists() && !force {
        warn!("⚠️  配置文件已存在: {}", config_path.display());
        warn!("👉 使用 --force 强制覆盖");
        return Ok(());
    }

    let config = AppConfig::default();
    config.save_to_file(&config_path)?;
    config.ensure_backup_dirs()?;

    info!("✅ 已生成配置文件: {}", config_path.display());
    info!("✅ 已创建备份目录: {}", config.backup.storage_dir);
    info!("💡 编辑配置文件后即可使用 'warden-cli backup' 创建首个备份");

    Ok(())
}
