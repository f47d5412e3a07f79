use crate::app::CliApp;
use tracing::{info, warn};
use warden_core::backup::StoreHealth;
use warden_core::error::Result;

/// 显示备份子系统的恢复就绪状态
pub async fn run_status(app: &CliApp) -> Result<()> {
    let status = app.backup_store.recovery_status().await?;

    info!("📊 恢复就绪状态");
    match status.status {
        StoreHealth::Healthy => info!("   状态: ✅ healthy"),
        StoreHealth::NoBackups => warn!("   状态: ⚠️  no_backups"),
    }
    info!("   备份总数: {}", status.total_backups);
    info!("   备份目录: {}", status.backup_dir);
    info!(
        "   保留策略: 最多 {} 个 / {} 天",
        status.max_backups, status.retention_days
    );

    if let Some(latest) = &status.latest_backup {
        info!(
            "   最新备份: {} ({})",
            latest.backup_id,
            latest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    if let Some(oldest) = &status.oldest_backup {
        info!(
            "   最旧备份: {} ({})",
            oldest.backup_id,
            oldest.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
