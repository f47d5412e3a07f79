use crate::app::CliApp;
use std::path::Path;
use tracing::{error, info, warn};
use warden_core::backup::BackupKind;
use warden_core::error::Result;

/// 创建备份
pub async fn run_backup(app: &CliApp, kind: &str) -> Result<()> {
    info!("💾 创建备份");

    let kind: BackupKind = kind.parse()?;
    let record = app.backup_store.create_backup(kind).await?;

    info!("✅ 备份创建成功: {}", record.backup_id);
    info!("   大小: {} 字节", record.size_bytes);
    info!("   包含: {} 个关键路径", record.files_included.len());
    info!("   校验和: {}", record.checksum_sha256);

    Ok(())
}

/// 列出所有备份
pub async fn run_list_backups(app: &CliApp) -> Result<()> {
    let backups = app.backup_store.list_backups().await?;

    if backups.is_empty() {
        info!("📋 当前没有任何备份");
        info!("💡 运行 'warden-cli backup' 创建首个备份");
        return Ok(());
    }

    info!("📋 共 {} 个备份（最新在前）:", backups.len());
    for backup in &backups {
        info!(
            "   - {} [{}] {} 字节  {}",
            backup.backup_id,
            backup.backup_type.as_str(),
            backup.size_bytes,
            backup.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}

/// 验证备份完整性
pub async fn run_verify(app: &CliApp, backup_id: &str) -> Result<()> {
    info!("🔍 验证备份: {}", backup_id);

    if app.backup_store.verify_backup(backup_id).await {
        info!("✅ 备份完整性验证通过");
    } else {
        error!("❌ 备份验证失败：元数据缺失、归档缺失或校验和不匹配");
    }

    Ok(())
}

/// 从备份恢复
///
/// 破坏性操作：除非传入 --yes，否则要求交互确认。
pub async fn run_restore(
    app: &CliApp,
    backup_id: &str,
    target: Option<&Path>,
    yes: bool,
) -> Result<()> {
    info!("♻️  准备从备份恢复: {}", backup_id);

    if !yes {
        warn!("⚠️  恢复会覆盖目标目录中的现有文件");
        info!("   （恢复前会自动创建 pre_restore 安全备份）");

        use std::io::{self, Write};
        print!("输入 'yes' 继续恢复，其他任意键取消: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "yes" {
            warn!("❌ 用户取消恢复操作");
            return Ok(());
        }
    }

    let report = app.restore_engine.restore(backup_id, target).await;

    if report.success {
        info!("✅ 恢复完成: {} -> {}", backup_id, report.target_dir);
        if let Some(pre) = &report.pre_restore_backup {
            info!("   撤销点: {}", pre);
        }
    } else {
        error!(
            "❌ 恢复失败: {}",
            report.message.as_deref().unwrap_or("未知原因")
        );
        if let Some(pre) = &report.pre_restore_backup {
            info!("💡 已有安全备份可用于撤销部分解压: {}", pre);
        }
    }

    Ok(())
}
