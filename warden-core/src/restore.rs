use crate::backup::{BackupKind, BackupStore};
use crate::constants::backup as consts;
use crate::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// 单次恢复操作的结果报告
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub backup_id: String,
    pub success: bool,
    /// 恢复前创建的安全备份（pre_restore 类型）
    pub pre_restore_backup: Option<String>,
    pub target_dir: String,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 恢复引擎
///
/// 恢复永远分三步：验证归档、创建 pre_restore 安全备份、解压。
/// 任何一步失败都折叠进报告返回，不会向上抛出。
#[derive(Debug, Clone)]
pub struct RestoreEngine {
    store: BackupStore,
    default_target: PathBuf,
}

impl RestoreEngine {
    pub fn new(store: BackupStore, default_target: PathBuf) -> Self {
        Self {
            store,
            default_target,
        }
    }

    /// 从指定备份恢复到目标目录（默认为应用根目录）
    pub async fn restore(&self, backup_id: &str, target_dir: Option<&Path>) -> RestoreReport {
        let target = target_dir.unwrap_or(&self.default_target).to_path_buf();
        let mut report = RestoreReport {
            backup_id: backup_id.to_string(),
            success: false,
            pre_restore_backup: None,
            target_dir: target.to_string_lossy().to_string(),
            message: None,
            timestamp: Utc::now(),
        };

        // 第一步：验证待恢复的归档，失败立即中止
        if !self.store.verify_backup(backup_id).await {
            tracing::error!("恢复中止，备份验证失败: {}", backup_id);
            report.message = Some("备份验证失败".to_string());
            return report;
        }

        // 第二步：无条件创建当前状态的安全备份，给每次恢复一个撤销点
        match self.store.create_backup(BackupKind::PreRestore).await {
            Ok(pre) => {
                tracing::info!("已创建恢复前安全备份: {}", pre.backup_id);
                report.pre_restore_backup = Some(pre.backup_id);
            }
            Err(e) => {
                tracing::error!("恢复前安全备份创建失败: {}", e);
                report.message = Some(format!("恢复前安全备份创建失败: {e}"));
                return report;
            }
        }

        // 第三步：解压归档。失败不回滚已解压内容，pre_restore 备份就是恢复手段
        let archive_path = self
            .store
            .get_storage_dir()
            .join(format!("{backup_id}{}", consts::ARCHIVE_EXTENSION));

        match self.extract_archive(&archive_path, &target).await {
            Ok(_) => {
                tracing::info!("恢复完成: {} -> {}", backup_id, target.display());
                report.success = true;
            }
            Err(e) => {
                tracing::error!("恢复失败: {}", e);
                report.message = Some(format!("解压归档失败: {e}"));
            }
        }

        report
    }

    /// 解压归档到目标目录
    async fn extract_archive(&self, archive_path: &Path, target_dir: &Path) -> Result<()> {
        use flate2::read::GzDecoder;
        use std::fs::File;
        use tar::Archive;

        let archive_path = archive_path.to_path_buf();
        let target_dir = target_dir.to_path_buf();

        // 在后台线程中执行解压操作
        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&target_dir)?;

            let file = File::open(&archive_path)?;
            let decoder = GzDecoder::new(file);
            let mut archive = Archive::new(decoder);

            archive
                .unpack(&target_dir)
                .map_err(|e| WardenError::restore(format!("解压归档失败: {e}")))?;

            Ok::<(), WardenError>(())
        })
        .await??;

        Ok(())
    }
}
