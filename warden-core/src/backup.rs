use crate::config::BackupConfig;
use crate::constants::backup as consts;
use crate::{Result, WardenError, checksum};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

/// 备份类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Full,
    Config,
    Incremental,
    PreRestore,
    Test,
}

impl BackupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Config => "config",
            BackupKind::Incremental => "incremental",
            BackupKind::PreRestore => "pre_restore",
            BackupKind::Test => "test",
        }
    }
}

impl std::str::FromStr for BackupKind {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(BackupKind::Full),
            "config" => Ok(BackupKind::Config),
            "incremental" => Ok(BackupKind::Incremental),
            "pre_restore" => Ok(BackupKind::PreRestore),
            "test" => Ok(BackupKind::Test),
            other => Err(WardenError::backup(format!("未知的备份类型: {other}"))),
        }
    }
}

/// 备份状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupStatus {
    Completed,
    Failed,
}

/// 备份记录（恢复点）
///
/// 与归档同目录的 `{backup_id}_metadata.json` 一一对应，
/// 字段名即 sidecar 文件的 JSON 键。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupRecord {
    pub backup_id: String,
    pub backup_type: BackupKind,
    pub timestamp: DateTime<Utc>,
    pub path: String,
    pub size_bytes: u64,
    pub checksum_sha256: String,
    pub files_included: Vec<String>,
    pub status: BackupStatus,
}

/// 备份保留策略
///
/// 同时满足两个条件的备份才会保留：按新旧排名在前 max_backups 之内，
/// 且时间戳晚于 now - retention_days。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub retention_days: u32,
    pub max_backups: usize,
}

/// 备份子系统整体状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreHealth {
    Healthy,
    NoBackups,
}

/// 恢复就绪状态报告
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryStatus {
    pub status: StoreHealth,
    pub total_backups: usize,
    pub latest_backup: Option<BackupRecord>,
    pub oldest_backup: Option<BackupRecord>,
    pub backup_dir: String,
    pub retention_days: u32,
    pub max_backups: usize,
    pub last_checked: DateTime<Utc>,
}

/// 备份管理器
///
/// 磁盘上的 sidecar 元数据是唯一的持久化索引，
/// 进程内的恢复点列表只是当前生命周期的缓存。
#[derive(Debug, Clone)]
pub struct BackupStore {
    storage_dir: PathBuf,
    source_dir: PathBuf,
    critical_paths: Vec<String>,
    exclude_patterns: Vec<String>,
    policy: RetentionPolicy,
    recovery_points: Arc<Mutex<Vec<BackupRecord>>>,
}

impl BackupStore {
    /// 创建新的备份管理器
    pub fn new(config: &BackupConfig) -> Result<Self> {
        let storage_dir = PathBuf::from(&config.storage_dir);
        if !storage_dir.exists() {
            std::fs::create_dir_all(&storage_dir)?;
        }

        Ok(Self {
            storage_dir,
            source_dir: PathBuf::from(&config.source_dir),
            critical_paths: config.critical_paths.clone(),
            exclude_patterns: config.exclude_patterns.clone(),
            policy: RetentionPolicy {
                retention_days: config.retention_days,
                max_backups: config.max_backups,
            },
            recovery_points: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// 获取备份存储目录
    pub fn get_storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// 获取保留策略
    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    /// 本次进程生命周期内创建的恢复点
    pub fn session_recovery_points(&self) -> Vec<BackupRecord> {
        self.recovery_points
            .lock()
            .map(|points| points.clone())
            .unwrap_or_default()
    }

    /// 创建备份
    pub async fn create_backup(&self, kind: BackupKind) -> Result<BackupRecord> {
        self.create_backup_at(kind, Utc::now()).await
    }

    /// 按指定时间戳创建备份（测试用时钟注入）
    pub async fn create_backup_at(
        &self,
        kind: BackupKind,
        now: DateTime<Utc>,
    ) -> Result<BackupRecord> {
        let backup_id = format!(
            "{}{}_{}",
            consts::BACKUP_PREFIX,
            kind.as_str(),
            now.format(consts::TIMESTAMP_FORMAT)
        );
        let archive_path = self
            .storage_dir
            .join(format!("{backup_id}{}", consts::ARCHIVE_EXTENSION));

        tracing::info!("开始创建备份: {}", archive_path.display());

        // 不存在的关键路径静默跳过，不视为错误
        let mut files_included = Vec::new();
        for critical_path in &self.critical_paths {
            if self.source_dir.join(critical_path.trim_end_matches('/')).exists() {
                files_included.push(critical_path.clone());
            } else {
                tracing::debug!("关键路径不存在，跳过: {}", critical_path);
            }
        }

        match self.write_archive(&archive_path, &files_included).await {
            Ok(_) => {}
            Err(e) => {
                tracing::error!("备份创建失败: {}", e);
                return Err(e);
            }
        }

        // 校验和必须在归档完全写入之后计算
        let size_bytes = std::fs::metadata(&archive_path)?.len();
        let checksum_sha256 = checksum::sha256_file(&archive_path).await?;

        let record = BackupRecord {
            backup_id: backup_id.clone(),
            backup_type: kind,
            timestamp: now,
            path: archive_path.to_string_lossy().to_string(),
            size_bytes,
            checksum_sha256,
            files_included,
            status: BackupStatus::Completed,
        };

        // 与归档同名的 sidecar 元数据
        let metadata_path = self
            .storage_dir
            .join(format!("{backup_id}{}", consts::METADATA_SUFFIX));
        std::fs::write(&metadata_path, serde_json::to_string_pretty(&record)?)?;

        self.recovery_points
            .lock()
            .map_err(|_| WardenError::backup("恢复点列表锁已损坏"))?
            .push(record.clone());

        tracing::info!(
            "备份创建成功: {} ({} 字节, {} 个关键路径)",
            backup_id,
            record.size_bytes,
            record.files_included.len()
        );

        // 每次成功创建后立即执行一次保留清理
        self.cleanup_at(now).await?;

        Ok(record)
    }

    /// 将关键路径打包为 tar.gz 归档
    async fn write_archive(&self, archive_path: &Path, critical_paths: &[String]) -> Result<()> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::fs::File;
        use tar::Builder;

        if let Some(parent) = archive_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let archive_path = archive_path.to_path_buf();
        let source_dir = self.source_dir.clone();
        let critical_paths = critical_paths.to_vec();
        let exclude_patterns = self.exclude_patterns.clone();

        // 在后台线程中执行压缩操作，避免阻塞异步运行时
        tokio::task::spawn_blocking(move || {
            let file = File::create(&archive_path)?;
            let encoder = GzEncoder::new(file, Compression::default());
            let mut archive = Builder::new(encoder);

            for critical_path in &critical_paths {
                let entry_name = critical_path.trim_end_matches('/');
                let full_path = source_dir.join(entry_name);

                if full_path.is_file() {
                    archive
                        .append_path_with_name(&full_path, entry_name)
                        .map_err(|e| WardenError::backup(format!("添加文件到归档失败: {e}")))?;
                    continue;
                }

                for entry in WalkDir::new(&full_path) {
                    let entry =
                        entry.map_err(|e| WardenError::backup(format!("遍历目录失败: {e}")))?;
                    let path = entry.path();

                    if !path.is_file() {
                        continue;
                    }

                    let relative_path = path.strip_prefix(&full_path)?;

                    // tar 归档内部统一使用 Unix 风格路径分隔符
                    let archive_name = if cfg!(windows) {
                        format!(
                            "{}/{}",
                            entry_name,
                            relative_path.display().to_string().replace('\\', "/")
                        )
                    } else {
                        format!("{}/{}", entry_name, relative_path.display())
                    };

                    if exclude_patterns.iter().any(|p| archive_name.contains(p.as_str())) {
                        continue;
                    }

                    archive
                        .append_path_with_name(path, archive_name)
                        .map_err(|e| WardenError::backup(format!("添加文件到归档失败: {e}")))?;
                }
            }

            let encoder = archive
                .into_inner()
                .map_err(|e| WardenError::backup(format!("完成归档失败: {e}")))?;
            encoder
                .finish()
                .map_err(|e| WardenError::backup(format!("压缩流收尾失败: {e}")))?;

            Ok::<(), WardenError>(())
        })
        .await??;

        Ok(())
    }

    /// 验证备份文件完整性
    ///
    /// 元数据或归档缺失、校验和不匹配都返回 false，不抛出错误。
    pub async fn verify_backup(&self, backup_id: &str) -> bool {
        let metadata_path = self
            .storage_dir
            .join(format!("{backup_id}{}", consts::METADATA_SUFFIX));

        let record = match Self::read_record(&metadata_path) {
            Some(record) => record,
            None => {
                tracing::warn!("备份元数据不存在或无法解析: {}", backup_id);
                return false;
            }
        };

        let archive_path = PathBuf::from(&record.path);
        if !archive_path.exists() {
            tracing::warn!("备份文件不存在: {}", archive_path.display());
            return false;
        }

        let valid = checksum::verify_file(&archive_path, &record.checksum_sha256).await;
        if valid {
            tracing::info!("备份验证通过: {}", backup_id);
        } else {
            tracing::warn!("备份校验和不匹配: {}", backup_id);
        }
        valid
    }

    /// 获取所有备份记录，按时间戳降序（最新在前）
    ///
    /// 完全从磁盘上的 sidecar 元数据重建，可跨进程重启。
    pub async fn list_backups(&self) -> Result<Vec<BackupRecord>> {
        let mut backups = Vec::new();

        for entry in std::fs::read_dir(&self.storage_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.ends_with(consts::METADATA_SUFFIX) {
                continue;
            }

            if let Some(record) = Self::read_record(&entry.path()) {
                backups.push(record);
            } else {
                tracing::warn!("跳过无法解析的备份元数据: {}", file_name);
            }
        }

        backups.sort_by(|a, b| {
            b.timestamp
                .cmp(&a.timestamp)
                .then_with(|| b.backup_id.cmp(&a.backup_id))
        });
        Ok(backups)
    }

    /// 获取最近的一条备份记录
    pub async fn latest_backup(&self) -> Result<Option<BackupRecord>> {
        Ok(self.list_backups().await?.into_iter().next())
    }

    /// 按当前时间执行保留清理
    pub async fn cleanup(&self) -> Result<usize> {
        self.cleanup_at(Utc::now()).await
    }

    /// 按指定时间执行保留清理（测试用时钟注入）
    ///
    /// 归档与其元数据一起删除。
    pub async fn cleanup_at(&self, now: DateTime<Utc>) -> Result<usize> {
        let cutoff = now - Duration::days(i64::from(self.policy.retention_days));
        let backups = self.list_backups().await?;

        let mut deleted = 0usize;
        for (rank, backup) in backups.iter().enumerate() {
            // 两个条件同时成立才保留：排名在最大数量内，且未超过保留期
            if rank < self.policy.max_backups && backup.timestamp > cutoff {
                continue;
            }

            let archive_path = PathBuf::from(&backup.path);
            let metadata_path = self
                .storage_dir
                .join(format!("{}{}", backup.backup_id, consts::METADATA_SUFFIX));

            if archive_path.exists() {
                std::fs::remove_file(&archive_path)?;
            }
            if metadata_path.exists() {
                std::fs::remove_file(&metadata_path)?;
            }

            tracing::info!("清理过期备份: {}", backup.backup_id);
            deleted += 1;
        }

        Ok(deleted)
    }

    /// 获取恢复就绪状态
    pub async fn recovery_status(&self) -> Result<RecoveryStatus> {
        let backups = self.list_backups().await?;

        let status = if backups.is_empty() {
            StoreHealth::NoBackups
        } else {
            StoreHealth::Healthy
        };

        Ok(RecoveryStatus {
            status,
            total_backups: backups.len(),
            latest_backup: backups.first().cloned(),
            oldest_backup: backups.last().cloned(),
            backup_dir: self.storage_dir.to_string_lossy().to_string(),
            retention_days: self.policy.retention_days,
            max_backups: self.policy.max_backups,
            last_checked: Utc::now(),
        })
    }

    fn read_record(metadata_path: &Path) -> Option<BackupRecord> {
        let content = std::fs::read_to_string(metadata_path).ok()?;
        serde_json::from_str(&content).ok()
    }
}
