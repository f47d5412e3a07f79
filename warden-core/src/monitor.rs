use crate::backup::BackupStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// 监控器对一批健康信号做出的决定
///
/// 闭合的标签化结果集，调用方可以穷尽匹配。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    /// 全部健康，无需动作
    None,
    /// 已有失败但尚未达到阈值，继续观察
    Monitoring { failures: Vec<String>, count: u32 },
    /// 阈值已越过，提出恢复建议（不会自动执行破坏性恢复）
    #[serde(rename = "recovery_initiated")]
    Initiated {
        backup_available: String,
        timestamp: DateTime<Utc>,
        requires_manual_confirmation: bool,
    },
    /// 触发了恢复但没有可用备份
    #[serde(rename = "recovery_failed")]
    Failed { reason: String },
}

/// 恢复监控器
///
/// 两个状态：Normal（计数为 0）和 Alerting（0 < 计数 < 阈值）。
/// 计数只存活于进程生命周期内，不做持久化。
pub struct RecoveryMonitor {
    store: BackupStore,
    failure_count: u32,
    failure_threshold: u32,
}

impl RecoveryMonitor {
    pub fn new(store: BackupStore, failure_threshold: u32) -> Self {
        Self {
            store,
            failure_count: 0,
            failure_threshold,
        }
    }

    /// 当前连续失败计数
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// 评估一批健康检查结果，必要时触发恢复建议
    ///
    /// 任何一项为 false 即计一次失败；全部为 true 立即清零。
    pub async fn check_and_recover(&mut self, health: &BTreeMap<String, bool>) -> RecoveryAction {
        let failures: Vec<String> = health
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(name, _)| name.clone())
            .collect();

        if failures.is_empty() {
            self.failure_count = 0;
            return RecoveryAction::None;
        }

        self.failure_count += 1;
        tracing::warn!(
            "健康检查失败: {:?} ({}/{})",
            failures,
            self.failure_count,
            self.failure_threshold
        );

        if self.failure_count >= self.failure_threshold {
            return self.trigger_recovery().await;
        }

        RecoveryAction::Monitoring {
            failures,
            count: self.failure_count,
        }
    }

    /// 触发恢复流程：查找最近的恢复点并提出建议
    ///
    /// 监控器只提议，破坏性恢复必须由操作员确认后执行。
    async fn trigger_recovery(&mut self) -> RecoveryAction {
        tracing::warn!("连续失败达到阈值，触发恢复流程");

        // 无论结果如何，触发后计数立即清零
        self.failure_count = 0;

        let latest = match self.store.latest_backup().await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::error!("查询恢复点失败: {}", e);
                return RecoveryAction::Failed {
                    reason: format!("查询恢复点失败: {e}"),
                };
            }
        };

        match latest {
            Some(backup) => {
                tracing::warn!("可用恢复点: {}，等待人工确认", backup.backup_id);
                RecoveryAction::Initiated {
                    backup_available: backup.backup_id,
                    timestamp: Utc::now(),
                    requires_manual_confirmation: true,
                }
            }
            None => {
                tracing::error!("触发了恢复但没有可用备份");
                RecoveryAction::Failed {
                    reason: "no_backups_available".to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupKind;
    use crate::config::BackupConfig;
    use std::path::Path;
    use tempfile::tempdir;

    fn make_store(root: &Path) -> BackupStore {
        let app = root.join("app");
        std::fs::create_dir_all(&app).unwrap();
        std::fs::write(app.join(".env"), b"SECRET=1\n").unwrap();

        BackupStore::new(&BackupConfig {
            storage_dir: root.join("backups").to_string_lossy().to_string(),
            source_dir: app.to_string_lossy().to_string(),
            critical_paths: vec![".env".to_string()],
            exclude_patterns: Vec::new(),
            retention_days: 7,
            max_backups: 10,
        })
        .unwrap()
    }

    fn unhealthy() -> BTreeMap<String, bool> {
        BTreeMap::from([("svc".to_string(), false)])
    }

    fn healthy() -> BTreeMap<String, bool> {
        BTreeMap::from([("svc".to_string(), true)])
    }

    #[tokio::test]
    async fn test_threshold_sequence() {
        let temp_dir = tempdir().unwrap();
        let store = make_store(temp_dir.path());
        let backup = store.create_backup(BackupKind::Full).await.unwrap();
        let mut monitor = RecoveryMonitor::new(store, 3);

        assert_eq!(
            monitor.check_and_recover(&unhealthy()).await,
            RecoveryAction::Monitoring {
                failures: vec!["svc".to_string()],
                count: 1
            }
        );
        assert_eq!(
            monitor.check_and_recover(&unhealthy()).await,
            RecoveryAction::Monitoring {
                failures: vec!["svc".to_string()],
                count: 2
            }
        );

        match monitor.check_and_recover(&unhealthy()).await {
            RecoveryAction::Initiated {
                backup_available,
                requires_manual_confirmation,
                ..
            } => {
                assert_eq!(backup_available, backup.backup_id);
                assert!(requires_manual_confirmation);
            }
            other => panic!("期望 recovery_initiated，得到 {other:?}"),
        }

        // 触发后计数清零
        assert_eq!(monitor.failure_count(), 0);
    }

    #[tokio::test]
    async fn test_success_resets_count() {
        let temp_dir = tempdir().unwrap();
        let store = make_store(temp_dir.path());
        let mut monitor = RecoveryMonitor::new(store, 3);

        monitor.check_and_recover(&unhealthy()).await;
        monitor.check_and_recover(&unhealthy()).await;
        assert_eq!(monitor.failure_count(), 2);

        assert_eq!(
            monitor.check_and_recover(&healthy()).await,
            RecoveryAction::None
        );
        assert_eq!(monitor.failure_count(), 0);

        // 重新计数，从 1 开始
        assert_eq!(
            monitor.check_and_recover(&unhealthy()).await,
            RecoveryAction::Monitoring {
                failures: vec!["svc".to_string()],
                count: 1
            }
        );
    }

    #[tokio::test]
    async fn test_trigger_without_backups() {
        let temp_dir = tempdir().unwrap();
        let store = make_store(temp_dir.path());
        let mut monitor = RecoveryMonitor::new(store, 3);

        monitor.check_and_recover(&unhealthy()).await;
        monitor.check_and_recover(&unhealthy()).await;

        assert_eq!(
            monitor.check_and_recover(&unhealthy()).await,
            RecoveryAction::Failed {
                reason: "no_backups_available".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_partial_failure_counts() {
        let temp_dir = tempdir().unwrap();
        let store = make_store(temp_dir.path());
        let mut monitor = RecoveryMonitor::new(store, 3);

        let mixed = BTreeMap::from([
            ("api".to_string(), true),
            ("worker".to_string(), false),
        ]);

        match monitor.check_and_recover(&mixed).await {
            RecoveryAction::Monitoring { failures, count } => {
                assert_eq!(failures, vec!["worker".to_string()]);
                assert_eq!(count, 1);
            }
            other => panic!("期望 monitoring，得到 {other:?}"),
        }
    }

    #[test]
    fn test_action_serialization_tags() {
        let none = serde_json::to_value(RecoveryAction::None).unwrap();
        assert_eq!(none["action"], "none");

        let failed = serde_json::to_value(RecoveryAction::Failed {
            reason: "no_backups_available".to_string(),
        })
        .unwrap();
        assert_eq!(failed["action"], "recovery_failed");
        assert_eq!(failed["reason"], "no_backups_available");
    }
}
