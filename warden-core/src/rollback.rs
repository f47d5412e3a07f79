use crate::constants::rollback as consts;
use crate::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 一条可回滚的历史版本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub revision: String,
    pub message: String,
    pub date: String,
}

/// 版本控制的窄接口
///
/// 回滚核心逻辑只依赖这三个操作，不耦合任何具体工具的参数语法。
pub trait VersionControl: Send + Sync {
    /// 最近的 N 条版本记录，最新在前
    fn list_revisions(&self, count: usize) -> impl Future<Output = Result<Vec<Revision>>> + Send;
    /// 在当前版本上创建分支
    fn create_branch(&self, name: &str) -> impl Future<Output = Result<()>> + Send;
    /// 切换工作树到指定版本
    fn checkout(&self, revision: &str) -> impl Future<Output = Result<()>> + Send;
}

/// 基于 git 命令行的版本控制实现
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: PathBuf) -> Result<Self> {
        if which::which("git").is_err() {
            return Err(WardenError::rollback("git 未安装或不在 PATH 中"));
        }
        Ok(Self { repo_dir })
    }

    /// 执行 git 命令
    async fn run_git(&self, args: &[&str]) -> Result<std::process::Output> {
        use std::process::Stdio;
        use tokio::process::Command;

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(output)
    }

    /// 执行 git 命令并把非零退出码转成错误
    async fn run_git_checked(&self, args: &[&str]) -> Result<String> {
        let output = self.run_git(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WardenError::rollback(format!(
                "git {} 失败: {}",
                args.first().unwrap_or(&""),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl VersionControl for GitCli {
    async fn list_revisions(&self, count: usize) -> Result<Vec<Revision>> {
        let count_arg = format!("-{count}");
        let stdout = self
            .run_git_checked(&["log", &count_arg, "--pretty=format:%H|%s|%ai"])
            .await?;

        let mut revisions = Vec::new();
        for line in stdout.lines() {
            let mut parts = line.splitn(3, '|');
            let Some(revision) = parts.next() else {
                continue;
            };
            if revision.is_empty() {
                continue;
            }
            revisions.push(Revision {
                revision: revision.to_string(),
                message: parts.next().unwrap_or("").to_string(),
                date: parts.next().unwrap_or("").to_string(),
            });
        }
        Ok(revisions)
    }

    async fn create_branch(&self, name: &str) -> Result<()> {
        self.run_git_checked(&["branch", name]).await?;
        Ok(())
    }

    async fn checkout(&self, revision: &str) -> Result<()> {
        self.run_git_checked(&["checkout", revision]).await?;
        Ok(())
    }
}

/// 一次回滚尝试的记录
#[derive(Debug, Clone, Serialize)]
pub struct RollbackRecord {
    pub target_revision: String,
    pub dry_run: bool,
    /// 切换版本前创建的安全分支
    pub backup_branch: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 回滚管理器
///
/// 实际回滚前总是先在当前版本上创建唯一命名的安全分支；
/// 每次尝试（无论成败）都追加进回滚历史。
pub struct RollbackManager<V: VersionControl> {
    vcs: V,
    rollback_history: Arc<Mutex<Vec<RollbackRecord>>>,
}

impl<V: VersionControl> RollbackManager<V> {
    pub fn new(vcs: V) -> Self {
        Self {
            vcs,
            rollback_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 查询最近的版本历史，最新在前
    pub async fn history(&self, count: usize) -> Result<Vec<Revision>> {
        self.vcs.list_revisions(count).await
    }

    /// 回滚到指定版本
    ///
    /// 演练模式只报告将要执行的动作；实际模式先建安全分支再切换，
    /// 任何一步的失败都捕获进记录返回，不向上抛出。
    pub async fn rollback(&self, revision: &str, dry_run: bool) -> RollbackRecord {
        let mut record = RollbackRecord {
            target_revision: revision.to_string(),
            dry_run,
            backup_branch: None,
            success: false,
            error: None,
            timestamp: Utc::now(),
        };

        if dry_run {
            tracing::info!(
                "（演练）将回滚到: {}",
                revision.get(..8).unwrap_or(revision)
            );
            record.success = true;
        } else {
            let backup_branch = format!(
                "{}{}",
                consts::BACKUP_BRANCH_PREFIX,
                Utc::now().format(consts::TIMESTAMP_FORMAT)
            );

            match self.vcs.create_branch(&backup_branch).await {
                Ok(_) => {
                    record.backup_branch = Some(backup_branch.clone());
                    tracing::info!("已创建回滚安全分支: {}", backup_branch);

                    match self.vcs.checkout(revision).await {
                        Ok(_) => {
                            tracing::info!("已回滚到: {}", revision);
                            record.success = true;
                        }
                        Err(e) => {
                            tracing::error!("切换版本失败: {}", e);
                            record.error = Some(e.to_string());
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("安全分支创建失败，放弃回滚: {}", e);
                    record.error = Some(e.to_string());
                }
            }
        }

        if let Ok(mut history) = self.rollback_history.lock() {
            history.push(record.clone());
        }

        record
    }

    /// 本进程内全部回滚尝试的历史
    pub fn rollback_history(&self) -> Vec<RollbackRecord> {
        self.rollback_history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 记录操作顺序、可注入失败的假版本控制
    struct FakeVcs {
        revisions: Vec<Revision>,
        fail_branch: bool,
        fail_checkout: bool,
        ops: Arc<Mutex<Vec<String>>>,
    }

    impl FakeVcs {
        fn new() -> Self {
            Self {
                revisions: vec![
                    Revision {
                        revision: "aaaa1111".to_string(),
                        message: "fix: restore config".to_string(),
                        date: "2026-08-01 10:00:00 +0000".to_string(),
                    },
                    Revision {
                        revision: "bbbb2222".to_string(),
                        message: "feat: add worker".to_string(),
                        date: "2026-07-30 09:00:00 +0000".to_string(),
                    },
                ],
                fail_branch: false,
                fail_checkout: false,
                ops: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl VersionControl for FakeVcs {
        async fn list_revisions(&self, count: usize) -> Result<Vec<Revision>> {
            Ok(self.revisions.iter().take(count).cloned().collect())
        }

        async fn create_branch(&self, name: &str) -> Result<()> {
            self.ops.lock().unwrap().push(format!("branch {name}"));
            if self.fail_branch {
                return Err(WardenError::rollback("branch 失败"));
            }
            Ok(())
        }

        async fn checkout(&self, revision: &str) -> Result<()> {
            self.ops.lock().unwrap().push(format!("checkout {revision}"));
            if self.fail_checkout {
                return Err(WardenError::rollback("checkout 失败"));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_history_passthrough() {
        let manager = RollbackManager::new(FakeVcs::new());

        let history = manager.history(1).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].revision, "aaaa1111");
    }

    #[tokio::test]
    async fn test_dry_run_mutates_nothing() {
        let vcs = FakeVcs::new();
        let ops = vcs.ops.clone();
        let manager = RollbackManager::new(vcs);

        let record = manager.rollback("bbbb2222", true).await;

        assert!(record.success);
        assert!(record.dry_run);
        assert!(record.backup_branch.is_none());
        assert!(ops.lock().unwrap().is_empty());
        assert_eq!(manager.rollback_history().len(), 1);
    }

    #[tokio::test]
    async fn test_dry_run_handles_multibyte_revision() {
        let manager = RollbackManager::new(FakeVcs::new());

        // 标签名可以不是十六进制，截断日志不能落在多字节字符中间
        let record = manager.rollback("发布前的稳定版本标记", true).await;

        assert!(record.success);
        assert_eq!(record.target_revision, "发布前的稳定版本标记");
    }

    #[tokio::test]
    async fn test_live_rollback_branches_before_checkout() {
        let vcs = FakeVcs::new();
        let ops = vcs.ops.clone();
        let manager = RollbackManager::new(vcs);

        let record = manager.rollback("bbbb2222", false).await;

        assert!(record.success);
        let branch = record.backup_branch.unwrap();
        assert!(branch.starts_with("pre_rollback_"));

        let ops = ops.lock().unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0], format!("branch {branch}"));
        assert_eq!(ops[1], "checkout bbbb2222");
    }

    #[tokio::test]
    async fn test_branch_failure_aborts_checkout() {
        let mut vcs = FakeVcs::new();
        vcs.fail_branch = true;
        let ops = vcs.ops.clone();
        let manager = RollbackManager::new(vcs);

        let record = manager.rollback("bbbb2222", false).await;

        assert!(!record.success);
        assert!(record.backup_branch.is_none());
        assert!(record.error.is_some());
        // 分支失败后没有尝试 checkout
        assert_eq!(ops.lock().unwrap().len(), 1);
        // 失败的尝试同样进入历史
        assert_eq!(manager.rollback_history().len(), 1);
    }

    #[tokio::test]
    async fn test_checkout_failure_is_captured() {
        let mut vcs = FakeVcs::new();
        vcs.fail_checkout = true;
        let manager = RollbackManager::new(vcs);

        let record = manager.rollback("bbbb2222", false).await;

        assert!(!record.success);
        assert!(record.backup_branch.is_some());
        assert!(record.error.as_deref().unwrap().contains("checkout"));
    }
}
