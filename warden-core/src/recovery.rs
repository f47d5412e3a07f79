use crate::config::ServiceConfig;
use crate::health::probe_local_port;
use crate::{Result, WardenError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 重启执行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartMode {
    DryRun,
    Live,
}

/// 重启意图：描述"将对哪个服务执行什么命令"
///
/// 决策逻辑只产出意图，真正的执行由 IntentExecutor 承担，
/// 演练模式下意图只被记录，不被消费。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestartIntent {
    pub service: String,
    pub command: String,
    pub mode: RestartMode,
}

/// 意图执行器：只在 Live 模式下被调用
pub trait IntentExecutor: Send + Sync {
    fn execute(&self, intent: &RestartIntent) -> Result<()>;
}

/// 通过系统 shell 启动服务进程的执行器
///
/// 分离启动，不等待子进程退出；服务是否起来由事后的端口探测判断。
pub struct ShellExecutor;

impl IntentExecutor for ShellExecutor {
    fn execute(&self, intent: &RestartIntent) -> Result<()> {
        use std::process::Stdio;
        use tokio::process::Command;

        tracing::info!("🔄 启动服务 {}: {}", intent.service, intent.command);

        let mut command = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(&intent.command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(&intent.command);
            c
        };

        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| WardenError::recovery(format!("启动命令执行失败: {e}")))?;

        Ok(())
    }
}

/// 单个服务的存活状态
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub port: u16,
    pub running: bool,
    pub health_endpoint: String,
    pub checked_at: DateTime<Utc>,
}

/// 一次重启尝试的结果
#[derive(Debug, Clone, Serialize)]
pub struct RestartReport {
    #[serde(flatten)]
    pub intent: RestartIntent,
    pub success: bool,
    /// Live 模式下重启并等待后的再探测结果
    pub running_after: Option<bool>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// 恢复预案中单个服务的处理结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlaybookOutcome {
    /// 复查时服务已恢复，跳过重启
    Skipped { service: String, reason: String },
    /// 执行了一次重启尝试
    Restart(RestartReport),
    /// 服务无法处理（例如未注册）
    Failed { service: String, reason: String },
}

/// 恢复预案的汇总报告
#[derive(Debug, Clone, Serialize)]
pub struct PlaybookReport {
    pub started_at: DateTime<Utc>,
    pub services_targeted: Vec<String>,
    pub results: Vec<PlaybookOutcome>,
    pub overall_success: bool,
    pub completed_at: DateTime<Utc>,
}

/// 服务恢复编排器
///
/// 持有声明式服务注册表；恢复日志是跨线程共享的可变状态，
/// 读写都经过互斥锁。
#[derive(Clone)]
pub struct ServiceRecovery {
    services: BTreeMap<String, ServiceConfig>,
    executor: Arc<dyn IntentExecutor>,
    recovery_log: Arc<Mutex<Vec<RestartReport>>>,
}

impl ServiceRecovery {
    /// 使用默认的 shell 执行器创建编排器
    pub fn new(services: &[ServiceConfig]) -> Self {
        Self::with_executor(services, Arc::new(ShellExecutor))
    }

    /// 注入自定义执行器（测试用）
    pub fn with_executor(services: &[ServiceConfig], executor: Arc<dyn IntentExecutor>) -> Self {
        Self {
            services: services
                .iter()
                .map(|s| (s.name.clone(), s.clone()))
                .collect(),
            executor,
            recovery_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 获取单个服务的存活状态
    pub async fn status(&self, name: &str) -> Result<ServiceStatus> {
        let config = self
            .services
            .get(name)
            .ok_or_else(|| WardenError::UnknownService(name.to_string()))?;

        let running = probe_local_port(config.port).await;

        Ok(ServiceStatus {
            service: name.to_string(),
            port: config.port,
            running,
            health_endpoint: config.health_endpoint.clone(),
            checked_at: Utc::now(),
        })
    }

    /// 获取全部注册服务的状态
    pub async fn all_statuses(&self) -> BTreeMap<String, ServiceStatus> {
        let mut statuses = BTreeMap::new();
        for name in self.services.keys() {
            if let Ok(status) = self.status(name).await {
                statuses.insert(name.clone(), status);
            }
        }
        statuses
    }

    /// 尝试重启一个服务
    ///
    /// 演练模式只记录将要执行的命令并视为成功；
    /// 实际模式执行命令、等待稳定时间、再探测端口。
    pub async fn attempt_restart(&self, name: &str, dry_run: bool) -> Result<RestartReport> {
        let config = self
            .services
            .get(name)
            .ok_or_else(|| WardenError::UnknownService(name.to_string()))?;

        let mode = if dry_run {
            RestartMode::DryRun
        } else {
            RestartMode::Live
        };
        let intent = RestartIntent {
            service: name.to_string(),
            command: config.start_cmd.clone(),
            mode,
        };

        let mut report = RestartReport {
            intent: intent.clone(),
            success: false,
            running_after: None,
            message: None,
            error: None,
            timestamp: Utc::now(),
        };

        if dry_run {
            tracing::info!("（演练）将执行: {}", intent.command);
            report.success = true;
            report.message = Some(format!("将执行: {}", intent.command));
        } else {
            match self.executor.execute(&intent) {
                Ok(_) => {
                    tracing::info!(
                        "等待 {} 秒让 {} 稳定...",
                        config.restart_delay_secs,
                        name
                    );
                    tokio::time::sleep(Duration::from_secs(config.restart_delay_secs)).await;

                    let running = probe_local_port(config.port).await;
                    report.success = running;
                    report.running_after = Some(running);
                    if running {
                        tracing::info!("✅ {} 已恢复", name);
                    } else {
                        tracing::warn!("❌ {} 重启后仍未监听端口 {}", name, config.port);
                    }
                }
                Err(e) => {
                    tracing::error!("重启 {} 失败: {}", name, e);
                    report.error = Some(e.to_string());
                }
            }
        }

        self.recovery_log
            .lock()
            .map_err(|_| WardenError::recovery("恢复日志锁已损坏"))?
            .push(report.clone());

        Ok(report)
    }

    /// 对一批失败服务执行恢复预案
    ///
    /// 每个服务先复查实际状态——失败数据可能已过时，
    /// 已恢复的服务跳过而不做多余的重启。
    pub async fn run_playbook(&self, failed_services: &[String], dry_run: bool) -> PlaybookReport {
        tracing::info!("📋 对 {} 个服务执行恢复预案", failed_services.len());

        let started_at = Utc::now();
        let mut results = Vec::new();
        let mut overall_success = true;

        for service in failed_services {
            match self.status(service).await {
                Ok(status) if status.running => {
                    tracing::info!("✅ {} 已在运行，跳过", service);
                    results.push(PlaybookOutcome::Skipped {
                        service: service.clone(),
                        reason: "already_running".to_string(),
                    });
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("无法处理服务 {}: {}", service, e);
                    results.push(PlaybookOutcome::Failed {
                        service: service.clone(),
                        reason: e.to_string(),
                    });
                    overall_success = false;
                    continue;
                }
            }

            match self.attempt_restart(service, dry_run).await {
                Ok(report) => {
                    if !report.success {
                        overall_success = false;
                    }
                    results.push(PlaybookOutcome::Restart(report));
                }
                Err(e) => {
                    results.push(PlaybookOutcome::Failed {
                        service: service.clone(),
                        reason: e.to_string(),
                    });
                    overall_success = false;
                }
            }
        }

        let report = PlaybookReport {
            started_at,
            services_targeted: failed_services.to_vec(),
            results,
            overall_success,
            completed_at: Utc::now(),
        };

        tracing::info!(
            "📊 恢复预案完成: {} 个服务, 整体{}",
            report.services_targeted.len(),
            if report.overall_success { "成功" } else { "失败" }
        );

        report
    }

    /// 获取全部重启尝试的历史记录
    pub fn recovery_history(&self) -> Vec<RestartReport> {
        self.recovery_log
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}
