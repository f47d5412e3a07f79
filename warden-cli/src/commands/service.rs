use crate::app::CliApp;
use tracing::{error, info, warn};
use warden_core::error::Result;
use warden_core::recovery::PlaybookOutcome;

/// 显示全部注册服务的存活状态
pub async fn run_service_status(app: &CliApp) -> Result<()> {
    if app.config.services.is_empty() {
        warn!("⚠️  配置中没有注册任何服务");
        return Ok(());
    }

    info!("📊 当前服务状态:");
    for (name, status) in app.service_recovery.all_statuses().await {
        if status.running {
            info!("   ✅ {}: 在线 (端口 {})", name, status.port);
        } else {
            warn!("   ❌ {}: 离线 (端口 {})", name, status.port);
        }
    }

    Ok(())
}

/// 对指定服务执行恢复预案
pub async fn run_service_recover(app: &CliApp, services: &[String], live: bool) -> Result<()> {
    if services.is_empty() {
        warn!("⚠️  未指定任何服务");
        return Ok(());
    }

    if live {
        warn!("⚠️  实际执行模式：会真正运行服务启动命令");
    } else {
        info!("（演练模式，使用 --live 实际执行）");
    }

    let report = app.service_recovery.run_playbook(services, !live).await;
    tracing::debug!("完整预案报告: {}", serde_json::to_string_pretty(&report)?);

    for outcome in &report.results {
        match outcome {
            PlaybookOutcome::Skipped { service, reason } => {
                info!("   ⏭️  {}: 跳过 ({})", service, reason);
            }
            PlaybookOutcome::Restart(restart) => {
                if restart.success {
                    info!("   ✅ {}: 重启{}", restart.intent.service, if live { "成功" } else { "（演练）" });
                } else {
                    error!(
                        "   ❌ {}: 重启失败{}",
                        restart.intent.service,
                        restart
                            .error
                            .as_deref()
                            .map(|e| format!(" ({e})"))
                            .unwrap_or_default()
                    );
                }
            }
            PlaybookOutcome::Failed { service, reason } => {
                error!("   ❌ {}: {}", service, reason);
            }
        }
    }

    if report.overall_success {
        info!("✅ 恢复预案整体成功");
    } else {
        error!("❌ 恢复预案存在失败项");
    }

    Ok(())
}

/// 显示本进程内的重启尝试历史
pub async fn run_service_history(app: &CliApp) -> Result<()> {
    let history = app.service_recovery.recovery_history();

    if history.is_empty() {
        info!("📋 本进程内没有重启尝试记录");
        return Ok(());
    }

    info!("📋 重启尝试历史 ({} 条):", history.len());
    for report in &history {
        info!(
            "   - {} [{}] {} @ {}",
            report.intent.service,
            if report.success { "成功" } else { "失败" },
            report.intent.command,
            report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    Ok(())
}
