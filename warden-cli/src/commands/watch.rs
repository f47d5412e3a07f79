use crate::app::CliApp;
use std::time::Duration;
use tracing::{error, info, warn};
use warden_core::error::Result;
use warden_core::health::HealthCheck;
use warden_core::monitor::RecoveryAction;

/// 轮询循环：健康检查 → 恢复监控器 → （必要时）恢复建议
///
/// 监控器只提议恢复，真正的恢复动作永远等待操作员确认；
/// 对失败服务只做演练模式的预案，记录将要执行的命令。
pub async fn run_watch(app: &mut CliApp, interval: u64) -> Result<()> {
    if app.config.services.is_empty() {
        warn!("⚠️  配置中没有注册任何服务，监控循环没有输入信号");
        return Ok(());
    }

    let health_check = HealthCheck::from_services(&app.config.services);
    info!(
        "👁️  开始监控 {} 个服务，每 {} 秒一轮",
        app.config.services.len(),
        interval
    );

    loop {
        let health = health_check.run_suite().await;
        let failing: Vec<String> = health
            .iter()
            .filter(|(_, healthy)| !**healthy)
            .map(|(name, _)| name.clone())
            .collect();

        match app.monitor.check_and_recover(&health).await {
            RecoveryAction::None => {
                info!("✅ 全部服务健康");
            }
            RecoveryAction::Monitoring { failures, count } => {
                warn!("⚠️  观察中: {:?} (连续失败 {} 次)", failures, count);
            }
            RecoveryAction::Initiated {
                backup_available, ..
            } => {
                warn!("🚨 连续失败达到阈值，已生成恢复建议");

                // 先对失败服务做演练预案，记录将要执行的重启命令
                let playbook = app.service_recovery.run_playbook(&failing, true).await;
                warn!(
                    "   预案演练: {} 个服务, 整体{}",
                    playbook.services_targeted.len(),
                    if playbook.overall_success { "可行" } else { "有失败项" }
                );

                warn!("   可用恢复点: {}", backup_available);
                warn!(
                    "👉 需人工确认: warden-cli restore {} 或 warden-cli service recover --live",
                    backup_available
                );
            }
            RecoveryAction::Failed { reason } => {
                error!("🚨 恢复触发失败: {}", reason);
                if reason == "no_backups_available" {
                    error!("👉 请先运行 'warden-cli backup' 建立恢复点");
                }
            }
        }

        tokio::time::sleep(Duration::from_secs(interval)).await;
    }
}
