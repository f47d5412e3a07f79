use crate::app::CliApp;
use tracing::{error, info, warn};
use warden_core::error::Result;
use warden_core::rollback::{GitCli, RollbackManager};

fn build_manager(app: &CliApp) -> Result<RollbackManager<GitCli>> {
    let git = GitCli::new(app.config.get_app_dir())?;
    Ok(RollbackManager::new(git))
}

/// 查询最近的版本历史
pub async fn run_rollback_history(app: &CliApp, count: usize) -> Result<()> {
    let manager = build_manager(app)?;
    let revisions = manager.history(count).await?;

    if revisions.is_empty() {
        info!("📋 没有可用的版本历史");
        return Ok(());
    }

    info!("📋 最近 {} 条版本记录:", revisions.len());
    for rev in &revisions {
        info!(
            "   - {} {} ({})",
            rev.revision.get(..8).unwrap_or(rev.revision.as_str()),
            rev.message,
            rev.date
        );
    }

    Ok(())
}

/// 回滚到指定版本
///
/// 破坏性操作：实际执行前要求交互确认。
pub async fn run_rollback_to(app: &CliApp, revision: &str, live: bool) -> Result<()> {
    if live {
        warn!("⚠️  实际回滚会切换工作树到 {}", revision);
        info!("   （切换前会自动创建安全分支）");

        use std::io::{self, Write};
        print!("输入 'yes' 继续回滚，其他任意键取消: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "yes" {
            warn!("❌ 用户取消回滚操作");
            return Ok(());
        }
    } else {
        info!("（演练模式，使用 --live 实际执行）");
    }

    let manager = build_manager(app)?;
    let record = manager.rollback(revision, !live).await;

    if record.success {
        info!("✅ 回滚{}: {}", if live { "完成" } else { "（演练）" }, revision);
        if let Some(branch) = &record.backup_branch {
            info!("   安全分支: {}", branch);
        }
    } else {
        error!(
            "❌ 回滚失败: {}",
            record.error.as_deref().unwrap_or("未知原因")
        );
    }

    Ok(())
}
