use crate::constants::{backup, monitor, timeout};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use toml;

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub backup: BackupConfig,
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
    pub rollback: RollbackConfig,
}

/// 备份相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BackupConfig {
    /// 备份归档的存储目录
    pub storage_dir: String,
    /// 关键路径的根目录（critical_paths 相对于此目录解析）
    pub source_dir: String,
    /// 需要备份的关键路径列表（相对于 source_dir）
    pub critical_paths: Vec<String>,
    /// 归档时跳过的路径片段
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
    /// 备份保留天数
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// 最大备份数量
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

/// 恢复监控配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    /// 连续失败触发恢复的阈值
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

/// 单个受管服务的声明式描述
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    /// 服务名称
    pub name: String,
    /// 存活探测端口
    pub port: u16,
    /// 启动命令（仅描述，不在此处执行）
    pub start_cmd: String,
    /// 健康检查路径（TCP 探测不使用，保留给更丰富的探测器）
    #[serde(default)]
    pub health_endpoint: String,
    /// 重启后等待的稳定时间（秒）
    #[serde(default = "default_restart_delay")]
    pub restart_delay_secs: u64,
}

/// 回滚相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RollbackConfig {
    /// 应用所在的版本控制仓库目录
    pub app_dir: String,
}

fn default_retention_days() -> u32 {
    backup::DEFAULT_RETENTION_DAYS
}

fn default_max_backups() -> usize {
    backup::DEFAULT_MAX_BACKUPS
}

fn default_failure_threshold() -> u32 {
    monitor::DEFAULT_FAILURE_THRESHOLD
}

fn default_restart_delay() -> u64 {
    timeout::DEFAULT_RESTART_DELAY
}

/// 把值渲染为 TOML 字面量（字符串带引号和转义，数组带方括号）
fn toml_literal<T: Serialize>(value: &T) -> Result<String> {
    let value = toml::Value::try_from(value)
        .map_err(|e| crate::WardenError::custom(format!("配置序列化失败: {e}")))?;
    Ok(value.to_string())
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "__pycache__".to_string(),
        ".git".to_string(),
        "node_modules".to_string(),
        "target".to_string(),
        ".pytest_cache".to_string(),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backup: BackupConfig {
                storage_dir: backup::get_default_storage_dir()
                    .to_string_lossy()
                    .to_string(),
                source_dir: ".".to_string(),
                critical_paths: vec![
                    "config/".to_string(),
                    ".env".to_string(),
                ],
                exclude_patterns: default_exclude_patterns(),
                retention_days: backup::DEFAULT_RETENTION_DAYS,
                max_backups: backup::DEFAULT_MAX_BACKUPS,
            },
            monitor: MonitorConfig {
                failure_threshold: monitor::DEFAULT_FAILURE_THRESHOLD,
            },
            services: Vec::new(),
            rollback: RollbackConfig {
                app_dir: ".".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：config.toml -> warden.toml -> .warden.toml
    pub fn find_and_load_config() -> Result<Self> {
        let config_files = ["config.toml", "warden.toml", ".warden.toml"];

        for config_file in &config_files {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        // 如果没找到配置文件，创建默认配置
        tracing::warn!("未找到配置文件，创建默认配置: config.toml");
        let default_config = Self::default();
        default_config.save_to_file("config.toml")?;
        Ok(default_config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(crate::WardenError::ConfigNotFound);
        }
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 渲染带中文注释的配置文本
    ///
    /// 基于内嵌模板做占位符替换，注释在保存后依然保留，
    /// 直接用 toml 序列化会丢掉所有注释。
    pub fn to_toml_with_comments(&self) -> Result<String> {
        const TEMPLATE: &str = include_str!("../templates/config.toml.template");

        #[derive(Serialize)]
        struct ServiceList<'a> {
            services: &'a [ServiceConfig],
        }

        let services_block = if self.services.is_empty() {
            String::new()
        } else {
            let body = toml::to_string(&ServiceList {
                services: &self.services,
            })
            .map_err(|e| crate::WardenError::custom(format!("配置序列化失败: {e}")))?;
            format!("\n{body}")
        };

        let content = TEMPLATE
            .replace("{storage_dir}", &toml_literal(&self.backup.storage_dir)?)
            .replace("{source_dir}", &toml_literal(&self.backup.source_dir)?)
            .replace(
                "{critical_paths}",
                &toml_literal(&self.backup.critical_paths)?,
            )
            .replace(
                "{exclude_patterns}",
                &toml_literal(&self.backup.exclude_patterns)?,
            )
            .replace(
                "{retention_days}",
                &toml_literal(&self.backup.retention_days)?,
            )
            .replace("{max_backups}", &toml_literal(&self.backup.max_backups)?)
            .replace(
                "{failure_threshold}",
                &toml_literal(&self.monitor.failure_threshold)?,
            )
            .replace("{app_dir}", &toml_literal(&self.rollback.app_dir)?)
            .replace("{services}", &services_block);

        Ok(content)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments()?;
        fs::write(&path, content)?;
        Ok(())
    }

    /// 确保备份存储目录存在
    pub fn ensure_backup_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.backup.storage_dir)?;
        Ok(())
    }

    /// 获取备份目录路径
    pub fn get_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.storage_dir)
    }

    /// 获取关键路径根目录
    pub fn get_source_dir(&self) -> PathBuf {
        PathBuf::from(&self.backup.source_dir)
    }

    /// 获取回滚仓库目录
    pub fn get_app_dir(&self) -> PathBuf {
        PathBuf::from(&self.rollback.app_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.backup.max_backups, 10);
        assert_eq!(config.monitor.failure_threshold, 3);
        assert!(config.services.is_empty());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.services.push(ServiceConfig {
            name: "api".to_string(),
            port: 8080,
            start_cmd: "api-server --listen 8080".to_string(),
            health_endpoint: "/health".to_string(),
            restart_delay_secs: 3,
        });

        config.save_to_file(&path).unwrap();
        let loaded = AppConfig::load_from_file(&path).unwrap();

        assert_eq!(loaded.backup.storage_dir, config.backup.storage_dir);
        assert_eq!(loaded.services.len(), 1);
        assert_eq!(loaded.services[0].name, "api");
        assert_eq!(loaded.services[0].restart_delay_secs, 3);
    }

    #[test]
    fn test_saved_config_keeps_template_comments() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.services.push(ServiceConfig {
            name: "api".to_string(),
            port: 8080,
            start_cmd: "api-server --listen 8080".to_string(),
            health_endpoint: "/health".to_string(),
            restart_delay_secs: 3,
        });
        config.save_to_file(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        // 模板注释在渲染后保留
        assert!(content.contains("# Warden 配置文件"));
        assert!(content.contains("# 备份保留天数"));
        assert!(content.contains("# 连续失败触发恢复的阈值"));
        assert!(content.contains("[[services]]"));

        // 渲染出的文本仍是可解析的合法配置
        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.services[0].port, 8080);
        assert_eq!(loaded.backup.critical_paths, config.backup.critical_paths);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        let content = r#"
[backup]
storage_dir = "/tmp/warden/backups"
source_dir = "/srv/app"
critical_paths = ["config/", ".env"]

[monitor]

[rollback]
app_dir = "/srv/app"
"#;
        std::fs::write(&path, content).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.backup.retention_days, 7);
        assert_eq!(loaded.monitor.failure_threshold, 3);
        assert!(!loaded.backup.exclude_patterns.is_empty());
    }
}
