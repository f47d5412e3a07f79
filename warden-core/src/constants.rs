/// 备份相关常量
pub mod backup {
    use std::path::PathBuf;

    /// 备份文件名前缀
    pub const BACKUP_PREFIX: &str = "warden_";

    /// 备份归档扩展名
    pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

    /// 元数据 sidecar 文件后缀
    pub const METADATA_SUFFIX: &str = "_metadata.json";

    /// 备份文件名时间戳格式（UTC，秒级）
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// 默认保留天数
    pub const DEFAULT_RETENTION_DAYS: u32 = 7;

    /// 默认最大备份数量
    pub const DEFAULT_MAX_BACKUPS: usize = 10;

    /// 备份目录名
    pub const BACKUP_DIR_NAME: &str = "backups";

    /// 获取默认备份存储目录（跨平台）
    pub fn get_default_storage_dir() -> PathBuf {
        super::config::get_data_dir().join(BACKUP_DIR_NAME)
    }
}

/// 校验和相关常量
pub mod checksum {
    /// 流式读取的块大小（字节）
    pub const READ_BLOCK_SIZE: usize = 8192;
}

/// 恢复监控相关常量
pub mod monitor {
    /// 默认连续失败触发阈值
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
}

/// 超时时间常量（秒）
pub mod timeout {
    /// TCP 端口探测超时时间
    pub const PORT_PROBE_TIMEOUT: u64 = 2;

    /// 服务重启后默认等待时间
    pub const DEFAULT_RESTART_DELAY: u64 = 5;

    /// 轮询循环默认间隔时间
    pub const DEFAULT_POLL_INTERVAL: u64 = 60;
}

/// 网络相关常量
pub mod network {
    /// 本地回环地址
    pub const LOCALHOST_IPV4: &str = "127.0.0.1";
}

/// 回滚相关常量
pub mod rollback {
    /// 回滚前安全分支名前缀
    pub const BACKUP_BRANCH_PREFIX: &str = "pre_rollback_";

    /// 安全分支时间戳格式（UTC，秒级）
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

    /// 默认查询的历史版本数量
    pub const DEFAULT_HISTORY_COUNT: usize = 5;
}

/// 应用配置相关常量
pub mod config {
    use std::path::{Path, PathBuf};

    /// 数据目录名
    pub const DATA_DIR_NAME: &str = "data";

    /// 配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.toml";

    /// 获取默认配置文件路径（跨平台）
    pub fn get_config_file_path() -> PathBuf {
        Path::new(".").join(CONFIG_FILE_NAME)
    }

    /// 获取数据目录路径（跨平台）
    pub fn get_data_dir() -> PathBuf {
        Path::new(".").join(DATA_DIR_NAME)
    }
}

/// 日志相关常量
pub mod logging {
    /// 默认日志级别
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}
