/// 初始化日志系统
///
/// 库代码只使用 `tracing` 宏，配置由应用入口统一控制：
/// - `-v, --verbose` 启用 DEBUG 级别
/// - `RUST_LOG` 覆盖默认日志级别
/// - `WARDEN_LOG_FILE` 设置后日志输出到文件而非终端
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};
    use warden_core::constants::logging;

    // 根据verbose参数和环境变量确定日志级别
    let default_level = if verbose {
        "debug"
    } else {
        logging::DEFAULT_LOG_LEVEL
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 检查环境变量，决定是否输出到文件
    if let Ok(log_file) = std::env::var("WARDEN_LOG_FILE") {
        // 输出到文件 - 使用详细格式便于调试
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
            .expect("Failed to create log file");

        fmt()
            .with_env_filter(env_filter)
            .with_writer(file)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init();
    } else {
        // 输出到终端 - 使用简洁格式，用户友好
        fmt()
            .with_env_filter(env_filter)
            .with_target(false) // 不显示模块路径
            .with_thread_names(false) // 不显示线程名
            .with_line_number(false) // 不显示行号
            .without_time() // 不显示时间戳
            .compact() // 使用紧凑格式
            .init();
    }
}
