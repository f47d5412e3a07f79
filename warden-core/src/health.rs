use crate::config::ServiceConfig;
use crate::constants::{network, timeout};
use std::collections::BTreeMap;
use std::time::Duration;

/// TCP 探测本机端口，连接成功即视为服务存活
pub async fn probe_local_port(port: u16) -> bool {
    use tokio::net::TcpStream;

    let addr = (network::LOCALHOST_IPV4, port);
    matches!(
        tokio::time::timeout(
            Duration::from_secs(timeout::PORT_PROBE_TIMEOUT),
            TcpStream::connect(addr),
        )
        .await,
        Ok(Ok(_))
    )
}

/// 健康检查套件
///
/// 按服务注册表探测本机端口，产出喂给恢复监控器的健康信号。
#[derive(Debug, Clone)]
pub struct HealthCheck {
    probes: BTreeMap<String, u16>,
}

impl HealthCheck {
    pub fn new(probes: BTreeMap<String, u16>) -> Self {
        Self { probes }
    }

    /// 从服务注册表构建探测套件
    pub fn from_services(services: &[ServiceConfig]) -> Self {
        Self {
            probes: services
                .iter()
                .map(|s| (s.name.clone(), s.port))
                .collect(),
        }
    }

    /// 执行一轮健康检查
    pub async fn run_suite(&self) -> BTreeMap<String, bool> {
        let mut results = BTreeMap::new();

        for (name, port) in &self.probes {
            let online = probe_local_port(*port).await;
            if online {
                tracing::info!("✅ {}: 在线 (端口 {})", name, port);
            } else {
                tracing::warn!("❌ {}: 离线 (端口 {})", name, port);
            }
            results.insert(name.clone(), online);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 绑定后立即释放，拿到一个当前大概率无监听者的端口
    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_probe_detects_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(probe_local_port(port).await);
    }

    #[tokio::test]
    async fn test_probe_closed_port() {
        assert!(!probe_local_port(free_port()).await);
    }

    #[tokio::test]
    async fn test_run_suite_mixed_results() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open_port = listener.local_addr().unwrap().port();

        let check = HealthCheck::new(BTreeMap::from([
            ("up".to_string(), open_port),
            ("down".to_string(), free_port()),
        ]));

        let results = check.run_suite().await;
        assert_eq!(results.get("up"), Some(&true));
        assert_eq!(results.get("down"), Some(&false));
    }
}
