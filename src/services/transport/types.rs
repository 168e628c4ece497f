use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::services::config::RegistryConfig;

/// 注册时刻的实例快照
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    pub instance_id: String,
    pub app_name: String,
    pub host: String,
    pub ip_addr: String,
    pub port: u16,
    pub health_check_url: String,
    pub status_page_url: String,
    pub home_page_url: String,
    pub data_center_name: String,
    pub zone: Option<String>,
    pub metadata: BTreeMap<String, String>,
    pub renewal_interval: Duration,
    pub lease_duration: Duration,
    /// 毫秒时间戳，对应 Eureka 的 lastDirtyTimestamp
    pub last_dirty_timestamp: u64,
}

impl InstanceRecord {
    pub fn from_config(config: &RegistryConfig) -> Self {
        let last_dirty_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            instance_id: config.instance_id.clone(),
            app_name: config.app_name.clone(),
            host: config.host.clone(),
            ip_addr: config.ip_addr.clone(),
            port: config.port,
            health_check_url: config.health_check_url.clone(),
            status_page_url: config.status_page_url.clone(),
            home_page_url: config.home_page_url.clone(),
            data_center_name: config.data_center_name.clone(),
            zone: config.zone.clone(),
            metadata: config.metadata.clone(),
            renewal_interval: config.timing.heartbeat_interval,
            lease_duration: config.timing.lease_duration,
            last_dirty_timestamp,
        }
    }

    /// 注册中心中的应用名（Eureka 统一使用大写）
    pub fn registry_app_name(&self) -> String {
        self.app_name.to_uppercase()
    }
}

/// 注册中心确认
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub endpoint: String,
    pub status: u16,
}
