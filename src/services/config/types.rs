use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// 默认数据中心名称
pub const DEFAULT_DATA_CENTER: &str = "MyOwn";
/// 未配置 zone 时使用的 zone 键
pub const DEFAULT_ZONE: &str = "default";

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;
pub const DEFAULT_LEASE_DURATION_SECS: u64 = 90;

/// URL 列表：既可以是列表，也可以是逗号分隔的字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UrlList {
    Joined(String),
    List(Vec<String>),
}

impl UrlList {
    /// 展开为独立的条目，去掉空白和空项
    pub fn entries(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            UrlList::Joined(joined) => joined.split(',').collect(),
            UrlList::List(list) => list.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl From<Vec<&str>> for UrlList {
    fn from(urls: Vec<&str>) -> Self {
        UrlList::List(urls.into_iter().map(str::to_string).collect())
    }
}

/// 端口：数字，或者包含占位符的字符串
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

/// 未经校验的注册中心配置，键名与配置文件一致
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSettings {
    pub app_name: Option<String>,
    pub host: Option<String>,
    pub port: Option<PortValue>,
    pub eureka_server_urls: Option<UrlList>,
    pub instance_id: Option<String>,
    pub data_center_name: Option<String>,
    pub health_check_url: Option<String>,
    pub status_page_url: Option<String>,
    pub home_page_url: Option<String>,
    pub zone: Option<String>,
    pub eureka_availability_zones: Option<BTreeMap<String, UrlList>>,
    pub ip_addr: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,

    pub heartbeat_interval_secs: Option<u64>,
    pub heartbeat_failure_threshold: Option<u32>,
    pub request_timeout_secs: Option<u64>,
    pub shutdown_grace_secs: Option<u64>,
    pub lease_duration_secs: Option<u64>,
    #[serde(default)]
    pub require_registration: bool,
}

impl RawSettings {
    /// 没有任何一个注册相关字段被设置
    pub fn is_empty(&self) -> bool {
        self.app_name.is_none()
            && self.host.is_none()
            && self.port.is_none()
            && self.eureka_server_urls.is_none()
    }
}

/// 心跳与请求的时间参数
#[derive(Debug, Clone, PartialEq)]
pub struct TimingConfig {
    pub heartbeat_interval: Duration,
    pub failure_threshold: u32,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub lease_duration: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            failure_threshold: DEFAULT_HEARTBEAT_FAILURE_THRESHOLD,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            lease_duration: Duration::from_secs(DEFAULT_LEASE_DURATION_SECS),
        }
    }
}

/// 校验通过的注册中心配置，创建后不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    pub app_name: String,
    pub host: String,
    pub port: u16,
    pub ip_addr: String,
    pub eureka_server_urls: Vec<String>,
    pub instance_id: String,
    pub data_center_name: String,
    pub health_check_url: String,
    pub status_page_url: String,
    pub home_page_url: String,
    pub zone: Option<String>,
    /// zone -> 有序的注册中心地址，至少包含实例自身所在的 zone
    pub zone_endpoints: BTreeMap<String, Vec<String>>,
    pub metadata: BTreeMap<String, String>,
    pub timing: TimingConfig,
    pub require_registration: bool,
}

impl RegistryConfig {
    /// 实例所在的 zone 键
    pub fn home_zone(&self) -> &str {
        self.zone.as_deref().unwrap_or(DEFAULT_ZONE)
    }

    /// 实例所在 zone 的候选地址
    pub fn home_endpoints(&self) -> &[String] {
        self.zone_endpoints
            .get(self.home_zone())
            .map(Vec::as_slice)
            .unwrap_or(&self.eureka_server_urls)
    }
}
