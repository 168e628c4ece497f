use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::error::ConfigError;
use super::types::{
    DEFAULT_DATA_CENTER, DEFAULT_ZONE, PortValue, RawSettings, RegistryConfig, TimingConfig,
    UrlList,
};

/// 环境变量来源，解析时只读取快照
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// 当前进程的环境变量
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// 使用进程环境变量解析配置
pub fn resolve(raw: &RawSettings) -> Result<RegistryConfig, ConfigError> {
    resolve_with_env(raw, &ProcessEnv)
}

/// 校验原始配置并补全派生字段，不做任何 I/O
pub fn resolve_with_env<E: Environment + ?Sized>(
    raw: &RawSettings,
    env: &E,
) -> Result<RegistryConfig, ConfigError> {
    let app_name = required_text("app_name", raw.app_name.as_deref(), env)?;
    let host = required_text("host", raw.host.as_deref(), env)?;
    let port = resolve_port(raw.port.as_ref(), env)?;

    let eureka_server_urls = match &raw.eureka_server_urls {
        Some(list) => resolve_url_list("eureka_server_urls", list, env)?,
        None => Vec::new(),
    };
    if eureka_server_urls.is_empty() {
        return Err(ConfigError::MissingField("eureka_server_urls"));
    }

    // 未指定实例ID时由 app_name + host + port 生成，保证在注册中心内唯一
    let instance_id = optional_text("instance_id", raw.instance_id.as_deref(), env)?
        .unwrap_or_else(|| format!("{app_name}-{host}-{port}"));
    let data_center_name = optional_text("data_center_name", raw.data_center_name.as_deref(), env)?
        .unwrap_or_else(|| DEFAULT_DATA_CENTER.to_string());
    let ip_addr = optional_text("ip_addr", raw.ip_addr.as_deref(), env)?
        .unwrap_or_else(|| host.clone());

    let base_url = format!("http://{host}:{port}");
    let health_check_url = optional_text("health_check_url", raw.health_check_url.as_deref(), env)?
        .unwrap_or_else(|| format!("{base_url}/health"));
    let status_page_url = optional_text("status_page_url", raw.status_page_url.as_deref(), env)?
        .unwrap_or_else(|| format!("{base_url}/info"));
    let home_page_url = optional_text("home_page_url", raw.home_page_url.as_deref(), env)?
        .unwrap_or_else(|| format!("{base_url}/"));

    let zone = optional_text("zone", raw.zone.as_deref(), env)?;
    let zone_endpoints = resolve_zones(
        zone.as_deref(),
        raw.eureka_availability_zones.as_ref(),
        &eureka_server_urls,
        env,
    )?;

    let mut metadata = BTreeMap::new();
    if let Some(raw_metadata) = &raw.metadata {
        for (key, value) in raw_metadata {
            let field = format!("metadata.{key}");
            metadata.insert(key.clone(), interpolate(&field, value, env)?);
        }
    }

    Ok(RegistryConfig {
        app_name,
        host,
        port,
        ip_addr,
        eureka_server_urls,
        instance_id,
        data_center_name,
        health_check_url,
        status_page_url,
        home_page_url,
        zone,
        zone_endpoints,
        metadata,
        timing: resolve_timing(raw),
        require_registration: raw.require_registration,
    })
}

/// 展开 `${VAR}` 与 `${VAR:-default}` 占位符
pub fn interpolate<E: Environment + ?Sized>(
    field: &str,
    value: &str,
    env: &E,
) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return Err(ConfigError::MalformedPlaceholder {
                field: field.to_string(),
            });
        };

        let body = &after[..end];
        let (name, default) = match body.split_once(":-") {
            Some((name, default)) => (name, Some(default)),
            None => (body, None),
        };
        if name.is_empty() {
            return Err(ConfigError::MalformedPlaceholder {
                field: field.to_string(),
            });
        }

        match (env.var(name), default) {
            (Some(v), _) => out.push_str(&v),
            (None, Some(d)) => out.push_str(d),
            (None, None) => {
                return Err(ConfigError::UnresolvedVariable {
                    field: field.to_string(),
                    variable: name.to_string(),
                });
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

fn required_text<E: Environment + ?Sized>(
    field: &'static str,
    value: Option<&str>,
    env: &E,
) -> Result<String, ConfigError> {
    optional_text(field, value, env)?.ok_or(ConfigError::MissingField(field))
}

// 空字符串视为未设置
fn optional_text<E: Environment + ?Sized>(
    field: &str,
    value: Option<&str>,
    env: &E,
) -> Result<Option<String>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    let resolved = interpolate(field, value, env)?;
    let trimmed = resolved.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn resolve_port<E: Environment + ?Sized>(
    value: Option<&PortValue>,
    env: &E,
) -> Result<u16, ConfigError> {
    let number = match value {
        None => return Err(ConfigError::MissingField("port")),
        Some(PortValue::Number(n)) => *n,
        Some(PortValue::Text(text)) => {
            let text = required_text("port", Some(text.as_str()), env)?;
            text.parse::<i64>()
                .map_err(|_| ConfigError::InvalidPort(text.clone()))?
        }
    };

    match u16::try_from(number) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ConfigError::InvalidPort(number.to_string())),
    }
}

fn resolve_url_list<E: Environment + ?Sized>(
    field: &str,
    list: &UrlList,
    env: &E,
) -> Result<Vec<String>, ConfigError> {
    let items: Vec<&str> = match list {
        UrlList::Joined(joined) => vec![joined.as_str()],
        UrlList::List(items) => items.iter().map(String::as_str).collect(),
    };

    let mut urls = Vec::new();
    for item in items {
        // 变量可能展开成逗号分隔的多个地址
        let expanded = interpolate(field, item, env)?;
        urls.extend(
            UrlList::Joined(expanded)
                .entries()
                .into_iter()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
        );
    }
    Ok(urls)
}

fn resolve_zones<E: Environment + ?Sized>(
    zone: Option<&str>,
    raw_zones: Option<&BTreeMap<String, UrlList>>,
    fallback: &[String],
    env: &E,
) -> Result<BTreeMap<String, Vec<String>>, ConfigError> {
    let mut zones = BTreeMap::new();
    if let Some(raw_zones) = raw_zones {
        for (name, list) in raw_zones {
            let field = format!("eureka_availability_zones.{name}");
            let urls = resolve_url_list(&field, list, env)?;
            if !urls.is_empty() {
                zones.insert(name.clone(), urls);
            }
        }
    }

    match zone {
        Some(zone) if !zones.is_empty() && !zones.contains_key(zone) => {
            return Err(ConfigError::UnknownZone(zone.to_string()));
        }
        // zone 映射为空时退回到顶层地址列表
        Some(zone) => {
            zones
                .entry(zone.to_string())
                .or_insert_with(|| fallback.to_vec());
        }
        None => {
            zones
                .entry(DEFAULT_ZONE.to_string())
                .or_insert_with(|| fallback.to_vec());
        }
    }

    Ok(zones)
}

fn resolve_timing(raw: &RawSettings) -> TimingConfig {
    let defaults = TimingConfig::default();
    let secs = |value: Option<u64>, default: Duration| {
        value.map(|s| Duration::from_secs(s.max(1))).unwrap_or(default)
    };

    TimingConfig {
        heartbeat_interval: secs(raw.heartbeat_interval_secs, defaults.heartbeat_interval),
        failure_threshold: raw
            .heartbeat_failure_threshold
            .map(|n| n.max(1))
            .unwrap_or(defaults.failure_threshold),
        request_timeout: secs(raw.request_timeout_secs, defaults.request_timeout),
        shutdown_grace: secs(raw.shutdown_grace_secs, defaults.shutdown_grace),
        lease_duration: secs(raw.lease_duration_secs, defaults.lease_duration),
    }
}
