use std::collections::BTreeMap;

use dashmap::DashMap;

use super::cursor::EndpointCursor;
use super::error::RouterError;
use crate::services::config::RegistryConfig;

#[derive(Debug, Clone)]
struct ZoneCandidates {
    endpoints: Vec<String>,
    cursor: EndpointCursor,
}

/// 按 zone 维护有序候选地址，失败时依次轮换，成功后回到首选地址
#[derive(Debug, Default)]
pub struct ZoneFailoverRouter {
    zones: DashMap<String, ZoneCandidates>,
}

impl ZoneFailoverRouter {
    pub fn new(zone_endpoints: &BTreeMap<String, Vec<String>>) -> Self {
        let zones = DashMap::new();
        for (zone, endpoints) in zone_endpoints {
            if endpoints.is_empty() {
                continue;
            }
            zones.insert(
                zone.clone(),
                ZoneCandidates {
                    endpoints: endpoints.clone(),
                    cursor: EndpointCursor::default(),
                },
            );
        }
        Self { zones }
    }

    pub fn from_config(config: &RegistryConfig) -> Self {
        Self::new(&config.zone_endpoints)
    }

    /// 当前应使用的地址
    pub fn current_endpoint(&self, zone: &str) -> Result<String, RouterError> {
        let entry = self
            .zones
            .get(zone)
            .ok_or_else(|| RouterError::UnknownZone(zone.to_string()))?;
        entry
            .endpoints
            .get(entry.cursor.index)
            .cloned()
            .ok_or_else(|| RouterError::NoEndpoints(zone.to_string()))
    }

    /// 轮换到下一个候选地址并返回；只有一个候选时地址不变
    pub fn advance(&self, zone: &str) -> Result<String, RouterError> {
        let mut entry = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| RouterError::UnknownZone(zone.to_string()))?;
        let len = entry.endpoints.len();
        let index = entry.cursor.advance(len);
        let endpoint = entry.endpoints[index].clone();

        tracing::debug!(
            zone = %zone,
            endpoint = %endpoint,
            consecutive_failures = entry.cursor.consecutive_failures,
            "Rotated to next registry endpoint"
        );
        Ok(endpoint)
    }

    pub fn reset(&self, zone: &str) -> Result<(), RouterError> {
        let mut entry = self
            .zones
            .get_mut(zone)
            .ok_or_else(|| RouterError::UnknownZone(zone.to_string()))?;
        entry.cursor.reset();
        Ok(())
    }

    /// 该 zone 的全部候选地址（按配置顺序）
    pub fn candidates(&self, zone: &str) -> Result<Vec<String>, RouterError> {
        self.zones
            .get(zone)
            .map(|entry| entry.endpoints.clone())
            .ok_or_else(|| RouterError::UnknownZone(zone.to_string()))
    }

    pub fn cursor(&self, zone: &str) -> Option<EndpointCursor> {
        self.zones.get(zone).map(|entry| entry.cursor)
    }
}
