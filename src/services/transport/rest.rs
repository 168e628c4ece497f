use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use serde_json::{Value, json};

use super::RegistryTransport;
use super::error::TransportError;
use super::types::{Ack, InstanceRecord};

const DEFAULT_DATA_CENTER_CLASS: &str = "com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo";

/// 基于 Eureka REST 接口的传输实现
#[derive(Debug, Clone)]
pub struct HttpRegistryTransport {
    client: reqwest::Client,
}

impl HttpRegistryTransport {
    /// 每个请求（含建连）都受 `request_timeout` 限制
    pub fn new(request_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }

    fn app_url(endpoint: &str, record: &InstanceRecord) -> String {
        format!("{endpoint}/apps/{}", record.registry_app_name())
    }

    fn instance_url(endpoint: &str, record: &InstanceRecord) -> String {
        format!(
            "{}/{}",
            Self::app_url(endpoint, record),
            record.instance_id
        )
    }

    async fn send(
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<StatusCode, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|e| classify(endpoint, e))?;
        Ok(response.status())
    }
}

#[async_trait]
impl RegistryTransport for HttpRegistryTransport {
    async fn register(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        let request = self
            .client
            .post(Self::app_url(endpoint, record))
            .json(&instance_payload(record));

        let status = Self::send(endpoint, request).await?;
        check_status(endpoint, record, status, false)
    }

    async fn heartbeat(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        let request = self
            .client
            .put(Self::instance_url(endpoint, record))
            .query(&[
                ("status", "UP".to_string()),
                ("lastDirtyTimestamp", record.last_dirty_timestamp.to_string()),
            ]);

        let status = Self::send(endpoint, request).await?;
        check_status(endpoint, record, status, true)
    }

    async fn deregister(
        &self,
        endpoint: &str,
        record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        let request = self.client.delete(Self::instance_url(endpoint, record));

        let status = Self::send(endpoint, request).await?;
        check_status(endpoint, record, status, true)
    }
}

fn classify(endpoint: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        TransportError::ConnectionRefused {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }
}

fn check_status(
    endpoint: &str,
    record: &InstanceRecord,
    status: StatusCode,
    not_found_is_distinct: bool,
) -> Result<Ack, TransportError> {
    if status.is_success() {
        return Ok(Ack {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        });
    }

    if not_found_is_distinct && status == StatusCode::NOT_FOUND {
        return Err(TransportError::NotFound {
            instance_id: record.instance_id.clone(),
        });
    }

    Err(TransportError::ProtocolError {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
    })
}

/// 构造 Eureka 注册请求体
pub fn instance_payload(record: &InstanceRecord) -> Value {
    let mut metadata = serde_json::Map::new();
    for (key, value) in &record.metadata {
        metadata.insert(key.clone(), Value::String(value.clone()));
    }
    if let Some(zone) = &record.zone {
        metadata.insert("zone".to_string(), Value::String(zone.clone()));
    }

    let timestamp = record.last_dirty_timestamp.to_string();

    json!({
        "instance": {
            "instanceId": record.instance_id,
            "hostName": record.host,
            "app": record.registry_app_name(),
            "ipAddr": record.ip_addr,
            "vipAddress": record.app_name,
            "secureVipAddress": record.app_name,
            "status": "UP",
            "overriddenstatus": "UNKNOWN",
            "port": { "$": record.port, "@enabled": "true" },
            "securePort": { "$": 443, "@enabled": "false" },
            "countryId": 1,
            "dataCenterInfo": {
                "@class": DEFAULT_DATA_CENTER_CLASS,
                "name": record.data_center_name,
            },
            "leaseInfo": {
                "renewalIntervalInSecs": record.renewal_interval.as_secs(),
                "durationInSecs": record.lease_duration.as_secs(),
            },
            "metadata": metadata,
            "homePageUrl": record.home_page_url,
            "statusPageUrl": record.status_page_url,
            "healthCheckUrl": record.health_check_url,
            "isCoordinatingDiscoveryServer": "false",
            "lastUpdatedTimestamp": timestamp,
            "lastDirtyTimestamp": timestamp,
        }
    })
}
