#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use registry_lifecycle::services::config::{
    PortValue, RawSettings, RegistryConfig, UrlList, resolve_with_env,
};
use registry_lifecycle::services::transport::{
    Ack, InstanceRecord, RegistryTransport, TransportError,
};

/// 记录的一次调用：操作 + 地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Register(String),
    Heartbeat(String),
    Deregister(String),
}

/// 按脚本返回结果的传输实现，未编排的调用一律成功
#[derive(Default)]
pub struct ScriptedTransport {
    register: Mutex<VecDeque<Result<(), TransportError>>>,
    heartbeat: Mutex<VecDeque<Result<(), TransportError>>>,
    deregister: Mutex<VecDeque<Result<(), TransportError>>>,
    heartbeat_default: Mutex<Option<TransportError>>,
    register_delay: Mutex<Option<Duration>>,
    deregister_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_register(&self, result: Result<(), TransportError>) {
        self.register.lock().unwrap().push_back(result);
    }

    pub fn push_heartbeat(&self, result: Result<(), TransportError>) {
        self.heartbeat.lock().unwrap().push_back(result);
    }

    pub fn push_deregister(&self, result: Result<(), TransportError>) {
        self.deregister.lock().unwrap().push_back(result);
    }

    /// 脚本用完后心跳始终返回该错误
    pub fn fail_heartbeats_with(&self, err: TransportError) {
        *self.heartbeat_default.lock().unwrap() = Some(err);
    }

    /// 每次注册请求先等待该时长
    pub fn hang_register(&self, delay: Duration) {
        *self.register_delay.lock().unwrap() = Some(delay);
    }

    pub fn hang_deregister(&self, delay: Duration) {
        *self.deregister_delay.lock().unwrap() = Some(delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn ack(endpoint: &str, result: Result<(), TransportError>) -> Result<Ack, TransportError> {
        result.map(|_| Ack {
            endpoint: endpoint.to_string(),
            status: 200,
        })
    }
}

#[async_trait]
impl RegistryTransport for ScriptedTransport {
    async fn register(
        &self,
        endpoint: &str,
        _record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        self.record(Call::Register(endpoint.to_string()));
        let delay = *self.register_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.register.lock().unwrap().pop_front().unwrap_or(Ok(()));
        Self::ack(endpoint, result)
    }

    async fn heartbeat(
        &self,
        endpoint: &str,
        _record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        self.record(Call::Heartbeat(endpoint.to_string()));
        let scripted = self.heartbeat.lock().unwrap().pop_front();
        let result = match scripted {
            Some(result) => result,
            None => match self.heartbeat_default.lock().unwrap().clone() {
                Some(err) => Err(err),
                None => Ok(()),
            },
        };
        Self::ack(endpoint, result)
    }

    async fn deregister(
        &self,
        endpoint: &str,
        _record: &InstanceRecord,
    ) -> Result<Ack, TransportError> {
        self.record(Call::Deregister(endpoint.to_string()));
        let delay = *self.deregister_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.deregister.lock().unwrap().pop_front().unwrap_or(Ok(()));
        Self::ack(endpoint, result)
    }
}

pub fn timeout(endpoint: &str) -> TransportError {
    TransportError::Timeout {
        endpoint: endpoint.to_string(),
    }
}

pub fn refused(endpoint: &str) -> TransportError {
    TransportError::ConnectionRefused {
        endpoint: endpoint.to_string(),
        reason: "connection refused".to_string(),
    }
}

pub fn not_found() -> TransportError {
    TransportError::NotFound {
        instance_id: "svc-10.0.0.1-4000".to_string(),
    }
}

pub fn raw_settings(urls: &[&str]) -> RawSettings {
    RawSettings {
        app_name: Some("svc".to_string()),
        host: Some("10.0.0.1".to_string()),
        port: Some(PortValue::Number(4000)),
        eureka_server_urls: Some(UrlList::from(urls.to_vec())),
        ..Default::default()
    }
}

/// 心跳间隔 30 秒，关闭宽限 5 秒
pub fn registry_config(urls: &[&str], failure_threshold: u32) -> RegistryConfig {
    let mut raw = raw_settings(urls);
    raw.heartbeat_failure_threshold = Some(failure_threshold);
    raw.heartbeat_interval_secs = Some(30);
    raw.shutdown_grace_secs = Some(5);
    resolve_with_env(&raw, &HashMap::<String, String>::new()).expect("valid test config")
}
