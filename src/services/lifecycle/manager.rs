use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use super::error::LifecycleError;
use crate::services::config::RegistryConfig;
use crate::services::heartbeat::HeartbeatScheduler;
use crate::services::router::{RouterError, ZoneFailoverRouter};
use crate::services::state::{RegistrationState, StateHandle};
use crate::services::transport::{Ack, InstanceRecord, RegistryTransport};

#[derive(Debug, Default)]
struct LifecycleInner {
    record: Option<Arc<InstanceRecord>>,
    heartbeat_shutdown: Option<CancellationToken>,
    registering: Option<CancellationToken>,
}

/// 注册生命周期：启动注册、持有心跳循环、关闭时注销
pub struct RegistrationLifecycle {
    config: Arc<RegistryConfig>,
    transport: Arc<dyn RegistryTransport>,
    router: Arc<ZoneFailoverRouter>,
    state: StateHandle,
    // 串行化 start/stop
    inner: Mutex<LifecycleInner>,
    task_tracker: TaskTracker,
}

impl RegistrationLifecycle {
    pub fn new(config: RegistryConfig, transport: Arc<dyn RegistryTransport>) -> Self {
        let router = Arc::new(ZoneFailoverRouter::from_config(&config));
        Self {
            config: Arc::new(config),
            transport,
            router,
            state: StateHandle::new(),
            inner: Mutex::new(LifecycleInner::default()),
            task_tracker: TaskTracker::new(),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn router(&self) -> &Arc<ZoneFailoverRouter> {
        &self.router
    }

    pub fn state(&self) -> RegistrationState {
        self.state.get()
    }

    /// 订阅状态变化
    pub fn subscribe_state(&self) -> WatchStream<RegistrationState> {
        self.state.stream()
    }

    /// 当前注册使用的实例快照
    pub async fn instance_record(&self) -> Option<Arc<InstanceRecord>> {
        self.inner.lock().await.record.clone()
    }

    /// 向注册中心注册，依次尝试本 zone 的全部候选地址各一次
    pub async fn start(&self) -> Result<RegistrationState, LifecycleError> {
        let zone = self.config.home_zone().to_string();

        // 注册请求期间不持有锁，stop 可以随时中断
        let (record, attempts, cancel) = {
            let mut inner = self.inner.lock().await;

            match self.state.get() {
                current if current.is_alive() || current == RegistrationState::Registering => {
                    tracing::debug!(state = %current, "Already registered, start is a no-op");
                    return Ok(current);
                }
                RegistrationState::Failed(reason) => return Err(LifecycleError::Terminal(reason)),
                _ => {}
            }

            let attempts = self.router.candidates(&zone)?.len();
            self.router.reset(&zone)?;

            let cancel = CancellationToken::new();
            inner.registering = Some(cancel.clone());
            self.state.set(RegistrationState::Registering);

            let record = Arc::new(InstanceRecord::from_config(&self.config));
            (record, attempts, cancel)
        };

        tracing::info!(
            app_name = %record.app_name,
            instance_id = %record.instance_id,
            zone = %zone,
            candidates = attempts,
            "Registering instance with registry"
        );

        let outcome = self
            .register_with_failover(&zone, &record, attempts, &cancel)
            .await;

        let mut inner = self.inner.lock().await;
        inner.registering = None;

        match outcome {
            Ok(ack) => {
                if let Err(e) = self.router.reset(&zone) {
                    tracing::warn!(zone = %zone, error = %e, "Failed to reset endpoint cursor");
                }
                self.state.set(RegistrationState::Registered);
                tracing::info!(
                    app_name = %record.app_name,
                    instance_id = %record.instance_id,
                    endpoint = %ack.endpoint,
                    status = ack.status,
                    "Successfully registered with registry"
                );

                self.spawn_heartbeat(&mut inner, record, zone);
                Ok(RegistrationState::Registered)
            }
            Err(e) => {
                self.state.set(RegistrationState::Unregistered);
                Err(e)
            }
        }
    }

    async fn register_with_failover(
        &self,
        zone: &str,
        record: &InstanceRecord,
        attempts: usize,
        cancel: &CancellationToken,
    ) -> Result<Ack, LifecycleError> {
        let mut last_error = None;

        for attempt in 1..=attempts {
            let endpoint = self.router.current_endpoint(zone)?;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(
                        instance_id = %record.instance_id,
                        endpoint = %endpoint,
                        "Registration interrupted by shutdown"
                    );
                    return Err(LifecycleError::Cancelled);
                }
                result = self.transport.register(&endpoint, record) => result,
            };

            match result {
                Ok(ack) => return Ok(ack),
                Err(err) => {
                    tracing::warn!(
                        instance_id = %record.instance_id,
                        endpoint = %endpoint,
                        attempt,
                        error = %err,
                        "Registration attempt failed"
                    );
                    last_error = Some(err);
                    self.router.advance(zone)?;
                }
            }
        }

        let last_error = last_error.ok_or_else(|| RouterError::NoEndpoints(zone.to_string()))?;
        tracing::error!(
            instance_id = %record.instance_id,
            zone = %zone,
            attempts,
            error = %last_error,
            "Registration failed on every configured endpoint"
        );
        Err(LifecycleError::RegistrationFailed {
            attempts,
            last_error,
        })
    }

    /// 停止心跳并尽力注销一次，整体不超过关闭宽限期
    pub async fn stop(&self) {
        let grace = self.config.timing.shutdown_grace;
        let deadline = Instant::now() + grace;

        let registering = match timeout_at(deadline, self.inner.lock()).await {
            Ok(inner) => inner.registering.clone(),
            Err(_) => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Lifecycle busy past the grace period, skipping deregistration"
                );
                return;
            }
        };

        // 中断进行中的注册，等它落定为 Registered 或 Unregistered
        if let Some(cancel) = registering {
            cancel.cancel();
            let mut states = self.state.subscribe();
            let settled = timeout_at(
                deadline,
                states.wait_for(|state| *state != RegistrationState::Registering),
            )
            .await
            .is_ok();
            if !settled {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Registration did not settle within the grace period"
                );
                return;
            }
        }

        let Ok(mut inner) = timeout_at(deadline, self.inner.lock()).await else {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Lifecycle busy past the grace period, skipping deregistration"
            );
            return;
        };

        match self.state.get() {
            RegistrationState::Unregistered => {
                tracing::debug!("Not registered, stop is a no-op");
                return;
            }
            RegistrationState::Failed(reason) => {
                tracing::warn!(reason = %reason, "Registration already failed, skipping deregistration");
                return;
            }
            _ => {}
        }

        if let Some(shutdown) = inner.heartbeat_shutdown.take() {
            shutdown.cancel();
        }
        self.task_tracker.close();
        if timeout_at(deadline, self.task_tracker.wait()).await.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                "Heartbeat loop did not stop within the grace period"
            );
        }
        self.task_tracker.reopen();

        // 心跳循环可能在取消前刚进入终止状态
        if self.state.get().is_terminal() {
            inner.record = None;
            return;
        }

        self.state.set(RegistrationState::Deregistering);

        if let Some(record) = inner.record.take() {
            self.deregister(&record, deadline).await;
        }

        self.state.set(RegistrationState::Unregistered);
    }

    async fn deregister(&self, record: &InstanceRecord, deadline: Instant) {
        let zone = self.config.home_zone();
        let endpoint = match self.router.current_endpoint(zone) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(zone = %zone, error = %e, "No endpoint to deregister from");
                return;
            }
        };

        // 注销失败只记录警告，注册中心的租约过期会回收该实例
        match timeout_at(deadline, self.transport.deregister(&endpoint, record)).await {
            Ok(Ok(_)) => {
                tracing::info!(
                    app_name = %record.app_name,
                    instance_id = %record.instance_id,
                    endpoint = %endpoint,
                    "Successfully deregistered from registry"
                );
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    instance_id = %record.instance_id,
                    endpoint = %endpoint,
                    error = %err,
                    "Deregistration failed, registry lease will expire"
                );
            }
            Err(_) => {
                tracing::warn!(
                    instance_id = %record.instance_id,
                    endpoint = %endpoint,
                    "Deregistration timed out, registry lease will expire"
                );
            }
        }
    }

    fn spawn_heartbeat(
        &self,
        inner: &mut LifecycleInner,
        record: Arc<InstanceRecord>,
        zone: String,
    ) {
        let shutdown = CancellationToken::new();
        let scheduler = HeartbeatScheduler::new(
            self.transport.clone(),
            self.router.clone(),
            record.clone(),
            zone,
            self.state.clone(),
            &self.config.timing,
        );

        self.task_tracker.spawn(scheduler.run(shutdown.clone()));
        inner.heartbeat_shutdown = Some(shutdown);
        inner.record = Some(record);
    }
}

impl Drop for RegistrationLifecycle {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(shutdown) = inner.heartbeat_shutdown.take() {
            shutdown.cancel();
        }
        if let Some(cancel) = inner.registering.take() {
            cancel.cancel();
        }
    }
}
