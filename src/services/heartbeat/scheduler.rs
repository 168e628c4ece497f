use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::services::config::TimingConfig;
use crate::services::router::ZoneFailoverRouter;
use crate::services::state::{RegistrationState, StateHandle};
use crate::services::transport::{InstanceRecord, RegistryTransport, TransportError};

pub const MAX_FAILURES_REASON: &str = "max consecutive heartbeat failures exceeded";

/// 单次心跳后的调度结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// 固定间隔的续约循环
pub struct HeartbeatScheduler {
    transport: Arc<dyn RegistryTransport>,
    router: Arc<ZoneFailoverRouter>,
    record: Arc<InstanceRecord>,
    zone: String,
    state: StateHandle,
    interval: Duration,
    failure_threshold: u32,
    consecutive_failures: u32,
}

impl HeartbeatScheduler {
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        router: Arc<ZoneFailoverRouter>,
        record: Arc<InstanceRecord>,
        zone: impl Into<String>,
        state: StateHandle,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            transport,
            router,
            record,
            zone: zone.into(),
            state,
            interval: timing.heartbeat_interval,
            failure_threshold: timing.failure_threshold.max(1),
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// 运行直到取消或进入终止状态；首次心跳在一个间隔之后
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            instance_id = %self.record.instance_id,
            zone = %self.zone,
            interval_secs = self.interval.as_secs(),
            "Heartbeat loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // 取消时最多丢弃一个进行中的心跳
            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                outcome = self.tick() => outcome,
            };

            if outcome == TickOutcome::Stop {
                break;
            }
        }

        tracing::debug!(instance_id = %self.record.instance_id, "Heartbeat loop stopped");
    }

    /// 执行一次心跳
    pub async fn tick(&mut self) -> TickOutcome {
        let endpoint = match self.router.current_endpoint(&self.zone) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!(zone = %self.zone, error = %e, "No registry endpoint available");
                self.state.set(RegistrationState::Failed(e.to_string()));
                return TickOutcome::Stop;
            }
        };

        match self.transport.heartbeat(&endpoint, &self.record).await {
            Ok(_) => {
                tracing::debug!(
                    instance_id = %self.record.instance_id,
                    endpoint = %endpoint,
                    "Heartbeat acknowledged"
                );
                self.on_success(&endpoint)
            }
            Err(err) if err.is_not_found() => {
                // 注册中心已丢失该实例，立即重新注册一次
                tracing::warn!(
                    instance_id = %self.record.instance_id,
                    endpoint = %endpoint,
                    "Registry no longer knows this instance, re-registering"
                );
                match self.transport.register(&endpoint, &self.record).await {
                    Ok(_) => {
                        tracing::info!(
                            instance_id = %self.record.instance_id,
                            endpoint = %endpoint,
                            "Re-registered instance with registry"
                        );
                        self.on_success(&endpoint)
                    }
                    Err(err) => self.on_failure(&endpoint, &err),
                }
            }
            Err(err) => self.on_failure(&endpoint, &err),
        }
    }

    fn on_success(&mut self, endpoint: &str) -> TickOutcome {
        if let Err(e) = self.router.reset(&self.zone) {
            tracing::warn!(zone = %self.zone, error = %e, "Failed to reset endpoint cursor");
        }

        if self.consecutive_failures > 0 {
            tracing::info!(
                instance_id = %self.record.instance_id,
                endpoint = %endpoint,
                previous_failures = self.consecutive_failures,
                "Heartbeat recovered"
            );
        }
        self.consecutive_failures = 0;
        self.state.set(RegistrationState::Registered);
        TickOutcome::Continue
    }

    fn on_failure(&mut self, endpoint: &str, err: &TransportError) -> TickOutcome {
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.failure_threshold {
            tracing::error!(
                instance_id = %self.record.instance_id,
                endpoint = %endpoint,
                consecutive_failures = self.consecutive_failures,
                threshold = self.failure_threshold,
                error = %err,
                "Heartbeat failure threshold reached, giving up; restart required"
            );
            self.state
                .set(RegistrationState::Failed(MAX_FAILURES_REASON.to_string()));
            return TickOutcome::Stop;
        }

        let next = self.router.advance(&self.zone);
        tracing::warn!(
            instance_id = %self.record.instance_id,
            endpoint = %endpoint,
            next_endpoint = ?next.ok(),
            consecutive_failures = self.consecutive_failures,
            error = %err,
            "Heartbeat failed"
        );
        self.state
            .set(RegistrationState::HeartbeatFailing(self.consecutive_failures));
        TickOutcome::Continue
    }
}
