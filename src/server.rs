use std::net::UdpSocket;
use std::sync::Arc;

use tokio_stream::StreamExt;

use crate::config::Config;
use crate::services::config::resolve;
use crate::services::lifecycle::{RegistrationLifecycle, RegistryHooks};
use crate::services::state::RegistrationState;
use crate::services::transport::HttpRegistryTransport;

const FALLBACK_IP: &str = "127.0.0.1";

pub async fn start() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let hooks = build_hooks(&config)?;

    if let Some(lifecycle) = hooks.lifecycle() {
        spawn_state_logger(lifecycle);
    }

    if let Err(e) = hooks.on_start().await {
        let required = hooks
            .lifecycle()
            .is_some_and(|l| l.config().require_registration);
        if required {
            return Err(e.into());
        }
        tracing::error!(error = %e, "Continuing without registry integration");
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    hooks.on_shutdown().await;
    Ok(())
}

/// 根据 `[eureka]` 配置构建钩子；未配置时返回空钩子
pub fn build_hooks(config: &Config) -> Result<RegistryHooks, Box<dyn std::error::Error>> {
    let Some(raw) = &config.eureka else {
        tracing::info!("No registry configuration, registry integration disabled");
        return Ok(RegistryHooks::disabled());
    };

    let mut raw = raw.clone();
    if raw.ip_addr.is_none() {
        raw.ip_addr = Some(detect_local_ip());
    }

    let registry_config = resolve(&raw)?;
    tracing::info!(
        app_name = %registry_config.app_name,
        instance_id = %registry_config.instance_id,
        zone = %registry_config.home_zone(),
        endpoints = ?registry_config.home_endpoints(),
        "Registry integration enabled"
    );

    let transport = HttpRegistryTransport::new(registry_config.timing.request_timeout)?;
    let lifecycle = RegistrationLifecycle::new(registry_config, Arc::new(transport));
    Ok(RegistryHooks::new(lifecycle))
}

// 终止状态需要运维介入，以 error 级别输出
fn spawn_state_logger(lifecycle: &RegistrationLifecycle) {
    let mut states = lifecycle.subscribe_state();
    tokio::spawn(async move {
        while let Some(state) = states.next().await {
            match state {
                RegistrationState::Failed(reason) => {
                    tracing::error!(reason = %reason, "Registry integration failed, restart required");
                }
                other => tracing::info!(state = %other, "Registration state"),
            }
        }
    });
}

/// 本机对外 IPv4 地址，UDP connect 不会发送数据包
pub fn detect_local_ip() -> String {
    UdpSocket::bind("0.0.0.0:0")
        .and_then(|socket| {
            socket.connect("8.8.8.8:80")?;
            socket.local_addr()
        })
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|_| FALLBACK_IP.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
