use std::sync::Arc;

use super::error::LifecycleError;
use super::manager::RegistrationLifecycle;

/// 交给宿主进程的启动/关闭钩子；未配置注册中心时为空操作
#[derive(Clone, Default)]
pub struct RegistryHooks {
    lifecycle: Option<Arc<RegistrationLifecycle>>,
}

impl RegistryHooks {
    pub fn disabled() -> Self {
        Self { lifecycle: None }
    }

    pub fn new(lifecycle: RegistrationLifecycle) -> Self {
        Self {
            lifecycle: Some(Arc::new(lifecycle)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.is_some()
    }

    pub fn lifecycle(&self) -> Option<&Arc<RegistrationLifecycle>> {
        self.lifecycle.as_ref()
    }

    /// 宿主监听端口就绪后调用
    pub async fn on_start(&self) -> Result<(), LifecycleError> {
        match &self.lifecycle {
            Some(lifecycle) => lifecycle.start().await.map(|_| ()),
            None => {
                tracing::debug!("Registry integration disabled, skipping registration");
                Ok(())
            }
        }
    }

    /// 宿主关闭监听端口之前调用
    pub async fn on_shutdown(&self) {
        if let Some(lifecycle) = &self.lifecycle {
            lifecycle.stop().await;
        }
    }
}
