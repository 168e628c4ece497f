use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

/// 注册状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    Unregistered,
    Registering,
    Registered,
    HeartbeatFailing(u32),
    Deregistering,
    Failed(String),
}

impl RegistrationState {
    /// 终止状态，只能通过重启进程恢复
    pub fn is_terminal(&self) -> bool {
        matches!(self, RegistrationState::Failed(_))
    }

    /// 已注册且心跳循环仍在运行
    pub fn is_alive(&self) -> bool {
        matches!(
            self,
            RegistrationState::Registered | RegistrationState::HeartbeatFailing(_)
        )
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Unregistered => write!(f, "unregistered"),
            RegistrationState::Registering => write!(f, "registering"),
            RegistrationState::Registered => write!(f, "registered"),
            RegistrationState::HeartbeatFailing(n) => write!(f, "heartbeat-failing({n})"),
            RegistrationState::Deregistering => write!(f, "deregistering"),
            RegistrationState::Failed(reason) => write!(f, "failed({reason})"),
        }
    }
}

/// 唯一的状态值，由生命周期持有，心跳调度器通过克隆的句柄写入
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<RegistrationState>>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RegistrationState::Unregistered);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> RegistrationState {
        self.tx.borrow().clone()
    }

    /// 写入新状态，返回状态是否发生变化
    pub fn set(&self, next: RegistrationState) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            tracing::debug!(from = %current, to = %next, "Registration state changed");
            *current = next;
            true
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationState> {
        self.tx.subscribe()
    }

    /// 状态变化流，首个元素为当前状态
    pub fn stream(&self) -> WatchStream<RegistrationState> {
        WatchStream::new(self.tx.subscribe())
    }
}
