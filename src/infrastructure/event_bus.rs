// Event Bus 框架
// 进程内事件发布/订阅，publish 内直接分发给订阅者（无后台任务）

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::ChainId;

// ============ 事件类型定义 ============

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum DomainEvent {
    ChainBound {
        account_id: String,
        cluster_id: String,
        chain_id: ChainId,
        address_id: String,
    },
    DappConnected {
        account_id: String,
        dapp_id: String,
        chain_id: ChainId,
        address_id: String,
    },
    DappDisconnected {
        account_id: String,
        dapp_id: String,
        chain_id: ChainId,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::ChainBound { .. } => "ChainBound",
            DomainEvent::DappConnected { .. } => "DappConnected",
            DomainEvent::DappDisconnected { .. } => "DappDisconnected",
        }
    }

    pub fn account_id(&self) -> &str {
        match self {
            DomainEvent::ChainBound { account_id, .. }
            | DomainEvent::DappConnected { account_id, .. }
            | DomainEvent::DappDisconnected { account_id, .. } => account_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event: DomainEvent,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

// ============ Event Handler Trait ============

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> Result<()>;
    fn event_types(&self) -> Vec<&'static str>;
}

// ============ Event Bus 接口 ============

#[async_trait]
pub trait EventBus: Send + Sync {
    /// 发布事件，返回前所有订阅者已处理完毕
    async fn publish(&self, event: DomainEvent) -> Result<()>;

    /// 订阅事件
    async fn subscribe(&self, handler: Arc<dyn EventHandler>);

    /// 获取事件历史（最新在前）
    async fn get_event_history(&self, limit: usize) -> Vec<EventEnvelope>;
}

// ============ 内存 Event Bus 实现 ============

const HISTORY_CAPACITY: usize = 256;

pub struct InMemoryEventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
    history: Mutex<VecDeque<EventEnvelope>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(Vec::new()),
            history: Mutex::new(VecDeque::with_capacity(HISTORY_CAPACITY)),
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    async fn publish(&self, event: DomainEvent) -> Result<()> {
        let envelope = EventEnvelope {
            event_id: Uuid::new_v4(),
            event,
            published_at: chrono::Utc::now(),
        };

        {
            let mut history = self.history.lock().await;
            if history.len() == HISTORY_CAPACITY {
                history.pop_front();
            }
            history.push_back(envelope.clone());
        }

        let event_type = envelope.event.event_type();
        let handlers = self.handlers.read().await;
        for handler in handlers.iter() {
            if handler.event_types().contains(&event_type) {
                // 订阅者失败不影响发布方
                if let Err(e) = handler.handle(&envelope.event).await {
                    tracing::error!(error = ?e, event_id = %envelope.event_id, event_type, "Event handler error");
                }
            }
        }

        Ok(())
    }

    async fn subscribe(&self, handler: Arc<dyn EventHandler>) {
        let mut handlers = self.handlers.write().await;
        handlers.push(handler);
    }

    async fn get_event_history(&self, limit: usize) -> Vec<EventEnvelope> {
        let history = self.history.lock().await;
        history.iter().rev().take(limit).cloned().collect()
    }
}
