use std::sync::Arc;

use crate::{
    config::Config,
    infrastructure::{
        cache::ProjectionCache,
        event_bus::{EventBus, InMemoryEventBus},
    },
    repository::Engine,
    service::{
        AccountProjectionService, AddressBindingService, ChainRegistryService,
        DappConnectionService, ProjectionInvalidationHandler,
    },
};

/// 应用状态
/// 包含所有共享资源与服务
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<dyn Engine>,
    pub events: Arc<dyn EventBus>,
    pub cache: Arc<ProjectionCache>,
    pub chains: ChainRegistryService,
    pub binding: Arc<AddressBindingService>,
    pub dapps: Arc<DappConnectionService>,
    pub projection: Arc<AccountProjectionService>,
}

impl AppState {
    /// 创建应用状态，并把投影缓存失效处理器订阅到事件总线
    pub async fn new(config: Config, engine: Arc<dyn Engine>) -> Self {
        let events: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
        let cache = Arc::new(ProjectionCache::new(&config.projection));

        events
            .subscribe(Arc::new(ProjectionInvalidationHandler::new(cache.clone())))
            .await;

        Self {
            config: Arc::new(config),
            chains: ChainRegistryService::new(engine.clone()),
            binding: Arc::new(AddressBindingService::new(
                engine.clone(),
                events.clone(),
                cache.clone(),
            )),
            dapps: Arc::new(DappConnectionService::new(
                engine.clone(),
                events.clone(),
                cache.clone(),
            )),
            projection: Arc::new(AccountProjectionService::new(engine.clone(), cache.clone())),
            engine,
            events,
            cache,
        }
    }
}
