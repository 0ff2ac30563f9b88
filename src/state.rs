use std::{sync::Arc, time::Duration};

use crate::{
    cache::CacheService, config::AppConfig, db::OrmConn, images::ImageStore,
    monitor::PerformanceMonitor,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub cache: CacheService,
    pub monitor: Arc<PerformanceMonitor>,
    pub images: ImageStore,
}

impl AppState {
    pub fn new(orm: OrmConn, config: AppConfig) -> Self {
        let cache = CacheService::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        );
        let images = ImageStore::new(config.upload_dir.clone(), config.max_upload_bytes);
        Self {
            orm,
            config: Arc::new(config),
            cache,
            monitor: Arc::new(PerformanceMonitor::new()),
            images,
        }
    }
}
