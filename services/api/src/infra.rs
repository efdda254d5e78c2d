use lostfound::config::AppConfig;
use lostfound::error::AppError;
use lostfound::items::{
    DiskImageStore, InMemoryImageStore, InMemoryItemRepository, InMemoryModeratorRepository,
    LostFoundService, ServiceSettings, SqliteDatabase, SqliteItemRepository,
    SqliteModeratorRepository,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn open_database(config: &AppConfig) -> Result<SqliteDatabase, AppError> {
    if let Some(parent) = config.storage.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(SqliteDatabase::open(&config.storage.database_path)?)
}

/// SQLite-backed service with images on disk and the configured moderator seeded.
pub(crate) fn build_service(
    config: &AppConfig,
) -> Result<Arc<LostFoundService<SqliteItemRepository>>, AppError> {
    let db = open_database(config)?;
    let service = LostFoundService::new(
        Arc::new(SqliteItemRepository::new(db.clone())),
        Arc::new(SqliteModeratorRepository::new(db)),
        Arc::new(DiskImageStore::new(&config.storage.upload_dir)),
        ServiceSettings::from_config(config),
    );

    if service.gate().ensure_seeded(&config.moderator)? {
        info!(username = %config.moderator.username, "seeded default moderator");
    }
    info!(
        database = %config.storage.database_path.display(),
        uploads = %config.storage.upload_dir.display(),
        "storage ready"
    );
    Ok(Arc::new(service))
}

/// Process-local service for the demo command.
pub(crate) fn in_memory_service(
    config: &AppConfig,
) -> Result<Arc<LostFoundService<InMemoryItemRepository>>, AppError> {
    let service = LostFoundService::new(
        Arc::new(InMemoryItemRepository::default()),
        Arc::new(InMemoryModeratorRepository::default()),
        Arc::new(InMemoryImageStore::default()),
        ServiceSettings::from_config(config),
    );
    service.gate().ensure_seeded(&config.moderator)?;
    Ok(Arc::new(service))
}
