use crate::services::{
    cases::CaseService,
    files::FileService,
    intake::IntakeService,
    locks::ContainerLocks,
    object_store::ObjectStore,
};
use sqlx::SqlitePool;
use std::{path::PathBuf, sync::Arc};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub intake: IntakeService,
    pub cases: CaseService,
    pub files: FileService,
    /// Bearer token required on `/admin` routes. `None` locks them.
    pub admin_token: Option<Arc<str>>,
    /// Payload root, checked by `/readyz`.
    pub storage_dir: PathBuf,
}

impl AppState {
    /// Wire the services around one object store and one set of container
    /// locks.
    pub fn new(
        db: Arc<SqlitePool>,
        store: Arc<dyn ObjectStore>,
        admin_token: Option<String>,
        storage_dir: PathBuf,
    ) -> Self {
        let locks = ContainerLocks::new();
        let cases = CaseService::new(db.clone(), store.clone(), locks.clone());
        let intake = IntakeService::new(store.clone(), Arc::new(cases.clone()), locks.clone());
        let files = FileService::new(store, locks);
        Self {
            db,
            intake,
            cases,
            files,
            admin_token: admin_token.map(Arc::from),
            storage_dir,
        }
    }
}
