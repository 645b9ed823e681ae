use crate::storage::ClientApp;
use dashmap::DashMap;
use std::sync::Arc;

/// Read-through shadow of the client app registry, keyed by client id.
///
/// The store stays authoritative: entries here are populated by the resolver
/// on miss and removed whenever the persisted record changes, so a stale
/// blank callback can never outlive the write that replaced it. Shared
/// across all request tasks.
#[derive(Clone, Default)]
pub struct AppInfoCache {
    entries: Arc<DashMap<String, ClientApp>>,
}

impl AppInfoCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, client_id: &str) -> Option<ClientApp> {
        self.entries.get(client_id).map(|entry| entry.value().clone())
    }

    pub fn put(&self, app: ClientApp) {
        self.entries.insert(app.client_id.clone(), app);
    }

    pub fn invalidate(&self, client_id: &str) {
        self.entries.remove(client_id);
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.entries.contains_key(client_id)
    }
}
