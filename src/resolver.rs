use crate::cache::AppInfoCache;
use crate::errors::SyzygyError;
use crate::storage;
use sea_orm::DatabaseConnection;

/// Resolve the redirect URI for a verified client.
///
/// Reads the client app record cache-first (populating the cache on miss).
/// A registered non-blank callback is authoritative and is returned without
/// any write. A blank one is replaced by a synthesized fallback pointing at
/// the interaction-success page, which is persisted and only then handed
/// back, with the cache entry invalidated in between, so no later request
/// can observe the stale blank through the cache.
///
/// Synthesis is deterministic in the application name, so two requests
/// racing over the same blank-callback client persist the same value; the
/// invalidation still happens on every write.
pub async fn resolve_callback_uri(
    db: &DatabaseConnection,
    cache: &AppInfoCache,
    success_url: &str,
    client_id: &str,
) -> Result<String, SyzygyError> {
    let app = match cache.get(client_id) {
        Some(app) => app,
        None => {
            let app = storage::get_client_app(db, client_id)
                .await?
                .ok_or_else(|| SyzygyError::ClientLookup {
                    client_id: client_id.to_string(),
                })?;
            cache.put(app.clone());
            app
        }
    };

    if let Some(uri) = app.callback_uri.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(uri.to_string());
    }

    let uri = fallback_redirect_uri(success_url, &app.application_name);
    storage::set_callback_uri(db, client_id, &uri).await?;
    cache.invalidate(client_id);
    tracing::debug!(client_id, "synthesized fallback redirect URI");
    Ok(uri)
}

/// Success-page URI parameterized with the application name, shown when the
/// client never registered a callback of its own.
pub fn fallback_redirect_uri(success_url: &str, app_name: &str) -> String {
    let sep = if success_url.contains('?') { '&' } else { '?' };
    format!("{success_url}{sep}appName={}", urlencoding::encode(app_name))
}
