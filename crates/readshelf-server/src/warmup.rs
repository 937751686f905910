//! Startup cache warmup for the NYT routes.
//!
//! Pre-populates the list-names catalog and the current overview through the
//! normal refresh path, so the first page load after a deploy hits warm
//! cache. Failures are logged and never block startup.

use crate::routes::nyt;
use crate::server::AppState;

pub fn spawn_warmup(state: AppState) {
    if state.config.nyt.api_key.as_deref().unwrap_or("").is_empty() {
        tracing::debug!("NYT key not configured, skipping cache warmup");
        return;
    }
    tokio::spawn(async move {
        match nyt::list_names_lookup(&state).await {
            Ok(_) => tracing::info!("warmed nyt:list-names"),
            Err(e) => tracing::warn!(status = %e.status(), "list-names warmup failed"),
        }
        match nyt::overview_lookup(&state, "current").await {
            Ok(_) => tracing::info!("warmed nyt:overview:current"),
            Err(e) => tracing::warn!(status = %e.status(), "overview warmup failed"),
        }
    });
}
