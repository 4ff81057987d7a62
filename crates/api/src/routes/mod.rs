pub mod diagnosis;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /diagnosis/analyze                               upload (POST, auth, rate limited)
/// /diagnosis/result/{id}                           poll one diagnosis (public)
/// /diagnosis/history                               caller's newest diagnoses (auth)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/diagnosis", diagnosis::router())
}
