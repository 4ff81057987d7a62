use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use sikjipsa_core::image_intake::MAX_IMAGE_BYTES;

use crate::handlers::diagnosis;
use crate::state::AppState;

/// Headroom over the image limit for multipart framing and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Routes mounted at `/diagnosis`.
///
/// ```text
/// POST /analyze          analyze_plant
/// GET  /result/{id}      get_diagnosis_result
/// GET  /history          get_diagnosis_history
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/analyze",
            post(diagnosis::analyze_plant)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/result/{id}", get(diagnosis::get_diagnosis_result))
        .route("/history", get(diagnosis::get_diagnosis_history))
}
