//! Upload validation and encoding rules for diagnosis images.
//!
//! The upload handler owns the multipart parsing; this module decides whether
//! a file is acceptable and how it is encoded for the classification provider.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest accepted upload: 10 MiB.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Accepted file extensions (compared lowercase, without the dot).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// MIME subtype used when the extension is missing or unrecognised.
pub const DEFAULT_MIME_SUBTYPE: &str = "jpeg";

/// Hosting folder for diagnosis uploads.
pub const UPLOAD_FOLDER: &str = "sikjipsa/diagnosis";

/// Hosting-side transformation applied on upload (bounded size, auto quality).
pub const UPLOAD_TRANSFORMATION: &str = "c_limit,w_1500,h_1500,q_auto:good";

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Lowercased extension of `filename`, without the dot.
///
/// Everything after the last dot, so a bare `".png"` counts. Returns `None`
/// when there is no dot or nothing follows it.
pub fn file_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reject uploads that are too large or not one of the allowed image types.
pub fn validate_image_upload(filename: &str, size_bytes: usize) -> Result<(), CoreError> {
    if size_bytes == 0 {
        return Err(CoreError::Validation("Image file is empty".into()));
    }
    if size_bytes > MAX_IMAGE_BYTES {
        return Err(CoreError::Validation(format!(
            "Image file exceeds the {} MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }

    match file_extension(filename) {
        Some(ext) if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(CoreError::Validation(
            "Invalid image file. Only JPG, PNG, GIF, WEBP files under 10MB are allowed".into(),
        )),
    }
}

/// Parse an optional coordinate form field.
///
/// Blank or unparsable input is treated as absent; location is advisory for
/// the provider and never a reason to reject an upload.
pub fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// MIME subtype (`image/<subtype>`) for the given filename.
pub fn mime_subtype(filename: &str) -> &'static str {
    match file_extension(filename).as_deref() {
        Some("png") => "png",
        Some("gif") => "gif",
        Some("webp") => "webp",
        _ => DEFAULT_MIME_SUBTYPE,
    }
}

/// Encode raw image bytes as a `data:image/<subtype>;base64,...` URL.
pub fn encode_data_url(filename: &str, bytes: &[u8]) -> String {
    format!(
        "data:image/{};base64,{}",
        mime_subtype(filename),
        STANDARD.encode(bytes)
    )
}
