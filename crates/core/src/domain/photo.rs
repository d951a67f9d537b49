use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Guesses an image MIME type from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Encodes raw image bytes as a `data:` URL, the form photos are stored in.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Returns the MIME type and decoded byte length of a base64 `data:` URL.
pub fn inspect_data_url(value: &str) -> Option<(&str, usize)> {
    let rest = value.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let decoded = STANDARD.decode(payload).ok()?;
    Some((mime, decoded.len()))
}
