use crate::handler::error::ApiError;

const TRACK_URI_PREFIX: &str = "spotify:track:";

pub fn required_str(s: &str, msg: &'static str) -> Result<(), ApiError> {
    if s.trim().is_empty() {
        Err(ApiError::BadRequest(msg))
    } else {
        Ok(())
    }
}

/// Accepts a bare base62 track id or a `spotify:track:` URI wrapping one.
pub fn catalog_id(s: &str, msg: &'static str) -> Result<(), ApiError> {
    let id = s.strip_prefix(TRACK_URI_PREFIX).unwrap_or(s);
    if !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(msg))
    }
}
