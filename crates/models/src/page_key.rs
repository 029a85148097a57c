use url::Url;

use crate::errors::ModelError;

/// Aggregate key for a page: origin plus path, without query string or fragment.
pub fn page_key(raw: &str) -> Result<String, ModelError> {
    let parsed = Url::parse(raw)
        .map_err(|e| ModelError::Validation(format!("invalid page url `{raw}`: {e}")))?;
    let origin = parsed.origin();
    if !origin.is_tuple() {
        return Err(ModelError::Validation(format!("page url `{raw}` has no origin")));
    }
    Ok(format!("{}{}", origin.ascii_serialization(), parsed.path()))
}
