//! Agreement reference URLs: `<base>/agreement/{id}/view`.

use crate::error::LendingError;
use crate::types::AgreementId;
use crate::LendingResult;

/// Build the external reference for an agreement.
pub fn agreement_url(base_url: &str, id: AgreementId) -> String {
    format!("{}/agreement/{}/view", base_url.trim_end_matches('/'), id)
}

/// Extract the agreement ID from a reference URL.
///
/// The ID is the second-to-last path segment; anything non-numeric there
/// is a parse error.
pub fn find_id_from_url(url: &str) -> LendingResult<AgreementId> {
    let segments: Vec<&str> = url.split('/').collect();
    if segments.len() < 2 {
        return Err(LendingError::ReferenceParse {
            url: url.to_string(),
            reason: "expected .../agreement/{id}/view".into(),
        });
    }

    let raw = segments[segments.len() - 2];
    raw.parse::<AgreementId>()
        .map_err(|e| LendingError::ReferenceParse {
            url: url.to_string(),
            reason: format!("segment '{}' is not a numeric id ({})", raw, e),
        })
}
