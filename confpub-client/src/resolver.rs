//! Cardinality checks for uniqueness-constrained lookups.

use crate::error::{ClientError, ClientResult, LookupKey};
use crate::wire::ResultsEnvelope;

/// Returns the single result of a lookup.
///
/// The count reported by the envelope decides: zero is
/// [`ClientError::NotFound`], more than one is
/// [`ClientError::MultipleResults`]. Ambiguity is never resolved by picking
/// one of the candidates.
pub fn resolve_single<T>(key: LookupKey, envelope: ResultsEnvelope<T>) -> ClientResult<T> {
    let count = envelope.reported_size();
    match count {
        0 => Err(ClientError::NotFound { key }),
        1 => envelope
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidResponse {
                request: key.to_string(),
                detail: "lookup reported one result but returned none".to_string(),
            }),
        count => Err(ClientError::MultipleResults { key, count }),
    }
}
