//! Credential rotation: try each candidate key in turn, retrying transient
//! failures per key, until one succeeds.

use std::future::Future;

use super::credentials::Credential;
use super::retry::{retry, RetryPolicy};
use crate::error::{StudioError, MISSING_CREDENTIAL_HINT};

/// Run `operation` with each candidate until one succeeds.
///
/// Each candidate gets its own retry budget from `policy`. Any failure is
/// recorded and the next candidate is tried. An empty list, or running out of
/// candidates, yields [`StudioError::CredentialExhausted`].
pub async fn execute_with_rotation<T, F, Fut>(
    candidates: &[Credential],
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
) -> Result<T, StudioError>
where
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = Result<T, StudioError>>,
{
    let mut last_error: Option<StudioError> = None;

    for credential in candidates {
        let outcome = retry(policy, label, || operation(credential.clone())).await;

        match outcome {
            Ok(value) => return Ok(value),
            Err(error) => {
                let error = StudioError::from(error);
                log::warn!(
                    "{}: API key {} failed: {}",
                    label,
                    credential.redacted(),
                    error
                );
                last_error = Some(error);
            }
        }
    }

    let rejected = last_error
        .as_ref()
        .is_some_and(StudioError::is_rejected_credential);

    if candidates.is_empty() {
        log::error!("{}: no API key configured", label);
    } else {
        log::error!("{}: all {} API keys failed", label, candidates.len());
    }

    Err(StudioError::CredentialExhausted {
        hint: exhaustion_hint(candidates.len(), rejected),
        tried: candidates.len(),
        rejected,
        last: last_error.map(Box::new),
    })
}

fn exhaustion_hint(tried: usize, rejected: bool) -> String {
    if rejected {
        format!(
            "{} (the provider rejected the API key; enter a new one in settings)",
            MISSING_CREDENTIAL_HINT
        )
    } else if tried == 0 {
        format!("{} (no API key configured)", MISSING_CREDENTIAL_HINT)
    } else {
        format!("{} (all {} API keys failed)", MISSING_CREDENTIAL_HINT, tried)
    }
}
