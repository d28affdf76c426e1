use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::util::{validate_url, UrlValidationError};

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 3;

/// Why a redirect was not followed.
#[derive(Debug, Error)]
pub enum RedirectError {
    #[error("too many redirects (max {MAX_REDIRECTS})")]
    TooMany,
    #[error("redirect loop detected at {0}")]
    Loop(String),
    #[error("redirect target rejected: {0}")]
    Blocked(#[from] UrlValidationError),
}

/// Decide whether to follow a redirect to `next`.
///
/// `previous` is the chain so far, starting with the originally requested
/// URL. With `guard_private_hosts`, every hop must pass [`validate_url`] the
/// same way the first URL did.
pub(crate) fn check_redirect(
    next: &Url,
    previous: &[Url],
    guard_private_hosts: bool,
) -> Result<(), RedirectError> {
    if previous.len() > MAX_REDIRECTS {
        return Err(RedirectError::TooMany);
    }
    if previous.iter().any(|prev| prev.as_str() == next.as_str()) {
        return Err(RedirectError::Loop(next.to_string()));
    }
    if guard_private_hosts {
        validate_url(next.as_str())?;
    }
    Ok(())
}

/// Redirect policy with a hop limit, loop detection and, optionally, the
/// private-host guard on every hop.
pub(crate) fn redirect_policy(guard_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        let decision = check_redirect(attempt.url(), attempt.previous(), guard_private_hosts);
        match decision {
            Ok(()) => {
                tracing::debug!(
                    from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
                    to = %attempt.url(),
                    hop = attempt.previous().len(),
                    "Following redirect"
                );
                attempt.follow()
            }
            Err(err) => {
                tracing::warn!(to = %attempt.url(), error = %err, "Refusing redirect");
                attempt.error(err)
            }
        }
    })
}
