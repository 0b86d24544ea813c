//! Transport wrapper with a single loopback-alias retry.
//!
//! When a request to `localhost` fails at the transport level it is retried
//! once against `127.0.0.1` (and vice versa). If both spellings fail the
//! failure is classified as origin-blocking rather than a down daemon: two
//! different spellings of the same machine both failing is the signature of a
//! policy rejection, not an unreachable host. This is a same-origin-ambiguity
//! workaround, not a resilience mechanism; there is no backoff and no second
//! retry, and HTTP error statuses pass through untouched.

use modeldock_core::DockErr;
use modeldock_core::Result;
use tracing::debug;

use crate::url::is_loopback_alias;
use crate::url::loopback_alternate;

/// Send `request`, retrying once across the alternate loopback spelling on a
/// transport-level failure. Requests whose host is not a loopback alias fail
/// straight through as [`DockErr::Network`].
pub async fn send_resilient(
    client: &reqwest::Client,
    request: reqwest::Request,
) -> Result<reqwest::Response> {
    // Clone up front: the body is consumed by the first attempt.
    let retry = request.try_clone();
    let url = request.url().clone();

    let first_err = match client.execute(request).await {
        Ok(response) => return Ok(response),
        Err(e) => e,
    };

    // Only connect-level failures are candidates for the alias retry; a
    // redirect-policy or body error means the daemon was reached.
    if !is_transport_failure(&first_err) || !is_loopback_alias(&url) {
        return Err(DockErr::Network(first_err.to_string()));
    }
    let (Some(mut retry), Some(alternate)) = (retry, loopback_alternate(&url)) else {
        return Err(DockErr::Network(first_err.to_string()));
    };

    debug!("request to {url} failed ({first_err}); retrying as {alternate}");
    *retry.url_mut() = alternate;
    match client.execute(retry).await {
        Ok(response) => Ok(response),
        Err(second_err) if is_transport_failure(&second_err) => {
            debug!("alternate loopback spelling also failed: {second_err}");
            Err(DockErr::CorsBlocked {
                host: url.host_str().unwrap_or("localhost").to_string(),
            })
        }
        Err(second_err) => Err(DockErr::Network(second_err.to_string())),
    }
}

/// True when the error means the daemon was never reached.
fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}
