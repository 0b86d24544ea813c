//! Base-URL normalisation and loopback-alias handling.
//!
//! `localhost` and `127.0.0.1` resolve to the same machine but are distinct
//! origins to browser security policy, and a daemon configured for one
//! spelling will sometimes reject the other. The fetch layer retries across
//! the two spellings exactly once; the rewriting lives here.

use reqwest::Url;

/// Derive the daemon host root from a configured base URL, e.g.
/// `http://localhost:11434/v1/` -> `http://localhost:11434`. The `/v1` suffix
/// belongs to the OpenAI-compatible inference surface, not the management API.
pub fn host_root(base_url: &str) -> String {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string()
}

/// True when the URL host is exactly one of the two loopback spellings the
/// alias retry covers. Other loopback addresses (`127.0.0.2`, `::1`) are
/// deliberately not included; they are not interchangeable origins.
pub fn is_loopback_alias(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost") | Some("127.0.0.1"))
}

/// Rewrite the URL with the alternate loopback spelling, or `None` when the
/// host is not a loopback alias.
pub fn loopback_alternate(url: &Url) -> Option<Url> {
    let alternate = match url.host_str()? {
        "localhost" => "127.0.0.1",
        "127.0.0.1" => "localhost",
        _ => return None,
    };
    let mut swapped = url.clone();
    swapped.set_host(Some(alternate)).ok()?;
    Some(swapped)
}
