//! Public URL composition for stored references

/// Scheme and authority the request arrived on, used when no proxy headers are set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub authority: String,
}

/// Derive the externally visible base URL (no trailing slash).
///
/// `X-Forwarded-Proto` wins over the request scheme; `X-Forwarded-Host` wins
/// over `Host`, which wins over the request authority. When a proxy chain
/// appends comma-separated values, the first (client-facing) one is used.
pub fn resolve_public_base(
    forwarded_proto: Option<&str>,
    forwarded_host: Option<&str>,
    host_header: Option<&str>,
    fallback: &RequestOrigin,
) -> String {
    let scheme = first_value(forwarded_proto).unwrap_or(&fallback.scheme);
    let host = first_value(forwarded_host)
        .or_else(|| first_value(host_header))
        .unwrap_or(&fallback.authority);

    format!("{}://{}", scheme, host.trim_end_matches('/'))
}

/// `{base}/refs/{filename}`
pub fn ref_url(base: &str, filename: &str) -> String {
    format!("{}/refs/{}", base.trim_end_matches('/'), filename)
}

fn first_value(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
