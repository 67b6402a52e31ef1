//! Referer check for the generate endpoints

use url::Url;

use crate::error::AppError;

/// Require `referer` to come from the same host (and port) as `allowed_origin`.
/// No configured origin disables the check.
pub fn check_referer(allowed_origin: Option<&str>, referer: Option<&str>) -> Result<(), AppError> {
    let Some(allowed) = allowed_origin else {
        return Ok(());
    };
    let Some(referer) = referer else {
        return Err(AppError::Forbidden("Missing Referer".to_string()));
    };

    match (host_port(referer), host_port(allowed)) {
        (Some(got), Some(want)) if got == want => Ok(()),
        _ => Err(AppError::Forbidden("Bad Referer".to_string())),
    }
}

fn host_port(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}
