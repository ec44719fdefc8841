use axum::http::{HeaderMap, header};

use crate::config::Config;
use crate::error::AppError;

/// Checks an `Authorization: Bearer <token>` header against the configured
/// tokens. Passes unconditionally when the config has `debug` and `skip_auth`.
pub fn verify(authorization: Option<&str>, config: &Config) -> Result<(), AppError> {
    if config.auth_bypassed() {
        tracing::debug!("auth skipped (debug + skip_auth)");
        return Ok(());
    }

    let header = authorization.ok_or(AppError::Unauthorized)?;
    let mut parts = header.split_whitespace();
    let (Some(scheme), Some(token), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AppError::Unauthorized);
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::Unauthorized);
    }

    let matches_prod = config.auth_token_prod.as_deref() == Some(token);
    if token == config.auth_token || matches_prod {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

pub fn verify_headers(headers: &HeaderMap, config: &Config) -> Result<(), AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| AppError::Unauthorized))
        .transpose()?;
    verify(value, config)
}
