use anyhow::{Result, anyhow, bail};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// What a signed token may be used for. Each verifier accepts exactly one purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Session,
    Download,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id for sessions, paste id for downloads
    pub exp: usize,
    pub jti: String,
    pub purpose: TokenPurpose,
}

fn sign(subject: &str, ttl: Duration, purpose: TokenPurpose, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow!("token expiry out of range"))?
        .timestamp();

    let claims = Claims {
        sub: subject.to_owned(),
        exp: expiration as usize,
        jti: uuid::Uuid::new_v4().to_string(),
        purpose,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;

    Ok(token)
}

fn decode_claims(token: &str, secret: &str, leeway: u64) -> Result<Claims> {
    let mut validation = Validation::default();
    validation.leeway = leeway;
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;
    Ok(token_data.claims)
}

/// Issues a session token for `user_id`, valid for `ttl_hours`.
pub fn create_jwt(user_id: &str, secret: &str, ttl_hours: i64) -> Result<String> {
    sign(user_id, Duration::hours(ttl_hours), TokenPurpose::Session, secret)
}

/// Decodes a session token. Download tokens are refused here.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims> {
    let claims = decode_claims(token, secret, Validation::default().leeway)?;
    if claims.purpose != TokenPurpose::Session {
        bail!("token is not a session token");
    }
    Ok(claims)
}

/// Mints a short-lived token that unlocks the download of a single paste.
pub fn issue_download_token(paste_id: &str, secret: &str, ttl_secs: i64) -> Result<String> {
    sign(
        paste_id,
        Duration::seconds(ttl_secs),
        TokenPurpose::Download,
        secret,
    )
}

/// True only for a well-formed, unexpired download token minted for `paste_id`.
pub fn verify_download_token(token: &str, paste_id: &str, secret: &str) -> bool {
    match decode_claims(token, secret, 0) {
        Ok(claims) => claims.purpose == TokenPurpose::Download && claims.sub == paste_id,
        Err(_) => false,
    }
}
