use anyhow::{Context, Result};
use chrono::Utc;
use contracts::system::auth::TokenClaims;
use contracts::system::users::User;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};

use crate::shared::config;
use crate::shared::data::db::get_connection;

const JWT_SECRET_KEY: &str = "jwt_secret";

fn access_token_hours() -> i64 {
    config::current()
        .map(|c| c.auth.access_token_hours)
        .unwrap_or(24)
}

fn refresh_token_days() -> i64 {
    config::current()
        .map(|c| c.auth.refresh_token_days)
        .unwrap_or(7)
}

/// Claims for a freshly issued access token
pub fn claims_for(user: &User, lifetime_hours: i64) -> TokenClaims {
    let now = Utc::now();
    TokenClaims {
        sub: user.id.clone(),
        username: user.username.clone(),
        is_admin: user.is_admin,
        exp: (now + chrono::Duration::hours(lifetime_hours)).timestamp() as usize,
        iat: now.timestamp() as usize,
    }
}

pub fn encode_claims(claims: &TokenClaims, secret: &str) -> Result<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .context("Failed to encode JWT token")
}

pub fn decode_claims(token: &str, secret: &str) -> Result<TokenClaims> {
    let data = decode::<TokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .context("Failed to decode JWT token")?;
    Ok(data.claims)
}

/// Generate JWT access token for the user
pub async fn generate_access_token(user: &User) -> Result<String> {
    let claims = claims_for(user, access_token_hours());
    let secret = get_jwt_secret().await?;
    encode_claims(&claims, &secret)
}

/// Validate JWT token and extract claims
pub async fn validate_token(token: &str) -> Result<TokenClaims> {
    let secret = get_jwt_secret().await?;
    decode_claims(token, &secret)
}

/// Refresh tokens are opaque random UUIDs
pub fn generate_refresh_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Read the JWT secret from sys_settings, creating it on first use
pub async fn get_jwt_secret() -> Result<String> {
    if let Some(secret) = load_jwt_secret().await? {
        return Ok(secret);
    }
    save_jwt_secret(&generate_jwt_secret()).await?;
    tracing::info!("Generated new JWT secret");
    // Re-read: a concurrent first request may have stored its own
    load_jwt_secret()
        .await?
        .ok_or_else(|| anyhow::anyhow!("JWT secret missing after insert"))
}

/// 256 random bits, base64 encoded
fn generate_jwt_secret() -> String {
    use base64::{engine::general_purpose, Engine as _};
    let mut rng = rand::thread_rng();
    let random_bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    general_purpose::STANDARD.encode(&random_bytes)
}

async fn load_jwt_secret() -> Result<Option<String>> {
    let row = get_connection()
        .query_one(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT value FROM sys_settings WHERE key = ?",
            [JWT_SECRET_KEY.into()],
        ))
        .await?;

    match row {
        Some(row) => Ok(Some(row.try_get("", "value")?)),
        None => Ok(None),
    }
}

async fn save_jwt_secret(secret: &str) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    get_connection()
        .execute(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "INSERT OR IGNORE INTO sys_settings (key, value, description, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
            [
                JWT_SECRET_KEY.into(),
                secret.to_string().into(),
                "Auto-generated JWT secret for authentication".into(),
                now.clone().into(),
                now.into(),
            ],
        ))
        .await
        .context("Failed to store JWT secret")?;
    Ok(())
}

/// Expiration timestamp (RFC 3339) for a refresh token issued now
pub fn calculate_refresh_token_expiration() -> String {
    let exp = Utc::now() + chrono::Duration::days(refresh_token_days());
    exp.to_rfc3339()
}
