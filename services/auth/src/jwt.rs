//! JWT issuance and validation
//!
//! Access tokens carry the user's role/permission closure so authorization
//! checks need no further store round-trip; refresh tokens carry identity
//! only. Tokens are RS256-signed and revocation goes through a Redis
//! blacklist keyed by the raw token.

use anyhow::Result;
use common::cache::RedisPool;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::models::User;
use crate::rbac::AccessProfile;

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Private key for signing tokens (PEM)
    pub private_key: String,
    /// Public key for verifying tokens (PEM)
    pub public_key: String,
    /// Access token lifetime in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// Refresh token lifetime in seconds (default: 7 days)
    pub refresh_token_expiry: u64,
}

impl JwtConfig {
    /// Build a JwtConfig from environment variables
    ///
    /// # Environment Variables
    /// - `JWT_PRIVATE_KEY`: signing key, PEM content or a path to it
    /// - `JWT_PUBLIC_KEY`: verification key, PEM content or a path to it
    /// - `JWT_ACCESS_TOKEN_EXPIRY`: access lifetime in seconds (default: 900)
    /// - `JWT_REFRESH_TOKEN_EXPIRY`: refresh lifetime in seconds (default: 604800)
    pub fn from_env() -> Result<Self> {
        let private_key = Self::load_key("JWT_PRIVATE_KEY")?;
        let public_key = Self::load_key("JWT_PUBLIC_KEY")?;

        let access_token_expiry = std::env::var("JWT_ACCESS_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(900);

        let refresh_token_expiry = std::env::var("JWT_REFRESH_TOKEN_EXPIRY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(604_800);

        Ok(JwtConfig {
            private_key,
            public_key,
            access_token_expiry,
            refresh_token_expiry,
        })
    }

    /// Read a key from an env var holding either PEM content or a file path
    fn load_key(var: &str) -> Result<String> {
        let value = std::env::var(var)
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", var))?;

        if value.starts_with("-----BEGIN") {
            return Ok(value);
        }

        let pem = std::fs::read_to_string(&value)
            .or_else(|_| {
                let mut path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"));
                path.push(&value);
                std::fs::read_to_string(path)
            })
            .map_err(|e| anyhow::anyhow!("failed to read {} key file: {}", var, e))?;

        Ok(pem.trim().to_string())
    }
}

/// Token type
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: Uuid,
    /// Role codes of the closure (empty for refresh tokens)
    pub roles: Vec<String>,
    /// Permission codes of the closure (empty for refresh tokens)
    pub permissions: Vec<String>,
    /// Issued at, seconds since the epoch
    pub iat: u64,
    /// Expiry, seconds since the epoch
    pub exp: u64,
    /// Access or refresh
    pub token_type: TokenType,
}

impl Claims {
    /// Access claims carrying the user's closure
    pub fn access(user_id: Uuid, profile: &AccessProfile, issued_at: u64, lifetime: u64) -> Self {
        Claims {
            sub: user_id,
            roles: profile.role_codes(),
            permissions: profile.permission_codes(),
            iat: issued_at,
            exp: issued_at + lifetime,
            token_type: TokenType::Access,
        }
    }

    /// Refresh claims carrying identity only
    pub fn refresh(user_id: Uuid, issued_at: u64, lifetime: u64) -> Self {
        Claims {
            sub: user_id,
            roles: Vec::new(),
            permissions: Vec::new(),
            iat: issued_at,
            exp: issued_at + lifetime,
            token_type: TokenType::Refresh,
        }
    }

    /// Remaining lifetime relative to `now`, for blacklist TTLs
    pub fn remaining_lifetime(&self, now: u64) -> u64 {
        self.exp.saturating_sub(now)
    }
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| anyhow::anyhow!("failed to read current time: {}", e))?
        .as_secs())
}

/// JWT service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtService {
    /// Initialize the JWT service from its configuration
    pub fn new(config: JwtConfig) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        let decoding_key = DecodingKey::from_rsa_pem(config.public_key.as_bytes())?;
        let mut validation = Validation::new(jsonwebtoken::Algorithm::RS256);
        validation.validate_exp = true;

        Ok(JwtService {
            encoding_key,
            decoding_key,
            validation,
            config,
        })
    }

    /// Sign an access token embedding the user's closure
    pub fn generate_access_token(&self, user: &User, profile: &AccessProfile) -> Result<String> {
        let claims = Claims::access(
            user.id,
            profile,
            unix_now()?,
            self.config.access_token_expiry,
        );
        Ok(encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Sign a refresh token
    pub fn generate_refresh_token(&self, user: &User) -> Result<String> {
        let claims = Claims::refresh(user.id, unix_now()?, self.config.refresh_token_expiry);
        Ok(encode(
            &Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Validate a token signature and expiry, returning its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }

    /// Whether a token has been revoked
    pub async fn is_token_blacklisted(&self, redis_pool: &RedisPool, token: &str) -> Result<bool> {
        let key = format!("blacklisted_token:{}", token);
        Ok(redis_pool.get(&key).await?.is_some())
    }

    /// Revoke a token for `expiry` seconds (its remaining lifetime)
    pub async fn blacklist_token(
        &self,
        redis_pool: &RedisPool,
        token: &str,
        expiry: u64,
    ) -> Result<()> {
        let key = format!("blacklisted_token:{}", token);
        redis_pool.set(&key, "1", Some(expiry)).await?;
        Ok(())
    }

    /// Rotate a refresh token: revoke the old one for its remaining
    /// lifetime and sign a replacement
    pub async fn rotate_refresh_token(
        &self,
        redis_pool: &RedisPool,
        user: &User,
        old_refresh_token: &str,
    ) -> Result<String> {
        let claims = self.validate_token(old_refresh_token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(anyhow::anyhow!("token is not a refresh token"));
        }
        if claims.sub != user.id {
            return Err(anyhow::anyhow!("token does not belong to user"));
        }

        let expiry = claims.remaining_lifetime(unix_now()?);
        self.blacklist_token(redis_pool, old_refresh_token, expiry)
            .await?;

        self.generate_refresh_token(user)
    }

    /// Access token lifetime in seconds
    pub fn access_token_expiry(&self) -> u64 {
        self.config.access_token_expiry
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_token_expiry(&self) -> u64 {
        self.config.refresh_token_expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PermissionCode, RoleCode, default_grants};

    #[test]
    fn access_claims_carry_the_closure() {
        let profile = AccessProfile::new([RoleCode::Normal], default_grants(RoleCode::Normal));
        let user_id = Uuid::new_v4();

        let claims = Claims::access(user_id, &profile, 1_000, 900);
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp, 1_900);
        assert_eq!(claims.roles, vec!["normal".to_string()]);
        assert!(
            claims
                .permissions
                .contains(&PermissionCode::StockDataView.to_string())
        );
        assert_eq!(claims.permissions.len(), 5);
    }

    #[test]
    fn refresh_claims_carry_identity_only() {
        let claims = Claims::refresh(Uuid::new_v4(), 1_000, 604_800);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(claims.roles.is_empty());
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn remaining_lifetime_saturates_at_zero() {
        let claims = Claims::refresh(Uuid::new_v4(), 1_000, 100);
        assert_eq!(claims.remaining_lifetime(1_050), 50);
        assert_eq!(claims.remaining_lifetime(2_000), 0);
    }
}
