//! Issues and verifies access tokens, refresh tokens, and personal access
//! tokens. Signing follows `r2e_oidc::token::TokenService`; the opaque
//! token materials (refresh tokens, PATs) follow `r2e_oidc::store`'s
//! hash-before-store discipline with sha2 in place of argon2, since these
//! are high-entropy random strings rather than user-chosen secrets.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::claims::AccessTokenClaims;
use super::keys::SigningKeyPair;
use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Clone)]
pub struct TokenService {
    key_pair: SigningKeyPair,
    issuer: String,
    audience: String,
    access_token_ttl: Duration,
}

impl TokenService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            key_pair: SigningKeyPair::generate("bim-server-1"),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            access_token_ttl: Duration::seconds(config.access_token_ttl_secs),
        }
    }

    #[cfg(test)]
    pub fn with_key_pair(key_pair: SigningKeyPair, issuer: &str, audience: &str, access_token_ttl_secs: i64) -> Self {
        Self {
            key_pair,
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn issue_access_token(&self, user_id: Uuid, workspace_id: Option<Uuid>, client_id: Option<&str>, scopes: &[String]) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AccessTokenClaims {
            sub: user_id,
            aud: self.audience.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.access_token_ttl).timestamp(),
            scope: scopes.join(" "),
            tid: workspace_id,
            cid: client_id.map(str::to_string),
            jti: Uuid::new_v4(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_pair.kid().to_string());
        encode(&header, &claims, self.key_pair.encoding_key()).map_err(|e| AppError::Internal(format!("failed to sign access token: {e}")))
    }

    pub fn verify_access_token(&self, token: &str) -> Result<AccessTokenClaims, AppError> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.audience]);
        validation.set_issuer(&[&self.issuer]);
        let data = decode::<AccessTokenClaims>(token, self.key_pair.decoding_key(), &validation)
            .map_err(|e| AppError::Unauthenticated(format!("invalid access token: {e}")))?;
        Ok(data.claims)
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        self.key_pair.decoding_key()
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        self.key_pair.encoding_key()
    }

    pub fn kid(&self) -> &str {
        self.key_pair.kid()
    }
}

/// 256 bits of randomness, base64url-no-pad encoded. Used for refresh
/// tokens and the secret part of personal access tokens.
fn random_opaque_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-time equality for two hash strings (hex digests). Spec §4.4:
/// "all hash comparisons use constant-time byte equality" — a plain
/// `==` on the hex `String`s would short-circuit on the first differing
/// byte and leak timing information about how much of a guessed secret
/// matched.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Opaque refresh token. Never stored directly — callers persist
/// `hash_token(&token)` and hand the plaintext to the client once.
pub fn issue_refresh_token() -> String {
    random_opaque_token()
}

const PAT_PREFIX: &str = "bim_pat_";

/// Personal access token: `bim_pat_<44 base64url chars>`. The stored
/// `token_prefix` is the first 8 characters after the prefix, enough to
/// let a user recognize a token in a list without revealing the secret.
pub fn issue_personal_access_token() -> (String, String) {
    let secret = random_opaque_token();
    let token = format!("{PAT_PREFIX}{secret}");
    let display_prefix = format!("{PAT_PREFIX}{}", &secret[..8.min(secret.len())]);
    (token, display_prefix)
}

pub fn looks_like_pat(token: &str) -> bool {
    token.starts_with(PAT_PREFIX)
}
