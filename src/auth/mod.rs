//! Access tokens for the Drive API.

use crate::config::CredentialsConfig;
use crate::error::DriveError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::path::Path;

pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

pub enum TokenSource {
    /// A token obtained elsewhere, used as-is
    Static(String),
    ServiceAccount(ServiceAccountAuth),
}

impl TokenSource {
    /// The environment token wins over a configured key file.
    pub fn from_config(credentials: &CredentialsConfig) -> Result<Self, DriveError> {
        if let Ok(token) = std::env::var(&credentials.access_token_env) {
            if !token.trim().is_empty() {
                debug!("Using access token from ${}", credentials.access_token_env);
                return Ok(TokenSource::Static(token.trim().to_string()));
            }
        }

        match &credentials.service_account_path {
            Some(path) => Ok(TokenSource::ServiceAccount(ServiceAccountAuth::from_file(path)?)),
            None => Err(DriveError::Auth(format!(
                "no credentials configured: set ${} or credentials.service_account_path",
                credentials.access_token_env
            ))),
        }
    }

    pub fn access_token(&self, http: &Client) -> Result<String, DriveError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(auth) => auth.access_token(http),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Two-legged OAuth with a service-account key: a signed RS256 assertion is
/// exchanged for a short-lived access token, cached until shortly before it
/// expires.
pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
    cached: RefCell<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scope: DRIVE_SCOPE.to_string(),
            cached: RefCell::new(None),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, DriveError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DriveError::Auth(format!("cannot read service account key {}: {}", path.display(), e))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content).map_err(|e| {
            DriveError::Auth(format!("invalid service account key {}: {}", path.display(), e))
        })?;

        Ok(Self::new(key))
    }

    pub fn claims(&self, now: DateTime<Utc>) -> AssertionClaims {
        AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        }
    }

    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, DriveError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let signing_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| DriveError::Auth(format!("invalid private key: {}", e)))?;

        encode(&header, &self.claims(now), &signing_key)
            .map_err(|e| DriveError::Auth(format!("cannot sign assertion: {}", e)))
    }

    pub fn access_token(&self, http: &Client) -> Result<String, DriveError> {
        let now = Utc::now();

        if let Some(cached) = self.cached.borrow().as_ref() {
            if cached.expires_at > now + Duration::seconds(REFRESH_MARGIN_SECS) {
                return Ok(cached.value.clone());
            }
        }

        let assertion = self.assertion(now)?;
        let response = http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| DriveError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DriveError::Auth(format!("token endpoint returned {}: {}", status, body.trim())));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| DriveError::Auth(format!("invalid token response: {}", e)))?;

        let expires_at = token_expiry(now, token.expires_in)?;
        info!("Obtained access token for {}", self.key.client_email);
        *self.cached.borrow_mut() = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }
}

/// `expires_in` comes from the token endpoint and is not trusted to be in range.
fn token_expiry(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>, DriveError> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| DriveError::Auth(format!("token lifetime out of range: expires_in = {}", expires_in)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn test_key() -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "sorter@project.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            private_key_id: Some("kid-1".to_string()),
            token_uri: DEFAULT_TOKEN_URI.to_string(),
        }
    }

    #[test]
    fn test_claims() {
        let auth = ServiceAccountAuth::new(test_key());
        let now = Utc.with_ymd_and_hms(2024, 11, 26, 12, 0, 0).unwrap();

        let claims = auth.claims(now);
        assert_eq!(claims.iss, "sorter@project.iam.gserviceaccount.com");
        assert_eq!(claims.scope, DRIVE_SCOPE);
        assert_eq!(claims.aud, DEFAULT_TOKEN_URI);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc.with_ymd_and_hms(2024, 11, 26, 12, 0, 0).unwrap();
        assert_eq!(token_expiry(now, 3599).unwrap(), now + Duration::seconds(3599));
    }

    #[test]
    fn test_token_expiry_out_of_range() {
        let now = Utc.with_ymd_and_hms(2024, 11, 26, 12, 0, 0).unwrap();

        for expires_in in [i64::MAX, i64::MIN, i64::MAX / 1000] {
            let result = token_expiry(now, expires_in);
            assert!(
                matches!(result, Err(DriveError::Auth(ref msg)) if msg.contains("out of range")),
                "expires_in {} gave {:?}",
                expires_in,
                result
            );
        }
    }

    #[test]
    fn test_invalid_private_key() {
        let auth = ServiceAccountAuth::new(test_key());
        let result = auth.assertion(Utc::now());
        assert!(matches!(result, Err(DriveError::Auth(msg)) if msg.contains("private key")));
    }

    #[test]
    fn test_key_file_defaults_token_uri() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"client_email": "a@b.iam.gserviceaccount.com", "private_key": "pem"}}"#
        )
        .unwrap();

        let auth = ServiceAccountAuth::from_file(file.path()).unwrap();
        assert_eq!(auth.key.token_uri, DEFAULT_TOKEN_URI);
        assert!(auth.key.private_key_id.is_none());
    }

    #[test]
    fn test_env_token_wins() {
        let credentials = CredentialsConfig {
            service_account_path: Some("/nonexistent/key.json".into()),
            access_token_env: "DRIVESORT_TEST_TOKEN_ENV_WINS".to_string(),
        };
        std::env::set_var("DRIVESORT_TEST_TOKEN_ENV_WINS", " abc ");

        let source = TokenSource::from_config(&credentials).unwrap();
        assert!(matches!(source, TokenSource::Static(ref t) if t == "abc"));
    }

    #[test]
    fn test_missing_credentials() {
        let credentials = CredentialsConfig {
            service_account_path: None,
            access_token_env: "DRIVESORT_TEST_TOKEN_UNSET".to_string(),
        };

        assert!(matches!(TokenSource::from_config(&credentials), Err(DriveError::Auth(_))));
    }
}
