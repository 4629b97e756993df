//! Bearer credentials for Google APIs.
//!
//! A [`CachedCredential`] is built once at startup and shared. The access
//! token lives behind an async mutex so concurrent callers wait on a single
//! refresh instead of racing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use std::{env, error::Error, fmt, fs};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

/// Tokens this close to expiry are refreshed before use.
const REFRESH_BUFFER: Duration = Duration::from_secs(300);

const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";
const ENV_CREDENTIALS_FILE: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Lifetime requested for service account assertions.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug)]
pub enum CredentialError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Unsupported(String),
    Signing(String),
    Status { status: u16, body: String },
    Transport(reqwest::Error),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "cannot read credentials file {}: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid credentials: {message}"),
            Self::Unsupported(kind) => write!(
                f,
                "unsupported credential type '{kind}'; use a service_account or \
                 authorized_user file, {ENV_ACCESS_TOKEN}, or the metadata server"
            ),
            Self::Signing(message) => write!(f, "cannot sign token assertion: {message}"),
            Self::Status { status, body } => {
                write!(f, "token endpoint returned status {status}: {body}")
            }
            Self::Transport(err) => write!(f, "token request failed: {err}"),
        }
    }
}

impl Error for CredentialError {}

impl From<reqwest::Error> for CredentialError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

/// Where access tokens come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A pre-minted token that is used as-is.
    Static(String),
    /// Application default credentials from `gcloud auth application-default login`.
    AuthorizedUser {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_url: String,
    },
    /// A service account key file, exchanged through a signed JWT assertion.
    ServiceAccount {
        client_email: String,
        private_key_id: Option<String>,
        private_key: String,
        token_url: String,
    },
    /// The GCE / Cloud Run metadata server.
    MetadataServer { url: String },
}

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

impl CredentialSource {
    /// Resolves credentials from the environment, in order: an explicit
    /// access token, a credentials file, the gcloud default file, and finally
    /// the metadata server.
    ///
    /// # Errors
    /// Returns `CredentialError` if a named credentials file cannot be used.
    pub fn discover() -> Result<Self, CredentialError> {
        if let Some(token) = env::var(ENV_ACCESS_TOKEN)
            .ok()
            .filter(|token| !token.trim().is_empty())
        {
            return Ok(Self::Static(token.trim().to_string()));
        }

        if let Some(path) = env::var_os(ENV_CREDENTIALS_FILE).filter(|path| !path.is_empty()) {
            return Self::from_file(Path::new(&path));
        }

        if let Some(path) = gcloud_default_file().filter(|path| path.is_file()) {
            return Self::from_file(&path);
        }

        Ok(Self::MetadataServer {
            url: DEFAULT_METADATA_TOKEN_URL.to_string(),
        })
    }

    /// Loads an application default credentials file.
    ///
    /// # Errors
    /// Returns `CredentialError` if the file is unreadable, malformed, or of
    /// an unsupported type.
    pub fn from_file(path: &Path) -> Result<Self, CredentialError> {
        let text = fs::read_to_string(path).map_err(|err| CredentialError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_json(&text)
    }

    /// Parses application default credentials JSON.
    ///
    /// # Errors
    /// Returns `CredentialError` for malformed JSON or unsupported types.
    pub fn from_json(text: &str) -> Result<Self, CredentialError> {
        let file: CredentialsFile =
            serde_json::from_str(text).map_err(|err| CredentialError::Parse(err.to_string()))?;
        let field = |value: Option<String>, name: &str| {
            value
                .filter(|value| !value.is_empty())
                .ok_or_else(|| CredentialError::Parse(format!("missing {name}")))
        };
        match file.kind.as_str() {
            "authorized_user" => Ok(Self::AuthorizedUser {
                client_id: field(file.client_id, "client_id")?,
                client_secret: field(file.client_secret, "client_secret")?,
                refresh_token: field(file.refresh_token, "refresh_token")?,
                token_url: DEFAULT_TOKEN_URL.to_string(),
            }),
            "service_account" => {
                let private_key = field(file.private_key, "private_key")?;
                encoding_key(&private_key)?;
                Ok(Self::ServiceAccount {
                    client_email: field(file.client_email, "client_email")?,
                    private_key_id: file.private_key_id.filter(|id| !id.is_empty()),
                    private_key,
                    token_url: file
                        .token_uri
                        .filter(|uri| !uri.is_empty())
                        .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
                })
            }
            _ => Err(CredentialError::Unsupported(file.kind)),
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::AuthorizedUser { .. } => "authorized_user",
            Self::ServiceAccount { .. } => "service_account",
            Self::MetadataServer { .. } => "metadata_server",
        }
    }
}

fn encoding_key(private_key: &str) -> Result<EncodingKey, CredentialError> {
    EncodingKey::from_rsa_pem(private_key.as_bytes())
        .map_err(|err| CredentialError::Parse(format!("private_key: {err}")))
}

/// Signs the RS256 assertion exchanged for a service account access token.
fn service_account_assertion(
    client_email: &str,
    private_key_id: Option<&str>,
    private_key: &str,
    token_url: &str,
    issued_at: i64,
) -> Result<String, CredentialError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = private_key_id.map(str::to_string);
    let claims = AssertionClaims {
        iss: client_email,
        scope: CLOUD_PLATFORM_SCOPE,
        aud: token_url,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    jsonwebtoken::encode(&header, &claims, &encoding_key(private_key)?)
        .map_err(|err| CredentialError::Signing(err.to_string()))
}

fn gcloud_default_file() -> Option<PathBuf> {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"))?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("gcloud")
            .join("application_default_credentials.json"),
    )
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at
            .is_none_or(|expires_at| expires_at.saturating_duration_since(now) > REFRESH_BUFFER)
    }
}

/// A credential source with its current access token.
pub struct CachedCredential {
    source: CredentialSource,
    client: reqwest::Client,
    token: Mutex<Option<AccessToken>>,
    refreshes: AtomicUsize,
}

impl CachedCredential {
    #[must_use]
    pub fn new(source: CredentialSource, client: reqwest::Client) -> Self {
        Self {
            source,
            client,
            token: Mutex::new(None),
            refreshes: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub const fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Number of token fetches performed so far.
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Returns a usable access token, refreshing it first when needed.
    ///
    /// # Errors
    /// Returns `CredentialError` when the token endpoint fails.
    pub async fn bearer(&self) -> Result<String, CredentialError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|token| token.is_fresh(Instant::now())) {
            return Ok(token.value.clone());
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *guard = Some(token);
        Ok(value)
    }

    async fn fetch(&self) -> Result<AccessToken, CredentialError> {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let request = match &self.source {
            CredentialSource::Static(token) => {
                return Ok(AccessToken {
                    value: token.clone(),
                    expires_at: None,
                });
            }
            CredentialSource::AuthorizedUser {
                client_id,
                client_secret,
                refresh_token,
                token_url,
            } => self
                .client
                .post(token_url)
                .header(CONTENT_TYPE, "application/json")
                .json(&serde_json::json!({
                    "grant_type": "refresh_token",
                    "refresh_token": refresh_token,
                    "client_id": client_id,
                    "client_secret": client_secret,
                })),
            CredentialSource::ServiceAccount {
                client_email,
                private_key_id,
                private_key,
                token_url,
            } => {
                let assertion = service_account_assertion(
                    client_email,
                    private_key_id.as_deref(),
                    private_key,
                    token_url,
                    Utc::now().timestamp(),
                )?;
                self.client.post(token_url).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
            CredentialSource::MetadataServer { url } => {
                self.client.get(url).header("Metadata-Flavor", "Google")
            }
        };

        info!(source = self.source.kind(), "refreshing access token");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialError::Status {
                status: status.as_u16(),
                body: crate::store::postgrest::truncate(&body, 500),
            });
        }

        let data: TokenResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::Parse(err.to_string()))?;
        debug!(expires_in = ?data.expires_in, "access token refreshed");
        Ok(AccessToken {
            value: data.access_token,
            expires_at: data
                .expires_in
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn parses_authorized_user_file() {
        let source = CredentialSource::from_json(
            r#"{"type":"authorized_user","client_id":"id","client_secret":"secret","refresh_token":"rt"}"#,
        )
        .expect("authorized user parses");
        assert_eq!(
            source,
            CredentialSource::AuthorizedUser {
                client_id: "id".into(),
                client_secret: "secret".into(),
                refresh_token: "rt".into(),
                token_url: DEFAULT_TOKEN_URL.into(),
            }
        );
    }

    const SERVICE_ACCOUNT_FILE: &str = include_str!("../../tests/data/service_account.json");
    const SERVICE_ACCOUNT_PUBLIC_KEY: &str =
        include_str!("../../tests/data/service_account_public.pem");

    fn service_account(token_url: &str) -> CredentialSource {
        match CredentialSource::from_json(SERVICE_ACCOUNT_FILE).expect("service account parses") {
            CredentialSource::ServiceAccount {
                client_email,
                private_key_id,
                private_key,
                ..
            } => CredentialSource::ServiceAccount {
                client_email,
                private_key_id,
                private_key,
                token_url: token_url.to_string(),
            },
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn parses_service_account_file() {
        let source =
            CredentialSource::from_json(SERVICE_ACCOUNT_FILE).expect("service account parses");
        let CredentialSource::ServiceAccount {
            client_email,
            private_key_id,
            token_url,
            ..
        } = source
        else {
            panic!("unexpected source: {source:?}");
        };
        assert_eq!(client_email, "estimator@sdlc-assist.iam.gserviceaccount.com");
        assert_eq!(private_key_id.as_deref(), Some("test-key-1"));
        assert_eq!(token_url, DEFAULT_TOKEN_URL);
    }

    #[test]
    fn unreadable_keys_and_unknown_types_are_rejected() {
        let err = CredentialSource::from_json(
            r#"{"type":"service_account","client_email":"a@b","private_key":"not a key"}"#,
        )
        .expect_err("bad key");
        assert!(matches!(err, CredentialError::Parse(message) if message.starts_with("private_key")));

        let err = CredentialSource::from_json(r#"{"type":"external_account"}"#)
            .expect_err("unsupported type");
        assert!(matches!(err, CredentialError::Unsupported(kind) if kind == "external_account"));
    }

    #[derive(Deserialize)]
    struct DecodedClaims {
        iss: String,
        scope: String,
        aud: String,
        iat: i64,
        exp: i64,
    }

    #[test]
    fn assertion_is_signed_for_the_token_endpoint() {
        let CredentialSource::ServiceAccount {
            client_email,
            private_key_id,
            private_key,
            token_url,
        } = service_account(DEFAULT_TOKEN_URL)
        else {
            panic!("service account expected");
        };
        let issued_at = Utc::now().timestamp();
        let assertion = service_account_assertion(
            &client_email,
            private_key_id.as_deref(),
            &private_key,
            &token_url,
            issued_at,
        )
        .expect("assertion signs");

        let key = jsonwebtoken::DecodingKey::from_rsa_pem(SERVICE_ACCOUNT_PUBLIC_KEY.as_bytes())
            .expect("public key parses");
        let mut validation = jsonwebtoken::Validation::new(Algorithm::RS256);
        validation.set_audience(&[DEFAULT_TOKEN_URL]);
        let decoded = jsonwebtoken::decode::<DecodedClaims>(&assertion, &key, &validation)
            .expect("assertion verifies");

        assert_eq!(decoded.header.kid.as_deref(), Some("test-key-1"));
        assert_eq!(decoded.claims.iss, client_email);
        assert_eq!(decoded.claims.aud, DEFAULT_TOKEN_URL);
        assert_eq!(decoded.claims.scope, CLOUD_PLATFORM_SCOPE);
        assert_eq!(decoded.claims.iat, issued_at);
        assert_eq!(decoded.claims.exp - decoded.claims.iat, 3600);
    }

    #[tokio::test]
    async fn service_account_callers_share_one_exchange() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion=ey"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "ya29.sa", "expires_in": 3600})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credential = CachedCredential::new(
            service_account(&format!("{}/token", server.uri())),
            reqwest::Client::new(),
        );

        let (left, right) = tokio::join!(credential.bearer(), credential.bearer());
        assert_eq!(left.expect("token"), "ya29.sa");
        assert_eq!(right.expect("token"), "ya29.sa");
        assert_eq!(credential.refresh_count(), 1);
    }

    #[tokio::test]
    async fn static_tokens_never_hit_the_network() {
        let credential =
            CachedCredential::new(CredentialSource::Static("tok".into()), reqwest::Client::new());
        assert_eq!(credential.bearer().await.expect("token"), "tok");
        assert_eq!(credential.bearer().await.expect("token"), "tok");
        assert_eq!(credential.refresh_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_partial_json(json!({"grant_type": "refresh_token", "refresh_token": "rt"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "ya29.fresh", "expires_in": 3600})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credential = CachedCredential::new(
            CredentialSource::AuthorizedUser {
                client_id: "id".into(),
                client_secret: "secret".into(),
                refresh_token: "rt".into(),
                token_url: format!("{}/token", server.uri()),
            },
            reqwest::Client::new(),
        );

        let (left, right) = tokio::join!(credential.bearer(), credential.bearer());
        assert_eq!(left.expect("token"), "ya29.fresh");
        assert_eq!(right.expect("token"), "ya29.fresh");
        assert_eq!(credential.refresh_count(), 1);
    }

    #[tokio::test]
    async fn short_lived_tokens_are_refreshed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .and(header("metadata-flavor", "Google"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"access_token": "short", "expires_in": 60})),
            )
            .expect(2)
            .mount(&server)
            .await;

        let credential = CachedCredential::new(
            CredentialSource::MetadataServer {
                url: format!("{}/token", server.uri()),
            },
            reqwest::Client::new(),
        );
        credential.bearer().await.expect("first token");
        credential.bearer().await.expect("second token");
        assert_eq!(credential.refresh_count(), 2);
    }

    #[tokio::test]
    async fn token_endpoint_errors_carry_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let credential = CachedCredential::new(
            CredentialSource::MetadataServer { url: server.uri() },
            reqwest::Client::new(),
        );
        let err = credential.bearer().await.expect_err("403 fails");
        assert!(matches!(err, CredentialError::Status { status: 403, .. }));
    }
}
