use std::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{ApiClient, ApiClientConfig, Envelope};
use crate::config::{ClientConfig, ResolvedBaseUrl, normalize_base_url, resolve_api_base_url};
use crate::error::{ClientError, ValidationError};
use crate::gate::GateState;
use crate::storage::CredentialStore;

/// Email recorded for sessions opened from a raw token whose claims carry no
/// email of their own.
pub const TOKEN_SESSION_EMAIL_PLACEHOLDER: &str = "dev@bypass";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, rename = "tenantId", alias = "brandId")]
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserRef {
    #[must_use]
    pub fn has_tenant(&self) -> bool {
        !self.tenant_id.trim().is_empty()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredentials {
    token: String,
    user: UserRef,
}

impl fmt::Debug for SessionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredentials")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// In-memory session. Token and user are only ever present together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<SessionCredentials>,
}

impl Session {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_parts(token: String, user: UserRef) -> Self {
        if token.is_empty() {
            return Self::empty();
        }
        Self {
            credentials: Some(SessionCredentials { token, user }),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.credentials
            .as_ref()
            .map(|credentials| credentials.token.as_str())
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserRef> {
        self.credentials.as_ref().map(|credentials| &credentials.user)
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.user()
            .filter(|user| user.has_tenant())
            .map(|user| user.tenant_id.as_str())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some_and(|token| !token.is_empty()) && self.tenant_id().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    expires_in: Option<String>,
    #[serde(default)]
    user: Option<UserRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    valid: Option<bool>,
    #[serde(default)]
    payload: Option<VerifyClaims>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
struct VerifyClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupVerification {
    /// Verification already ran for this manager; nothing was sent.
    AlreadyChecked,
    NoStoredCredentials,
    Verified,
    /// Stored credentials were rejected and cleared.
    Rejected,
}

/// Read access to the current session plus a transport client bound to it.
pub trait SessionSource {
    fn session(&self) -> &Session;
    fn api_client(&self) -> Result<ApiClient, ClientError>;
}

/// Owns the process session and its durable shadow in a [`CredentialStore`].
#[derive(Debug)]
pub struct SessionManager<S> {
    store: S,
    config: ClientConfig,
    session: Session,
    checked: bool,
    verification_started: bool,
}

impl<S: CredentialStore> SessionManager<S> {
    pub fn new(store: S, config: ClientConfig) -> Self {
        Self {
            store,
            config,
            session: Session::empty(),
            checked: false,
            verification_started: false,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn is_checked(&self) -> bool {
        self.checked
    }

    #[must_use]
    pub fn gate_state(&self) -> GateState {
        GateState::from_session(self.checked, &self.session)
    }

    #[must_use]
    pub fn resolve_base_url(&self, explicit: Option<&str>) -> ResolvedBaseUrl {
        let stored = self.store.stored_api_base_url();
        resolve_api_base_url(explicit, stored.as_deref(), &self.config)
    }

    #[must_use]
    pub fn onboarding_complete(&self) -> bool {
        self.store.onboarding_complete()
    }

    pub fn set_onboarding_complete(&mut self, complete: bool) -> Result<(), ClientError> {
        self.store.set_onboarding_complete(complete)?;
        Ok(())
    }

    pub async fn sign_in_with_password(
        &mut self,
        email: &str,
        password: &str,
        base_url: Option<&str>,
    ) -> Result<&Session, ClientError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::EmptyEmail.into());
        }
        if password.is_empty() {
            return Err(ValidationError::EmptyPassword.into());
        }

        let explicit = explicit_base_url(base_url)?;
        let resolved = self.resolve_base_url(explicit.as_deref());
        self.store.set_api_base_url(resolved.base_url.as_str())?;
        tracing::debug!(base_url = %resolved.base_url, source = resolved.source, "signing in with password");

        let client = self.client_for(resolved.base_url.as_str(), "")?;
        let response = client
            .post::<_, Envelope<LoginResponse>>(
                ApiClient::login_path().as_str(),
                &LoginRequest { email, password },
            )
            .await?
            .into_data()?;

        let Some(user) = response.user.filter(UserRef::has_tenant) else {
            tracing::warn!("login response carried no tenant id");
            return Err(ClientError::InvalidLoginResponse);
        };
        if response.token.is_empty() {
            tracing::warn!("login response carried no token");
            return Err(ClientError::InvalidLoginResponse);
        }

        tracing::info!(
            user_id = %user.id,
            tenant_id = %user.tenant_id,
            expires_in = response.expires_in.as_deref().unwrap_or("unknown"),
            "signed in with password"
        );
        self.establish(response.token, user)
    }

    /// Opens a session from a pre-issued token, verified against the backend
    /// and scoped to the caller-supplied tenant.
    pub async fn sign_in_with_raw_token(
        &mut self,
        base_url: Option<&str>,
        token: &str,
        tenant_id: &str,
    ) -> Result<&Session, ClientError> {
        let token = token.trim();
        let tenant_id = tenant_id.trim();
        if token.is_empty() {
            return Err(ValidationError::EmptyToken.into());
        }
        if tenant_id.is_empty() {
            return Err(ValidationError::EmptyTenantId.into());
        }

        let explicit = explicit_base_url(base_url)?;
        let resolved = self.resolve_base_url(explicit.as_deref());
        if let Some(explicit) = explicit.as_deref() {
            self.store.set_api_base_url(explicit)?;
        }

        let client = self.client_for(resolved.base_url.as_str(), token)?;
        let claims = verify_token(&client).await?;
        let Some(subject) = claims
            .sub
            .map(|sub| sub.trim().to_string())
            .filter(|sub| !sub.is_empty())
        else {
            tracing::warn!("token verification returned no subject");
            return Err(ClientError::InvalidToken);
        };

        let email = claims
            .email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .unwrap_or_else(|| TOKEN_SESSION_EMAIL_PLACEHOLDER.to_string());
        let user = UserRef {
            id: subject,
            email,
            tenant_id: tenant_id.to_string(),
            role: None,
        };
        tracing::info!(user_id = %user.id, tenant_id = %user.tenant_id, "signed in with token");
        self.establish(token.to_string(), user)
    }

    /// Clears memory first so a failing store cannot leave a live session.
    pub fn sign_out(&mut self) -> Result<(), ClientError> {
        let was_authenticated = self.session.is_authenticated();
        self.session = Session::empty();
        if let Err(error) = self.store.clear_auth() {
            tracing::warn!(%error, "failed to clear stored credentials");
            return Err(error.into());
        }
        if was_authenticated {
            tracing::info!("signed out");
        }
        Ok(())
    }

    /// Reconciles stored credentials with the backend. Runs once per manager;
    /// any verification failure clears the session and the stored credentials.
    pub async fn verify_startup(&mut self) -> StartupVerification {
        if self.verification_started {
            return StartupVerification::AlreadyChecked;
        }
        self.verification_started = true;

        let token = self.store.stored_token();
        let user = self.store.stored_user().filter(UserRef::has_tenant);
        let (Some(token), Some(user)) = (token, user) else {
            self.session = Session::empty();
            self.checked = true;
            tracing::debug!("no stored credentials to verify");
            return StartupVerification::NoStoredCredentials;
        };

        self.session = Session::from_parts(token.clone(), user);
        let resolved = self.resolve_base_url(None);
        let outcome = match self.client_for(resolved.base_url.as_str(), token.as_str()) {
            Ok(client) => verify_token(&client).await.map(|_| ()),
            Err(error) => Err(error),
        };

        let result = match outcome {
            Ok(()) => {
                tracing::info!(tenant_id = ?self.session.tenant_id(), "stored session verified");
                StartupVerification::Verified
            }
            Err(error) => {
                tracing::warn!(%error, "stored session rejected; signing out");
                self.session = Session::empty();
                if let Err(error) = self.store.clear_auth() {
                    tracing::warn!(%error, "failed to clear stored credentials");
                }
                StartupVerification::Rejected
            }
        };
        self.checked = true;
        result
    }

    fn establish(&mut self, token: String, user: UserRef) -> Result<&Session, ClientError> {
        self.store.persist_credentials(token.as_str(), &user)?;
        self.session = Session::from_parts(token, user);
        Ok(&self.session)
    }

    fn client_for(&self, base_url: &str, token: &str) -> Result<ApiClient, ClientError> {
        ApiClient::new(ApiClientConfig {
            base_url: base_url.to_string(),
            token: token.to_string(),
            timeout_ms: self.config.timeout_ms,
        })
    }
}

impl<S: CredentialStore> SessionSource for SessionManager<S> {
    fn session(&self) -> &Session {
        &self.session
    }

    fn api_client(&self) -> Result<ApiClient, ClientError> {
        let resolved = self.resolve_base_url(None);
        self.client_for(
            resolved.base_url.as_str(),
            self.session.token().unwrap_or_default(),
        )
    }
}

/// A caller-supplied base must be usable; it is never silently replaced by a
/// fallback. Blank counts as not supplied.
fn explicit_base_url(base_url: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(raw) = base_url.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    normalize_base_url(raw)
        .map(Some)
        .map_err(|_| ValidationError::InvalidBaseUrl {
            value: raw.to_string(),
        })
}

async fn verify_token(client: &ApiClient) -> Result<VerifyClaims, ClientError> {
    let response = client
        .get::<Envelope<VerifyResponse>>(ApiClient::verify_path().as_str())
        .await?
        .into_data()?;
    if response.valid == Some(false) {
        return Err(ClientError::InvalidToken);
    }
    Ok(response.payload.unwrap_or_default())
}
