use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::{ApiClient, Envelope};
use crate::config_path;
use crate::error::ClientError;
use crate::session::SessionSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    #[serde(rename = "tenantId", alias = "brandId")]
    pub tenant_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Server-owned fields this client does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shallow top-level update; absent fields are left alone server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<String>>,
}

impl BrandPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.timezone.is_none() && self.phone_numbers.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ConfigReplacement<'a> {
    config: &'a Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigEdit {
    Set(String, Value),
    Remove(String),
}

impl ConfigEdit {
    #[must_use]
    pub fn apply(&self, document: &Map<String, Value>) -> Map<String, Value> {
        match self {
            Self::Set(path, value) => config_path::set(document, path, value.clone()),
            Self::Remove(path) => config_path::remove(document, path),
        }
    }
}

/// Holds the single active brand for the current session's tenant.
#[derive(Debug, Clone, Default)]
pub struct BrandSynchronizer {
    brand: Option<Brand>,
    last_error: Option<String>,
}

impl BrandSynchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The held brand, provided it belongs to the session's current tenant.
    #[must_use]
    pub fn brand(&self, sessions: &impl SessionSource) -> Option<&Brand> {
        let tenant_id = authenticated_tenant(sessions)?;
        self.brand
            .as_ref()
            .filter(|brand| brand.tenant_id == tenant_id)
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The current tenant's config, or an empty document when none is held.
    #[must_use]
    pub fn config(&self, sessions: &impl SessionSource) -> Map<String, Value> {
        self.brand(sessions)
            .map(|brand| brand.config.clone())
            .unwrap_or_default()
    }

    pub fn clear(&mut self) {
        self.brand = None;
        self.last_error = None;
    }

    /// Fetches the session tenant's brand and replaces the held copy
    /// wholesale. Without an authenticated session the held copy is dropped.
    pub async fn load(
        &mut self,
        sessions: &impl SessionSource,
    ) -> Result<Option<&Brand>, ClientError> {
        let Some(tenant_id) = authenticated_tenant(sessions) else {
            self.clear();
            return Ok(None);
        };
        self.last_error = None;

        let fetched = match sessions.api_client() {
            Ok(client) => client
                .get::<Envelope<Brand>>(ApiClient::brand_path(tenant_id.as_str()).as_str())
                .await
                .and_then(Envelope::into_data)
                .and_then(|brand| {
                    if brand.tenant_id == tenant_id {
                        Ok(brand)
                    } else {
                        Err(ClientError::TenantMismatch {
                            expected: tenant_id.clone(),
                            found: brand.tenant_id,
                        })
                    }
                }),
            Err(error) => Err(error),
        };
        match fetched {
            Ok(brand) => {
                tracing::debug!(tenant_id = %tenant_id, "brand loaded");
                self.brand = Some(brand);
                Ok(self.brand.as_ref())
            }
            Err(error) => {
                tracing::warn!(tenant_id = %tenant_id, %error, "brand load failed");
                self.brand = None;
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    pub async fn patch_fields(
        &mut self,
        sessions: &impl SessionSource,
        patch: &BrandPatch,
    ) -> Result<(), ClientError> {
        let Some(tenant_id) = authenticated_tenant(sessions) else {
            tracing::warn!("brand patch skipped without an authenticated session");
            return Ok(());
        };
        sessions
            .api_client()?
            .put::<_, Envelope<Value>>(ApiClient::brand_path(tenant_id.as_str()).as_str(), patch)
            .await?
            .into_ack()?;
        tracing::info!(tenant_id = %tenant_id, "brand fields updated");
        self.load(sessions).await?;
        Ok(())
    }

    /// Overwrites the server's `config` field with `document`. Keys missing
    /// from `document` are dropped server-side.
    pub async fn replace_config(
        &mut self,
        sessions: &impl SessionSource,
        document: &Map<String, Value>,
    ) -> Result<(), ClientError> {
        let Some(tenant_id) = authenticated_tenant(sessions) else {
            tracing::warn!("config replace skipped without an authenticated session");
            return Ok(());
        };
        sessions
            .api_client()?
            .put::<_, Envelope<Value>>(
                ApiClient::brand_replace_config_path(tenant_id.as_str()).as_str(),
                &ConfigReplacement { config: document },
            )
            .await?
            .into_ack()?;
        tracing::info!(tenant_id = %tenant_id, keys = document.len(), "brand config replaced");
        self.load(sessions).await?;
        Ok(())
    }

    /// Applies `edits` to the current tenant's config and submits the full
    /// result, so untouched paths survive the replace. Loads the brand first
    /// when none is held for the session's tenant; a failed load aborts the
    /// write.
    pub async fn apply_config_edits(
        &mut self,
        sessions: &impl SessionSource,
        edits: &[ConfigEdit],
    ) -> Result<(), ClientError> {
        let Some(tenant_id) = authenticated_tenant(sessions) else {
            tracing::warn!("config edit skipped without an authenticated session");
            return Ok(());
        };
        if self.brand(sessions).is_none() {
            tracing::debug!(tenant_id = %tenant_id, "loading brand before config edit");
            self.load(sessions).await?;
        }
        let current = self
            .brand(sessions)
            .map(|brand| brand.config.clone())
            .ok_or(ClientError::MissingData)?;

        let next = edits
            .iter()
            .fold(current, |document, edit| edit.apply(&document));
        self.replace_config(sessions, &next).await
    }
}

fn authenticated_tenant(sessions: &impl SessionSource) -> Option<String> {
    let session = sessions.session();
    if !session.is_authenticated() {
        return None;
    }
    session.tenant_id().map(str::to_string)
}
