use serde::Serialize;
use serde_json::Value;

use crate::api::{ApiClient, Envelope};
use crate::error::{ClientError, ValidationError};
use crate::session::{SessionManager, SessionSource};
use crate::storage::CredentialStore;

pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordChangeRequest<'a> {
    current_password: &'a str,
    new_password: &'a str,
}

pub fn validate_new_password(new_password: &str, confirmation: &str) -> Result<(), ValidationError> {
    if new_password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if new_password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}

impl<S: CredentialStore> SessionManager<S> {
    /// Changes the signed-in user's password. A rejected current password
    /// surfaces as [`ClientError::CurrentPasswordIncorrect`]; other failures
    /// pass through unchanged.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirmation: &str,
    ) -> Result<(), ClientError> {
        validate_new_password(new_password, confirmation)?;

        let result = match self.api_client() {
            Ok(client) => client
                .put::<_, Envelope<Value>>(
                    ApiClient::password_path().as_str(),
                    &PasswordChangeRequest {
                        current_password,
                        new_password,
                    },
                )
                .await
                .and_then(Envelope::into_ack),
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => {
                tracing::info!(user_id = ?self.session().user().map(|user| user.id.as_str()), "password changed");
                Ok(())
            }
            Err(error) if rejects_current_password(&error) => {
                Err(ClientError::CurrentPasswordIncorrect)
            }
            Err(error) => Err(error),
        }
    }
}

fn rejects_current_password(error: &ClientError) -> bool {
    error.status() == Some(401) || error.to_string().contains("Current")
}
