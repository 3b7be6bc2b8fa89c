//! Client Service

use covenant_core::{Client, CovenantResult, ValidationError};
use serde::{Deserialize, Serialize};

use crate::manager::LifecycleManager;
use crate::result::{finish, ActionResult, Delivered};

/// Input for [`LifecycleManager::create_client`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
}

impl LifecycleManager {
    /// Register a new lead. Emails are unique across clients.
    pub async fn create_client(&self, request: CreateClientRequest) -> ActionResult<Client> {
        finish(self.register_client(request).await, "create client")
    }

    async fn register_client(
        &self,
        request: CreateClientRequest,
    ) -> CovenantResult<Delivered<Client>> {
        let email = request.email.trim();
        if covenant_notify::validate_recipient(email).is_err() {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                reason: "must be an email address".to_string(),
            }
            .into());
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "name".to_string(),
            }
            .into());
        }
        if self.store.client_find_by_email(email).await?.is_some() {
            return Err(ValidationError::InvalidValue {
                field: "email".to_string(),
                reason: "already in use".to_string(),
            }
            .into());
        }

        let mut client = Client::new_lead(email, name);
        client.company = request.company.filter(|c| !c.trim().is_empty());
        self.store.client_insert(&client).await?;
        tracing::info!(client_id = %client.client_id, "Client created");
        Ok(Delivered::quiet(client))
    }
}
