//! Client records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadastro_core::{AccountId, ClientId};

use crate::db::Record;
use crate::db::records::DraftQuery;
use crate::validation::{Validate, ValidationErrors, blank_as_none, null_as_empty};

/// A client owned by an account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Client {
    pub id: ClientId,
    #[serde(skip)]
    pub owner_id: AccountId,
    #[serde(rename = "nome")]
    pub name: String,
    /// CPF or CNPJ, as entered.
    #[serde(rename = "cpfCnpj")]
    pub document: String,
    pub email: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "cep")]
    pub postal_code: Option<String>,
    #[serde(rename = "endereco")]
    pub address: Option<String>,
    #[serde(rename = "dataCadastro")]
    pub created_at: DateTime<Utc>,
}

/// Client fields accepted on create and update.
///
/// Identity, owner and timestamp are not part of the draft; any such
/// fields in the request body are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientDraft {
    #[serde(rename = "nome", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(rename = "cpfCnpj", default, deserialize_with = "null_as_empty")]
    pub document: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(rename = "telefone", default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(rename = "cep", default, deserialize_with = "blank_as_none")]
    pub postal_code: Option<String>,
    #[serde(rename = "endereco", default, deserialize_with = "blank_as_none")]
    pub address: Option<String>,
}

impl Validate for ClientDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("nome", &self.name, 200);
        errors.require("cpfCnpj", &self.document, 20);
        errors.require_email("email", &self.email, 200);
        errors.require("telefone", &self.phone, 20);
        errors.optional("cep", self.postal_code.as_deref(), 10);
        errors.postal_code("cep", self.postal_code.as_deref(), false);
        errors.optional("endereco", self.address.as_deref(), 300);
        errors.into_result()
    }
}

impl Record for Client {
    type Id = ClientId;
    type Draft = ClientDraft;

    const TABLE: &'static str = "client";
    const FIELDS: &'static [&'static str] =
        &["name", "document", "email", "phone", "postal_code", "address"];

    fn id(&self) -> ClientId {
        self.id
    }

    fn owner(&self) -> AccountId {
        self.owner_id
    }

    fn from_draft(id: ClientId, owner: AccountId, created_at: DateTime<Utc>, draft: &ClientDraft) -> Self {
        Self {
            id,
            owner_id: owner,
            name: draft.name.clone(),
            document: draft.document.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            postal_code: draft.postal_code.clone(),
            address: draft.address.clone(),
            created_at,
        }
    }

    fn apply_draft(&mut self, draft: &ClientDraft) {
        self.name.clone_from(&draft.name);
        self.document.clone_from(&draft.document);
        self.email.clone_from(&draft.email);
        self.phone.clone_from(&draft.phone);
        self.postal_code.clone_from(&draft.postal_code);
        self.address.clone_from(&draft.address);
    }

    fn bind_draft<'q>(draft: &'q ClientDraft, query: DraftQuery<'q, Self>) -> DraftQuery<'q, Self> {
        query
            .bind(draft.name.as_str())
            .bind(draft.document.as_str())
            .bind(draft.email.as_str())
            .bind(draft.phone.as_str())
            .bind(draft.postal_code.as_deref())
            .bind(draft.address.as_deref())
    }
}
