//! Supplier records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cadastro_core::{AccountId, SupplierId};

use crate::db::Record;
use crate::db::records::DraftQuery;
use crate::validation::{Validate, ValidationErrors, null_as_empty};

/// A supplier owned by an account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: SupplierId,
    #[serde(skip)]
    pub owner_id: AccountId,
    #[serde(rename = "nomeFantasia")]
    pub trade_name: String,
    pub cnpj: String,
    #[serde(rename = "emailVendas")]
    pub sales_email: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "endereco")]
    pub address: String,
    #[serde(rename = "dataCadastro")]
    pub created_at: DateTime<Utc>,
}

/// Supplier fields accepted on create and update. Every field is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierDraft {
    #[serde(rename = "nomeFantasia", default, deserialize_with = "null_as_empty")]
    pub trade_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub cnpj: String,
    #[serde(rename = "emailVendas", default, deserialize_with = "null_as_empty")]
    pub sales_email: String,
    #[serde(rename = "telefone", default, deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(rename = "cep", default, deserialize_with = "null_as_empty")]
    pub postal_code: String,
    #[serde(rename = "endereco", default, deserialize_with = "null_as_empty")]
    pub address: String,
}

impl Validate for SupplierDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("nomeFantasia", &self.trade_name, 200);
        errors.require("cnpj", &self.cnpj, 20);
        errors.require_email("emailVendas", &self.sales_email, 200);
        errors.require("telefone", &self.phone, 30);
        errors.postal_code("cep", Some(&self.postal_code), true);
        errors.require("endereco", &self.address, 500);
        errors.into_result()
    }
}

impl Record for Supplier {
    type Id = SupplierId;
    type Draft = SupplierDraft;

    const TABLE: &'static str = "supplier";
    const FIELDS: &'static [&'static str] = &[
        "trade_name",
        "cnpj",
        "sales_email",
        "phone",
        "postal_code",
        "address",
    ];

    fn id(&self) -> SupplierId {
        self.id
    }

    fn owner(&self) -> AccountId {
        self.owner_id
    }

    fn from_draft(
        id: SupplierId,
        owner: AccountId,
        created_at: DateTime<Utc>,
        draft: &SupplierDraft,
    ) -> Self {
        Self {
            id,
            owner_id: owner,
            trade_name: draft.trade_name.clone(),
            cnpj: draft.cnpj.clone(),
            sales_email: draft.sales_email.clone(),
            phone: draft.phone.clone(),
            postal_code: draft.postal_code.clone(),
            address: draft.address.clone(),
            created_at,
        }
    }

    fn apply_draft(&mut self, draft: &SupplierDraft) {
        self.trade_name.clone_from(&draft.trade_name);
        self.cnpj.clone_from(&draft.cnpj);
        self.sales_email.clone_from(&draft.sales_email);
        self.phone.clone_from(&draft.phone);
        self.postal_code.clone_from(&draft.postal_code);
        self.address.clone_from(&draft.address);
    }

    fn bind_draft<'q>(draft: &'q SupplierDraft, query: DraftQuery<'q, Self>) -> DraftQuery<'q, Self> {
        query
            .bind(draft.trade_name.as_str())
            .bind(draft.cnpj.as_str())
            .bind(draft.sales_email.as_str())
            .bind(draft.phone.as_str())
            .bind(draft.postal_code.as_str())
            .bind(draft.address.as_str())
    }
}
