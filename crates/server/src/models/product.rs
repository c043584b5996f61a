//! Product records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use cadastro_core::{AccountId, ProductId};

use crate::db::Record;
use crate::db::records::DraftQuery;
use crate::validation::{Validate, ValidationErrors, non_blank};

/// Decimal places kept by the `NUMERIC(18,2)` price column.
const PRICE_SCALE: u32 = 2;

/// Smallest price the `NUMERIC(18,2)` column cannot hold.
fn max_price() -> Decimal {
    Decimal::from(10_i64.pow(16))
}

/// A product owned by an account, optionally carrying an image.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    #[serde(skip)]
    pub owner_id: AccountId,
    #[serde(rename = "descricao")]
    pub description: String,
    #[serde(rename = "quantidade")]
    pub quantity: i32,
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Free-text supplier name.
    #[serde(rename = "fornecedor")]
    pub supplier_name: Option<String>,
    /// External reference returned by the blob gateway.
    #[serde(rename = "caminhoImagem")]
    pub image_ref: Option<String>,
    #[serde(rename = "dataCadastro")]
    pub created_at: DateTime<Utc>,
}

/// Raw text fields of a product form, before parsing.
#[derive(Debug, Clone, Default)]
pub struct ProductFields {
    pub description: Option<String>,
    pub quantity: Option<String>,
    pub price: Option<String>,
    pub supplier_name: Option<String>,
}

impl ProductFields {
    /// Store a form field by its wire name. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "descricao" => self.description = Some(value),
            "quantidade" => self.quantity = Some(value),
            "valor" => self.price = Some(value),
            "fornecedor" => self.supplier_name = Some(value),
            _ => {}
        }
    }
}

/// Product fields accepted on create and update.
///
/// `image_ref` is not read from the request; the lifecycle service fills it
/// in from the blob gateway.
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub description: String,
    pub quantity: i32,
    pub price: Decimal,
    pub supplier_name: Option<String>,
    pub image_ref: Option<String>,
}

impl ProductDraft {
    /// Parse and validate raw form fields.
    ///
    /// Decimal commas are accepted in `valor` (`9,99`).
    ///
    /// # Errors
    ///
    /// Returns every parse and validation failure at once.
    pub fn parse(fields: ProductFields) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let quantity = match fields.quantity.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("quantidade", "campo obrigatório");
                0
            }
            Some(raw) => raw.parse::<i32>().unwrap_or_else(|_| {
                errors.add("quantidade", "deve ser um número inteiro");
                0
            }),
        };

        let price = match fields.price.as_deref().map(str::trim) {
            None | Some("") => {
                errors.add("valor", "campo obrigatório");
                Decimal::ZERO
            }
            Some(raw) => Decimal::from_str(&raw.replace(',', ".")).unwrap_or_else(|_| {
                errors.add("valor", "deve ser um número decimal");
                Decimal::ZERO
            }),
        };

        let draft = Self {
            description: fields.description.unwrap_or_default(),
            quantity,
            price,
            supplier_name: non_blank(fields.supplier_name),
            image_ref: None,
        };

        if let Err(field_errors) = draft.validate() {
            errors.extend(field_errors);
        }
        errors.into_result().map(|()| draft)
    }
}

impl Validate for ProductDraft {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("descricao", &self.description, 200);
        errors.non_negative("quantidade", self.quantity < 0);
        errors.non_negative("valor", self.price.is_sign_negative() && !self.price.is_zero());
        if self.price.normalize().scale() > PRICE_SCALE {
            errors.add("valor", "deve ter no máximo 2 casas decimais");
        }
        if self.price >= max_price() {
            errors.add("valor", "valor muito alto");
        }
        errors.optional("fornecedor", self.supplier_name.as_deref(), 200);
        errors.into_result()
    }
}

impl Record for Product {
    type Id = ProductId;
    type Draft = ProductDraft;

    const TABLE: &'static str = "product";
    const FIELDS: &'static [&'static str] =
        &["description", "quantity", "price", "supplier_name", "image_ref"];

    fn id(&self) -> ProductId {
        self.id
    }

    fn owner(&self) -> AccountId {
        self.owner_id
    }

    fn from_draft(
        id: ProductId,
        owner: AccountId,
        created_at: DateTime<Utc>,
        draft: &ProductDraft,
    ) -> Self {
        Self {
            id,
            owner_id: owner,
            description: draft.description.clone(),
            quantity: draft.quantity,
            price: draft.price,
            supplier_name: draft.supplier_name.clone(),
            image_ref: draft.image_ref.clone(),
            created_at,
        }
    }

    fn apply_draft(&mut self, draft: &ProductDraft) {
        self.description.clone_from(&draft.description);
        self.quantity = draft.quantity;
        self.price = draft.price;
        self.supplier_name.clone_from(&draft.supplier_name);
        self.image_ref.clone_from(&draft.image_ref);
    }

    fn bind_draft<'q>(draft: &'q ProductDraft, query: DraftQuery<'q, Self>) -> DraftQuery<'q, Self> {
        query
            .bind(draft.description.as_str())
            .bind(draft.quantity)
            .bind(draft.price)
            .bind(draft.supplier_name.as_deref())
            .bind(draft.image_ref.as_deref())
    }
}
