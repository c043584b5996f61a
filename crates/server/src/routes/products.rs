//! Product handlers.
//!
//! Writes are `multipart/form-data`: text fields `descricao`, `quantidade`,
//! `valor`, `fornecedor` and an optional file field `imagem`. An empty file
//! part counts as no image.

use axum::{
    Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
};
use serde_json::{Value, json};

use cadastro_core::ProductId;

use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::models::{Product, ProductDraft, ProductFields};
use crate::storage::ImageUpload;
use crate::state::AppState;

const NOT_FOUND: &str = "Produto não encontrado";

/// Multipart field carrying the image.
pub const IMAGE_FIELD: &str = "imagem";

/// A parsed product form.
struct ProductForm {
    draft: ProductDraft,
    image: Option<ImageUpload>,
}

fn malformed(e: &MultipartError) -> AppError {
    tracing::debug!(error = %e, "Malformed multipart body");
    AppError::BadRequest("Formulário inválido".to_string())
}

async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut fields = ProductFields::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| malformed(&e))? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == IMAGE_FIELD {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| malformed(&e))?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
        } else {
            let value = field.text().await.map_err(|e| malformed(&e))?;
            fields.set(&name, value);
        }
    }

    let draft = ProductDraft::parse(fields)?;
    Ok(ProductForm { draft, image })
}

/// List the caller's products, newest first.
pub async fn index(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>> {
    Ok(Json(state.products().list(owner).await?))
}

/// One of the caller's products.
pub async fn show(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Product>> {
    state
        .products()
        .get(owner, id)
        .await
        .map(Json)
        .map_err(|e| AppError::record(e, NOT_FOUND))
}

/// Create a product, with an image when one is attached.
pub async fn create(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Product>)> {
    let form = read_form(multipart).await?;
    let product = state
        .products()
        .create(owner, form.draft, form.image.as_ref())
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// Replace a product's fields and, when attached, its image.
pub async fn update(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
    multipart: Multipart,
) -> Result<Json<Product>> {
    let form = read_form(multipart).await?;
    state
        .products()
        .update(owner, id, form.draft, form.image.as_ref())
        .await
        .map(Json)
        .map_err(|e| AppError::record(e, NOT_FOUND))
}

/// Delete a product and its image.
pub async fn destroy(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> Result<Json<Value>> {
    state
        .products()
        .delete(owner, id)
        .await
        .map_err(|e| AppError::record(e, NOT_FOUND))?;
    Ok(Json(json!({ "mensagem": "Produto excluído com sucesso!" })))
}
