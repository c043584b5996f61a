//! JSON CRUD handlers shared by clients and suppliers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::db::Record;
use crate::error::{AppError, Result};
use crate::middleware::RequireOwner;
use crate::models::{Client, Supplier};
use crate::services::records::OwnedRecords;
use crate::state::AppState;

/// A record type exposed as a plain JSON collection.
pub trait JsonRecord: Record + Serialize
where
    Self::Draft: DeserializeOwned + Send + 'static,
    Self::Id: DeserializeOwned + Send + Sync,
{
    /// Message for a missing or foreign record.
    const NOT_FOUND: &'static str;

    /// Message after a successful delete.
    const DELETED: &'static str;

    /// Owner-scoped operations for this type.
    fn records(state: &AppState) -> OwnedRecords<'_, Self>;
}

impl JsonRecord for Client {
    const NOT_FOUND: &'static str = "Cliente não encontrado";
    const DELETED: &'static str = "Cliente excluído com sucesso!";

    fn records(state: &AppState) -> OwnedRecords<'_, Self> {
        state.clients()
    }
}

impl JsonRecord for Supplier {
    const NOT_FOUND: &'static str = "Fornecedor não encontrado";
    const DELETED: &'static str = "Fornecedor excluído com sucesso!";

    fn records(state: &AppState) -> OwnedRecords<'_, Self> {
        state.suppliers()
    }
}

/// Routes for one record type: `/` and `/{id}`.
pub fn routes<T>() -> Router<AppState>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    Router::new()
        .route("/", get(index::<T>).post(create::<T>))
        .route("/{id}", get(show::<T>).put(update::<T>).delete(destroy::<T>))
}

async fn index<T>(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
) -> Result<Json<Vec<T>>>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    Ok(Json(T::records(&state).list(owner).await?))
}

async fn show<T>(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<T::Id>,
) -> Result<Json<T>>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    T::records(&state)
        .get(owner, id)
        .await
        .map(Json)
        .map_err(|e| AppError::record(e, T::NOT_FOUND))
}

async fn create<T>(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Json(draft): Json<T::Draft>,
) -> Result<(StatusCode, Json<T>)>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    let record = T::records(&state).create(owner, &draft).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update<T>(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<T::Id>,
    Json(draft): Json<T::Draft>,
) -> Result<Json<T>>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    T::records(&state)
        .update(owner, id, &draft)
        .await
        .map(Json)
        .map_err(|e| AppError::record(e, T::NOT_FOUND))
}

async fn destroy<T>(
    RequireOwner(owner): RequireOwner,
    State(state): State<AppState>,
    Path(id): Path<T::Id>,
) -> Result<Json<Value>>
where
    T: JsonRecord,
    T::Draft: DeserializeOwned + Send + 'static,
    T::Id: DeserializeOwned + Send + Sync,
{
    T::records(&state)
        .delete(owner, id)
        .await
        .map_err(|e| AppError::record(e, T::NOT_FOUND))?;
    Ok(Json(json!({ "mensagem": T::DELETED })))
}
