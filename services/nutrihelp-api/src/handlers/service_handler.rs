use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::{ServiceContent, ServiceContentPage};
use crate::errors::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::repo::ServiceRepo;
use crate::state::AppState;
use crate::validators::{PaginationParams, ServiceContentRequest, ValidateFields};

#[derive(Debug, Serialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ServiceResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

/// List all services
pub async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ServiceResponse<Vec<ServiceContent>>>, ApiError> {
    let repo = ServiceRepo::new(state.pool.clone());
    let items = repo.list().await?;
    Ok(ServiceResponse::ok(items))
}

/// List services one page at a time
pub async fn list_services_page(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<Json<ServiceResponse<ServiceContentPage>>, ApiError> {
    params.validate_fields()?;

    let repo = ServiceRepo::new(state.pool.clone());
    let items = repo.list_page(params.offset(), params.limit()).await?;
    let total = repo.count().await?;

    Ok(ServiceResponse::ok(ServiceContentPage::new(
        items,
        params.page(),
        params.limit(),
        total,
    )))
}

pub async fn create_service(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ServiceContentRequest>,
) -> Result<(StatusCode, Json<ServiceResponse<ServiceContent>>), ApiError> {
    request.validate_fields()?;

    let repo = ServiceRepo::new(state.pool.clone());
    let created = repo.insert(&request.into_input()).await?;

    Ok((StatusCode::CREATED, ServiceResponse::ok(created)))
}

pub async fn update_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(request): ApiJson<ServiceContentRequest>,
) -> Result<Json<ServiceResponse<ServiceContent>>, ApiError> {
    request.validate_fields()?;

    let repo = ServiceRepo::new(state.pool.clone());
    let updated = repo
        .update(id, &request.into_input())
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Service {} not found", id)))?;

    Ok(ServiceResponse::ok(updated))
}

pub async fn delete_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Value>, ApiError> {
    let repo = ServiceRepo::new(state.pool.clone());
    if !repo.delete(id).await? {
        return Err(ApiError::not_found(format!("Service {} not found", id)));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Service deleted"
    })))
}
