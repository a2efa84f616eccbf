use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::controllers::assignment_controller::AssignmentController;
use crate::dto::assignment_dto::{
    AssignmentListQuery, AssignmentResponse, CreateAssignmentRequest, EndAssignmentRequest,
    UpdateAssignmentRequest,
};
use crate::dto::common::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_assignment_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_assignment))
        .route("/:id", get(get_assignment))
        .route("/:id", put(update_assignment))
        .route("/:id/end", post(end_assignment))
        .route("/:id", delete(delete_assignment))
        .route("/vehicle/:vehicle_id", get(list_by_vehicle))
        .route("/vehicle/:vehicle_id/active-primary", get(get_active_primary))
        .route(
            "/vehicle/:vehicle_id/deactivate-primary",
            post(deactivate_vehicle_primary),
        )
        .route("/driver/:driver_id", get(list_by_driver))
        .route(
            "/driver/:driver_id/roles/:role/deactivate",
            post(deactivate_driver_role),
        )
        .route("/group/:group_id", get(list_by_group))
}

// TODO: Extraer el perfil del actor del middleware de auth cuando se integre;
// la autorización ocurre antes de llegar a este subsistema
async fn get_actor_profile_id() -> String {
    "system".to_string()
}

async fn create_assignment(
    State(state): State<AppState>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.create(request).await?;
    Ok(Json(response))
}

async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssignmentResponse>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.get_by_id(id).await?;
    Ok(Json(response))
}

async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let actor = get_actor_profile_id().await;
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.update(id, request, &actor).await?;
    Ok(Json(response))
}

async fn end_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EndAssignmentRequest>,
) -> Result<Json<ApiResponse<AssignmentResponse>>, AppError> {
    let actor = get_actor_profile_id().await;
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.end(id, request, &actor).await?;
    Ok(Json(response))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let actor = get_actor_profile_id().await;
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    controller.delete(id, &actor).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Asignación deshabilitada exitosamente"
    })))
}

async fn list_by_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.list_by_vehicle(&vehicle_id, query).await?;
    Ok(Json(response))
}

async fn list_by_driver(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.list_by_driver(&driver_id, query).await?;
    Ok(Json(response))
}

async fn list_by_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
    Query(query): Query<AssignmentListQuery>,
) -> Result<Json<Vec<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.list_by_group(&group_id, query).await?;
    Ok(Json(response))
}

async fn get_active_primary(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Option<AssignmentResponse>>, AppError> {
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller.get_active_primary(&vehicle_id).await?;
    Ok(Json(response))
}

async fn deactivate_vehicle_primary(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<Option<AssignmentResponse>>, AppError> {
    let actor = get_actor_profile_id().await;
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller
        .deactivate_vehicle_primary(&vehicle_id, &actor)
        .await?;
    Ok(Json(response))
}

async fn deactivate_driver_role(
    State(state): State<AppState>,
    Path((driver_id, role)): Path<(String, String)>,
) -> Result<Json<Option<AssignmentResponse>>, AppError> {
    let actor = get_actor_profile_id().await;
    let controller = AssignmentController::new(state.repository.clone(), state.audit.clone());
    let response = controller
        .deactivate_driver_role(&driver_id, &role, &actor)
        .await?;
    Ok(Json(response))
}
