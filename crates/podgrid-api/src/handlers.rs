//! REST API handlers.
//!
//! Mutations go through the `Reconciler`; reads go straight to the record
//! store. Every failure is answered with a `{ "msg": ... }` body.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::{debug, warn};

use podgrid_reconciler::PodError;
use podgrid_state::PodId;

use crate::convert::{info_from_pod, pod_from_info};
use crate::wire::{AllPod, PodInfo, PodResponse};
use crate::ApiState;

fn error_response(err: PodError) -> Response {
    let status = match &err {
        PodError::Validation(_) => StatusCode::BAD_REQUEST,
        PodError::NotFound(_) => StatusCode::NOT_FOUND,
        PodError::AlreadyExists(_) => StatusCode::CONFLICT,
        PodError::Orchestrator(_) => StatusCode::BAD_GATEWAY,
        PodError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(status = status.as_u16(), error = %err, "request failed");
    (status, Json(PodResponse::message(err.to_string()))).into_response()
}

fn path_id(path: Result<Path<PodId>, PathRejection>) -> Result<PodId, PodError> {
    path.map(|Path(id)| id)
        .map_err(|e| PodError::Validation(e.body_text()))
}

fn body(json: Result<Json<PodInfo>, JsonRejection>) -> Result<PodInfo, PodError> {
    json.map(|Json(info)| info)
        .map_err(|e| PodError::Validation(e.body_text()))
}

// ── Mutations ──────────────────────────────────────────────────

/// POST /api/v1/pods
pub async fn add_pod(
    State(state): State<ApiState>,
    json: Result<Json<PodInfo>, JsonRejection>,
) -> Response {
    let result = async {
        let mut record = pod_from_info(&body(json)?)?;
        record.id = 0;
        let id = state.reconciler.create(&record).await?;
        Ok::<_, PodError>((record.name, id))
    }
    .await;

    match result {
        Ok((name, id)) => (
            StatusCode::CREATED,
            Json(PodResponse {
                msg: format!("pod {name} added, id: {id}"),
                id: Some(id),
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE /api/v1/pods/{id}
pub async fn delete_pod(
    State(state): State<ApiState>,
    path: Result<Path<PodId>, PathRejection>,
) -> Response {
    let result = async {
        let id = path_id(path)?;
        state.reconciler.delete(id).await?;
        Ok::<_, PodError>(id)
    }
    .await;

    match result {
        Ok(id) => Json(PodResponse::message(format!("pod {id} deleted"))).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT /api/v1/pods/{id}
pub async fn update_pod(
    State(state): State<ApiState>,
    path: Result<Path<PodId>, PathRejection>,
    json: Result<Json<PodInfo>, JsonRejection>,
) -> Response {
    let result = async {
        let id = path_id(path)?;
        let info = body(json)?;
        if info.id != 0 && info.id != id {
            return Err(PodError::Validation(format!(
                "body id {} does not match path id {id}",
                info.id
            )));
        }
        let mut record = pod_from_info(&info)?;
        record.id = id;
        state.reconciler.update(&record).await?;
        Ok::<_, PodError>(record.name)
    }
    .await;

    match result {
        Ok(name) => Json(PodResponse::message(format!("pod {name} updated"))).into_response(),
        Err(e) => error_response(e),
    }
}

// ── Reads ──────────────────────────────────────────────────────

/// GET /api/v1/pods/{id}
pub async fn find_pod_by_id(
    State(state): State<ApiState>,
    path: Result<Path<PodId>, PathRejection>,
) -> Response {
    let result = path_id(path).and_then(|id| Ok(state.reconciler.store().get_pod(id)?));
    match result {
        Ok(record) => Json(info_from_pod(&record)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/v1/pods
pub async fn find_all_pod(State(state): State<ApiState>) -> Response {
    match state.reconciler.store().list_pods() {
        Ok(records) => {
            debug!(count = records.len(), "listing pods");
            Json(AllPod {
                pod_info: records.iter().map(info_from_pod).collect(),
            })
            .into_response()
        }
        Err(e) => error_response(e.into()),
    }
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}
