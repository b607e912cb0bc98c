//! podgrid-api — REST API for podgrid.
//!
//! Provides axum route handlers for managing pod records. Request bodies
//! are decoded into [`wire`] payloads, converted and validated by
//! [`convert`], and applied through a [`Reconciler`].
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/pods` | List all pods |
//! | POST | `/api/v1/pods` | Add a pod |
//! | GET | `/api/v1/pods/{id}` | Get a pod with its ports and env |
//! | PUT | `/api/v1/pods/{id}` | Replace a pod's desired state |
//! | DELETE | `/api/v1/pods/{id}` | Delete a pod and its Deployment |
//! | GET | `/healthz` | Liveness |

pub mod convert;
pub mod handlers;
pub mod wire;

use axum::Router;
use axum::routing::get;
use podgrid_reconciler::Reconciler;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reconciler: Reconciler,
}

/// Build the complete API router.
pub fn build_router(reconciler: Reconciler) -> Router {
    let api_state = ApiState { reconciler };

    let api_routes = Router::new()
        .route("/pods", get(handlers::find_all_pod).post(handlers::add_pod))
        .route(
            "/pods/{id}",
            get(handlers::find_pod_by_id)
                .put(handlers::update_pod)
                .delete(handlers::delete_pod),
        )
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
