use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};

use crate::causal::version_vector::VersionVector;

use super::node::Node;
use super::protocol::{
    siblings_from_wire, siblings_to_wire, GetResponse, PutParams, PutRequest, PutResponse,
    ReplicateRequest, SiblingsWire,
};

/// Public write: `PUT /kv/:key` with the JSON value as the body and the
/// echoed causal context as a query parameter.
pub async fn handle_put(
    Extension(node): Extension<Arc<Node>>,
    Path(key): Path<String>,
    Query(params): Query<PutParams>,
    Json(value): Json<serde_json::Value>,
) -> (StatusCode, Json<PutResponse>) {
    let context = match VersionVector::parse(&params.context) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!("malformed context: {}", e);
            return (StatusCode::BAD_REQUEST, Json(PutResponse { success: false }));
        }
    };

    match node.put(&key, value, context).await {
        Ok(()) => (StatusCode::OK, Json(PutResponse { success: true })),
        Err(e) => {
            tracing::error!("failed to put: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PutResponse { success: false }),
            )
        }
    }
}

/// Public read: `GET /kv/:key`. Returns every concurrent value plus the
/// joined context the client echoes back on its next write.
pub async fn handle_get(
    Extension(node): Extension<Arc<Node>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<GetResponse>) {
    match node.get(&key).await {
        Ok(Some(siblings)) => {
            let context = node.kernel().join(&siblings).to_string();
            let values = siblings.iter().map(|v| v.value().clone()).collect();
            (StatusCode::OK, Json(GetResponse { values, context }))
        }
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(GetResponse {
                values: Vec::new(),
                context: String::new(),
            }),
        ),
        Err(e) => {
            tracing::error!("failed to get: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(GetResponse {
                    values: Vec::new(),
                    context: String::new(),
                }),
            )
        }
    }
}

/// Internal write forwarded from a non-replica node.
pub async fn handle_forward_put(
    Extension(node): Extension<Arc<Node>>,
    Json(req): Json<PutRequest>,
) -> (StatusCode, Json<PutResponse>) {
    let context = match VersionVector::parse(&req.context) {
        Ok(context) => context,
        Err(e) => {
            tracing::error!("malformed context: {}", e);
            return (StatusCode::BAD_REQUEST, Json(PutResponse { success: false }));
        }
    };

    match node.put_forwarded(&req.op_id, &req.key, req.value, context).await {
        Ok(()) => (StatusCode::OK, Json(PutResponse { success: true })),
        Err(e) => {
            tracing::error!("failed to put forwarded write: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PutResponse { success: false }),
            )
        }
    }
}

/// Internal read forwarded from a non-replica node. Returns the full sibling
/// set so the forwarding node can serve it unchanged.
pub async fn handle_forward_get(
    Extension(node): Extension<Arc<Node>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<SiblingsWire>) {
    match node.get(&key).await {
        Ok(Some(siblings)) => (
            StatusCode::OK,
            Json(SiblingsWire {
                siblings: siblings_to_wire(&siblings),
            }),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(SiblingsWire {
                siblings: Vec::new(),
            }),
        ),
        Err(e) => {
            tracing::error!("failed to get forwarded read: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(SiblingsWire {
                    siblings: Vec::new(),
                }),
            )
        }
    }
}

/// Replica pull: the local sibling set for a key, 404 when absent.
pub async fn handle_get_replica(
    Extension(node): Extension<Arc<Node>>,
    Path(key): Path<String>,
) -> (StatusCode, Json<SiblingsWire>) {
    match node.get_replica(&key) {
        Ok(Some(siblings)) => (
            StatusCode::OK,
            Json(SiblingsWire {
                siblings: siblings_to_wire(&siblings),
            }),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(SiblingsWire {
                siblings: Vec::new(),
            }),
        ),
        Err(e) => {
            tracing::error!("failed to read replica: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(SiblingsWire {
                    siblings: Vec::new(),
                }),
            )
        }
    }
}

/// Replica push: folds the coordinator's sibling set into the local one.
pub async fn handle_put_replica(
    Extension(node): Extension<Arc<Node>>,
    Json(req): Json<ReplicateRequest>,
) -> (StatusCode, Json<PutResponse>) {
    let siblings = match siblings_from_wire(req.siblings) {
        Ok(siblings) => siblings,
        Err(e) => {
            tracing::error!("malformed replica payload: {}", e);
            return (StatusCode::BAD_REQUEST, Json(PutResponse { success: false }));
        }
    };

    match node.put_replica(&req.key, siblings) {
        Ok(()) => (StatusCode::OK, Json(PutResponse { success: true })),
        Err(e) => {
            tracing::error!("failed to store replica: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(PutResponse { success: false }),
            )
        }
    }
}
