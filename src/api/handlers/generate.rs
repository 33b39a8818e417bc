//! Allocation handlers.

use axum::{Json, extract::State};
use tracing::warn;

use crate::api::state::AppState;
use crate::domain::{AllocationRequest, GenerateReply, GenerateRequest, SequenceListResponse};
use crate::error::ResultCode;

/// Allocate one id.
///
/// Always answers `200 OK`; the outcome is carried in `code`.
pub async fn generate(
    State(state): State<AppState>,
    Json(body): Json<GenerateRequest>,
) -> Json<GenerateReply> {
    let request = AllocationRequest::from(body);
    let allocation = state.allocation_service.generate(&request);

    let reply = match state.request_timeout {
        None => GenerateReply::from(allocation.await),
        Some(deadline) => match tokio::time::timeout(deadline, allocation).await {
            Ok(result) => GenerateReply::from(result),
            Err(_) => {
                // The insert may have committed before it was dropped.
                warn!(
                    sequence = %request.sequence,
                    timeout_ms = deadline.as_millis(),
                    "allocation deadline elapsed"
                );
                GenerateReply::failure(ResultCode::FailedToGetLastInsertId)
            }
        },
    };

    Json(reply)
}

/// List configured sequence names.
pub async fn list_sequences(State(state): State<AppState>) -> Json<SequenceListResponse> {
    Json(SequenceListResponse {
        sequences: state.registry().names(),
    })
}
