//! Cart route handlers.
//!
//! The cart itself lives in client storage; the server's involvement is
//! the totals preview, computed with the exact function order creation
//! uses, so the preview and the persisted order can never disagree.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tracing::instrument;

use marigold_core::{LineItem, Totals, compute_totals};

use crate::error::Result;
use crate::state::AppState;

/// Totals preview request: just the client's cart lines. Lines
/// deserialize leniently; garbage entries price out at zero rather than
/// failing the preview.
#[derive(Debug, Deserialize)]
pub struct TotalsRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// `POST /cart/totals` - compute display totals for client cart state.
#[instrument(skip(state, request))]
pub async fn totals(
    State(state): State<AppState>,
    Json(request): Json<TotalsRequest>,
) -> Result<Json<Totals>> {
    let totals = compute_totals(&request.items, state.orders().pricing());
    Ok(Json(totals))
}
