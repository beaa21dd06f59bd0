use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OcidQuery {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct OcidLookup {
    pub name: String,
    pub ocid: String,
}

/// GET /api/v1/characters/ocid?name=
///
/// Vendor id for a character name. Answers come from the fast cache when
/// the same name was looked up recently.
pub async fn lookup_ocid(
    State(state): State<AppState>,
    Query(params): Query<OcidQuery>,
) -> AppResult<Json<DataResponse<OcidLookup>>> {
    let name = params.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    let ocid = state.api.resolve_character_id(name).await?;
    Ok(Json(DataResponse {
        data: OcidLookup {
            name: name.to_string(),
            ocid,
        },
    }))
}
