use axum::{
    extract::{State, Query, Json, Path},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::Deserialize;
use chrono::Utc;

use crate::AppState;
use crate::auth::{self, AuthenticatedUser, Role};
use crate::db;
use crate::db::models::UserProfile;
use crate::filter;

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize)]
pub struct RoleUpdateRequest {
    pub role: Role,
}

pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::USER_ADMINS) {
        return resp;
    }
    match db::list_profiles(&state.db).await {
        Ok(profiles) => {
            let search = params.search.unwrap_or_default();
            let profiles: Vec<UserProfile> = profiles
                .into_iter()
                .filter(|p| {
                    filter::matches_search(
                        &search,
                        &[
                            p.display_name.as_deref().unwrap_or(""),
                            p.email.as_deref().unwrap_or(""),
                        ],
                    ) && filter::matches_choice(params.role.as_deref(), &p.role)
                })
                .collect();
            AxumJson(serde_json::json!({ "users": profiles })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_role(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<RoleUpdateRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::USER_ADMINS) {
        return resp;
    }
    match db::set_profile_role(&state.db, &user_id, req.role.as_str(), Utc::now()).await {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "user_id": user_id }))
            .into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update role error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}
