use axum::{
    extract::{State, Query, Json, Path},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::Cause;
use crate::filter;
use crate::validation::{FieldRules, FormState};

pub const CATEGORIES: [&str; 8] = [
    "Environmental",
    "Educational",
    "Humanitarian",
    "Healthcare",
    "Community",
    "Animal Welfare",
    "Arts & Culture",
    "Technology",
];

fn normalize_status(input: &Option<String>) -> String {
    match input.as_deref().map(str::trim) {
        Some("paused") => "paused",
        Some("completed") => "completed",
        _ => "active",
    }
    .to_string()
}

#[derive(Deserialize)]
pub struct CauseRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub goal_amount: Option<f64>,
    pub target_date: Option<String>, // YYYY-MM-DD
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

#[derive(Serialize)]
struct CauseView<'a> {
    #[serde(flatten)]
    cause: &'a Cause,
    progress: f64,
}

fn cause_rules() -> Vec<(&'static str, FieldRules)> {
    vec![
        ("title", FieldRules::new().required().max_length(120)),
        (
            "category",
            FieldRules::new().required().custom(|value: &str| {
                if CATEGORIES.contains(&value) {
                    None
                } else {
                    Some("Category is not a recognized category".to_string())
                }
            }),
        ),
    ]
}

fn validate_cause(req: &CauseRequest) -> FormState {
    let mut form = FormState::new(&[("title", ""), ("category", "")]);
    form.update_field("title", &req.title, None);
    form.update_field("category", &req.category, None);
    form.validate_form(&cause_rules());
    form
}

pub async fn list_causes(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_causes(&state.db).await {
        Ok(causes) => {
            let search = params.search.unwrap_or_default();
            let causes: Vec<Cause> = causes
                .into_iter()
                .filter(|c| {
                    filter::matches_search(
                        &search,
                        &[&c.title, c.description.as_deref().unwrap_or("")],
                    ) && filter::matches_choice(params.category.as_deref(), &c.category)
                        && filter::matches_choice(params.status.as_deref(), &c.status)
                })
                .collect();
            let views: Vec<CauseView> = causes
                .iter()
                .map(|c| CauseView { cause: c, progress: c.progress_percent() })
                .collect();
            AxumJson(serde_json::json!({ "causes": views })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn create_cause(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<CauseRequest>,
) -> impl IntoResponse {
    let form = validate_cause(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let now = Utc::now();
    let target_date = req
        .target_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    let cause = Cause {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description,
        category: req.category,
        goal_amount: req.goal_amount,
        current_amount: 0.0,
        target_date,
        status: normalize_status(&req.status),
        created_by: Some(user.id),
        created_at: now,
        updated_at: now,
    };

    match db::create_cause(&state.db, &cause).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "created", "id": cause.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_cause(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(req): Json<CauseRequest>,
) -> impl IntoResponse {
    let form = validate_cause(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let target_date = req
        .target_date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
    let status = normalize_status(&req.status);

    match db::update_cause(
        &state.db,
        &id,
        &req.title,
        &req.description,
        &req.category,
        req.goal_amount,
        target_date,
        &status,
        Utc::now(),
    )
    .await
    {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update cause error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn delete_cause(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::delete_cause(&state.db, &id).await {
        Ok(true) => (StatusCode::OK, "Deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Delete cause error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_normalizes_to_active() {
        assert_eq!(normalize_status(&Some("archived".to_string())), "active");
        assert_eq!(normalize_status(&Some("paused".to_string())), "paused");
        assert_eq!(normalize_status(&None), "active");
    }

    #[test]
    fn category_outside_catalog_fails_validation() {
        let req = CauseRequest {
            title: "Tree Planting".to_string(),
            description: None,
            category: "Space Travel".to_string(),
            goal_amount: Some(1000.0),
            target_date: None,
            status: None,
        };
        let form = validate_cause(&req);
        assert!(form.has_errors());
        assert_eq!(
            form.field_error("category"),
            "Category is not a recognized category"
        );
    }

    #[test]
    fn valid_cause_passes() {
        let req = CauseRequest {
            title: "Tree Planting".to_string(),
            description: Some("Plant trees".to_string()),
            category: "Environmental".to_string(),
            goal_amount: Some(1000.0),
            target_date: Some("2026-12-31".to_string()),
            status: Some("active".to_string()),
        };
        assert!(!validate_cause(&req).has_errors());
    }
}
