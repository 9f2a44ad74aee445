use axum::{
    extract::{State, Query, Json, Path},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::Deserialize;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::AppState;
use crate::auth::{self, AuthenticatedUser};
use crate::db;
use crate::db::models::Sponsor;
use crate::filter;
use crate::validation::{FieldRules, FormState};

fn normalize_type(input: &Option<String>) -> String {
    let normalized = input.as_deref().unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "corporate" | "individual" | "event-based" => normalized,
        _ => "corporate".to_string(),
    }
}

fn normalize_contribution_type(input: &Option<String>) -> String {
    let normalized = input.as_deref().unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "monetary" | "in-kind" | "both" => normalized,
        _ => "monetary".to_string(),
    }
}

fn normalize_status(input: &Option<String>) -> String {
    match input.as_deref().map(str::trim) {
        Some("active") => "active",
        Some("inactive") => "inactive",
        _ => "pending",
    }
    .to_string()
}

#[derive(Deserialize)]
pub struct SponsorRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub sponsor_type: Option<String>,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_contributions: Option<f64>,
    pub contribution_type: Option<String>,
    pub last_contribution: Option<String>, // YYYY-MM-DD
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub sponsor_type: Option<String>,
    pub status: Option<String>,
}

fn validate_sponsor(req: &SponsorRequest) -> FormState {
    let mut form = FormState::new(&[("name", "")]);
    form.update_field("name", &req.name, None);
    form.validate_form(&[("name", FieldRules::new().required())]);
    form
}

fn parse_date(input: &Option<String>) -> Option<NaiveDate> {
    input
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

pub async fn list_sponsors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_sponsors(&state.db).await {
        Ok(sponsors) => {
            let search = params.search.unwrap_or_default();
            let sponsors: Vec<Sponsor> = sponsors
                .into_iter()
                .filter(|s| {
                    filter::matches_search(
                        &search,
                        &[&s.name, s.contact_person.as_deref().unwrap_or("")],
                    ) && filter::matches_choice(params.sponsor_type.as_deref(), &s.sponsor_type)
                        && filter::matches_choice(params.status.as_deref(), &s.status)
                })
                .collect();
            AxumJson(serde_json::json!({ "sponsors": sponsors })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn create_sponsor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<SponsorRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::SPONSOR_EDITORS) {
        return resp;
    }
    let form = validate_sponsor(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let now = Utc::now();
    let sponsor = Sponsor {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        sponsor_type: normalize_type(&req.sponsor_type),
        contact_person: req.contact_person,
        email: req.email,
        phone: req.phone,
        total_contributions: req.total_contributions.unwrap_or(0.0),
        contribution_type: normalize_contribution_type(&req.contribution_type),
        last_contribution: parse_date(&req.last_contribution),
        status: normalize_status(&req.status),
        created_at: now,
        updated_at: now,
    };

    match db::create_sponsor(&state.db, &sponsor).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "created", "id": sponsor.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_sponsor(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<SponsorRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::SPONSOR_EDITORS) {
        return resp;
    }
    let form = validate_sponsor(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    match db::update_sponsor(
        &state.db,
        &id,
        &req.name,
        &normalize_type(&req.sponsor_type),
        &req.contact_person,
        &req.email,
        &req.phone,
        req.total_contributions.unwrap_or(0.0),
        &normalize_contribution_type(&req.contribution_type),
        parse_date(&req.last_contribution),
        &normalize_status(&req.status),
        Utc::now(),
    )
    .await
    {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update sponsor error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn delete_sponsor(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::SPONSOR_EDITORS) {
        return resp;
    }
    match db::delete_sponsor(&state.db, &id).await {
        Ok(true) => (StatusCode::OK, "Deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Delete sponsor error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sponsor_defaults() {
        assert_eq!(normalize_type(&None), "corporate");
        assert_eq!(normalize_type(&Some("Event-Based".to_string())), "event-based");
        assert_eq!(normalize_contribution_type(&Some("goods".to_string())), "monetary");
        assert_eq!(normalize_status(&None), "pending");
    }
}
