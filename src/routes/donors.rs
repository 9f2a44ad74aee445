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
use crate::db::models::Donor;
use crate::filter;
use crate::validation::{self, FieldRules, FormState};

fn normalize_type(input: &Option<String>) -> String {
    let normalized = input.as_deref().unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "one-time" | "recurring" | "high-value" => normalized,
        _ => "one-time".to_string(),
    }
}

fn normalize_status(input: &Option<String>) -> String {
    match input.as_deref().map(str::trim) {
        Some("inactive") => "inactive",
        _ => "active",
    }
    .to_string()
}

#[derive(Deserialize)]
pub struct DonorRequest {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_donations: Option<f64>,
    pub last_donation: Option<String>, // YYYY-MM-DD
    #[serde(rename = "type")]
    pub donor_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    #[serde(rename = "type")]
    pub donor_type: Option<String>,
    pub status: Option<String>,
}

fn validate_donor(req: &DonorRequest) -> FormState {
    let mut form = FormState::new(&[("name", ""), ("email", "")]);
    form.update_field("name", &req.name, None);
    form.update_field("email", req.email.as_deref().unwrap_or(""), None);

    let mut rules = vec![("name", FieldRules::new().required())];
    // The email pattern rule is only attached when a value was supplied, so an
    // omitted email stays valid.
    if !req.email.as_deref().unwrap_or("").trim().is_empty() {
        rules.push(("email", FieldRules::new().pattern(validation::email_pattern())));
    }
    form.validate_form(&rules);
    form
}

fn parse_date(input: &Option<String>) -> Option<NaiveDate> {
    input
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

pub async fn list_donors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_donors(&state.db).await {
        Ok(donors) => {
            let search = params.search.unwrap_or_default();
            let donors: Vec<Donor> = donors
                .into_iter()
                .filter(|d| {
                    filter::matches_search(&search, &[&d.name, d.email.as_deref().unwrap_or("")])
                        && filter::matches_choice(params.donor_type.as_deref(), &d.donor_type)
                        && filter::matches_choice(params.status.as_deref(), &d.status)
                })
                .collect();
            AxumJson(serde_json::json!({ "donors": donors })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn create_donor(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<DonorRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONOR_EDITORS) {
        return resp;
    }
    let form = validate_donor(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let now = Utc::now();
    let donor = Donor {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        phone: req.phone,
        total_donations: req.total_donations.unwrap_or(0.0),
        last_donation: parse_date(&req.last_donation),
        donor_type: normalize_type(&req.donor_type),
        status: normalize_status(&req.status),
        created_at: now,
        updated_at: now,
    };

    match db::create_donor(&state.db, &donor).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "created", "id": donor.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_donor(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<DonorRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONOR_EDITORS) {
        return resp;
    }
    let form = validate_donor(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    match db::update_donor(
        &state.db,
        &id,
        &req.name,
        &req.email,
        &req.phone,
        req.total_donations.unwrap_or(0.0),
        parse_date(&req.last_donation),
        &normalize_type(&req.donor_type),
        &normalize_status(&req.status),
        Utc::now(),
    )
    .await
    {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update donor error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn delete_donor(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONOR_EDITORS) {
        return resp;
    }
    match db::delete_donor(&state.db, &id).await {
        Ok(true) => (StatusCode::OK, "Deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Delete donor error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_email_is_valid_but_malformed_email_is_not() {
        let mut req = DonorRequest {
            name: "John Smith".to_string(),
            email: None,
            phone: None,
            total_donations: None,
            last_donation: None,
            donor_type: None,
            status: None,
        };
        assert!(!validate_donor(&req).has_errors());

        req.email = Some("not-an-email".to_string());
        let form = validate_donor(&req);
        assert_eq!(form.field_error("email"), "Please enter a valid email address");
    }

    #[test]
    fn unknown_type_falls_back_to_one_time() {
        assert_eq!(normalize_type(&Some("platinum".to_string())), "one-time");
        assert_eq!(normalize_type(&Some("High-Value".to_string())), "high-value");
    }
}
