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
use crate::db::models::Donation;
use crate::filter;
use crate::validation::{FieldRules, FormState};

fn normalize_source(input: &Option<String>) -> String {
    let normalized = input.as_deref().unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "online" | "offline" | "event" | "campaign" | "recurring" => normalized,
        _ => "online".to_string(),
    }
}

fn normalize_status(input: &Option<String>) -> String {
    let normalized = input.as_deref().unwrap_or("").trim().to_lowercase();
    match normalized.as_str() {
        "completed" | "pending" | "failed" => normalized,
        _ => "pending".to_string(),
    }
}

#[derive(Deserialize)]
pub struct DonationRequest {
    pub amount: f64,
    pub donor_name: String,
    pub source: Option<String>,
    pub date: Option<String>, // YYYY-MM-DD
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
}

fn donation_rules() -> Vec<(&'static str, FieldRules)> {
    vec![
        ("donor_name", FieldRules::new().required()),
        (
            "amount",
            FieldRules::new().required().custom(|value: &str| {
                match value.parse::<f64>() {
                    Ok(amount) if amount > 0.0 => None,
                    _ => Some("Amount must be a positive number".to_string()),
                }
            }),
        ),
    ]
}

fn validate_donation(req: &DonationRequest) -> FormState {
    let mut form = FormState::new(&[("donor_name", ""), ("amount", "")]);
    form.update_field("donor_name", &req.donor_name, None);
    form.update_field("amount", &req.amount.to_string(), None);
    form.validate_form(&donation_rules());
    form
}

pub async fn list_donations(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_donations(&state.db).await {
        Ok(donations) => {
            let search = params.search.unwrap_or_default();
            let donations: Vec<Donation> = donations
                .into_iter()
                .filter(|d| {
                    filter::matches_search(&search, &[&d.donor_name])
                        && filter::matches_choice(params.source.as_deref(), &d.source)
                        && filter::matches_choice(params.status.as_deref(), &d.status)
                })
                .collect();
            AxumJson(serde_json::json!({ "donations": donations })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn create_donation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<DonationRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONATION_EDITORS) {
        return resp;
    }
    let form = validate_donation(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let now = Utc::now();
    let date = req
        .date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| now.date_naive());
    let donation = Donation {
        id: Uuid::new_v4().to_string(),
        amount: req.amount,
        donor_name: req.donor_name,
        source: normalize_source(&req.source),
        date,
        status: normalize_status(&req.status),
        created_at: now,
        updated_at: now,
    };

    match db::add_donation(&state.db, &donation).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "created", "id": donation.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_donation(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<DonationRequest>,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONATION_EDITORS) {
        return resp;
    }
    let form = validate_donation(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let date = req
        .date
        .as_deref()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| Utc::now().date_naive());

    match db::update_donation(
        &state.db,
        &id,
        req.amount,
        &req.donor_name,
        &normalize_source(&req.source),
        date,
        &normalize_status(&req.status),
        Utc::now(),
    )
    .await
    {
        Ok(true) => {
            AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response()
        }
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update donation error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn delete_donation(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    if let Err(resp) = auth::authorize(&user, auth::DONATION_EDITORS) {
        return resp;
    }
    match db::delete_donation(&state.db, &id).await {
        Ok(true) => (StatusCode::OK, "Deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Delete donation error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_falls_back_to_online() {
        assert_eq!(normalize_source(&Some("carrier pigeon".to_string())), "online");
        assert_eq!(normalize_source(&Some("Event".to_string())), "event");
        assert_eq!(normalize_source(&None), "online");
    }

    #[test]
    fn unknown_status_falls_back_to_pending() {
        assert_eq!(normalize_status(&Some("refunded".to_string())), "pending");
        assert_eq!(normalize_status(&Some("completed".to_string())), "completed");
    }

    #[test]
    fn non_positive_amount_is_rejected() {
        let req = DonationRequest {
            amount: 0.0,
            donor_name: "John Smith".to_string(),
            source: None,
            date: None,
            status: None,
        };
        let form = validate_donation(&req);
        assert_eq!(form.field_error("amount"), "Amount must be a positive number");
    }
}
