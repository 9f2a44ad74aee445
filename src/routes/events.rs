use axum::{
    extract::{State, Json, Path},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::Deserialize;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::Event;
use crate::validation::{FieldRules, FormState};

#[derive(Deserialize)]
pub struct EventRequest {
    pub title: String,
    pub description: Option<String>,
    pub event_date: String, // RFC3339
    pub end_date: Option<String>,
    pub location: Option<String>,
    pub cause_id: Option<String>,
}

fn parse_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn event_rules() -> Vec<(&'static str, FieldRules)> {
    vec![
        ("title", FieldRules::new().required()),
        (
            "event_date",
            FieldRules::new().required().custom(|value: &str| {
                if parse_rfc3339(value).is_none() {
                    Some("Event_date format is invalid".to_string())
                } else {
                    None
                }
            }),
        ),
    ]
}

fn validate_event(req: &EventRequest) -> FormState {
    let mut form = FormState::new(&[("title", ""), ("event_date", "")]);
    form.update_field("title", &req.title, None);
    form.update_field("event_date", &req.event_date, None);
    form.validate_form(&event_rules());
    form
}

pub async fn list_events(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::list_events(&state.db).await {
        Ok(events) => {
            let now = Utc::now();
            let (upcoming, past): (Vec<Event>, Vec<Event>) =
                events.into_iter().partition(|e| e.event_date >= now);
            AxumJson(serde_json::json!({ "upcoming": upcoming, "past": past })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<EventRequest>,
) -> impl IntoResponse {
    let form = validate_event(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let now = Utc::now();
    let event_date = parse_rfc3339(&req.event_date).unwrap_or(now);
    // A missing or malformed end date falls back to the start date.
    let end_date = req
        .end_date
        .as_deref()
        .and_then(parse_rfc3339)
        .unwrap_or(event_date);

    let event = Event {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        description: req.description,
        event_date,
        end_date,
        location: req.location,
        cause_id: req.cause_id,
        created_by: Some(user.id),
        created_at: now,
    };

    match db::create_event(&state.db, &event).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "created", "id": event.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn update_event(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(req): Json<EventRequest>,
) -> impl IntoResponse {
    let form = validate_event(&req);
    if form.has_errors() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let event_date = parse_rfc3339(&req.event_date).unwrap_or_else(Utc::now);
    let end_date = req
        .end_date
        .as_deref()
        .and_then(parse_rfc3339)
        .unwrap_or(event_date);

    match db::update_event(
        &state.db,
        &id,
        &req.title,
        &req.description,
        event_date,
        end_date,
        &req.location,
        &req.cause_id,
    )
    .await
    {
        Ok(true) => AxumJson(serde_json::json!({ "status": "updated", "id": id })).into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Update event error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn delete_event(
    Path(id): Path<String>,
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::delete_event(&state.db, &id).await {
        Ok(true) => (StatusCode::OK, "Deleted").into_response(),
        Ok(false) => (StatusCode::NOT_FOUND, "Not found").into_response(),
        Err(e) => {
            tracing::error!("Delete event error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_date_must_be_rfc3339() {
        let req = EventRequest {
            title: "Gala".to_string(),
            description: None,
            event_date: "next friday".to_string(),
            end_date: None,
            location: None,
            cause_id: None,
        };
        let form = validate_event(&req);
        assert_eq!(form.field_error("event_date"), "Event_date format is invalid");
    }

    #[test]
    fn valid_event_passes() {
        let req = EventRequest {
            title: "Gala".to_string(),
            description: None,
            event_date: "2026-09-01T18:00:00Z".to_string(),
            end_date: None,
            location: Some("Main Hall".to_string()),
            cause_id: None,
        };
        assert!(!validate_event(&req).has_errors());
    }
}
