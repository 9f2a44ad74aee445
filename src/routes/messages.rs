use axum::{
    extract::{State, Query, Json, Path},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::Deserialize;
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::Message;
use crate::validation::{FieldRules, FormState};

#[derive(Deserialize)]
pub struct ListParams {
    pub filter: Option<String>, // all | unread | sent
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: String,
    pub subject: Option<String>,
    pub content: String,
    pub cause_id: Option<String>,
}

fn message_rules() -> Vec<(&'static str, FieldRules)> {
    vec![
        ("recipient_id", FieldRules::new().required()),
        ("content", FieldRules::new().required().max_length(2000)),
    ]
}

pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    match db::list_messages_for(&state.db, &user.id).await {
        Ok(messages) => {
            let unread_count = messages
                .iter()
                .filter(|m| m.recipient_id == user.id && m.read_at.is_none())
                .count();

            let view = params.filter.as_deref().unwrap_or("all");
            let messages: Vec<Message> = messages
                .into_iter()
                .filter(|m| match view {
                    "unread" => m.recipient_id == user.id && m.read_at.is_none(),
                    "sent" => m.sender_id == user.id,
                    _ => true,
                })
                .collect();

            AxumJson(serde_json::json!({
                "messages": messages,
                "unread_count": unread_count,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<SendMessageRequest>,
) -> impl IntoResponse {
    let mut form = FormState::new(&[("recipient_id", ""), ("content", "")]);
    form.update_field("recipient_id", &req.recipient_id, None);
    form.update_field("content", &req.content, None);
    if !form.validate_form(&message_rules()) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": form.errors() })),
        )
            .into_response();
    }

    let message = Message {
        id: Uuid::new_v4().to_string(),
        sender_id: user.id,
        recipient_id: req.recipient_id,
        cause_id: req.cause_id,
        subject: req.subject,
        content: req.content,
        read_at: None,
        created_at: Utc::now(),
    };

    match db::add_message(&state.db, &message).await {
        Ok(()) => (
            StatusCode::CREATED,
            AxumJson(serde_json::json!({ "status": "sent", "id": message.id })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("DB Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

// Marking an already-read message (or someone else's) is a no-op, not an
// error; the response reports whether anything changed.
pub async fn mark_read(
    Path(id): Path<String>,
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::mark_message_read(&state.db, &id, &user.id, Utc::now()).await {
        Ok(updated) => AxumJson(serde_json::json!({ "updated": updated })).into_response(),
        Err(e) => {
            tracing::error!("Mark read error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}
