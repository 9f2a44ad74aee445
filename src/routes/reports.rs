use axum::{
    extract::State,
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use chrono::Utc;
use std::collections::BTreeMap;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;

// Aggregates are recomputed from the full row set on every request; nothing
// here is cached or persisted.
pub async fn summary(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let donations = match db::list_donations(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    let causes = match db::list_causes(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };

    let total_raised: f64 = donations
        .iter()
        .filter(|d| d.status == "completed")
        .map(|d| d.amount)
        .sum();

    let mut by_source: BTreeMap<String, f64> = BTreeMap::new();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut monthly: BTreeMap<String, f64> = BTreeMap::new();
    for donation in &donations {
        *by_status.entry(donation.status.clone()).or_default() += 1;
        if donation.status == "completed" {
            *by_source.entry(donation.source.clone()).or_default() += donation.amount;
            let month = donation.date.format("%Y-%m").to_string();
            *monthly.entry(month).or_default() += donation.amount;
        }
    }

    let cause_progress: Vec<serde_json::Value> = causes
        .iter()
        .map(|c| {
            serde_json::json!({
                "id": c.id,
                "title": c.title,
                "current_amount": c.current_amount,
                "goal_amount": c.goal_amount,
                "progress": c.progress_percent(),
            })
        })
        .collect();

    AxumJson(serde_json::json!({
        "total_raised": total_raised,
        "donation_count": donations.len(),
        "by_source": by_source,
        "by_status": by_status,
        "monthly": monthly,
        "cause_progress": cause_progress,
    }))
    .into_response()
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    let donations = match db::list_donations(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    let donors = match db::list_donors(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    let causes = match db::list_causes(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    let events = match db::list_events(&state.db).await {
        Ok(list) => list,
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };

    let now = Utc::now();
    let total_raised: f64 = donations
        .iter()
        .filter(|d| d.status == "completed")
        .map(|d| d.amount)
        .sum();
    let active_donors = donors.iter().filter(|d| d.status == "active").count();
    let active_causes = causes.iter().filter(|c| c.status == "active").count();
    let upcoming_events = events.iter().filter(|e| e.event_date >= now).count();
    let recent_donations: Vec<_> = donations.iter().take(5).collect();

    AxumJson(serde_json::json!({
        "total_raised": total_raised,
        "active_donors": active_donors,
        "active_causes": active_causes,
        "upcoming_events": upcoming_events,
        "recent_donations": recent_donations,
    }))
    .into_response()
}
