use axum::{
    extract::{State, Json},
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use chrono::Utc;
use uuid::Uuid;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;
use crate::db::models::{Achievement, UserProfile};
use crate::levels;

#[derive(Serialize, Clone, Copy)]
pub struct AchievementType {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub points: i64,
    pub badge_icon: &'static str,
}

// Fixed catalog; users earn a subset of these.
pub static ACHIEVEMENT_CATALOG: [AchievementType; 6] = [
    AchievementType {
        kind: "first_cause",
        title: "Pioneer",
        description: "Created your first cause",
        points: 100,
        badge_icon: "target",
    },
    AchievementType {
        kind: "first_donation",
        title: "Contributor",
        description: "Made your first donation",
        points: 50,
        badge_icon: "star",
    },
    AchievementType {
        kind: "cause_complete",
        title: "Goal Crusher",
        description: "Completed a cause goal",
        points: 200,
        badge_icon: "trophy",
    },
    AchievementType {
        kind: "team_player",
        title: "Team Player",
        description: "Collaborated on 5 causes",
        points: 150,
        badge_icon: "award",
    },
    AchievementType {
        kind: "streak_7",
        title: "Dedicated",
        description: "7-day activity streak",
        points: 75,
        badge_icon: "zap",
    },
    AchievementType {
        kind: "mentor",
        title: "Mentor",
        description: "Helped 10 other users",
        points: 300,
        badge_icon: "crown",
    },
];

pub fn catalog_entry(kind: &str) -> Option<&'static AchievementType> {
    ACHIEVEMENT_CATALOG.iter().find(|entry| entry.kind == kind)
}

#[derive(Deserialize)]
pub struct AwardRequest {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Serialize)]
struct LeaderboardEntry {
    rank: usize,
    user_id: String,
    display_name: Option<String>,
    total_points: i64,
    level: usize,
}

async fn get_or_create_profile(
    state: &AppState,
    user: &AuthenticatedUser,
) -> anyhow::Result<UserProfile> {
    if let Some(profile) = db::get_profile(&state.db, &user.id).await? {
        return Ok(profile);
    }
    let now = Utc::now();
    let profile = UserProfile {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        email: Some(user.email.clone()),
        display_name: Some(user.name.clone()),
        role: user.role.as_str().to_string(),
        status: "active".to_string(),
        total_points: 0,
        level: 1,
        preferences: None,
        last_login: None,
        created_at: now,
        updated_at: now,
    };
    db::create_profile(&state.db, &profile).await?;
    Ok(profile)
}

pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    match get_or_create_profile(&state, &user).await {
        Ok(profile) => {
            // The stored level column is ignored for display; points decide.
            let points = profile.total_points;
            AxumJson(serde_json::json!({
                "profile": profile,
                "level": levels::level_for_points(points),
                "progress_to_next": levels::progress_to_next(points),
                "points_to_next": levels::points_to_next(points),
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Profile error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn list_achievements(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::list_achievements(&state.db, &user.id).await {
        Ok(achievements) => {
            AxumJson(serde_json::json!({ "achievements": achievements })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn award_achievement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(req): Json<AwardRequest>,
) -> impl IntoResponse {
    let Some(entry) = catalog_entry(&req.kind) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            AxumJson(serde_json::json!({ "errors": { "type": "Unknown achievement type" } })),
        )
            .into_response();
    };

    let profile = match get_or_create_profile(&state, &user).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!("Profile error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };

    match db::has_achievement(&state.db, &user.id, entry.kind).await {
        Ok(true) => {
            return AxumJson(serde_json::json!({ "status": "already_earned" })).into_response()
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    }

    let now = Utc::now();
    let achievement = Achievement {
        id: Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        kind: entry.kind.to_string(),
        title: entry.title.to_string(),
        description: Some(entry.description.to_string()),
        points: entry.points,
        badge_icon: Some(entry.badge_icon.to_string()),
        earned_at: now,
    };

    if let Err(e) = db::add_achievement(&state.db, &achievement).await {
        tracing::error!("DB Error: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
    }

    let total_points = profile.total_points + entry.points;
    let level = levels::level_for_points(total_points) as i64;
    if let Err(e) = db::set_points(&state.db, &user.id, total_points, level, now).await {
        tracing::error!("DB Error: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
    }

    (
        StatusCode::CREATED,
        AxumJson(serde_json::json!({
            "status": "awarded",
            "points": entry.points,
            "total_points": total_points,
        })),
    )
        .into_response()
}

pub async fn leaderboard(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> impl IntoResponse {
    match db::top_profiles(&state.db, 10).await {
        Ok(profiles) => {
            let entries: Vec<LeaderboardEntry> = profiles
                .into_iter()
                .enumerate()
                .map(|(index, profile)| LeaderboardEntry {
                    rank: index + 1,
                    level: levels::level_for_points(profile.total_points),
                    user_id: profile.user_id,
                    display_name: profile.display_name,
                    total_points: profile.total_points,
                })
                .collect();
            AxumJson(serde_json::json!({ "leaderboard": entries })).into_response()
        }
        Err(e) => {
            tracing::error!("DB Query Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn catalog(_user: AuthenticatedUser) -> impl IntoResponse {
    AxumJson(serde_json::json!({ "achievement_types": ACHIEVEMENT_CATALOG }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lookup() {
        let entry = catalog_entry("cause_complete").expect("known type");
        assert_eq!(entry.title, "Goal Crusher");
        assert_eq!(entry.points, 200);
        assert!(catalog_entry("time_traveler").is_none());
    }

    #[test]
    fn catalog_points_match_level_table_scale() {
        // Earning the full catalog lands mid-table, not past the top tier.
        let total: i64 = ACHIEVEMENT_CATALOG.iter().map(|a| a.points).sum();
        assert_eq!(total, 875);
        assert_eq!(crate::levels::level_for_points(total), 4);
    }
}
