use axum::{
    extract::State,
    response::{IntoResponse, Json as AxumJson},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use chrono::Utc;

use crate::AppState;
use crate::auth::AuthenticatedUser;
use crate::db;

const TOUR_STEP: &str = "dashboard-tour";
const PREFERENCES_KEY: &str = "onboarding";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OnboardingState {
    pub is_first_visit: bool,
    pub completed_steps: Vec<String>,
    pub is_active: bool,
}

impl Default for OnboardingState {
    fn default() -> Self {
        Self {
            is_first_visit: true,
            completed_steps: Vec::new(),
            is_active: true,
        }
    }
}

impl OnboardingState {
    // The active flag is recomputed on load rather than trusted from storage.
    fn rehydrate(mut self) -> Self {
        self.is_active =
            self.is_first_visit && !self.completed_steps.iter().any(|s| s == TOUR_STEP);
        self
    }
}

fn state_from_preferences(preferences: &Option<String>) -> OnboardingState {
    preferences
        .as_deref()
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .and_then(|prefs| {
            prefs
                .get(PREFERENCES_KEY)
                .cloned()
                .and_then(|v| serde_json::from_value::<OnboardingState>(v).ok())
        })
        .map(OnboardingState::rehydrate)
        .unwrap_or_default()
}

async fn load_state(state: &AppState, user_id: &str) -> anyhow::Result<OnboardingState> {
    let profile = db::get_profile(&state.db, user_id).await?;
    Ok(match profile {
        Some(profile) => state_from_preferences(&profile.preferences),
        None => OnboardingState::default(),
    })
}

async fn store_state(
    state: &AppState,
    user_id: &str,
    onboarding: &OnboardingState,
) -> anyhow::Result<()> {
    let profile = db::get_profile(&state.db, user_id).await?;
    let mut prefs = profile
        .as_ref()
        .and_then(|p| p.preferences.as_deref())
        .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    if !prefs.is_object() {
        prefs = serde_json::json!({});
    }
    prefs[PREFERENCES_KEY] = serde_json::to_value(onboarding)?;
    db::set_preferences(&state.db, user_id, &prefs.to_string(), Utc::now()).await?;
    Ok(())
}

pub async fn get_state(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    match load_state(&state, &user.id).await {
        Ok(onboarding) => AxumJson(serde_json::json!({ "onboarding": onboarding })).into_response(),
        Err(e) => {
            tracing::error!("Onboarding load error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn complete(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    let mut onboarding = match load_state(&state, &user.id).await {
        Ok(onboarding) => onboarding,
        Err(e) => {
            tracing::error!("Onboarding load error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    onboarding.is_first_visit = false;
    if !onboarding.completed_steps.iter().any(|s| s == TOUR_STEP) {
        onboarding.completed_steps.push(TOUR_STEP.to_string());
    }
    onboarding.is_active = false;

    match store_state(&state, &user.id, &onboarding).await {
        Ok(()) => AxumJson(serde_json::json!({ "onboarding": onboarding })).into_response(),
        Err(e) => {
            tracing::error!("Onboarding store error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn skip(State(state): State<AppState>, user: AuthenticatedUser) -> impl IntoResponse {
    let mut onboarding = match load_state(&state, &user.id).await {
        Ok(onboarding) => onboarding,
        Err(e) => {
            tracing::error!("Onboarding load error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response();
        }
    };
    onboarding.is_active = false;

    match store_state(&state, &user.id, &onboarding).await {
        Ok(()) => AxumJson(serde_json::json!({ "onboarding": onboarding })).into_response(),
        Err(e) => {
            tracing::error!("Onboarding store error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

pub async fn reset(State(state): State<AppState>, user: AuthenticatedUser) -> impl IntoResponse {
    let onboarding = OnboardingState::default();
    match store_state(&state, &user.id, &onboarding).await {
        Ok(()) => AxumJson(serde_json::json!({ "onboarding": onboarding })).into_response(),
        Err(e) => {
            tracing::error!("Onboarding store error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Database Error").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_preferences_default_to_active_first_visit() {
        let state = state_from_preferences(&None);
        assert!(state.is_first_visit);
        assert!(state.is_active);
        assert!(state.completed_steps.is_empty());
    }

    #[test]
    fn completed_tour_is_inactive_after_rehydration() {
        // Stored is_active is ignored; the flag is derived on load.
        let raw = serde_json::json!({
            "onboarding": {
                "is_first_visit": true,
                "completed_steps": ["dashboard-tour"],
                "is_active": true,
            }
        })
        .to_string();
        let state = state_from_preferences(&Some(raw));
        assert!(!state.is_active);
    }

    #[test]
    fn garbage_preferences_fall_back_to_default() {
        let state = state_from_preferences(&Some("not json".to_string()));
        assert_eq!(state, OnboardingState::default());
    }
}
