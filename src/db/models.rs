use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, DateTime, Utc};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Cause {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub goal_amount: Option<f64>,
    pub current_amount: f64,
    pub target_date: Option<NaiveDate>,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cause {
    // current_amount may exceed the goal; the displayed percentage never does.
    pub fn progress_percent(&self) -> f64 {
        match self.goal_amount {
            Some(goal) if goal > 0.0 => ((self.current_amount / goal) * 100.0).clamp(0.0, 100.0),
            _ => 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    pub id: String,
    pub amount: f64,
    pub donor_name: String,
    pub source: String,
    pub date: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donor {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_donations: f64,
    pub last_donation: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub donor_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Sponsor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub sponsor_type: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_contributions: f64,
    pub contribution_type: String,
    pub last_contribution: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub location: Option<String>,
    pub cause_id: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub cause_id: Option<String>,
    pub subject: Option<String>,
    pub content: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Achievement {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub points: i64,
    pub badge_icon: Option<String>,
    pub earned_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserProfile {
    pub id: String,
    pub user_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: String,
    pub status: String,
    pub total_points: i64,
    pub level: i64,
    pub preferences: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cause_with(current: f64, goal: Option<f64>) -> Cause {
        let now = Utc::now();
        Cause {
            id: "c1".to_string(),
            title: "Clean Water".to_string(),
            description: None,
            category: "Humanitarian".to_string(),
            goal_amount: goal,
            current_amount: current,
            target_date: None,
            status: "active".to_string(),
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn progress_is_clamped_to_hundred() {
        assert_eq!(cause_with(2500.0, Some(1000.0)).progress_percent(), 100.0);
        assert_eq!(cause_with(500.0, Some(1000.0)).progress_percent(), 50.0);
    }

    #[test]
    fn progress_without_goal_is_zero() {
        assert_eq!(cause_with(500.0, None).progress_percent(), 0.0);
        assert_eq!(cause_with(500.0, Some(0.0)).progress_percent(), 0.0);
    }
}
