use noble_cause_tracker::db;
use noble_cause_tracker::db::models::{Achievement, Cause, Donation, Donor, Event, Message, UserProfile};
use noble_cause_tracker::levels;
use chrono::Utc;
use uuid::Uuid;

#[tokio::test]
async fn cause_donation_message_and_gamification_flow() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::env::set_var("DATABASE_PATH", dir.path().join("noble_cause_test.db"));

    let pool = db::init_pool().await.expect("init pool");
    db::run_migrations(&pool).await.expect("run migrations");

    let now = Utc::now();

    // Create a cause and confirm it lists with a clamped progress display.
    let cause_id = format!("test-cause-{}", Uuid::new_v4());
    let cause = Cause {
        id: cause_id.clone(),
        title: "Clean Water Initiative".to_string(),
        description: Some("Wells for three villages".to_string()),
        category: "Humanitarian".to_string(),
        goal_amount: Some(1000.0),
        current_amount: 2500.0,
        target_date: chrono::NaiveDate::from_ymd_opt(2026, 12, 31),
        status: "active".to_string(),
        created_by: Some("test-user".to_string()),
        created_at: now,
        updated_at: now,
    };
    db::create_cause(&pool, &cause).await.expect("create_cause");

    let causes = db::list_causes(&pool).await.expect("list_causes");
    let stored = causes.iter().find(|c| c.id == cause_id).expect("cause listed");
    assert_eq!(stored.progress_percent(), 100.0);

    let updated = db::update_cause(
        &pool,
        &cause_id,
        "Clean Water Initiative",
        &Some("Wells for five villages".to_string()),
        "Humanitarian",
        Some(5000.0),
        None,
        "paused",
        Utc::now(),
    )
    .await
    .expect("update_cause");
    assert!(updated);
    let stored = db::get_cause(&pool, &cause_id)
        .await
        .expect("get_cause")
        .expect("cause still present");
    assert_eq!(stored.status, "paused");
    // current_amount is untouched by the edit form.
    assert_eq!(stored.current_amount, 2500.0);

    // Donation CRUD.
    let donation_id = format!("test-donation-{}", Uuid::new_v4());
    let donation = Donation {
        id: donation_id.clone(),
        amount: 123.45,
        donor_name: "John Smith".to_string(),
        source: "online".to_string(),
        date: chrono::NaiveDate::from_ymd_opt(2026, 2, 18).expect("valid date"),
        status: "completed".to_string(),
        created_at: now,
        updated_at: now,
    };
    db::add_donation(&pool, &donation).await.expect("add_donation");

    let donations = db::list_donations(&pool).await.expect("list_donations");
    assert!(donations.iter().any(|d| d.id == donation_id));

    let deleted = db::delete_donation(&pool, &donation_id)
        .await
        .expect("delete_donation");
    assert!(deleted);
    assert!(!db::delete_donation(&pool, &donation_id).await.expect("second delete"));

    // Donor row keeps its stored running total as-is.
    let donor_id = format!("test-donor-{}", Uuid::new_v4());
    let donor = Donor {
        id: donor_id.clone(),
        name: "Sarah Johnson".to_string(),
        email: Some("sarah@email.com".to_string()),
        phone: None,
        total_donations: 1200.0,
        last_donation: chrono::NaiveDate::from_ymd_opt(2026, 1, 14),
        donor_type: "recurring".to_string(),
        status: "active".to_string(),
        created_at: now,
        updated_at: now,
    };
    db::create_donor(&pool, &donor).await.expect("create_donor");
    let donors = db::list_donors(&pool).await.expect("list_donors");
    let stored = donors.iter().find(|d| d.id == donor_id).expect("donor listed");
    assert_eq!(stored.total_donations, 1200.0);

    // Event end_date behaves as stored; the route layer defaults it.
    let event_id = format!("test-event-{}", Uuid::new_v4());
    let event_date = Utc::now() + chrono::Duration::days(7);
    let event = Event {
        id: event_id.clone(),
        title: "Charity Gala".to_string(),
        description: None,
        event_date,
        end_date: event_date,
        location: Some("Main Hall".to_string()),
        cause_id: Some(cause_id.clone()),
        created_by: None,
        created_at: now,
    };
    db::create_event(&pool, &event).await.expect("create_event");
    let events = db::list_events(&pool).await.expect("list_events");
    let stored = events.iter().find(|e| e.id == event_id).expect("event listed");
    assert_eq!(stored.end_date, stored.event_date);

    // Messages: only the recipient marks a message read, exactly once.
    let sender = format!("user-{}", Uuid::new_v4());
    let recipient = format!("user-{}", Uuid::new_v4());
    let message_id = format!("test-message-{}", Uuid::new_v4());
    let message = Message {
        id: message_id.clone(),
        sender_id: sender.clone(),
        recipient_id: recipient.clone(),
        cause_id: None,
        subject: Some("Welcome".to_string()),
        content: "Thanks for joining the cause".to_string(),
        read_at: None,
        created_at: now,
    };
    db::add_message(&pool, &message).await.expect("add_message");

    let inbox = db::list_messages_for(&pool, &recipient).await.expect("recipient inbox");
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].read_at.is_none());

    // The sender cannot mark it read.
    assert!(!db::mark_message_read(&pool, &message_id, &sender, Utc::now())
        .await
        .expect("sender mark read"));
    // The recipient can, once.
    assert!(db::mark_message_read(&pool, &message_id, &recipient, Utc::now())
        .await
        .expect("recipient mark read"));
    assert!(!db::mark_message_read(&pool, &message_id, &recipient, Utc::now())
        .await
        .expect("repeat mark read"));

    let inbox = db::list_messages_for(&pool, &recipient).await.expect("recipient inbox");
    assert!(inbox[0].read_at.is_some());

    // Profiles and achievements: points accumulate server-side and the
    // leaderboard orders by the authoritative total.
    let mut user_ids = Vec::new();
    for (index, points) in [(1, 250i64), (2, 900), (3, 40)] {
        let user_id = format!("player-{}-{}", index, Uuid::new_v4());
        let profile = UserProfile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.clone(),
            email: Some(format!("player{}@example.com", index)),
            display_name: Some(format!("Player {}", index)),
            role: "viewer".to_string(),
            status: "active".to_string(),
            total_points: points,
            // Deliberately wrong stored level; ranking paths must derive it.
            level: 99,
            preferences: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        db::create_profile(&pool, &profile).await.expect("create_profile");
        user_ids.push((user_id, points));
    }

    let top = db::top_profiles(&pool, 10).await.expect("top_profiles");
    let ranked: Vec<i64> = top.iter().map(|p| p.total_points).collect();
    let mut sorted = ranked.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(ranked, sorted, "leaderboard must be ordered by points");
    assert_eq!(levels::level_for_points(250), 2);

    let (winner_id, winner_points) = &user_ids[1];
    assert!(!db::has_achievement(&pool, winner_id, "mentor").await.expect("has_achievement"));
    let achievement = Achievement {
        id: Uuid::new_v4().to_string(),
        user_id: winner_id.clone(),
        kind: "mentor".to_string(),
        title: "Mentor".to_string(),
        description: Some("Helped 10 other users".to_string()),
        points: 300,
        badge_icon: Some("crown".to_string()),
        earned_at: Utc::now(),
    };
    db::add_achievement(&pool, &achievement).await.expect("add_achievement");
    assert!(db::has_achievement(&pool, winner_id, "mentor").await.expect("has_achievement"));

    let new_total = winner_points + 300;
    let new_level = levels::level_for_points(new_total) as i64;
    assert!(db::set_points(&pool, winner_id, new_total, new_level, Utc::now())
        .await
        .expect("set_points"));

    let profile = db::get_profile(&pool, winner_id)
        .await
        .expect("get_profile")
        .expect("profile present");
    assert_eq!(profile.total_points, 1200);
    assert_eq!(levels::level_for_points(profile.total_points), 5);

    let earned = db::list_achievements(&pool, winner_id).await.expect("list_achievements");
    assert_eq!(earned.len(), 1);
    assert_eq!(earned[0].kind, "mentor");

    // Session bookkeeping helpers.
    let by_email = db::find_profile_by_email(&pool, "player2@example.com")
        .await
        .expect("find_profile_by_email")
        .expect("profile by email");
    assert_eq!(&by_email.user_id, winner_id);
    assert!(db::touch_last_login(&pool, winner_id, Utc::now()).await.expect("touch_last_login"));
    assert!(db::set_profile_role(&pool, winner_id, "finance", Utc::now())
        .await
        .expect("set_profile_role"));

    let prefs = serde_json::json!({
        "onboarding": { "is_first_visit": false, "completed_steps": ["dashboard-tour"], "is_active": false }
    })
    .to_string();
    assert!(db::set_preferences(&pool, winner_id, &prefs, Utc::now())
        .await
        .expect("set_preferences"));
    let profile = db::get_profile(&pool, winner_id)
        .await
        .expect("get_profile")
        .expect("profile present");
    assert_eq!(profile.role, "finance");
    assert!(profile.preferences.unwrap_or_default().contains("dashboard-tour"));
}
