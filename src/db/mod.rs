use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Row};
use chrono::{NaiveDate, DateTime, Utc};
use std::env;

pub mod models;

use models::{Achievement, Cause, Donation, Donor, Event, Message, Sponsor, UserProfile};

pub type DbPool = Pool<SqliteConnectionManager>;

pub async fn init_pool() -> anyhow::Result<DbPool> {
    let path = env::var("DATABASE_PATH").unwrap_or_else(|_| "noble_cause.db".to_string());

    let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")
    });
    let pool = Pool::builder()
        // Tolerate transient contention from concurrent request handlers
        .max_size(10)
        .connection_timeout(std::time::Duration::from_secs(60))
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

    Ok(pool)
}

pub async fn run_migrations(pool: &DbPool) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute_batch(include_str!("../../migrations/init.sql"))?;
    Ok(())
}

// ---------- causes ----------

fn cause_from_row(row: &Row) -> rusqlite::Result<Cause> {
    Ok(Cause {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        goal_amount: row.get(4)?,
        current_amount: row.get(5)?,
        target_date: row.get(6)?,
        status: row.get(7)?,
        created_by: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const CAUSE_COLUMNS: &str =
    "id, title, description, category, goal_amount, current_amount, target_date, status, created_by, created_at, updated_at";

pub async fn list_causes(pool: &DbPool) -> anyhow::Result<Vec<Cause>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM causes ORDER BY created_at DESC",
        CAUSE_COLUMNS
    ))?;
    let causes = stmt
        .query_map([], |row| cause_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(causes)
}

pub async fn get_cause(pool: &DbPool, id: &str) -> anyhow::Result<Option<Cause>> {
    let conn = pool.get()?;
    let cause = conn
        .query_row(
            &format!("SELECT {} FROM causes WHERE id = ?1", CAUSE_COLUMNS),
            params![id],
            |row| cause_from_row(row),
        )
        .optional()?;
    Ok(cause)
}

pub async fn create_cause(pool: &DbPool, cause: &Cause) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO causes (id, title, description, category, goal_amount, current_amount, target_date, status, created_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            cause.id,
            cause.title,
            cause.description,
            cause.category,
            cause.goal_amount,
            cause.current_amount,
            cause.target_date,
            cause.status,
            cause.created_by,
            cause.created_at,
            cause.updated_at,
        ],
    )?;
    Ok(())
}

pub async fn update_cause(
    pool: &DbPool,
    id: &str,
    title: &str,
    description: &Option<String>,
    category: &str,
    goal_amount: Option<f64>,
    target_date: Option<NaiveDate>,
    status: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE causes SET title = ?1, description = ?2, category = ?3, goal_amount = ?4, target_date = ?5, status = ?6, updated_at = ?7
         WHERE id = ?8",
        params![title, description, category, goal_amount, target_date, status, updated_at, id],
    )?;
    Ok(changed > 0)
}

pub async fn delete_cause(pool: &DbPool, id: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute("DELETE FROM causes WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ---------- donations ----------

fn donation_from_row(row: &Row) -> rusqlite::Result<Donation> {
    Ok(Donation {
        id: row.get(0)?,
        amount: row.get(1)?,
        donor_name: row.get(2)?,
        source: row.get(3)?,
        date: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub async fn list_donations(pool: &DbPool) -> anyhow::Result<Vec<Donation>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, amount, donor_name, source, date, status, created_at, updated_at
         FROM donations ORDER BY date DESC, created_at DESC",
    )?;
    let donations = stmt
        .query_map([], |row| donation_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(donations)
}

pub async fn add_donation(pool: &DbPool, donation: &Donation) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO donations (id, amount, donor_name, source, date, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            donation.id,
            donation.amount,
            donation.donor_name,
            donation.source,
            donation.date,
            donation.status,
            donation.created_at,
            donation.updated_at,
        ],
    )?;
    Ok(())
}

pub async fn update_donation(
    pool: &DbPool,
    id: &str,
    amount: f64,
    donor_name: &str,
    source: &str,
    date: NaiveDate,
    status: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE donations SET amount = ?1, donor_name = ?2, source = ?3, date = ?4, status = ?5, updated_at = ?6
         WHERE id = ?7",
        params![amount, donor_name, source, date, status, updated_at, id],
    )?;
    Ok(changed > 0)
}

pub async fn delete_donation(pool: &DbPool, id: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute("DELETE FROM donations WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ---------- donors ----------

fn donor_from_row(row: &Row) -> rusqlite::Result<Donor> {
    Ok(Donor {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        total_donations: row.get(4)?,
        last_donation: row.get(5)?,
        donor_type: row.get(6)?,
        status: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

pub async fn list_donors(pool: &DbPool) -> anyhow::Result<Vec<Donor>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, total_donations, last_donation, donor_type, status, created_at, updated_at
         FROM donors ORDER BY created_at DESC",
    )?;
    let donors = stmt
        .query_map([], |row| donor_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(donors)
}

pub async fn create_donor(pool: &DbPool, donor: &Donor) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO donors (id, name, email, phone, total_donations, last_donation, donor_type, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            donor.id,
            donor.name,
            donor.email,
            donor.phone,
            donor.total_donations,
            donor.last_donation,
            donor.donor_type,
            donor.status,
            donor.created_at,
            donor.updated_at,
        ],
    )?;
    Ok(())
}

pub async fn update_donor(
    pool: &DbPool,
    id: &str,
    name: &str,
    email: &Option<String>,
    phone: &Option<String>,
    total_donations: f64,
    last_donation: Option<NaiveDate>,
    donor_type: &str,
    status: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE donors SET name = ?1, email = ?2, phone = ?3, total_donations = ?4, last_donation = ?5, donor_type = ?6, status = ?7, updated_at = ?8
         WHERE id = ?9",
        params![name, email, phone, total_donations, last_donation, donor_type, status, updated_at, id],
    )?;
    Ok(changed > 0)
}

pub async fn delete_donor(pool: &DbPool, id: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute("DELETE FROM donors WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ---------- sponsors ----------

fn sponsor_from_row(row: &Row) -> rusqlite::Result<Sponsor> {
    Ok(Sponsor {
        id: row.get(0)?,
        name: row.get(1)?,
        sponsor_type: row.get(2)?,
        contact_person: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        total_contributions: row.get(6)?,
        contribution_type: row.get(7)?,
        last_contribution: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub async fn list_sponsors(pool: &DbPool) -> anyhow::Result<Vec<Sponsor>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, sponsor_type, contact_person, email, phone, total_contributions, contribution_type, last_contribution, status, created_at, updated_at
         FROM sponsors ORDER BY created_at DESC",
    )?;
    let sponsors = stmt
        .query_map([], |row| sponsor_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sponsors)
}

pub async fn create_sponsor(pool: &DbPool, sponsor: &Sponsor) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO sponsors (id, name, sponsor_type, contact_person, email, phone, total_contributions, contribution_type, last_contribution, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            sponsor.id,
            sponsor.name,
            sponsor.sponsor_type,
            sponsor.contact_person,
            sponsor.email,
            sponsor.phone,
            sponsor.total_contributions,
            sponsor.contribution_type,
            sponsor.last_contribution,
            sponsor.status,
            sponsor.created_at,
            sponsor.updated_at,
        ],
    )?;
    Ok(())
}

pub async fn update_sponsor(
    pool: &DbPool,
    id: &str,
    name: &str,
    sponsor_type: &str,
    contact_person: &Option<String>,
    email: &Option<String>,
    phone: &Option<String>,
    total_contributions: f64,
    contribution_type: &str,
    last_contribution: Option<NaiveDate>,
    status: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE sponsors SET name = ?1, sponsor_type = ?2, contact_person = ?3, email = ?4, phone = ?5, total_contributions = ?6, contribution_type = ?7, last_contribution = ?8, status = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            name,
            sponsor_type,
            contact_person,
            email,
            phone,
            total_contributions,
            contribution_type,
            last_contribution,
            status,
            updated_at,
            id
        ],
    )?;
    Ok(changed > 0)
}

pub async fn delete_sponsor(pool: &DbPool, id: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute("DELETE FROM sponsors WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ---------- events ----------

fn event_from_row(row: &Row) -> rusqlite::Result<Event> {
    Ok(Event {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        event_date: row.get(3)?,
        end_date: row.get(4)?,
        location: row.get(5)?,
        cause_id: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub async fn list_events(pool: &DbPool) -> anyhow::Result<Vec<Event>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, title, description, event_date, end_date, location, cause_id, created_by, created_at
         FROM events ORDER BY event_date ASC",
    )?;
    let events = stmt
        .query_map([], |row| event_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(events)
}

pub async fn create_event(pool: &DbPool, event: &Event) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO events (id, title, description, event_date, end_date, location, cause_id, created_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            event.id,
            event.title,
            event.description,
            event.event_date,
            event.end_date,
            event.location,
            event.cause_id,
            event.created_by,
            event.created_at,
        ],
    )?;
    Ok(())
}

pub async fn update_event(
    pool: &DbPool,
    id: &str,
    title: &str,
    description: &Option<String>,
    event_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    location: &Option<String>,
    cause_id: &Option<String>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE events SET title = ?1, description = ?2, event_date = ?3, end_date = ?4, location = ?5, cause_id = ?6
         WHERE id = ?7",
        params![title, description, event_date, end_date, location, cause_id, id],
    )?;
    Ok(changed > 0)
}

pub async fn delete_event(pool: &DbPool, id: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute("DELETE FROM events WHERE id = ?1", params![id])?;
    Ok(changed > 0)
}

// ---------- messages ----------

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        cause_id: row.get(3)?,
        subject: row.get(4)?,
        content: row.get(5)?,
        read_at: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub async fn list_messages_for(pool: &DbPool, user_id: &str) -> anyhow::Result<Vec<Message>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, recipient_id, cause_id, subject, content, read_at, created_at
         FROM messages WHERE sender_id = ?1 OR recipient_id = ?1
         ORDER BY created_at DESC",
    )?;
    let messages = stmt
        .query_map(params![user_id], |row| message_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(messages)
}

pub async fn add_message(pool: &DbPool, message: &Message) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO messages (id, sender_id, recipient_id, cause_id, subject, content, read_at, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            message.id,
            message.sender_id,
            message.recipient_id,
            message.cause_id,
            message.subject,
            message.content,
            message.read_at,
            message.created_at,
        ],
    )?;
    Ok(())
}

// Only the recipient can mark a message read, and only once.
pub async fn mark_message_read(
    pool: &DbPool,
    id: &str,
    recipient_id: &str,
    read_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE messages SET read_at = ?1 WHERE id = ?2 AND recipient_id = ?3 AND read_at IS NULL",
        params![read_at, id, recipient_id],
    )?;
    Ok(changed > 0)
}

// ---------- achievements ----------

fn achievement_from_row(row: &Row) -> rusqlite::Result<Achievement> {
    Ok(Achievement {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        points: row.get(5)?,
        badge_icon: row.get(6)?,
        earned_at: row.get(7)?,
    })
}

pub async fn list_achievements(pool: &DbPool, user_id: &str) -> anyhow::Result<Vec<Achievement>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, user_id, type, title, description, points, badge_icon, earned_at
         FROM achievements WHERE user_id = ?1 ORDER BY earned_at DESC",
    )?;
    let achievements = stmt
        .query_map(params![user_id], |row| achievement_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(achievements)
}

pub async fn has_achievement(pool: &DbPool, user_id: &str, kind: &str) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM achievements WHERE user_id = ?1 AND type = ?2",
        params![user_id, kind],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub async fn add_achievement(pool: &DbPool, achievement: &Achievement) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO achievements (id, user_id, type, title, description, points, badge_icon, earned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            achievement.id,
            achievement.user_id,
            achievement.kind,
            achievement.title,
            achievement.description,
            achievement.points,
            achievement.badge_icon,
            achievement.earned_at,
        ],
    )?;
    Ok(())
}

// ---------- user profiles ----------

fn profile_from_row(row: &Row) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        email: row.get(2)?,
        display_name: row.get(3)?,
        role: row.get(4)?,
        status: row.get(5)?,
        total_points: row.get(6)?,
        level: row.get(7)?,
        preferences: row.get(8)?,
        last_login: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

const PROFILE_COLUMNS: &str =
    "id, user_id, email, display_name, role, status, total_points, level, preferences, last_login, created_at, updated_at";

pub async fn get_profile(pool: &DbPool, user_id: &str) -> anyhow::Result<Option<UserProfile>> {
    let conn = pool.get()?;
    let profile = conn
        .query_row(
            &format!("SELECT {} FROM user_profiles WHERE user_id = ?1", PROFILE_COLUMNS),
            params![user_id],
            |row| profile_from_row(row),
        )
        .optional()?;
    Ok(profile)
}

pub async fn find_profile_by_email(pool: &DbPool, email: &str) -> anyhow::Result<Option<UserProfile>> {
    let conn = pool.get()?;
    let profile = conn
        .query_row(
            &format!("SELECT {} FROM user_profiles WHERE email = ?1", PROFILE_COLUMNS),
            params![email],
            |row| profile_from_row(row),
        )
        .optional()?;
    Ok(profile)
}

pub async fn list_profiles(pool: &DbPool) -> anyhow::Result<Vec<UserProfile>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM user_profiles ORDER BY created_at ASC",
        PROFILE_COLUMNS
    ))?;
    let profiles = stmt
        .query_map([], |row| profile_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

pub async fn top_profiles(pool: &DbPool, limit: i64) -> anyhow::Result<Vec<UserProfile>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM user_profiles ORDER BY total_points DESC LIMIT ?1",
        PROFILE_COLUMNS
    ))?;
    let profiles = stmt
        .query_map(params![limit], |row| profile_from_row(row))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(profiles)
}

pub async fn create_profile(pool: &DbPool, profile: &UserProfile) -> anyhow::Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO user_profiles (id, user_id, email, display_name, role, status, total_points, level, preferences, last_login, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            profile.id,
            profile.user_id,
            profile.email,
            profile.display_name,
            profile.role,
            profile.status,
            profile.total_points,
            profile.level,
            profile.preferences,
            profile.last_login,
            profile.created_at,
            profile.updated_at,
        ],
    )?;
    Ok(())
}

pub async fn touch_last_login(
    pool: &DbPool,
    user_id: &str,
    when: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE user_profiles SET last_login = ?1, updated_at = ?1 WHERE user_id = ?2",
        params![when, user_id],
    )?;
    Ok(changed > 0)
}

pub async fn set_profile_role(
    pool: &DbPool,
    user_id: &str,
    role: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE user_profiles SET role = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![role, updated_at, user_id],
    )?;
    Ok(changed > 0)
}

// total_points is authoritative here; the displayed level is derived by callers
// but the stored column is kept in step for other consumers of the table.
pub async fn set_points(
    pool: &DbPool,
    user_id: &str,
    total_points: i64,
    level: i64,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE user_profiles SET total_points = ?1, level = ?2, updated_at = ?3 WHERE user_id = ?4",
        params![total_points, level, updated_at, user_id],
    )?;
    Ok(changed > 0)
}

pub async fn set_preferences(
    pool: &DbPool,
    user_id: &str,
    preferences: &str,
    updated_at: DateTime<Utc>,
) -> anyhow::Result<bool> {
    let conn = pool.get()?;
    let changed = conn.execute(
        "UPDATE user_profiles SET preferences = ?1, updated_at = ?2 WHERE user_id = ?3",
        params![preferences, updated_at, user_id],
    )?;
    Ok(changed > 0)
}
