use rusqlite::Connection;
use std::env;
use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    println!("Starting database migration...");

    let db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| "noble_cause.db".to_string());
    let migration_path =
        env::var("MIGRATION_FILE").unwrap_or_else(|_| "migrations/init.sql".to_string());

    if !Path::new(&migration_path).exists() {
        println!("Migration file not found at: {}", migration_path);
        return Ok(());
    }

    println!("Opening database at {}...", db_path);
    let conn = Connection::open(&db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let sql_content = fs::read_to_string(&migration_path)?;

    // The schema uses IF NOT EXISTS throughout, so re-running is harmless.
    conn.execute_batch(&sql_content)
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    println!("Migration complete.");
    Ok(())
}
