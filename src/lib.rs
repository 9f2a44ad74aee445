pub mod auth;
pub mod counter;
pub mod db;
pub mod filter;
pub mod levels;
pub mod routes;
pub mod validation;

use db::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
}
