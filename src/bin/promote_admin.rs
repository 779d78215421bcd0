//! Grants the admin role to an existing account.
//!
//! Usage: `promote_admin <email>`

use sea_orm::Database;
use travelbook_server::{config::Config, services::accounts};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    travelbook_server::telemetry::init_telemetry("travelbook-promote-admin");

    let Some(email) = std::env::args().nth(1) else {
        eprintln!("usage: promote_admin <email>");
        std::process::exit(2);
    };

    let config = Config::from_env()?;
    let db = Database::connect(&config.database_url).await?;

    let user = accounts::promote_to_admin(&db, &email).await?;
    tracing::info!(user_id = user.id, "{} is now an administrator", user.email);
    Ok(())
}
