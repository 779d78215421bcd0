use sea_orm_migration::prelude::*;

mod m20251020_000001_create_users_and_catalog;
mod m20251020_000002_create_reservations;
mod m20251021_000001_create_sessions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251020_000001_create_users_and_catalog::Migration),
            Box::new(m20251020_000002_create_reservations::Migration),
            Box::new(m20251021_000001_create_sessions::Migration),
        ]
    }
}
