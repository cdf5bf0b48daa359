// tasklist_backend/src/db.rs
use crate::config::AppConfig;
use anyhow::Context;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use rocket::fairing::AdHoc;
use tracing::{error, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// an R2D2 connection pool
pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// SQLite only enforces foreign keys when asked to, per connection.
#[derive(Debug, Clone, Copy)]
struct SqlitePragmas;

impl CustomizeConnection<SqliteConnection, r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(r2d2::Error::QueryError)
    }
}

/// Apply every embedded migration that has not run yet.
pub fn run_migrations(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!(e))
        .context("Failed to run database migrations")?;
    if !applied.is_empty() {
        info!(count = applied.len(), "applied pending migrations");
    }
    Ok(())
}

/// Initialize the database pool and bring the schema up to date.
pub fn init_pool(config: &AppConfig) -> anyhow::Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(config.database_url.as_str());
    let pool = r2d2::Pool::builder()
        .max_size(config.pool_size)
        .connection_customizer(Box::new(SqlitePragmas))
        .build(manager)
        .with_context(|| format!("Failed to create database pool for {}", config.database_url))?;

    let mut conn = pool.get().context("Failed to get DB connection")?;
    run_migrations(&mut conn)?;
    Ok(pool)
}

// Fairing for attaching the pool to Rocket's managed state
pub fn stage() -> AdHoc {
    AdHoc::try_on_ignite("Diesel SQLite Pool", |rocket| async {
        let config = match rocket.figment().extract::<AppConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "invalid application configuration");
                return Err(rocket);
            }
        };

        match init_pool(&config) {
            Ok(pool) => {
                info!(database_url = %config.database_url, "database ready");
                Ok(rocket.manage(pool))
            }
            Err(e) => {
                error!(error = ?e, "database initialization failed");
                Err(rocket)
            }
        }
    })
}
