use rocket::figment::providers::{Env, Serialized};
use rocket::figment::Figment;
use rocket::serde::{Deserialize, Serialize};

/// Application settings that sit next to Rocket's own `address`/`port` keys.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AppConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

fn default_database_url() -> String {
    "tasklist.db".to_string()
}

fn default_pool_size() -> u32 {
    8
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: default_database_url(),
            pool_size: default_pool_size(),
            session_ttl_hours: default_session_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

/// Rocket's default figment (Rocket.toml, `ROCKET_*`) with our defaults
/// underneath and a bare `DATABASE_URL` environment variable on top.
pub fn figment() -> Figment {
    rocket::Config::figment()
        .join(Serialized::defaults(AppConfig::default()))
        .merge(Env::raw().only(&["DATABASE_URL"]).global())
}
