use std::env;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub recalc_page_size: i64,
    pub default_actor: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| "DATABASE_URL must be set".to_string())?;

        let recalc_page_size: i64 = env::var("RECALC_PAGE_SIZE")
            .unwrap_or_else(|_| "500".to_string())
            .parse()
            .map_err(|_| "RECALC_PAGE_SIZE must be a valid integer".to_string())?;

        if recalc_page_size <= 0 {
            return Err("RECALC_PAGE_SIZE must be positive".to_string());
        }

        let default_actor = env::var("LEDGER_ACTOR")
            .unwrap_or_else(|_| "system".to_string());

        Ok(Config {
            database_url,
            recalc_page_size,
            default_actor,
        })
    }
}
