use anyhow::Result;

pub struct AppConfig {
    pub database: DatabaseConfig,
    pub reservation: ReservationConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        let database = DatabaseConfig {
            host: std::env::var("DATABASE_HOST")?,
            port: std::env::var("DATABASE_PORT")?.parse::<u16>()?,
            username: std::env::var("DATABASE_USERNAME")?,
            password: std::env::var("DATABASE_PASSWORD")?,
            database: std::env::var("DATABASE_NAME")?,
        };
        let reservation = ReservationConfig {
            commit_retries: parse_or("RESERVATION_COMMIT_RETRIES", 3)?,
        };
        let server = ServerConfig {
            port: parse_or("SERVER_PORT", 8080)?,
        };
        Ok(Self {
            database,
            reservation,
            server,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => Ok(v.parse::<T>()?),
        Err(_) => Ok(default),
    }
}

pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

pub struct ReservationConfig {
    /// How many times a create/update is re-run after the store reports a concurrent commit.
    pub commit_retries: u32,
}

pub struct ServerConfig {
    pub port: u16,
}
