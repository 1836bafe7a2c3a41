use std::env::var;
use std::str::FromStr;

use dotenvy::dotenv;

pub struct Config {
    pub port: u16,
    pub scheme: String,
    pub host: String,
    pub database_url: String,
    pub dispatch: DispatchTunables,
}

#[derive(Debug, Clone)]
pub struct DispatchTunables {
    pub batch_size: u32,
    pub retry_backoff_secs: u64,
    pub same_recipient_delay_secs: u64,
    pub stale_processing_secs: u64,
    pub default_max_attempts: u32,
    /// Interval of the built-in dispatch ticker; 0 disables it and leaves
    /// triggering to an external scheduler.
    pub dispatch_interval_secs: u64,
}

impl Config {
    pub fn try_parse() -> Result<Config, &'static str> {
        let _ = dotenv();

        Ok(Config {
            port: var("PORT")
                .map_err(|_| "An error occured while getting PORT env param")?
                .parse::<u16>()
                .map_err(|_| "An error occured while parsing PORT env param")?,
            scheme: var("SCHEME").map_err(|_| "An error occured while getting SCHEME env param")?,
            host: var("HOST").map_err(|_| "An error occured while getting HOST env param")?,
            database_url: var("DATABASE_URL")
                .map_err(|_| "An error occured while getting DATABASE_URL env param")?,
            dispatch: DispatchTunables {
                batch_size: parse_optional(
                    "BATCH_SIZE",
                    10,
                    "An error occured while parsing BATCH_SIZE env param",
                )?,
                retry_backoff_secs: parse_optional(
                    "RETRY_BACKOFF_SECONDS",
                    60,
                    "An error occured while parsing RETRY_BACKOFF_SECONDS env param",
                )?,
                same_recipient_delay_secs: parse_optional(
                    "SAME_RECIPIENT_DELAY_SECONDS",
                    3,
                    "An error occured while parsing SAME_RECIPIENT_DELAY_SECONDS env param",
                )?,
                stale_processing_secs: parse_optional(
                    "STALE_PROCESSING_SECONDS",
                    900,
                    "An error occured while parsing STALE_PROCESSING_SECONDS env param",
                )?,
                default_max_attempts: parse_optional(
                    "DEFAULT_MAX_ATTEMPTS",
                    3,
                    "An error occured while parsing DEFAULT_MAX_ATTEMPTS env param",
                )?,
                dispatch_interval_secs: parse_optional(
                    "DISPATCH_INTERVAL_SECONDS",
                    0,
                    "An error occured while parsing DISPATCH_INTERVAL_SECONDS env param",
                )?,
            },
        })
    }
}

fn parse_optional<T: FromStr>(
    name: &str,
    default: T,
    error: &'static str,
) -> Result<T, &'static str> {
    match var(name) {
        Ok(value) => value.parse::<T>().map_err(|_| error),
        Err(_) => Ok(default),
    }
}
