use std::{str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};

use crate::env::{which, Environment};

const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60 * 24;
const DEV_SESSION_SECRET: &str = "development-only-session-secret";

pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
    pub admin: Option<AdminSeedConfig>,
}

impl AppConfig {
    pub fn new() -> Result<Self> {
        Self::from_lookup(which(), |key| std::env::var(key).ok())
    }

    // 環境変数の読み出し元を差し替えられるようにしておく（テスト用）
    pub fn from_lookup<F>(environment: Environment, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            port: parse_or(&lookup, "PORT", 8080)?,
            public_base_url: lookup("PUBLIC_BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".into()),
        };

        let health_check_secs: u64 = parse_or(&lookup, "DB_HEALTH_CHECK_INTERVAL", 30)?;
        if health_check_secs == 0 {
            return Err(anyhow!("DB_HEALTH_CHECK_INTERVAL must be at least 1 second"));
        }
        let database = DatabaseConfig {
            url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            health_check_interval: Duration::from_secs(health_check_secs),
        };

        let secret = match (lookup("SESSION_SECRET"), environment) {
            (Some(secret), _) => secret,
            (None, Environment::Development) => DEV_SESSION_SECRET.into(),
            (None, Environment::Production) => {
                return Err(anyhow!("SESSION_SECRET must be set in production"))
            }
        };
        let auth = AuthConfig {
            ttl: parse_or(&lookup, "AUTH_TOKEN_TTL", DEFAULT_TOKEN_TTL_SECS)?,
            secret,
            secure_cookie: environment == Environment::Production,
        };

        let mail = MailConfig {
            api_url: lookup("EMAIL_API_URL")
                .unwrap_or_else(|| "https://api.resend.com/emails".into()),
            api_key: lookup("EMAIL_API_KEY").filter(|k| !k.is_empty()),
            sender: lookup("EMAIL_FROM").unwrap_or_else(|| "no-reply@localhost".into()),
            public_base_url: server.public_base_url.clone(),
        };

        let admin = lookup("ADMIN_PASSWORD")
            .filter(|p| !p.is_empty())
            .map(|password| AdminSeedConfig {
                email: lookup("ADMIN_EMAIL").unwrap_or_else(|| "admin@admin.com".into()),
                password,
            });

        Ok(Self {
            environment,
            server,
            database,
            auth,
            mail,
            admin,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid value for {key}: {e}")),
    }
}

pub struct ServerConfig {
    pub port: u16,
    pub public_base_url: String,
}

pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub health_check_interval: Duration,
}

#[derive(Clone)]
pub struct AuthConfig {
    /// セッションの有効期間（秒）
    pub ttl: u64,
    pub secret: String,
    pub secure_cookie: bool,
}

#[derive(Clone)]
pub struct MailConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub sender: String,
    pub public_base_url: String,
}

pub struct AdminSeedConfig {
    pub email: String,
    pub password: String,
}
