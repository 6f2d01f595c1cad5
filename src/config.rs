use serde::Deserialize;

pub const SESSION_COOKIE: &str = "jwt";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    pub api_key: String,
    pub api_secret: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub chat: ChatConfig,
    /// Turns on the `Secure` flag of the session cookie.
    pub production: bool,
    /// Browser origin allowed to send credentialed requests.
    pub client_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "lingo".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "lingo-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 7),
        };
        let chat = ChatConfig {
            api_key: std::env::var("STREAM_API_KEY")?,
            api_secret: std::env::var("STREAM_API_SECRET")?,
            base_url: std::env::var("STREAM_BASE_URL")
                .unwrap_or_else(|_| "https://chat.stream-io-api.com".into()),
        };
        let production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        let client_origin = std::env::var("CLIENT_ORIGIN").ok().filter(|v| !v.is_empty());
        Ok(Self {
            database_url,
            jwt,
            chat,
            production,
            client_origin,
        })
    }
}
