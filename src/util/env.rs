use std::sync::LazyLock;

use thiserror::Error;
use tokio::sync::OnceCell;

static ENV_VARS: LazyLock<OnceCell<Env>> = LazyLock::new(OnceCell::new);

/// Resolve a single process-level variable, loading the full environment on
/// first access.
///
/// Vendor credentials are optional at load time; asking for one that was
/// absent surfaces [`EnvErr::NotConfigured`], which the route layer maps to a
/// 500 for the corresponding proxy only.
pub async fn get_var(var: Var) -> EnvResult<&'static str> {
    let vars = ENV_VARS.get_or_try_init(|| async { Env::new() }).await?;
    match var {
        Var::DatabaseUrl => Ok(&vars.database_url),
        Var::ServerApiPort => Ok(&vars.server_api_port),
        Var::VkServiceToken => vars
            .vk_service_token
            .as_deref()
            .ok_or(EnvErr::NotConfigured("VK_SERVICE_TOKEN")),
        Var::YoutubeApiKey => vars
            .youtube_api_key
            .as_deref()
            .ok_or(EnvErr::NotConfigured("YOUTUBE_API_KEY")),
    }
}

#[derive(Debug, Clone)]
pub struct Env {
    pub database_url: String,
    pub server_api_port: String,
    pub vk_service_token: Option<String>,
    pub youtube_api_key: Option<String>,
}

impl Env {
    pub fn new() -> EnvResult<Self> {
        // a missing .env file is fine, the process environment may carry
        // everything already
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_api_port: required("SERVER_API_PORT")?,
            vk_service_token: optional("VK_SERVICE_TOKEN"),
            youtube_api_key: optional("YOUTUBE_API_KEY"),
        })
    }
}

fn required(name: &'static str) -> EnvResult<String> {
    std::env::var(name).map_err(|_| EnvErr::MissingValue(name))
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy)]
pub enum Var {
    DatabaseUrl,
    ServerApiPort,
    VkServiceToken,
    YoutubeApiKey,
}

#[macro_export]
macro_rules! var {
    ($ev:expr) => {
        $crate::util::env::get_var($ev)
    };
}

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing required environment variable '{0}'")]
    MissingValue(&'static str),

    #[error("{0} not configured")]
    NotConfigured(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_not_configured_message() {
        let err = EnvErr::NotConfigured("VK_SERVICE_TOKEN");
        assert_eq!(err.to_string(), "VK_SERVICE_TOKEN not configured");
    }

    #[test]
    fn test_missing_value_names_the_var() {
        let err = EnvErr::MissingValue("DATABASE_URL");
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
