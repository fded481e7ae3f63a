use config::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "BLOG_";
// 部署平台上惯用的单一连接串变量
const CONNECTION_STRING_VAR: &str = "MONGODB_URI";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub views: ViewSettings,
    pub comments: CommentSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    /// `None` leaves every store-backed endpoint disabled.
    pub url: Option<String>,
    pub name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize, Clone)]
pub struct ViewSettings {
    pub dedup_window_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct CommentSettings {
    /// Reject replies whose parent does not exist instead of dropping them.
    pub strict_parent: bool,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        Self::build(&run_mode, map_env_vars(std::env::vars()))
    }

    fn build(run_mode: &str, env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let env_json = serde_json::to_string(&env_map)
            .map_err(|e| ConfigError::Foreign(Box::new(e)))?;

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.name", "Blog")?
            .set_default("views.dedup_window_secs", 3600)?
            .set_default("comments.strict_parent", false)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(&env_json, config::FileFormat::Json))
            .build()?;

        s.try_deserialize()
    }
}

fn map_env_vars(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    let mut connection_string = None;
    for (k, v) in vars {
        if k == CONNECTION_STRING_VAR {
            connection_string = Some(v);
        } else if let Some(rest) = k.strip_prefix(ENV_PREFIX) {
            map.insert(rest.replace("__", ".").to_lowercase(), v);
        }
    }
    if let Some(url) = connection_string {
        map.insert("database.url".to_string(), url);
    }
    map
}
