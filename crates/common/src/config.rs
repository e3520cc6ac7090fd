use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub github: GithubConfig,
    pub survey: SurveyConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    #[serde(default = "GithubConfig::default_api_url")]
    pub api_url: String,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
}

impl GithubConfig {
    fn default_api_url() -> String {
        "https://api.github.com".to_string()
    }

    fn default_user_agent() -> String {
        "org-surveyor".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SurveyConfig {
    pub org: String,
    pub topic: String,
    #[serde(default = "SurveyConfig::default_page_size")]
    pub page_size: u32,
}

impl SurveyConfig {
    const fn default_page_size() -> u32 {
        100
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "OutputConfig::default_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
        }
    }
}

impl OutputConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from(".")
    }
}
