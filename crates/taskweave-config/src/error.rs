use taskweave_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid option in [{section}]: {source}")]
    Invalid {
        section: &'static str,
        #[source]
        source: ConfigError,
    },

    #[error("Profile not found: {0}")]
    MissingProfile(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl ProfileError {
    pub fn invalid(section: &'static str, source: ConfigError) -> Self {
        Self::Invalid { section, source }
    }
}

pub type ProfileResult<T> = Result<T, ProfileError>;
