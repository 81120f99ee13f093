use std::fs;
use std::path::Path;

use crate::error::{ProfileError, ProfileResult};
use crate::profile::ProfileSet;

/// Supported file formats for profiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
    Toml,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ProfileResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some("toml") => Ok(FileFormat::Toml),
            Some(ext) => Err(ProfileError::UnsupportedFormat(ext.to_string())),
            None => Err(ProfileError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Reads profile files and validates every section before handing them out.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileLoader;

impl ProfileLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load profiles from a file
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> ProfileResult<ProfileSet> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;

        tracing::debug!(path = %path.display(), ?format, "Loading execution profiles");
        self.parse_content(&content, format)
    }

    /// Parse profile content directly
    pub fn parse_content(&self, content: &str, format: FileFormat) -> ProfileResult<ProfileSet> {
        let set: ProfileSet = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
            FileFormat::Toml => toml::from_str(content)?,
        };
        self.validate(&set)?;
        Ok(set)
    }

    fn validate(&self, set: &ProfileSet) -> ProfileResult<()> {
        for (name, profile) in &set.profiles {
            if let Err(e) = profile.validate() {
                tracing::warn!(profile = %name, error = %e, "Rejecting execution profile");
                return Err(e);
            }
        }
        Ok(())
    }
}
