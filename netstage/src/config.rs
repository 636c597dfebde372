//! Run configuration.
//!
//! Everything a fleet run needs comes from one [`RunConfig`] value, usually
//! loaded from YAML:
//!
//! ```yaml
//! devices: [192.168.86.52, 192.168.86.53]
//! credentials:
//!   username: admin
//!   password: cisco
//! template:
//!   dir: templates
//!   name: full_config.hbs
//! output:
//!   dir: intended_config
//!   file: config.txt
//! timeouts:
//!   commit: 180
//! failure_policy: isolate
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::fleet::Stage;
use crate::render::VariableTree;
use crate::transport::HostKeyVerification;

/// What the orchestrator does when a device fails a stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the whole run at the first failure.
    #[default]
    Abort,

    /// Mark the device failed and keep going with the rest.
    Isolate,
}

/// Login credentials shared by every device in the fleet.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub username: String,

    #[serde(deserialize_with = "secret_string")]
    pub password: SecretString,

    /// Privileged-mode secret; the password is used when absent.
    #[serde(default, deserialize_with = "optional_secret_string")]
    pub secret: Option<SecretString>,
}

impl Credentials {
    /// Credentials with no separate secret.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            secret: None,
        }
    }

    /// Set an explicit privileged-mode secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::from(secret.into()));
        self
    }

    /// The secret to use: explicit if given, otherwise the password.
    pub fn effective_secret(&self) -> SecretString {
        self.secret
            .clone()
            .unwrap_or_else(|| self.password.clone())
    }
}

fn secret_string<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn optional_secret_string<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|s| !s.is_empty())
        .map(SecretString::from))
}

/// Template directory and file name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateSource {
    pub dir: PathBuf,
    pub name: String,
}

/// A directory plus file name, relative to the run's base directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileLocation {
    pub dir: PathBuf,
    pub file: String,
}

impl FileLocation {
    /// A file `file` inside `dir`.
    pub fn new(dir: impl Into<PathBuf>, file: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            file: file.into(),
        }
    }
}

fn default_variables_file() -> FileLocation {
    FileLocation::new("j2_vars", "ios.yml")
}

fn default_output() -> FileLocation {
    FileLocation::new("intended_config", "config.txt")
}

fn default_port() -> u16 {
    22
}

/// Per-stage timeouts in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    pub probe: u64,
    pub connect: u64,
    pub stage: u64,
    pub commit: u64,
    pub readback: u64,
    pub close: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe: 60,
            connect: 30,
            stage: 60,
            commit: 120,
            readback: 60,
            close: 10,
        }
    }
}

impl Timeouts {
    /// Bound for one collaborator call in `stage`.
    ///
    /// `None` for [`Stage::Resolve`], which makes no device call.
    pub fn for_stage(&self, stage: Stage) -> Option<Duration> {
        let secs = match stage {
            Stage::Detect => self.probe,
            Stage::Resolve => return None,
            Stage::Connect => self.connect,
            Stage::Stage => self.stage,
            Stage::Commit => self.commit,
            Stage::Verify => self.readback,
        };
        Some(Duration::from_secs(secs))
    }

    /// Bound for closing one session.
    pub fn close(&self) -> Duration {
        Duration::from_secs(self.close)
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("probe", self.probe),
            ("connect", self.connect),
            ("stage", self.stage),
            ("commit", self.commit),
            ("readback", self.readback),
            ("close", self.close),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, secs)| *secs == 0) {
            return Err(Error::Config {
                message: format!("timeouts.{name} must be greater than zero"),
            });
        }
        Ok(())
    }
}

/// Inputs of one fleet run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Device addresses, in fleet order.
    pub devices: Vec<String>,

    pub credentials: Credentials,

    #[serde(default = "default_port")]
    pub port: u16,

    pub template: TemplateSource,

    /// Inline variables; `variables_file` is read when absent or empty.
    #[serde(default)]
    pub variables: Option<VariableTree>,

    #[serde(default = "default_variables_file")]
    pub variables_file: FileLocation,

    #[serde(default = "default_output")]
    pub output: FileLocation,

    #[serde(default)]
    pub timeouts: Timeouts,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    #[serde(default)]
    pub host_key_verification: HostKeyVerification,

    /// Directory relative paths are resolved against.
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
}

impl RunConfig {
    /// A config with default port, paths, timeouts and policy.
    pub fn new(devices: Vec<String>, credentials: Credentials, template: TemplateSource) -> Self {
        Self {
            devices,
            credentials,
            port: default_port(),
            template,
            variables: None,
            variables_file: default_variables_file(),
            output: default_output(),
            timeouts: Timeouts::default(),
            failure_policy: FailurePolicy::default(),
            host_key_verification: HostKeyVerification::default(),
            base_dir: None,
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: RunConfig = serde_yaml::from_str(text).map_err(|e| Error::Config {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file. `base_dir` defaults to the file's directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if config.base_dir.is_none() {
            config.base_dir = path.parent().map(Path::to_path_buf);
        }
        Ok(config)
    }

    /// Check the values serde cannot.
    pub fn validate(&self) -> Result<()> {
        if let Some(pos) = self.devices.iter().position(|d| d.trim().is_empty()) {
            return Err(Error::Config {
                message: format!("devices[{pos}] is empty"),
            });
        }
        if self.credentials.username.is_empty() {
            return Err(Error::Config {
                message: "credentials.username is empty".to_string(),
            });
        }
        if self.template.name.is_empty() {
            return Err(Error::Config {
                message: "template.name is empty".to_string(),
            });
        }
        self.timeouts.validate()
    }

    /// Resolve `path` against `base_dir`; absolute paths are kept.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.base_dir {
            Some(ref base) => base.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Template directory, resolved against the base directory.
    pub fn template_dir(&self) -> PathBuf {
        self.resolve_path(&self.template.dir)
    }

    /// Variables directory, resolved against the base directory.
    pub fn variables_dir(&self) -> PathBuf {
        self.resolve_path(&self.variables_file.dir)
    }

    /// Output directory, resolved against the base directory.
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.output.dir)
    }
}
