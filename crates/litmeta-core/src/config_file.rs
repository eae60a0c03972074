use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub contact: Option<ContactConfig>,
    pub http: Option<HttpConfig>,
    pub sources: Option<SourcesConfig>,
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactConfig {
    pub ncbi_email: Option<String>,
    pub crossref_mailto: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub disabled: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_quote_claims: Option<usize>,
    pub max_document_mb: Option<usize>,
}

/// Platform config directory path: `<config_dir>/litmeta/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("litmeta").join("config.toml"))
}

/// Load config by cascading CWD `.litmeta.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".litmeta.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        contact: Some(ContactConfig {
            ncbi_email: pick(&overlay.contact, &base.contact, |c| c.ncbi_email.clone()),
            crossref_mailto: pick(&overlay.contact, &base.contact, |c| {
                c.crossref_mailto.clone()
            }),
        }),
        http: Some(HttpConfig {
            timeout_secs: pick(&overlay.http, &base.http, |h| h.timeout_secs),
        }),
        sources: Some(SourcesConfig {
            disabled: pick(&overlay.sources, &base.sources, |s| s.disabled.clone()),
        }),
        limits: Some(LimitsConfig {
            max_quote_claims: pick(&overlay.limits, &base.limits, |l| l.max_quote_claims),
            max_document_mb: pick(&overlay.limits, &base.limits, |l| l.max_document_mb),
        }),
    }
}

impl ConfigFile {
    /// Write every value present in the file onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(ref contact) = self.contact {
            if let Some(ref email) = contact.ncbi_email {
                config.ncbi_email = Some(email.clone());
            }
            if let Some(ref mailto) = contact.crossref_mailto {
                config.crossref_mailto = Some(mailto.clone());
            }
        }
        if let Some(secs) = self.http.as_ref().and_then(|h| h.timeout_secs) {
            config.http_timeout_secs = secs;
        }
        if let Some(disabled) = self.sources.as_ref().and_then(|s| s.disabled.clone()) {
            config.disabled_sources = disabled;
        }
        if let Some(ref limits) = self.limits {
            if let Some(max) = limits.max_quote_claims {
                config.max_quote_claims = max.max(1);
            }
            if let Some(mb) = limits.max_document_mb {
                config.max_document_bytes = mb.max(1) * 1024 * 1024;
            }
        }
    }
}

/// Resolve the runtime config: defaults, then config files, then environment.
pub fn resolve() -> Config {
    let mut config = Config::default();
    load_config().apply_to(&mut config);
    config.apply_env();
    config
}
