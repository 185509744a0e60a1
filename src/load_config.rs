/// `load_config` module: loads the site index (`content/index.yml`) and the site
/// layout into a [`SiteConfig`].
///
/// This module is the only place where user-supplied YAML is parsed and mapped
/// onto the strongly-typed values the build stage and the publish engine take.
///
/// # Responsibilities
/// - Parse the camelCase YAML index into [`SiteIndex`]
/// - Apply defaults (`ftpDir` = `""`, `ftpPort` = 21)
/// - Apply environment overrides (`BLOGSYNC_FTP_HOST`, `BLOGSYNC_FTP_USER`, `BLOGSYNC_FTP_DIR`)
/// - Derive the `content/`, `templates/` and `output/` directories below the site root
///
/// The password is never part of the configuration; it is prompted for at publish time.
///
/// # Errors
/// All errors in this module use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use blogsync_core::contract::RemoteTarget;
use blogsync_core::publish::PublishConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_FTP_PORT: u16 = 21;

fn default_ftp_port() -> u16 {
    DEFAULT_FTP_PORT
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteIndex {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ftp_host: String,
    #[serde(default)]
    pub ftp_user: String,
    #[serde(default)]
    pub ftp_dir: String,
    #[serde(default = "default_ftp_port")]
    pub ftp_port: u16,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

/// One blog post: a markdown source under `content/` rendered to `output/`.
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub title: String,
    /// Relative to the content root.
    pub source: PathBuf,
    /// Relative to the output root.
    pub output: PathBuf,
    #[serde(default)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub content_root: PathBuf,
    pub template_root: PathBuf,
    pub output_root: PathBuf,
}

impl SitePaths {
    pub fn under(root: &Path) -> Self {
        Self {
            content_root: root.join("content"),
            template_root: root.join("templates"),
            output_root: root.join("output"),
        }
    }

    pub fn default_index(&self) -> PathBuf {
        self.content_root.join("index.yml")
    }
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub index: SiteIndex,
    pub paths: SitePaths,
}

impl SiteConfig {
    pub fn remote_target(&self) -> RemoteTarget {
        RemoteTarget {
            host: self.index.ftp_host.clone(),
            port: self.index.ftp_port,
            user: self.index.ftp_user.clone(),
            dir: self.index.ftp_dir.clone(),
        }
    }

    /// Publish settings; fails when the host or user is not configured.
    pub fn publish_config(&self) -> Result<PublishConfig> {
        if self.index.ftp_host.trim().is_empty() {
            anyhow::bail!("ftpHost is not configured in the site index or BLOGSYNC_FTP_HOST");
        }
        if self.index.ftp_user.trim().is_empty() {
            anyhow::bail!("ftpUser is not configured in the site index or BLOGSYNC_FTP_USER");
        }
        Ok(PublishConfig {
            output_root: self.paths.output_root.clone(),
            target: self.remote_target(),
        })
    }
}

/// Loads the site index for the site rooted at `root`.
/// `index_path` overrides the default `content/index.yml`.
pub fn load_config(root: &Path, index_path: Option<&Path>) -> Result<SiteConfig> {
    let paths = SitePaths::under(root);
    let path_ref = index_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| paths.default_index());
    info!(config_path = ?path_ref, "Loading site index from file");

    let config_content = match fs::read_to_string(&path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read site index");
            return Err(anyhow::anyhow!(
                "Failed to read site index {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut index: SiteIndex = match serde_yaml::from_str(&config_content) {
        Ok(index) => index,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse site index YAML");
            return Err(anyhow::anyhow!("Failed to parse site index YAML: {e}"));
        }
    };

    apply_env_overrides(&mut index);

    info!(
        host = %index.ftp_host,
        user = %index.ftp_user,
        dir = %index.ftp_dir,
        entries = index.entries.len(),
        "Site index loaded"
    );
    Ok(SiteConfig { index, paths })
}

fn apply_env_overrides(index: &mut SiteIndex) {
    let overrides: [(&str, &mut String); 3] = [
        ("BLOGSYNC_FTP_HOST", &mut index.ftp_host),
        ("BLOGSYNC_FTP_USER", &mut index.ftp_user),
        ("BLOGSYNC_FTP_DIR", &mut index.ftp_dir),
    ];
    for (var, field) in overrides {
        if let Ok(value) = std::env::var(var) {
            info!(var, "Overriding site index value from environment");
            *field = value;
        }
    }
}
