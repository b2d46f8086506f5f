//! Installation files: the extension set a CLI run resolves against.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tplns_core::{DiscoveryError, ExtensionManifest, StaticExtensionDiscovery};

#[derive(Debug, Deserialize)]
pub struct Installation {
    /// Installation root; a relative root is taken from the file's directory.
    pub root: PathBuf,
    pub active_theme: String,
    #[serde(default)]
    pub extensions: Vec<InstalledExtension>,
}

#[derive(Debug, Deserialize)]
pub struct InstalledExtension {
    /// Install path, absolute or relative to the root.
    pub path: PathBuf,
    #[serde(flatten)]
    pub manifest: ExtensionManifest,
}

#[derive(Debug)]
pub enum InstallationError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: serde_json::Error },
    Register(DiscoveryError),
}

impl Display for InstallationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read installation `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "cannot parse installation `{}`: {source}", path.display())
            }
            Self::Register(err) => write!(f, "{err}"),
        }
    }
}

impl Error for InstallationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Register(err) => Some(err),
        }
    }
}

impl From<DiscoveryError> for InstallationError {
    fn from(value: DiscoveryError) -> Self {
        Self::Register(value)
    }
}

impl Installation {
    pub fn load(path: &Path) -> Result<Self, InstallationError> {
        let raw = std::fs::read_to_string(path).map_err(|source| InstallationError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut installation: Installation =
            serde_json::from_str(&raw).map_err(|source| InstallationError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        if installation.root.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            installation.root = base.join(&installation.root);
        }
        Ok(installation)
    }

    /// Registers every extension, in file order.
    pub fn discovery(self) -> Result<StaticExtensionDiscovery, InstallationError> {
        let mut discovery = StaticExtensionDiscovery::new();
        for extension in self.extensions {
            discovery.register(extension.manifest, &extension.path)?;
        }
        Ok(discovery)
    }
}
