//! WhatsApp secrets read from a private `.env` file.
//!
//! Only `WHATSAPP_*` entries are kept; anything else in the file is skipped
//! so an `.env` shared with other tools does not leak unrelated values into
//! the SDK settings.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::config::config_dir;

/// Prefix every retained key carries.
pub const KEY_PREFIX: &str = "WHATSAPP_";

/// File name looked up inside `~/.wacloud/`.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Mode bits that must be clear: no group or world access.
const SHARED_MODE_BITS: u32 = 0o077;

/// `WHATSAPP_*` secrets keyed by env var name.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Wrap an already-loaded map. Keys outside [`KEY_PREFIX`] are dropped.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars: vars
                .into_iter()
                .filter(|(key, _)| key.starts_with(KEY_PREFIX))
                .collect(),
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Non-blank value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error when the key is absent or blank.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_owned()),
            Some(_) => Err(anyhow::anyhow!("credential {key} is blank")),
            None => Err(anyhow::anyhow!("missing required credential: {key}")),
        }
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// True when the file held no `WHATSAPP_*` entries.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Read `path` as a dotenv file.
///
/// # Errors
///
/// Returns an error if the file is missing, readable by group or others,
/// or not valid dotenv syntax.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("credentials file does not exist: {}", path.display()))?;
    check_private(path, &metadata)?;

    let entries = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?
        .collect::<Result<BTreeMap<_, _>, _>>()
        .with_context(|| format!("malformed entry in credentials file {}", path.display()))?;

    let total = entries.len();
    let credentials = Credentials::from_map(entries);
    debug!(
        path = %path.display(),
        kept = credentials.len(),
        skipped = total.saturating_sub(credentials.len()),
        "credentials loaded"
    );
    Ok(credentials)
}

/// Read `~/.wacloud/.env`. A missing file yields empty credentials.
///
/// # Errors
///
/// Returns an error when the home directory cannot be resolved or the file
/// exists but fails [`load_credentials`].
pub fn load_default_credentials() -> anyhow::Result<Credentials> {
    let path = config_dir()?.join(DEFAULT_ENV_FILE);
    if path.exists() {
        load_credentials(&path)
    } else {
        debug!(path = %path.display(), "no credentials file");
        Ok(Credentials::default())
    }
}

/// Set `path` to mode 0600. No-op off unix.
///
/// # Errors
///
/// Returns an error if permissions cannot be updated.
#[cfg(unix)]
pub fn enforce_private_file_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("failed to set permissions on {}", path.display()))
}

/// Set `path` to mode 0600. No-op off unix.
///
/// # Errors
///
/// Never fails on this platform.
#[cfg(not(unix))]
pub fn enforce_private_file_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

/// Whether `mode` grants nothing to group or others.
pub fn is_private_mode(mode: u32) -> bool {
    mode & SHARED_MODE_BITS == 0
}

#[cfg(unix)]
fn check_private(path: &Path, metadata: &fs::Metadata) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    if is_private_mode(mode) {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {mode:o}",
            path.display()
        ))
    }
}

#[cfg(not(unix))]
fn check_private(_path: &Path, _metadata: &fs::Metadata) -> anyhow::Result<()> {
    Ok(())
}
