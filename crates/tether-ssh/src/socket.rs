//! Where control sockets live and what they are called.

use std::{
    fs::DirBuilder,
    path::{Path, PathBuf},
};

use tether_core::{Config, Error, SessionKey};
use uuid::Uuid;

/// Namespace for socket identifiers; changing it orphans existing masters.
const SOCKET_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_4e0a_93d2_4b7e_a5c8_0d2e_7f31_b944);

/// Deterministic socket identifier for the connection behind `key`.
///
/// Depends only on user, host and port, so every alias on one link
/// shares a master.
#[must_use]
pub fn socket_id(key: &SessionKey) -> String {
    Uuid::new_v5(&SOCKET_NAMESPACE, key.connection_id().as_bytes())
        .simple()
        .to_string()
}

/// Control socket path for `key` inside `dir`.
#[must_use]
pub fn control_path(dir: &Path, key: &SessionKey) -> PathBuf {
    dir.join(format!("{}.sock", socket_id(key)))
}

/// Pick and create the socket directory.
///
/// Memory-backed locations are preferred over disk-backed ones; the first
/// candidate that can be created, or already exists privately owned by us,
/// wins.
///
/// # Errors
/// Returns [`Error::Io`] if no candidate directory is usable.
pub fn socket_dir(config: &Config) -> Result<PathBuf, Error> {
    first_usable(candidates(config))
}

fn first_usable(candidates: Vec<PathBuf>) -> Result<PathBuf, Error> {
    let mut last_err = None;

    for dir in candidates {
        match prepare(&dir) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "using control socket directory");
                return Ok(dir);
            }
            Err(err) => {
                tracing::debug!(dir = %dir.display(), %err, "socket directory unusable");
                last_err = Some(err);
            }
        }
    }

    Err(last_err.map_or_else(
        || Error::Config("no control socket directory candidates".into()),
        Error::Io,
    ))
}

fn candidates(config: &Config) -> Vec<PathBuf> {
    if let Some(dir) = &config.socket_dir {
        // An explicit override is never silently replaced.
        return vec![dir.clone()];
    }

    let user = local_user();
    let mut dirs = Vec::with_capacity(4);
    if let Some(runtime) = dirs::runtime_dir() {
        dirs.push(runtime.join("tether"));
    }
    let shm = Path::new("/dev/shm");
    if shm.is_dir() {
        dirs.push(shm.join(format!("tether-{user}")));
    }
    dirs.push(std::env::temp_dir().join(format!("tether-{user}")));
    if let Some(home) = dirs::home_dir() {
        dirs.push(home.join(".tether").join("sockets"));
    }
    dirs
}

fn prepare(dir: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)?;

    let meta = std::fs::metadata(dir)?;
    if meta.permissions().readonly() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "directory is read-only",
        ));
    }
    #[cfg(unix)]
    ensure_private(&meta)?;
    Ok(())
}

/// A pre-existing directory is only trusted if nobody else can plant
/// sockets in it.
#[cfg(unix)]
fn ensure_private(meta: &std::fs::Metadata) -> std::io::Result<()> {
    use std::os::unix::fs::MetadataExt;

    let euid = rustix::process::geteuid().as_raw();
    if meta.uid() != euid {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("directory is owned by uid {}, not {euid}", meta.uid()),
        ));
    }
    let mode = meta.mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("directory mode {mode:o} is open to other users"),
        ));
    }
    Ok(())
}

fn local_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .ok()
        .filter(|u| !u.is_empty() && !u.contains(std::path::MAIN_SEPARATOR))
        .unwrap_or_else(|| "user".into())
}
