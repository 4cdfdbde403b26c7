use std::{ffi::CString, io, os::unix::ffi::OsStrExt, path::Path};

use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a stderr logger filtered by the directives in the environment variable `env`.
///
/// Stdout carries the server output and must stay free of log lines.
pub fn initialize_logging(env: &str) {
    let filter = EnvFilter::try_from_env(env).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

pub fn print_startup_string(
    pkg_description: &str,
    pkg_version: &str,
    git_version: Option<&str>,
    target: &str,
    built_time: &str,
    rustc_version: &str,
) {
    let git = match git_version {
        None => String::new(),
        Some(git) => format!(" (Git information: {git})"),
    };
    info!("Starting {pkg_description}");
    info!("This is version {pkg_version}{git}, built for {target} by {rustc_version} at {built_time}");
}

/// `access(2)` for read and write permission on `path`.
pub fn check_read_write_access(path: &Path) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
    // SAFETY: c_path is a valid NUL terminated string that outlives the call
    let rc = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_of_existing_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        check_read_write_access(dir.path()).unwrap();

        let err = check_read_write_access(&dir.path().join("missing")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_access_rejects_interior_nul() {
        let err = check_read_write_access(Path::new("/tmp/zoo\0.cfg")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
