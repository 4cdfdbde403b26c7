//! Prepares the data directory, `myid` and `zoo.cfg` before the server starts.
use std::{
    fs::{DirBuilder, OpenOptions},
    io::{self, Write},
    os::unix::fs::{DirBuilderExt, OpenOptionsExt},
    path::{Path, PathBuf},
};

use snafu::{ResultExt, Snafu};
use stackable_zookeeper_entrypoint_config::{Configuration, ZOOKEEPER_MYID_FILE};
use tracing::info;

use crate::utils::check_read_write_access;

const DATA_DIR_MODE: u32 = 0o755;
const FILE_MODE: u32 = 0o644;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("failed to create data directory {}", path.display()))]
    CreateDataDir { source: io::Error, path: PathBuf },

    #[snafu(display("data directory {} is not readable and writable", path.display()))]
    DataDirNotAccessible { source: io::Error, path: PathBuf },

    #[snafu(display("failed to write myid file {}", path.display()))]
    WriteMyid { source: io::Error, path: PathBuf },

    #[snafu(display("failed to write config file {}", path.display()))]
    WriteConfigFile { source: io::Error, path: PathBuf },
}

/// Where the server keeps its state and reads its configuration from.
#[derive(Clone, Debug)]
pub struct Layout {
    pub data_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Layout {
    pub fn myid_file(&self) -> PathBuf {
        self.data_dir.join(ZOOKEEPER_MYID_FILE)
    }
}

/// Creates the data directory, then writes `myid` and `zoo.cfg` as far as they apply.
///
/// Nothing is rolled back if a later step fails.
pub fn provision(config: &Configuration, layout: &Layout) -> Result<()> {
    ensure_data_dir(&layout.data_dir)?;

    if let Some(myid) = config.myid() {
        let path = layout.myid_file();
        write_file(&path, &myid).context(WriteMyidSnafu { path: &path })?;
        info!(path = %path.display(), %myid, "wrote myid");
    }

    write_config_file(&layout.config_file, &config.to_zoo_cfg(&layout.data_dir))
}

pub fn ensure_data_dir(path: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(DATA_DIR_MODE)
        .create(path)
        .context(CreateDataDirSnafu { path })?;
    check_read_write_access(path).context(DataDirNotAccessibleSnafu { path })
}

/// Overwrites `path` with `content`, but only if it already exists and is read/write accessible.
///
/// A missing or read-only file means the config is managed by someone else, which is not an
/// error.
pub fn write_config_file(path: &Path, content: &str) -> Result<()> {
    if let Err(err) = check_read_write_access(path) {
        info!(
            path = %path.display(),
            reason = %err,
            "config file is not writable, leaving it untouched"
        );
        return Ok(());
    }

    write_file(path, content).context(WriteConfigFileSnafu { path })?;
    info!(path = %path.display(), "wrote config file");
    Ok(())
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(FILE_MODE)
        .open(path)?
        .write_all(content.as_bytes())
}
