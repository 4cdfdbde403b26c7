//! Runs the ZooKeeper server as a child process and relays its output.
use std::{
    ffi::OsString,
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
};

use snafu::{ensure, ResultExt, Snafu};
use tracing::{info, warn};

pub const JAVA_BINARY: &str = "/usr/bin/java";
pub const ZOOKEEPER_CLASSPATH: &str = "/zookeeper/lib/*:/zookeeper/conf";
pub const ZOOKEEPER_MAIN_CLASS: &str = "org.apache.zookeeper.server.quorum.QuorumPeerMain";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("failed to start {}", program.display()))]
    SpawnServer { source: io::Error, program: PathBuf },

    #[snafu(display("failed to relay the server output"))]
    RelayServerOutput { source: io::Error },

    #[snafu(display("failed to wait for the server to exit"))]
    WaitForServer { source: io::Error },

    #[snafu(display("server exited unsuccessfully ({status})"))]
    ServerFailed { status: ExitStatus },
}

/// A command line started with an empty environment.
#[derive(Clone, Debug)]
pub struct ServerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ServerCommand {
    pub fn new<I>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `java -cp <classpath> QuorumPeerMain <config_file>`
    pub fn zookeeper(java: &Path, classpath: &str, config_file: &Path) -> Self {
        Self::new(
            java,
            [
                OsString::from("-cp"),
                classpath.into(),
                ZOOKEEPER_MAIN_CLASS.into(),
                config_file.into(),
            ],
        )
    }

    /// Runs the command to completion, copying its stdout to `out` line by line.
    ///
    /// The child sees none of our environment variables. Its stderr is inherited.
    pub fn run(&self, out: &mut impl Write) -> Result<()> {
        info!(
            program = %self.program.display(),
            args = ?self.args,
            "starting ZooKeeper server"
        );
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context(SpawnServerSnafu {
                program: &self.program,
            })?;

        if let Err(err) = relay_stdout(&mut child, out) {
            // The child would block on a full pipe otherwise
            if let Err(kill_err) = child.kill() {
                warn!(error = %kill_err, "failed to kill server after relay failure");
            }
            child.wait().context(WaitForServerSnafu)?;
            return Err(err).context(RelayServerOutputSnafu);
        }

        let status = child.wait().context(WaitForServerSnafu)?;
        info!(%status, "ZooKeeper server exited");
        ensure!(status.success(), ServerFailedSnafu { status });
        Ok(())
    }
}

fn relay_stdout(child: &mut Child, out: &mut impl Write) -> io::Result<()> {
    let Some(stdout) = child.stdout.take() else {
        return Ok(());
    };
    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        out.write_all(&line)?;
        out.flush()?;
    }
}
