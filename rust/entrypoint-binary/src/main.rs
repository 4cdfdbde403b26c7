use std::{io, path::PathBuf};

use clap::{crate_description, crate_version, Parser};
use snafu::{ResultExt, Snafu};
use stackable_zookeeper_entrypoint_config::{
    Configuration, EnsembleMode, Environment, ZOOKEEPER_CONFIG_FILE, ZOOKEEPER_DATA_DIR,
};

use crate::{
    provision::Layout,
    server::{ServerCommand, JAVA_BINARY, ZOOKEEPER_CLASSPATH},
};

mod provision;
mod server;
mod utils;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
    pub const TARGET_PLATFORM: Option<&str> = option_env!("TARGET");
}

const LOG_ENV_VAR: &str = "ZOOKEEPER_ENTRYPOINT_LOG";

#[derive(Snafu, Debug)]
enum Error {
    #[snafu(display("failed to resolve the ZooKeeper configuration from the environment"))]
    ResolveConfiguration {
        source: stackable_zookeeper_entrypoint_config::Error,
    },

    #[snafu(display("failed to provision the ZooKeeper server"))]
    Provision { source: provision::Error },

    #[snafu(display("failed to run the ZooKeeper server"))]
    RunServer { source: server::Error },
}

/// Without a subcommand the entrypoint behaves like `run`.
#[derive(clap::Parser)]
#[clap(about, author, version, args_conflicts_with_subcommands = true)]
struct Opts {
    #[clap(subcommand)]
    cmd: Option<Command>,

    #[clap(flatten)]
    run: RunArgs,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Provision the data directory, myid and zoo.cfg, then run the ZooKeeper server
    Run(RunArgs),

    /// Print the zoo.cfg derived from the environment, without touching the filesystem
    PrintConfig(PrintConfigArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Directory holding myid and the server state
    #[clap(long, default_value = ZOOKEEPER_DATA_DIR)]
    data_dir: PathBuf,

    /// zoo.cfg to overwrite, skipped unless it already exists and is writable
    #[clap(long, default_value = ZOOKEEPER_CONFIG_FILE)]
    config_file: PathBuf,

    /// Java binary used to start the server
    #[clap(long, default_value = JAVA_BINARY)]
    java: PathBuf,

    /// Classpath of the server JVM
    #[clap(long, default_value = ZOOKEEPER_CLASSPATH)]
    classpath: String,

    #[clap(flatten)]
    ensemble: EnsembleArgs,
}

#[derive(clap::Args)]
struct PrintConfigArgs {
    /// Directory rendered as dataDir
    #[clap(long, default_value = ZOOKEEPER_DATA_DIR)]
    data_dir: PathBuf,

    #[clap(flatten)]
    ensemble: EnsembleArgs,
}

#[derive(clap::Args)]
struct EnsembleArgs {
    /// Fail instead of dropping ensemble servers that are missing a variable
    #[clap(long)]
    strict_ensemble: bool,
}

impl EnsembleArgs {
    fn mode(&self) -> EnsembleMode {
        if self.strict_ensemble {
            EnsembleMode::Strict
        } else {
            EnsembleMode::Lenient
        }
    }
}

fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    utils::initialize_logging(LOG_ENV_VAR);
    utils::print_startup_string(
        crate_description!(),
        crate_version!(),
        built_info::GIT_VERSION,
        built_info::TARGET_PLATFORM.unwrap_or("unknown target"),
        built_info::BUILT_TIME_UTC,
        built_info::RUSTC_VERSION,
    );

    let env = Environment::from_process();
    match opts.cmd.unwrap_or(Command::Run(opts.run)) {
        Command::Run(args) => run(&env, args)?,
        Command::PrintConfig(args) => {
            let config = Configuration::from_environment(&env, args.ensemble.mode())
                .context(ResolveConfigurationSnafu)?;
            print!("{}", config.to_zoo_cfg(&args.data_dir));
        }
    }

    Ok(())
}

fn run(env: &Environment, args: RunArgs) -> Result<(), Error> {
    let config = Configuration::from_environment(env, args.ensemble.mode())
        .context(ResolveConfigurationSnafu)?;

    let layout = Layout {
        data_dir: args.data_dir,
        config_file: args.config_file,
    };
    provision::provision(&config, &layout).context(ProvisionSnafu)?;

    ServerCommand::zookeeper(&args.java, &args.classpath, &layout.config_file)
        .run(&mut io::stdout().lock())
        .context(RunServerSnafu)
}
