//! Derives the configuration of a single Apache ZooKeeper server from its environment.
//!
//! The environment is the only configuration source: five scalar settings
//! (see [`Setting`]) and any number of `ZOOKEEPER_SERVER_<N>_*` peer definitions
//! (see [`ensemble`]). The result is rendered into `zoo.cfg` by [`zoo_cfg`].
use snafu::{ResultExt, Snafu};
use tracing::debug;

pub mod ensemble;
pub mod environment;
pub mod zoo_cfg;

pub use crate::{
    ensemble::{EnsembleMode, ServerEntry},
    environment::{Environment, Setting},
};

pub const ZOOKEEPER_MYID_FILE: &str = "myid";

pub const ZOOKEEPER_DATA_DIR: &str = "/zookeeper/data";
pub const ZOOKEEPER_CONFIG_FILE: &str = "/zookeeper/conf/zoo.cfg";

pub const DEFAULT_CLIENT_PORT: u16 = 2181;
pub const DEFAULT_TICK_TIME: u16 = 2000;
pub const DEFAULT_INIT_LIMIT: u16 = 10;
pub const DEFAULT_SYNC_LIMIT: u16 = 5;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("failed to resolve a server setting"))]
    ResolveSetting { source: environment::Error },

    #[snafu(display("failed to resolve the ensemble servers"))]
    ResolveEnsemble { source: ensemble::Error },
}

/// The resolved settings of one ZooKeeper server.
///
/// Built once from [`Configuration::default`] overlaid with the environment and only read
/// afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Configuration {
    pub client_port: u16,
    /// Omitted from `zoo.cfg` when zero.
    pub tick_time: u16,
    /// Omitted from `zoo.cfg` when zero.
    pub init_limit: u16,
    /// Omitted from `zoo.cfg` when zero.
    pub sync_limit: u16,
    /// The `myid` of this server, `0` if it is not part of an ensemble.
    pub server_id: u8,
    /// Complete ensemble peers, ascending by [`ServerEntry::server_id`].
    pub servers: Vec<ServerEntry>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            client_port: DEFAULT_CLIENT_PORT,
            tick_time: DEFAULT_TICK_TIME,
            init_limit: DEFAULT_INIT_LIMIT,
            sync_limit: DEFAULT_SYNC_LIMIT,
            server_id: 0,
            servers: Vec::new(),
        }
    }
}

impl Configuration {
    /// Resolves all settings from `env`.
    ///
    /// Either every setting resolves or an error is returned, there is no partially applied
    /// configuration.
    pub fn from_environment(env: &Environment, mode: EnsembleMode) -> Result<Self> {
        let defaults = Self::default();

        let client_port = env
            .setting(Setting::ClientPort)
            .context(ResolveSettingSnafu)?
            .unwrap_or(defaults.client_port);
        let tick_time = env
            .setting(Setting::TickTime)
            .context(ResolveSettingSnafu)?
            .unwrap_or(defaults.tick_time);
        let init_limit = env
            .setting(Setting::InitLimit)
            .context(ResolveSettingSnafu)?
            .unwrap_or(defaults.init_limit);
        let sync_limit = env
            .setting(Setting::SyncLimit)
            .context(ResolveSettingSnafu)?
            .unwrap_or(defaults.sync_limit);
        let server_id = env
            .setting(Setting::ServerId)
            .context(ResolveSettingSnafu)?
            .unwrap_or(defaults.server_id);

        let servers = ensemble::resolve_servers(env, mode).context(ResolveEnsembleSnafu)?;

        let config = Self {
            client_port,
            tick_time,
            init_limit,
            sync_limit,
            server_id,
            servers,
        };
        debug!(?config, "resolved ZooKeeper configuration");
        Ok(config)
    }

    pub fn is_ensemble_member(&self) -> bool {
        self.server_id != 0
    }

    /// Content of the `myid` file, if this server is part of an ensemble.
    pub fn myid(&self) -> Option<String> {
        self.is_ensemble_member().then(|| self.server_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    fn resolve(entries: &[&str]) -> Result<Configuration> {
        Configuration::from_environment(
            &Environment::from_entries(entries.iter().copied()),
            EnsembleMode::Lenient,
        )
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = resolve(&["PATH=/usr/bin", "HOME=/root"]).unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.client_port, 2181);
        assert_eq!(config.tick_time, 2000);
        assert_eq!(config.init_limit, 10);
        assert_eq!(config.sync_limit, 5);
        assert_eq!(config.server_id, 0);
        assert!(config.servers.is_empty());
        assert_eq!(config.myid(), None);
    }

    #[test]
    fn test_all_scalar_settings_overridden() {
        let config = resolve(&[
            "ZOOKEEPER_CLIENT_PORT=12181",
            "ZOOKEEPER_TICK_TIME=0",
            "ZOOKEEPER_INIT_LIMIT=65535",
            "ZOOKEEPER_SYNC_LIMIT=7",
            "ZOOKEEPER_SERVER_ID=255",
        ])
        .unwrap();

        assert_eq!(config.client_port, 12181);
        assert_eq!(config.tick_time, 0);
        assert_eq!(config.init_limit, 65535);
        assert_eq!(config.sync_limit, 7);
        assert_eq!(config.server_id, 255);
        assert_eq!(config.myid().as_deref(), Some("255"));
    }

    #[rstest]
    #[case::client_port_overflow("ZOOKEEPER_CLIENT_PORT=70000")]
    #[case::tick_time_negative("ZOOKEEPER_TICK_TIME=-1")]
    #[case::init_limit_not_a_number("ZOOKEEPER_INIT_LIMIT=ten")]
    #[case::sync_limit_empty("ZOOKEEPER_SYNC_LIMIT=")]
    #[case::server_id_overflow("ZOOKEEPER_SERVER_ID=256")]
    #[case::server_id_hex("ZOOKEEPER_SERVER_ID=0x1")]
    #[case::client_port_plus_sign("ZOOKEEPER_CLIENT_PORT=+2181")]
    #[case::server_id_plus_sign("ZOOKEEPER_SERVER_ID=+1")]
    fn test_invalid_setting_fails(#[case] entry: &str) {
        let err = resolve(&["ZOOKEEPER_CLIENT_PORT=2182", entry]).unwrap_err();
        assert!(
            matches!(
                err,
                Error::ResolveSetting {
                    source: environment::Error::ParseSetting { .. }
                }
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_every_setting_has_its_own_variable() {
        let names: Vec<&str> = Setting::iter().map(Setting::variable_name).collect();
        assert_eq!(
            names,
            [
                "ZOOKEEPER_CLIENT_PORT",
                "ZOOKEEPER_TICK_TIME",
                "ZOOKEEPER_INIT_LIMIT",
                "ZOOKEEPER_SYNC_LIMIT",
                "ZOOKEEPER_SERVER_ID",
            ]
        );
    }

    #[test]
    fn test_malformed_entry_fails_resolution() {
        let err = resolve(&["ZOOKEEPER_SERVER_ID=1", "BROKEN_NO_EQUALS"]).unwrap_err();
        assert!(
            matches!(
                &err,
                Error::ResolveEnsemble {
                    source: ensemble::Error::ReadEnvironment {
                        source: environment::Error::MalformedEnvironmentEntry { name }
                    }
                } if name == "BROKEN_NO_EQUALS"
            ),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn test_servers_resolved_with_scalars() {
        let config = resolve(&[
            "ZOOKEEPER_SERVER_ID=2",
            "ZOOKEEPER_SERVER_2_ENDPOINT=zk-2",
            "ZOOKEEPER_SERVER_2_LEADER_PORT=2888",
            "ZOOKEEPER_SERVER_2_ELECTION_PORT=3888",
        ])
        .unwrap();

        assert_eq!(config.server_id, 2);
        assert_eq!(
            config.servers,
            [ServerEntry {
                server_id: 2,
                endpoint: "zk-2".to_owned(),
                leader_port: 2888,
                election_port: 3888,
            }]
        );
    }
}
