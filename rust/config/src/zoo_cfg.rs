//! Renders a [`Configuration`] into the Java properties format of `zoo.cfg`.
use std::path::Path;

use crate::{Configuration, ServerEntry};

impl Configuration {
    pub const CLIENT_PORT: &'static str = "clientPort";
    pub const DATA_DIR: &'static str = "dataDir";
    pub const INIT_LIMIT: &'static str = "initLimit";
    pub const SYNC_LIMIT: &'static str = "syncLimit";
    pub const TICK_TIME: &'static str = "tickTime";

    /// The `zoo.cfg` properties in file order.
    ///
    /// Zero valued timing settings are left out so that ZooKeeper applies its own defaults,
    /// `server.<id>` lines are only emitted for ensemble members.
    pub fn zoo_cfg_properties(&self, data_dir: &Path) -> Vec<(String, String)> {
        let mut properties = vec![
            (Self::DATA_DIR.to_owned(), data_dir.display().to_string()),
            (Self::CLIENT_PORT.to_owned(), self.client_port.to_string()),
        ];

        properties.extend(
            [
                (Self::TICK_TIME, self.tick_time),
                (Self::INIT_LIMIT, self.init_limit),
                (Self::SYNC_LIMIT, self.sync_limit),
            ]
            .into_iter()
            .filter(|(_, value)| *value != 0)
            .map(|(key, value)| (key.to_owned(), value.to_string())),
        );

        if self.is_ensemble_member() {
            properties.extend(
                self.servers
                    .iter()
                    .map(|server| (server.zoo_cfg_key(), server.zoo_cfg_value())),
            );
        }

        properties
    }

    /// Full content of `zoo.cfg`, one `key=value` per line.
    pub fn to_zoo_cfg(&self, data_dir: &Path) -> String {
        self.zoo_cfg_properties(data_dir)
            .into_iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect()
    }
}

impl ServerEntry {
    pub fn zoo_cfg_key(&self) -> String {
        format!("server.{}", self.server_id)
    }

    pub fn zoo_cfg_value(&self) -> String {
        format!(
            "{endpoint}:{leader_port}:{election_port}",
            endpoint = self.endpoint,
            leader_port = self.leader_port,
            election_port = self.election_port
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ZOOKEEPER_DATA_DIR;
    use indoc::indoc;

    fn zk_server(server_id: u8) -> ServerEntry {
        ServerEntry {
            server_id,
            endpoint: format!("zk{server_id}"),
            leader_port: 2888,
            election_port: 3888,
        }
    }

    #[test]
    fn test_standalone_without_tick_time() {
        let config = Configuration {
            tick_time: 0,
            ..Configuration::default()
        };

        assert_eq!(
            config.to_zoo_cfg(Path::new(ZOOKEEPER_DATA_DIR)),
            indoc! {"
                dataDir=/zookeeper/data
                clientPort=2181
                initLimit=10
                syncLimit=5
            "}
        );
    }

    #[test]
    fn test_ensemble_member() {
        let config = Configuration {
            server_id: 1,
            servers: vec![zk_server(1)],
            ..Configuration::default()
        };

        assert_eq!(
            config.to_zoo_cfg(Path::new(ZOOKEEPER_DATA_DIR)),
            indoc! {"
                dataDir=/zookeeper/data
                clientPort=2181
                tickTime=2000
                initLimit=10
                syncLimit=5
                server.1=zk1:2888:3888
            "}
        );
    }

    #[test]
    fn test_servers_ignored_for_standalone() {
        let config = Configuration {
            client_port: 12181,
            init_limit: 0,
            sync_limit: 0,
            servers: vec![zk_server(1), zk_server(2)],
            ..Configuration::default()
        };

        assert_eq!(
            config.to_zoo_cfg(Path::new("/var/lib/zookeeper")),
            indoc! {"
                dataDir=/var/lib/zookeeper
                clientPort=12181
                tickTime=2000
            "}
        );
    }

    #[test]
    fn test_server_lines_follow_server_order() {
        let config = Configuration {
            server_id: 3,
            servers: vec![zk_server(1), zk_server(2), zk_server(3)],
            ..Configuration::default()
        };

        let keys: Vec<String> = config
            .zoo_cfg_properties(Path::new(ZOOKEEPER_DATA_DIR))
            .into_iter()
            .map(|(key, _)| key)
            .filter(|key| key.starts_with("server."))
            .collect();
        assert_eq!(keys, ["server.1", "server.2", "server.3"]);
    }
}
