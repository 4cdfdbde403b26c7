//! Assembles the ensemble peers from the `ZOOKEEPER_SERVER_<N>_*` variables.
//!
//! Every peer `N` is described by three variables:
//!
//! * `ZOOKEEPER_SERVER_<N>_ENDPOINT`
//! * `ZOOKEEPER_SERVER_<N>_LEADER_PORT`
//! * `ZOOKEEPER_SERVER_<N>_ELECTION_PORT`
//!
//! `N` is the `myid` of the peer and has to fit into 8 bits.
use std::collections::BTreeMap;

use snafu::{ResultExt, Snafu};
use strum::EnumString;
use tracing::{debug, warn};

use crate::environment::{self, parse_decimal, DecimalError, Environment, Setting};

pub const SERVER_VARIABLE_PREFIX: &str = "ZOOKEEPER_SERVER_";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("failed to read the environment"))]
    ReadEnvironment { source: environment::Error },

    #[snafu(display(
        "failed to parse the server index of {variable} as an unsigned 8 bit integer"
    ))]
    ParsePeerIndex {
        source: DecimalError,
        variable: String,
    },

    #[snafu(display("failed to parse {variable}={value:?} as an unsigned 16 bit integer"))]
    ParsePeerPort {
        source: DecimalError,
        variable: String,
        value: String,
    },

    #[snafu(display(
        "server {server_id} is missing its endpoint, leader port or election port"
    ))]
    IncompletePeer { server_id: u8 },
}

/// How to treat peers that are missing one of their three variables.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnsembleMode {
    /// Incomplete peers are dropped.
    #[default]
    Lenient,
    /// Incomplete peers are an [`Error::IncompletePeer`].
    Strict,
}

/// One ensemble peer, rendered as `server.<server_id>=<endpoint>:<leader_port>:<election_port>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ServerEntry {
    pub server_id: u8,
    pub endpoint: String,
    pub leader_port: u16,
    pub election_port: u16,
}

#[derive(Clone, Copy, Debug, EnumString, Eq, PartialEq)]
enum PeerField {
    #[strum(serialize = "ENDPOINT")]
    Endpoint,
    #[strum(serialize = "LEADER_PORT")]
    LeaderPort,
    #[strum(serialize = "ELECTION_PORT")]
    ElectionPort,
}

#[derive(Debug, Default)]
struct PartialPeer {
    endpoint: Option<String>,
    leader_port: Option<u16>,
    election_port: Option<u16>,
}

impl PartialPeer {
    /// An empty endpoint or a zero port counts as missing.
    fn complete(self, server_id: u8) -> Option<ServerEntry> {
        Some(ServerEntry {
            server_id,
            endpoint: self.endpoint.filter(|endpoint| !endpoint.is_empty())?,
            leader_port: self.leader_port.filter(|port| *port != 0)?,
            election_port: self.election_port.filter(|port| *port != 0)?,
        })
    }
}

/// Splits `ZOOKEEPER_SERVER_<N>_<FIELD>` into the still unparsed `N` and the field.
fn parse_peer_variable(name: &str) -> Option<(&str, PeerField)> {
    let (index, field) = name
        .strip_prefix(SERVER_VARIABLE_PREFIX)?
        .split_once('_')?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((index, field.parse().ok()?))
}

fn parse_port(variable: &str, value: &str) -> Result<u16> {
    parse_decimal(value).context(ParsePeerPortSnafu { variable, value })
}

/// Collects the ensemble peers defined in `env`, ascending by server id.
///
/// Every entry of `env` is validated, including the ones unrelated to ZooKeeper.
pub fn resolve_servers(env: &Environment, mode: EnsembleMode) -> Result<Vec<ServerEntry>> {
    let mut peers = BTreeMap::<u8, PartialPeer>::new();

    for (name, value) in env.variables().context(ReadEnvironmentSnafu)? {
        let is_own_server_id = name == Setting::ServerId.variable_name();
        if !name.starts_with(SERVER_VARIABLE_PREFIX) || is_own_server_id {
            continue;
        }
        let Some((index, field)) = parse_peer_variable(name) else {
            debug!(variable = name, "ignoring unknown server variable");
            continue;
        };
        let server_id: u8 =
            parse_decimal(index).context(ParsePeerIndexSnafu { variable: name })?;

        let peer = peers.entry(server_id).or_default();
        match field {
            PeerField::Endpoint => peer.endpoint = Some(value.to_owned()),
            PeerField::LeaderPort => peer.leader_port = Some(parse_port(name, value)?),
            PeerField::ElectionPort => peer.election_port = Some(parse_port(name, value)?),
        }
    }

    // BTreeMap iteration is already ascending by server id
    let mut servers = Vec::with_capacity(peers.len());
    for (server_id, peer) in peers {
        match (peer.complete(server_id), mode) {
            (Some(server), _) => servers.push(server),
            (None, EnsembleMode::Strict) => return IncompletePeerSnafu { server_id }.fail(),
            (None, EnsembleMode::Lenient) => {
                warn!(server_id, "dropping incomplete ensemble peer");
            }
        }
    }

    Ok(servers)
}
