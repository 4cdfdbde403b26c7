//! A snapshot of the process environment and typed lookups of the scalar server settings.
use std::{ffi::CStr, num::ParseIntError, str::FromStr};

use snafu::{ensure, ResultExt, Snafu};
use strum::{Display, EnumIter, IntoStaticStr};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Snafu, Debug)]
pub enum Error {
    #[snafu(display("failed to parse {setting}={value:?} as an unsigned {bits} bit integer"))]
    ParseSetting {
        source: DecimalError,
        setting: Setting,
        value: String,
        bits: usize,
    },

    #[snafu(display("invalid environment variable: {name}"))]
    MalformedEnvironmentEntry { name: String },
}

#[derive(Snafu, Debug)]
pub enum DecimalError {
    #[snafu(display("not an unsigned decimal number"))]
    NotDecimal,

    #[snafu(display("number out of range"))]
    OutOfRange { source: ParseIntError },
}

/// Parses plain ASCII digits into `T`.
///
/// Signs, whitespace and the empty string are rejected, overflow is an error.
pub fn parse_decimal<T>(value: &str) -> Result<T, DecimalError>
where
    T: FromStr<Err = ParseIntError>,
{
    ensure!(
        !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()),
        NotDecimalSnafu
    );
    value.parse().context(OutOfRangeSnafu)
}

/// The scalar server settings, each read from exactly one environment variable.
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, IntoStaticStr, PartialEq)]
pub enum Setting {
    #[strum(serialize = "ZOOKEEPER_CLIENT_PORT")]
    ClientPort,
    #[strum(serialize = "ZOOKEEPER_TICK_TIME")]
    TickTime,
    #[strum(serialize = "ZOOKEEPER_INIT_LIMIT")]
    InitLimit,
    #[strum(serialize = "ZOOKEEPER_SYNC_LIMIT")]
    SyncLimit,
    #[strum(serialize = "ZOOKEEPER_SERVER_ID")]
    ServerId,
}

impl Setting {
    pub fn variable_name(self) -> &'static str {
        self.into()
    }
}

/// Raw `NAME=VALUE` entries, taken once and never modified.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    entries: Vec<String>,
}

impl Environment {
    /// Copies the raw `environ` entries, including the ones without a `=`.
    ///
    /// [`std::env::vars_os`] would skip those, so they could never be rejected.
    pub fn from_process() -> Self {
        let mut entries = Vec::new();
        // SAFETY: environ is a NULL terminated array of NUL terminated strings. The
        // environment is not modified while it is copied.
        unsafe {
            let mut entry = libc::environ;
            while !entry.is_null() && !(*entry).is_null() {
                entries.push(CStr::from_ptr(*entry).to_string_lossy().into_owned());
                entry = entry.add(1);
            }
        }
        Self { entries }
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    /// Value of the first entry called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .find(|(entry_name, _)| *entry_name == name)
            .map(|(_, value)| value)
    }

    /// Parses `setting` as a decimal integer of width `T`, returns `None` if it is not set.
    ///
    /// Values that do not fit into `T` are an error, they are never truncated.
    pub fn setting<T>(&self, setting: Setting) -> Result<Option<T>>
    where
        T: FromStr<Err = ParseIntError>,
    {
        self.get(setting.variable_name())
            .map(|value| {
                parse_decimal(value).context(ParseSettingSnafu {
                    setting,
                    value,
                    bits: std::mem::size_of::<T>() * 8,
                })
            })
            .transpose()
    }

    /// All entries split into name and value.
    ///
    /// Fails on the first entry that does not contain exactly one `=`.
    pub fn variables(&self) -> Result<Vec<(&str, &str)>> {
        self.entries.iter().map(|entry| split_entry(entry)).collect()
    }
}

fn split_entry(entry: &str) -> Result<(&str, &str)> {
    let mut parts = entry.split('=');
    let name = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (Some(value), None) => Ok((name, value)),
        _ => MalformedEnvironmentEntrySnafu { name }.fail(),
    }
}
