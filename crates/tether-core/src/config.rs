//! Runtime configuration, built once from `TETHER_*` environment overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Every tunable the transport and the session controller read.
///
/// Built once per invocation and handed to components at construction;
/// nothing reads the environment after that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `ControlPersist` for new masters (`TETHER_PERSIST`, default `10m`).
    pub control_persist: String,
    /// Transport command, possibly with arguments (`TETHER_SSH`, default `ssh`).
    pub ssh_command: String,
    /// Port used when none is given (`TETHER_PORT`, default 22).
    pub default_port: u16,
    /// Lines returned by `logs` without an explicit count (`TETHER_LOG_LINES`, default 200).
    pub log_lines: u32,
    /// `StrictHostKeyChecking` value (`TETHER_HOST_KEY_CHECK`, default `accept-new`).
    pub host_key_checking: String,
    /// `KexAlgorithms` list (`TETHER_KEX`).
    pub kex_algorithms: Option<String>,
    /// `Ciphers` list (`TETHER_CIPHERS`).
    pub ciphers: Option<String>,
    /// `MACs` list (`TETHER_MACS`).
    pub macs: Option<String>,
    /// `ServerAliveInterval` seconds (`TETHER_ALIVE_INTERVAL`, default 15).
    pub server_alive_interval: u32,
    /// `ServerAliveCountMax` (`TETHER_ALIVE_COUNT`, default 3).
    pub server_alive_count_max: u32,
    /// Control socket directory override (`TETHER_SOCKET_DIR`).
    pub socket_dir: Option<PathBuf>,
    /// Emit JSON records instead of human lines (`TETHER_JSON`).
    pub json_output: bool,
    /// Identity file passed with `-i` (`TETHER_IDENTITY`).
    pub identity_file: Option<PathBuf>,
    /// Jump host passed with `-J` (`TETHER_JUMP`).
    pub jump_host: Option<String>,
    /// Reuse a master connection per key (`TETHER_MUX`, default on).
    ///
    /// When off every remote call opens a fresh connection and
    /// `connection_alive` is always reported as false.
    pub multiplex: bool,
    /// Remote multiplexer command (`TETHER_TMUX`, default `tmux`).
    pub tmux_command: String,
    /// Also stop the master on `close` (`TETHER_CLOSE_MASTER`).
    pub close_master: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            control_persist: "10m".into(),
            ssh_command: "ssh".into(),
            default_port: 22,
            log_lines: 200,
            host_key_checking: "accept-new".into(),
            kex_algorithms: None,
            ciphers: None,
            macs: None,
            server_alive_interval: 15,
            server_alive_count_max: 3,
            socket_dir: None,
            json_output: false,
            identity_file: None,
            jump_host: None,
            multiplex: true,
            tmux_command: "tmux".into(),
            close_master: false,
        }
    }
}

impl Config {
    /// Build from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a numeric or boolean override does not parse.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a numeric or boolean override does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("TETHER_PERSIST") {
            config.control_persist = v;
        }
        if let Some(v) = get("TETHER_SSH") {
            config.ssh_command = v;
        }
        if let Some(v) = get("TETHER_PORT") {
            config.default_port = parse_number("TETHER_PORT", &v)?;
            if config.default_port == 0 {
                return Err(Error::Config("TETHER_PORT must not be 0".into()));
            }
        }
        if let Some(v) = get("TETHER_LOG_LINES") {
            config.log_lines = parse_number("TETHER_LOG_LINES", &v)?;
            if config.log_lines == 0 {
                return Err(Error::Config("TETHER_LOG_LINES must not be 0".into()));
            }
        }
        if let Some(v) = get("TETHER_HOST_KEY_CHECK") {
            config.host_key_checking = v;
        }
        config.kex_algorithms = get("TETHER_KEX");
        config.ciphers = get("TETHER_CIPHERS");
        config.macs = get("TETHER_MACS");
        if let Some(v) = get("TETHER_ALIVE_INTERVAL") {
            config.server_alive_interval = parse_number("TETHER_ALIVE_INTERVAL", &v)?;
        }
        if let Some(v) = get("TETHER_ALIVE_COUNT") {
            config.server_alive_count_max = parse_number("TETHER_ALIVE_COUNT", &v)?;
        }
        config.socket_dir = get("TETHER_SOCKET_DIR").map(PathBuf::from);
        if let Some(v) = get("TETHER_JSON") {
            config.json_output = parse_flag("TETHER_JSON", &v)?;
        }
        config.identity_file = get("TETHER_IDENTITY").map(PathBuf::from);
        config.jump_host = get("TETHER_JUMP");
        if let Some(v) = get("TETHER_MUX") {
            config.multiplex = parse_flag("TETHER_MUX", &v)?;
        }
        if let Some(v) = get("TETHER_TMUX") {
            config.tmux_command = v;
        }
        if let Some(v) = get("TETHER_CLOSE_MASTER") {
            config.close_master = parse_flag("TETHER_CLOSE_MASTER", &v)?;
        }

        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{name}: expected a number, got `{value}`")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, Error> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{name}: expected a boolean, got `{value}`"
        ))),
    }
}
