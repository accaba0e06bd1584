//! Startup configuration file
//!
//! The daemon reads an optional `key = value` file at startup to seed the
//! session settings before the SoC pushes its own. The format follows the
//! border router configuration files in the field: `#` and `;` start
//! comments, the network name accepts `\xNN` byte escapes, unknown keys are
//! logged and skipped so newer files still load on older daemons.

use std::path::Path;

use tracing::{info, warn};

use crate::error::{AgentError, Result};
use crate::settings::{PhyConfig, Settings};

/// Default port of the inbound service listener
pub const DEFAULT_SERVICE_PORT: u16 = 11500;

/// Default port of the SoC control link
pub const DEFAULT_SOC_PORT: u16 = 11501;

/// Load settings from a configuration file, or defaults when absent
pub fn load_or_default(path: &Path) -> Result<Settings> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("no configuration file at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(err) => return Err(err.into()),
    };
    parse(&text)
}

fn parse(text: &str) -> Result<Settings> {
    let mut settings = Settings::default();

    for (lineno, raw) in text.lines().enumerate() {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!("line {}: no '=' separator, skipped", lineno + 1);
            continue;
        };
        let key = key.trim();
        let value = value.trim();

        if let Err(err) = apply(&mut settings, key, value) {
            warn!("line {}: {err}, skipped", lineno + 1);
        }
    }

    Ok(settings)
}

fn apply(settings: &mut Settings, key: &str, value: &str) -> Result<()> {
    match key {
        "network_name" => settings.network_name = unescape(value)?,
        "size" => settings.network_size = value.parse()?,
        "tx_power_ddbm" => settings.tx_power_ddbm = parse_num(key, value)?,
        "uc_dwell_interval_ms" => settings.uc_dwell_interval_ms = parse_num(key, value)?,
        "bc_interval_ms" => settings.bc_interval_ms = parse_num(key, value)?,
        "bc_dwell_interval_ms" => settings.bc_dwell_interval_ms = parse_num(key, value)?,
        "allowed_channels" => settings.allowed_channels = value.to_string(),
        "ipv6_prefix" => settings.ipv6_prefix = value.to_string(),
        "max_neighbor_count" => settings.max_neighbor_count = parse_num(key, value)?,
        "max_child_count" => settings.max_child_count = parse_num(key, value)?,
        "max_security_neighbor_count" => {
            settings.max_security_neighbor_count = parse_num(key, value)?
        }
        "keychain" => settings.keychain = value.parse()?,
        "keychain_index" => settings.keychain_index = parse_num(key, value)?,
        "socket_rx_buffer_size" => settings.socket_rx_buffer_size = parse_num(key, value)?,
        "pan_id" => settings.pan_id = parse_num(key, value)?,
        // PHY keys only make sense against a FAN1.1 plan, the default
        "domain" => {
            let PhyConfig::Fan11 { reg_domain, .. } = &mut settings.phy else {
                return Err(AgentError::Config(format!(
                    "{key} requires a FAN 1.1 channel plan"
                )));
            };
            *reg_domain = value.parse()?;
        }
        "chan_plan_id" => {
            let PhyConfig::Fan11 { chan_plan_id, .. } = &mut settings.phy else {
                return Err(AgentError::Config(format!(
                    "{key} requires a FAN 1.1 channel plan"
                )));
            };
            *chan_plan_id = parse_num(key, value)?;
        }
        "phy_mode_id" => {
            let PhyConfig::Fan11 { phy_mode_id, .. } = &mut settings.phy else {
                return Err(AgentError::Config(format!(
                    "{key} requires a FAN 1.1 channel plan"
                )));
            };
            *phy_mode_id = parse_num(key, value)?;
        }
        other => return Err(AgentError::Config(format!("unknown key {other:?}"))),
    }
    Ok(())
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        AgentError::Config(format!("invalid value {value:?} for key {key:?}"))
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find(['#', ';']) {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Resolve `\xNN` escapes in a value
fn unescape(value: &str) -> Result<String> {
    let mut out = Vec::with_capacity(value.len());
    let mut chars = value.char_indices();
    while let Some((pos, c)) = chars.next() {
        if c != '\\' {
            let mut utf8 = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
            continue;
        }
        match chars.next() {
            Some((_, 'x')) => {
                let hex = value.get(pos + 2..pos + 4).ok_or_else(|| {
                    AgentError::Config(format!("truncated \\x escape in {value:?}"))
                })?;
                let byte = u8::from_str_radix(hex, 16).map_err(|_| {
                    AgentError::Config(format!("bad \\x escape in {value:?}"))
                })?;
                out.push(byte);
                chars.next();
                chars.next();
            }
            Some((_, '\\')) => out.push(b'\\'),
            _ => {
                return Err(AgentError::Config(format!(
                    "unknown escape sequence in {value:?}"
                )))
            }
        }
    }
    String::from_utf8(out)
        .map_err(|_| AgentError::Config(format!("escapes in {value:?} are not valid UTF-8")))
}
