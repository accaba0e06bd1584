//! Wi-SUN border router settings and their fixed wire layout
//!
//! The settings record is the payload of `SET_CONFIG_PARAMS` frames. Field
//! order and widths below are the wire contract: strings are fixed-size and
//! NUL-padded, multi-byte integers are little-endian (the frame header stays
//! big-endian). The PHY configuration is a tagged variant occupying a fixed
//! 16-byte block (u32 tag + 12-byte variant body, zero-padded).
//!
//! | off | size | field                         |
//! |-----|------|-------------------------------|
//! | 0   | 33   | network_name                  |
//! | 33  | 1    | network_size tag              |
//! | 34  | 2    | tx_power_ddbm (i16)           |
//! | 36  | 1    | uc_dwell_interval_ms          |
//! | 37  | 4    | bc_interval_ms (u32)          |
//! | 41  | 1    | bc_dwell_interval_ms          |
//! | 42  | 65   | allowed_channels              |
//! | 107 | 44   | ipv6_prefix                   |
//! | 151 | 1    | max_neighbor_count            |
//! | 152 | 1    | max_child_count               |
//! | 153 | 2    | max_security_neighbor_count   |
//! | 155 | 1    | keychain tag                  |
//! | 156 | 1    | keychain_index                |
//! | 157 | 2    | socket_rx_buffer_size         |
//! | 159 | 4    | phy type tag (u32)            |
//! | 163 | 12   | phy variant body              |
//! | 175 | 2    | pan_id (u16)                  |

use std::fmt;
use std::io::{Cursor, Read};
use std::str::FromStr;

use byteorder::{LittleEndian, ReadBytesExt};
use serde::Serialize;

use crate::error::{AgentError, Result};

/// Maximum length of the network name, excluding the NUL terminator
pub const NETWORK_NAME_SIZE: usize = 32;
/// Maximum length of the allowed-channels spec string
pub const ALLOWED_CHANNELS_SIZE: usize = 64;
/// Maximum length of the IPv6 prefix string
pub const IPV6_PREFIX_SIZE: usize = 43;

/// Size of the PHY variant body on the wire
const PHY_BODY_SIZE: usize = 12;

/// Size of the serialized settings record
pub const SETTINGS_WIRE_SIZE: usize = (NETWORK_NAME_SIZE + 1)
    + 1 // network_size
    + 2 // tx_power_ddbm
    + 1 // uc_dwell_interval_ms
    + 4 // bc_interval_ms
    + 1 // bc_dwell_interval_ms
    + (ALLOWED_CHANNELS_SIZE + 1)
    + (IPV6_PREFIX_SIZE + 1)
    + 1 // max_neighbor_count
    + 1 // max_child_count
    + 2 // max_security_neighbor_count
    + 1 // keychain
    + 1 // keychain_index
    + 2 // socket_rx_buffer_size
    + 4 // phy type tag
    + PHY_BODY_SIZE
    + 2; // pan_id

/// Wi-SUN network size class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum NetworkSize {
    Small = 0,
    Medium = 1,
    Large = 2,
    XLarge = 3,
    Certification = 4,
}

impl NetworkSize {
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Small),
            1 => Ok(Self::Medium),
            2 => Ok(Self::Large),
            3 => Ok(Self::XLarge),
            4 => Ok(Self::Certification),
            other => Err(AgentError::InvalidPayload(format!(
                "unknown network size tag {other}"
            ))),
        }
    }
}

impl fmt::Display for NetworkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::XLarge => "xlarge",
            Self::Certification => "certification",
        };
        f.write_str(name)
    }
}

impl FromStr for NetworkSize {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            "xlarge" => Ok(Self::XLarge),
            "certification" => Ok(Self::Certification),
            other => Err(AgentError::Config(format!("unknown network size: {other}"))),
        }
    }
}

/// Wi-SUN regulatory domain
///
/// Values are assigned by the Wi-SUN specification; Australia and New
/// Zealand share one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum RegulatoryDomain {
    Ww = 0x00,
    Na = 0x01,
    Jp = 0x02,
    Eu = 0x03,
    Cn = 0x04,
    In = 0x05,
    Mx = 0x06,
    Bz = 0x07,
    AzNz = 0x08,
    Kr = 0x09,
    Ph = 0x0A,
    My = 0x0B,
    Hk = 0x0C,
    Sg = 0x0D,
    Th = 0x0E,
    Vn = 0x0F,
    Undefined = 0x10,
}

impl RegulatoryDomain {
    /// Map a wire tag; out-of-range values collapse to `Undefined`
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0x00 => Self::Ww,
            0x01 => Self::Na,
            0x02 => Self::Jp,
            0x03 => Self::Eu,
            0x04 => Self::Cn,
            0x05 => Self::In,
            0x06 => Self::Mx,
            0x07 => Self::Bz,
            0x08 => Self::AzNz,
            0x09 => Self::Kr,
            0x0A => Self::Ph,
            0x0B => Self::My,
            0x0C => Self::Hk,
            0x0D => Self::Sg,
            0x0E => Self::Th,
            0x0F => Self::Vn,
            _ => Self::Undefined,
        }
    }
}

impl fmt::Display for RegulatoryDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ww => "WW",
            Self::Na => "NA",
            Self::Jp => "JP",
            Self::Eu => "EU",
            Self::Cn => "CN",
            Self::In => "IN",
            Self::Mx => "MX",
            Self::Bz => "BZ",
            Self::AzNz => "AZ",
            Self::Kr => "KR",
            Self::Ph => "PH",
            Self::My => "MY",
            Self::Hk => "HK",
            Self::Sg => "SG",
            Self::Th => "TH",
            Self::Vn => "VN",
            Self::Undefined => "UNDEF",
        };
        f.write_str(name)
    }
}

impl FromStr for RegulatoryDomain {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WW" => Ok(Self::Ww),
            "NA" => Ok(Self::Na),
            "JP" => Ok(Self::Jp),
            "EU" => Ok(Self::Eu),
            "CN" => Ok(Self::Cn),
            "IN" => Ok(Self::In),
            "MX" => Ok(Self::Mx),
            "BZ" => Ok(Self::Bz),
            "AZ" | "NZ" => Ok(Self::AzNz),
            "KR" => Ok(Self::Kr),
            "PH" => Ok(Self::Ph),
            "MY" => Ok(Self::My),
            "HK" => Ok(Self::Hk),
            "SG" => Ok(Self::Sg),
            "TH" => Ok(Self::Th),
            "VN" => Ok(Self::Vn),
            other => Err(AgentError::Config(format!(
                "unknown regulatory domain: {other}"
            ))),
        }
    }
}

/// Key chain selection for network credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum Keychain {
    /// Automatic selection, falling back to the built-in chain
    Automatic = 0,
    Builtin = 1,
    Nvm = 2,
}

impl Keychain {
    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(Self::Automatic),
            1 => Ok(Self::Builtin),
            2 => Ok(Self::Nvm),
            other => Err(AgentError::InvalidPayload(format!(
                "unknown keychain tag {other}"
            ))),
        }
    }
}

impl fmt::Display for Keychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Automatic => "automatic",
            Self::Builtin => "builtin",
            Self::Nvm => "nvm",
        };
        f.write_str(name)
    }
}

impl FromStr for Keychain {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "automatic" => Ok(Self::Automatic),
            "builtin" => Ok(Self::Builtin),
            "nvm" => Ok(Self::Nvm),
            other => Err(AgentError::Config(format!("unknown keychain: {other}"))),
        }
    }
}

/// PHY configuration, one variant per configuration kind
///
/// Each variant maps to a fixed body inside the 16-byte PHY block on the
/// wire; unused trailing body bytes are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PhyConfig {
    /// FAN1.0 channel plan
    Fan10 {
        reg_domain: RegulatoryDomain,
        op_class: u8,
        op_mode: u8,
        fec: bool,
    },
    /// FAN1.1 channel plan
    Fan11 {
        reg_domain: RegulatoryDomain,
        chan_plan_id: u8,
        phy_mode_id: u8,
    },
    /// Explicit channel plan
    Explicit {
        ch0_frequency_khz: u32,
        number_of_channels: u16,
        channel_spacing: u8,
        phy_mode_id: u8,
    },
    /// Explicit radio configuration IDs
    Ids {
        protocol_id: u16,
        channel_id: u16,
        phy_mode_id: u8,
    },
    /// Custom FSK PHY
    CustomFsk {
        ch0_frequency_khz: u32,
        channel_spacing_khz: u16,
        number_of_channels: u16,
        phy_mode_id: u8,
        crc_type: u8,
        preamble_length: u8,
    },
    /// Custom OFDM PHY
    CustomOfdm {
        ch0_frequency_khz: u32,
        channel_spacing_khz: u16,
        number_of_channels: u16,
        phy_mode_id: u8,
        crc_type: u8,
        stf_length: u8,
    },
    /// Custom OQPSK PHY
    CustomOqpsk {
        ch0_frequency_khz: u32,
        channel_spacing_khz: u16,
        number_of_channels: u16,
        phy_mode_id: u8,
        crc_type: u8,
        preamble_length: u8,
    },
}

impl PhyConfig {
    /// Wire tag of the variant
    pub fn type_tag(&self) -> u32 {
        match self {
            Self::Fan10 { .. } => 0,
            Self::Fan11 { .. } => 1,
            Self::Explicit { .. } => 2,
            Self::Ids { .. } => 3,
            Self::CustomFsk { .. } => 4,
            Self::CustomOfdm { .. } => 5,
            Self::CustomOqpsk { .. } => 6,
        }
    }

    /// PHY mode ID, where the variant defines one
    pub fn phy_mode_id(&self) -> u8 {
        match *self {
            Self::Fan10 { .. } => 0,
            Self::Fan11 { phy_mode_id, .. }
            | Self::Explicit { phy_mode_id, .. }
            | Self::Ids { phy_mode_id, .. }
            | Self::CustomFsk { phy_mode_id, .. }
            | Self::CustomOfdm { phy_mode_id, .. }
            | Self::CustomOqpsk { phy_mode_id, .. } => phy_mode_id,
        }
    }

    /// Channel plan ID; only FAN1.1 plans carry one
    pub fn chan_plan_id(&self) -> u8 {
        match *self {
            Self::Fan11 { chan_plan_id, .. } => chan_plan_id,
            _ => 0,
        }
    }

    /// Regulatory domain, where the variant defines one
    pub fn reg_domain(&self) -> RegulatoryDomain {
        match *self {
            Self::Fan10 { reg_domain, .. } | Self::Fan11 { reg_domain, .. } => reg_domain,
            _ => RegulatoryDomain::Undefined,
        }
    }

    /// FAN version display string derived from the configuration kind
    pub fn fan_version(&self) -> &'static str {
        match self {
            Self::Fan10 { .. } => "FAN 1.0",
            Self::Fan11 { .. } => "FAN 1.1",
            Self::Explicit { .. } => "explicit",
            Self::Ids { .. } => "ids",
            Self::CustomFsk { .. } => "custom FSK",
            Self::CustomOfdm { .. } => "custom OFDM",
            Self::CustomOqpsk { .. } => "custom OQPSK",
        }
    }

    /// Serialize the variant body into a fixed zero-padded block
    fn body_to_wire(&self) -> [u8; PHY_BODY_SIZE] {
        let mut body = [0u8; PHY_BODY_SIZE];
        match *self {
            Self::Fan10 {
                reg_domain,
                op_class,
                op_mode,
                fec,
            } => {
                body[0] = reg_domain as u8;
                body[1] = op_class;
                body[2] = op_mode;
                body[3] = u8::from(fec);
            }
            Self::Fan11 {
                reg_domain,
                chan_plan_id,
                phy_mode_id,
            } => {
                body[0] = reg_domain as u8;
                body[1] = chan_plan_id;
                body[2] = phy_mode_id;
            }
            Self::Explicit {
                ch0_frequency_khz,
                number_of_channels,
                channel_spacing,
                phy_mode_id,
            } => {
                body[0..4].copy_from_slice(&ch0_frequency_khz.to_le_bytes());
                body[4..6].copy_from_slice(&number_of_channels.to_le_bytes());
                body[6] = channel_spacing;
                body[7] = phy_mode_id;
            }
            Self::Ids {
                protocol_id,
                channel_id,
                phy_mode_id,
            } => {
                body[0..2].copy_from_slice(&protocol_id.to_le_bytes());
                body[2..4].copy_from_slice(&channel_id.to_le_bytes());
                body[4] = phy_mode_id;
            }
            Self::CustomFsk {
                ch0_frequency_khz,
                channel_spacing_khz,
                number_of_channels,
                phy_mode_id,
                crc_type,
                preamble_length,
            }
            | Self::CustomOqpsk {
                ch0_frequency_khz,
                channel_spacing_khz,
                number_of_channels,
                phy_mode_id,
                crc_type,
                preamble_length,
            } => {
                body[0..4].copy_from_slice(&ch0_frequency_khz.to_le_bytes());
                body[4..6].copy_from_slice(&channel_spacing_khz.to_le_bytes());
                body[6..8].copy_from_slice(&number_of_channels.to_le_bytes());
                body[8] = phy_mode_id;
                body[9] = crc_type;
                body[10] = preamble_length;
            }
            Self::CustomOfdm {
                ch0_frequency_khz,
                channel_spacing_khz,
                number_of_channels,
                phy_mode_id,
                crc_type,
                stf_length,
            } => {
                body[0..4].copy_from_slice(&ch0_frequency_khz.to_le_bytes());
                body[4..6].copy_from_slice(&channel_spacing_khz.to_le_bytes());
                body[6..8].copy_from_slice(&number_of_channels.to_le_bytes());
                body[8] = phy_mode_id;
                body[9] = crc_type;
                body[10] = stf_length;
            }
        }
        body
    }

    /// Deserialize a variant from its tag and fixed body block
    fn from_wire(tag: u32, body: &[u8; PHY_BODY_SIZE]) -> Result<Self> {
        let mut cursor = Cursor::new(&body[..]);
        match tag {
            0 => Ok(Self::Fan10 {
                reg_domain: RegulatoryDomain::from_tag(cursor.read_u8()?),
                op_class: cursor.read_u8()?,
                op_mode: cursor.read_u8()?,
                fec: cursor.read_u8()? != 0,
            }),
            1 => Ok(Self::Fan11 {
                reg_domain: RegulatoryDomain::from_tag(cursor.read_u8()?),
                chan_plan_id: cursor.read_u8()?,
                phy_mode_id: cursor.read_u8()?,
            }),
            2 => Ok(Self::Explicit {
                ch0_frequency_khz: cursor.read_u32::<LittleEndian>()?,
                number_of_channels: cursor.read_u16::<LittleEndian>()?,
                channel_spacing: cursor.read_u8()?,
                phy_mode_id: cursor.read_u8()?,
            }),
            3 => Ok(Self::Ids {
                protocol_id: cursor.read_u16::<LittleEndian>()?,
                channel_id: cursor.read_u16::<LittleEndian>()?,
                phy_mode_id: cursor.read_u8()?,
            }),
            4 => Ok(Self::CustomFsk {
                ch0_frequency_khz: cursor.read_u32::<LittleEndian>()?,
                channel_spacing_khz: cursor.read_u16::<LittleEndian>()?,
                number_of_channels: cursor.read_u16::<LittleEndian>()?,
                phy_mode_id: cursor.read_u8()?,
                crc_type: cursor.read_u8()?,
                preamble_length: cursor.read_u8()?,
            }),
            5 => Ok(Self::CustomOfdm {
                ch0_frequency_khz: cursor.read_u32::<LittleEndian>()?,
                channel_spacing_khz: cursor.read_u16::<LittleEndian>()?,
                number_of_channels: cursor.read_u16::<LittleEndian>()?,
                phy_mode_id: cursor.read_u8()?,
                crc_type: cursor.read_u8()?,
                stf_length: cursor.read_u8()?,
            }),
            6 => Ok(Self::CustomOqpsk {
                ch0_frequency_khz: cursor.read_u32::<LittleEndian>()?,
                channel_spacing_khz: cursor.read_u16::<LittleEndian>()?,
                number_of_channels: cursor.read_u16::<LittleEndian>()?,
                phy_mode_id: cursor.read_u8()?,
                crc_type: cursor.read_u8()?,
                preamble_length: cursor.read_u8()?,
            }),
            other => Err(AgentError::InvalidPayload(format!(
                "unknown PHY config type tag {other}"
            ))),
        }
    }
}

/// The Wi-SUN network configuration the SoC should run with
///
/// Replaced wholesale on every update, never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub network_name: String,
    pub network_size: NetworkSize,
    pub tx_power_ddbm: i16,
    pub uc_dwell_interval_ms: u8,
    pub bc_interval_ms: u32,
    pub bc_dwell_interval_ms: u8,
    pub allowed_channels: String,
    pub ipv6_prefix: String,
    pub max_neighbor_count: u8,
    pub max_child_count: u8,
    pub max_security_neighbor_count: u16,
    pub keychain: Keychain,
    pub keychain_index: u8,
    pub socket_rx_buffer_size: u16,
    pub phy: PhyConfig,
    pub pan_id: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            network_name: "Wi-SUN Network".to_string(),
            network_size: NetworkSize::Small,
            tx_power_ddbm: 0,
            uc_dwell_interval_ms: 0,
            bc_interval_ms: 0,
            bc_dwell_interval_ms: 0,
            allowed_channels: String::new(),
            ipv6_prefix: String::new(),
            max_neighbor_count: 0,
            max_child_count: 0,
            max_security_neighbor_count: 0,
            keychain: Keychain::Automatic,
            keychain_index: 0,
            socket_rx_buffer_size: 0,
            phy: PhyConfig::Fan11 {
                reg_domain: RegulatoryDomain::Na,
                chan_plan_id: 1,
                phy_mode_id: 2,
            },
            pan_id: 0x1234,
        }
    }
}

impl Settings {
    /// Serialize into the fixed wire layout (exactly [`SETTINGS_WIRE_SIZE`] bytes)
    ///
    /// Strings longer than their fixed field are cut at the field boundary.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SETTINGS_WIRE_SIZE);
        write_padded_str(&mut buf, &self.network_name, NETWORK_NAME_SIZE + 1);
        buf.push(self.network_size as u8);
        buf.extend_from_slice(&self.tx_power_ddbm.to_le_bytes());
        buf.push(self.uc_dwell_interval_ms);
        buf.extend_from_slice(&self.bc_interval_ms.to_le_bytes());
        buf.push(self.bc_dwell_interval_ms);
        write_padded_str(&mut buf, &self.allowed_channels, ALLOWED_CHANNELS_SIZE + 1);
        write_padded_str(&mut buf, &self.ipv6_prefix, IPV6_PREFIX_SIZE + 1);
        buf.push(self.max_neighbor_count);
        buf.push(self.max_child_count);
        buf.extend_from_slice(&self.max_security_neighbor_count.to_le_bytes());
        buf.push(self.keychain as u8);
        buf.push(self.keychain_index);
        buf.extend_from_slice(&self.socket_rx_buffer_size.to_le_bytes());
        buf.extend_from_slice(&self.phy.type_tag().to_le_bytes());
        buf.extend_from_slice(&self.phy.body_to_wire());
        buf.extend_from_slice(&self.pan_id.to_le_bytes());
        debug_assert_eq!(buf.len(), SETTINGS_WIRE_SIZE);
        buf
    }

    /// Deserialize from the fixed wire layout
    ///
    /// The payload must be exactly [`SETTINGS_WIRE_SIZE`] bytes; anything
    /// else is rejected before any field is read.
    pub fn from_wire(payload: &[u8]) -> Result<Self> {
        if payload.len() != SETTINGS_WIRE_SIZE {
            return Err(AgentError::InvalidPayload(format!(
                "settings payload must be {} bytes, got {}",
                SETTINGS_WIRE_SIZE,
                payload.len()
            )));
        }

        let mut cursor = Cursor::new(payload);
        let network_name = read_padded_str(&mut cursor, NETWORK_NAME_SIZE + 1)?;
        let network_size = NetworkSize::from_tag(cursor.read_u8()?)?;
        let tx_power_ddbm = cursor.read_i16::<LittleEndian>()?;
        let uc_dwell_interval_ms = cursor.read_u8()?;
        let bc_interval_ms = cursor.read_u32::<LittleEndian>()?;
        let bc_dwell_interval_ms = cursor.read_u8()?;
        let allowed_channels = read_padded_str(&mut cursor, ALLOWED_CHANNELS_SIZE + 1)?;
        let ipv6_prefix = read_padded_str(&mut cursor, IPV6_PREFIX_SIZE + 1)?;
        let max_neighbor_count = cursor.read_u8()?;
        let max_child_count = cursor.read_u8()?;
        let max_security_neighbor_count = cursor.read_u16::<LittleEndian>()?;
        let keychain = Keychain::from_tag(cursor.read_u8()?)?;
        let keychain_index = cursor.read_u8()?;
        let socket_rx_buffer_size = cursor.read_u16::<LittleEndian>()?;
        let phy_tag = cursor.read_u32::<LittleEndian>()?;
        let mut phy_body = [0u8; PHY_BODY_SIZE];
        cursor.read_exact(&mut phy_body)?;
        let phy = PhyConfig::from_wire(phy_tag, &phy_body)?;
        let pan_id = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            network_name,
            network_size,
            tx_power_ddbm,
            uc_dwell_interval_ms,
            bc_interval_ms,
            bc_dwell_interval_ms,
            allowed_channels,
            ipv6_prefix,
            max_neighbor_count,
            max_child_count,
            max_security_neighbor_count,
            keychain,
            keychain_index,
            socket_rx_buffer_size,
            phy,
            pan_id,
        })
    }
}

/// Append a string as a fixed-size NUL-padded field
fn write_padded_str(buf: &mut Vec<u8>, value: &str, field_size: usize) {
    let bytes = value.as_bytes();
    let len = bytes.len().min(field_size - 1);
    buf.extend_from_slice(&bytes[..len]);
    buf.resize(buf.len() + (field_size - len), 0);
}

/// Read a fixed-size NUL-padded string field
fn read_padded_str(cursor: &mut Cursor<&[u8]>, field_size: usize) -> Result<String> {
    let mut field = vec![0u8; field_size];
    cursor.read_exact(&mut field)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(String::from_utf8_lossy(&field[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn phy_variants() -> Vec<PhyConfig> {
        vec![
            PhyConfig::Fan10 {
                reg_domain: RegulatoryDomain::Eu,
                op_class: 2,
                op_mode: 3,
                fec: true,
            },
            PhyConfig::Fan11 {
                reg_domain: RegulatoryDomain::Na,
                chan_plan_id: 1,
                phy_mode_id: 2,
            },
            PhyConfig::Explicit {
                ch0_frequency_khz: 902_200,
                number_of_channels: 129,
                channel_spacing: 0,
                phy_mode_id: 2,
            },
            PhyConfig::Ids {
                protocol_id: 0x1234,
                channel_id: 7,
                phy_mode_id: 5,
            },
            PhyConfig::CustomFsk {
                ch0_frequency_khz: 863_100,
                channel_spacing_khz: 100,
                number_of_channels: 69,
                phy_mode_id: 1,
                crc_type: 0,
                preamble_length: 56,
            },
            PhyConfig::CustomOfdm {
                ch0_frequency_khz: 863_100,
                channel_spacing_khz: 200,
                number_of_channels: 35,
                phy_mode_id: 84,
                crc_type: 1,
                stf_length: 4,
            },
            PhyConfig::CustomOqpsk {
                ch0_frequency_khz: 868_300,
                channel_spacing_khz: 400,
                number_of_channels: 17,
                phy_mode_id: 96,
                crc_type: 1,
                preamble_length: 32,
            },
        ]
    }

    #[test]
    fn test_wire_size_constant() {
        assert_eq!(SETTINGS_WIRE_SIZE, 177);
        assert_eq!(Settings::default().to_wire().len(), SETTINGS_WIRE_SIZE);
    }

    #[test]
    fn test_roundtrip_default() {
        let settings = Settings::default();
        let wire = settings.to_wire();
        assert_eq!(Settings::from_wire(&wire).unwrap(), settings);
    }

    #[test]
    fn test_roundtrip_every_phy_variant() {
        for phy in phy_variants() {
            let settings = Settings {
                phy,
                ..Settings::default()
            };
            let wire = settings.to_wire();
            let decoded = Settings::from_wire(&wire).unwrap();
            assert_eq!(decoded, settings, "variant {:?}", phy.type_tag());
            // serialization is stable byte-for-byte
            assert_eq!(decoded.to_wire(), wire);
        }
    }

    #[test]
    fn test_roundtrip_populated_record() {
        let settings = Settings {
            network_name: "Conformance BR".to_string(),
            network_size: NetworkSize::Large,
            tx_power_ddbm: -45,
            uc_dwell_interval_ms: 255,
            bc_interval_ms: 1_020,
            bc_dwell_interval_ms: 255,
            allowed_channels: "0-63".to_string(),
            ipv6_prefix: "fd12:3456::/64".to_string(),
            max_neighbor_count: 32,
            max_child_count: 22,
            max_security_neighbor_count: 1_000,
            keychain: Keychain::Nvm,
            keychain_index: 3,
            socket_rx_buffer_size: 4_096,
            phy: PhyConfig::Fan11 {
                reg_domain: RegulatoryDomain::Jp,
                chan_plan_id: 33,
                phy_mode_id: 5,
            },
            pan_id: 0xABCD,
        };
        let wire = settings.to_wire();
        assert_eq!(Settings::from_wire(&wire).unwrap(), settings);
    }

    #[test]
    fn test_from_wire_rejects_wrong_length() {
        assert!(matches!(
            Settings::from_wire(&[0u8; SETTINGS_WIRE_SIZE - 1]),
            Err(AgentError::InvalidPayload(_))
        ));
        assert!(matches!(
            Settings::from_wire(&[0u8; SETTINGS_WIRE_SIZE + 1]),
            Err(AgentError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_from_wire_rejects_unknown_tags() {
        let mut wire = Settings::default().to_wire();
        wire[33] = 0xFF; // network_size tag
        assert!(matches!(
            Settings::from_wire(&wire),
            Err(AgentError::InvalidPayload(_))
        ));

        let mut wire = Settings::default().to_wire();
        wire[159] = 0xFF; // phy type tag (low byte)
        assert!(matches!(
            Settings::from_wire(&wire),
            Err(AgentError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_long_network_name_cut_at_field_boundary() {
        let settings = Settings {
            network_name: "x".repeat(NETWORK_NAME_SIZE + 10),
            ..Settings::default()
        };
        let wire = settings.to_wire();
        assert_eq!(wire.len(), SETTINGS_WIRE_SIZE);
        let decoded = Settings::from_wire(&wire).unwrap();
        assert_eq!(decoded.network_name.len(), NETWORK_NAME_SIZE);
    }

    #[test]
    fn test_phy_accessors() {
        let fan11 = PhyConfig::Fan11 {
            reg_domain: RegulatoryDomain::Eu,
            chan_plan_id: 37,
            phy_mode_id: 8,
        };
        assert_eq!(fan11.phy_mode_id(), 8);
        assert_eq!(fan11.chan_plan_id(), 37);
        assert_eq!(fan11.reg_domain(), RegulatoryDomain::Eu);
        assert_eq!(fan11.fan_version(), "FAN 1.1");

        let fsk = phy_variants()[4];
        assert_eq!(fsk.chan_plan_id(), 0);
        assert_eq!(fsk.reg_domain(), RegulatoryDomain::Undefined);
    }

    #[test]
    fn test_display_tables() {
        assert_eq!(NetworkSize::Certification.to_string(), "certification");
        assert_eq!(RegulatoryDomain::Na.to_string(), "NA");
        assert_eq!(RegulatoryDomain::from_tag(0x42), RegulatoryDomain::Undefined);
        assert_eq!("NZ".parse::<RegulatoryDomain>().unwrap(), RegulatoryDomain::AzNz);
        assert_eq!(Keychain::Nvm.to_string(), "nvm");
        assert!("tiny".parse::<NetworkSize>().is_err());
    }
}
