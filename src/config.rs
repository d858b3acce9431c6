//! Session configuration: a plain record validated once, up front, with
//! no process-wide or global state.

use std::time::Duration;

use crate::error::{SnmpError, SnmpResult};
use crate::snmp::message::SnmpVersion;
use crate::usm::{AuthProtocol, PrivProtocol, SecurityLevel};

/// All options a `Session` needs to open a connection and, for v3,
/// authenticate and encrypt its traffic.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub version: SnmpVersion,
    pub address: String,
    pub timeout: Duration,
    pub retries: u32,
    pub message_max_size: u32,
    pub community: String,
    pub user_name: String,
    pub security_level: SecurityLevel,
    pub auth_password: String,
    pub auth_protocol: AuthProtocol,
    pub priv_password: String,
    pub priv_protocol: PrivProtocol,
    pub security_engine_id: Option<Vec<u8>>,
    pub context_engine_id: Option<Vec<u8>>,
    pub context_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            version: SnmpVersion::V2c,
            address: String::new(),
            timeout: Duration::from_secs(5),
            retries: 0,
            message_max_size: 1400,
            community: String::new(),
            user_name: String::new(),
            security_level: SecurityLevel::NoAuthNoPriv,
            auth_password: String::new(),
            auth_protocol: AuthProtocol::Md5,
            priv_password: String::new(),
            priv_protocol: PrivProtocol::Des,
            security_engine_id: None,
            context_engine_id: None,
            context_name: String::new(),
        }
    }
}

const MIN_MESSAGE_MAX_SIZE: u32 = 484;

impl SessionConfig {
    /// Checks every constraint spec.md §6 places on the option table.
    /// Called from `Session::open` before any socket is touched, so a bad
    /// config never results in network I/O.
    pub fn validate(&self) -> SnmpResult<()> {
        if self.address.is_empty() {
            return Err(SnmpError::Argument("Address is required".into()));
        }
        if self.message_max_size < MIN_MESSAGE_MAX_SIZE {
            return Err(SnmpError::Argument(format!(
                "MessageMaxSize must be at least {MIN_MESSAGE_MAX_SIZE}"
            )));
        }

        if matches!(self.version, SnmpVersion::V1 | SnmpVersion::V2c) && self.community.is_empty()
        {
            return Err(SnmpError::Argument(
                "Community is required for v1/v2c".into(),
            ));
        }

        if self.version == SnmpVersion::V3 {
            if self.user_name.is_empty() || self.user_name.len() > 32 {
                return Err(SnmpError::Argument(
                    "UserName must be 1..32 octets for v3".into(),
                ));
            }
            if self.security_level.needs_auth() && self.auth_password.len() < 8 {
                return Err(SnmpError::Argument(
                    "AuthPassword must be at least 8 octets when authentication is enabled".into(),
                ));
            }
            if self.security_level.needs_priv() && self.priv_password.len() < 8 {
                return Err(SnmpError::Argument(
                    "PrivPassword must be at least 8 octets when privacy is enabled".into(),
                ));
            }
            if let Some(engine_id) = &self.security_engine_id {
                validate_engine_id(engine_id)?;
            }
            if let Some(engine_id) = &self.context_engine_id {
                validate_engine_id(engine_id)?;
            }
        }

        Ok(())
    }
}

fn validate_engine_id(engine_id: &[u8]) -> SnmpResult<()> {
    if engine_id.len() < 5 || engine_id.len() > 32 {
        return Err(SnmpError::Argument(
            "engine ID must decode to 5..32 octets".into(),
        ));
    }
    Ok(())
}

/// Parses an engine-ID string as specified in spec.md §6: an optional
/// `0x` prefix, then a hex string decoding to 5–32 octets.
pub fn parse_engine_id(input: &str) -> SnmpResult<Vec<u8>> {
    let hex = input.strip_prefix("0x").unwrap_or(input);
    if hex.len() % 2 != 0 {
        return Err(SnmpError::Argument(
            "engine ID hex string must have an even number of digits".into(),
        ));
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| SnmpError::Argument(format!("invalid hex octet in engine ID: '{}'", &hex[i..i + 2])))
        })
        .collect::<SnmpResult<Vec<u8>>>()?;
    validate_engine_id(&bytes)?;
    Ok(bytes)
}
