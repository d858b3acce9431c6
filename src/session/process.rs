//! Message processing: assembling an outgoing datagram from a PDU
//! (assigning a request identifier, attaching community or USM security
//! parameters, applying privacy then authentication) and disassembling a
//! received one (verifying authentication, decrypting, and checking that
//! it actually answers what was sent).

use rand::Rng;

use crate::ber::Asn1Tag;
use crate::config::SessionConfig;
use crate::error::{SnmpError, SnmpResult};
use crate::snmp::message::{
    MsgFlags, ScopedPdu, ScopedPduData, SnmpMessage, SnmpVersion, UsmSecurityParameters,
};
use crate::snmp::pdu::Pdu;
use crate::usm::{self, EngineState};

fn fresh_id() -> i32 {
    rand::thread_rng().gen_range(1..=i32::MAX)
}

pub struct OutgoingKeys<'a> {
    pub auth_key: Option<&'a [u8]>,
    pub priv_key: Option<&'a [u8]>,
}

pub struct IncomingKeys<'a> {
    pub auth_key: Option<&'a [u8]>,
    pub priv_key: Option<&'a [u8]>,
}

/// Assigns a fresh request-id (and, for v3, msgID), wraps the PDU in a
/// scoped PDU with USM security parameters, and applies privacy then
/// authentication in that order. Returns the serialized datagram plus the
/// identifiers the caller must match the response against.
pub fn prepare_outgoing_message(
    config: &SessionConfig,
    engine_state: Option<&mut EngineState>,
    keys: OutgoingKeys,
    mut pdu: Pdu,
) -> SnmpResult<(Vec<u8>, i32, Option<i32>)> {
    let request_id = fresh_id();
    pdu.set_request_id(request_id);

    match config.version {
        SnmpVersion::V1 | SnmpVersion::V2c => {
            let message = SnmpMessage::Community {
                version: config.version,
                community: config.community.as_bytes().to_vec(),
                pdu,
            };
            Ok((message.to_bytes(), request_id, None))
        }
        SnmpVersion::V3 => {
            let msg_id = fresh_id();
            let engine_state = engine_state.ok_or_else(|| {
                SnmpError::Argument("v3 operations require engine discovery first".into())
            })?;

            let context_engine_id = config
                .context_engine_id
                .clone()
                .unwrap_or_else(|| engine_state.engine_id.clone());
            let scoped_pdu = ScopedPdu {
                context_engine_id,
                context_name: config.context_name.as_bytes().to_vec(),
                pdu,
            };

            let needs_priv = config.security_level.needs_priv();
            let needs_auth = config.security_level.needs_auth();

            let (scoped_pdu_data, priv_params) = if needs_priv {
                let priv_key = keys
                    .priv_key
                    .ok_or_else(|| SnmpError::Argument("no privacy key configured".into()))?;
                let salt_counter = engine_state.next_salt();
                let (ciphertext, salt) = usm::privacy::encrypt(
                    config.priv_protocol,
                    priv_key,
                    engine_state.engine_boots,
                    engine_state.projected_time(),
                    salt_counter,
                    &scoped_pdu.to_bytes(),
                )?;
                (ScopedPduData::Encrypted(ciphertext), salt)
            } else {
                (ScopedPduData::Plaintext(scoped_pdu), Vec::new())
            };

            let security_parameters = UsmSecurityParameters {
                authoritative_engine_id: engine_state.engine_id.clone(),
                authoritative_engine_boots: engine_state.engine_boots,
                authoritative_engine_time: engine_state.projected_time(),
                user_name: config.user_name.as_bytes().to_vec(),
                authentication_parameters: if needs_auth { vec![0u8; 12] } else { Vec::new() },
                privacy_parameters: priv_params,
            };

            let message = SnmpMessage::V3 {
                msg_id,
                msg_max_size: config.message_max_size as i32,
                flags: MsgFlags {
                    auth: needs_auth,
                    priv_: needs_priv,
                    reportable: true,
                },
                security_parameters,
                scoped_pdu: scoped_pdu_data,
            };

            let mut bytes = message.to_bytes();
            if needs_auth {
                let auth_key = keys.auth_key.ok_or_else(|| {
                    SnmpError::Argument("no authentication key configured".into())
                })?;
                usm::auth::sign(config.auth_protocol, auth_key, &mut bytes)?;
            }

            Ok((bytes, request_id, Some(msg_id)))
        }
    }
}

/// Decodes a received datagram, verifies authentication and decrypts if
/// privacy is in effect, checks it against the engine-time replay window,
/// and returns the enclosed PDU after confirming it answers the request
/// the caller sent.
pub fn prepare_data_elements(
    config: &SessionConfig,
    engine_state: Option<&mut EngineState>,
    keys: IncomingKeys,
    sent_request_id: i32,
    sent_msg_id: Option<i32>,
    raw: &[u8],
) -> SnmpResult<Pdu> {
    match crate::snmp::message::parse_message(raw)? {
        SnmpMessage::Community { version, pdu, .. } => {
            if version != config.version {
                return Err(SnmpError::Message(
                    "unexpected SNMP version in response".into(),
                ));
            }
            check_request_id(&pdu, sent_request_id)?;
            Ok(pdu)
        }
        SnmpMessage::V3 {
            msg_id,
            flags,
            security_parameters,
            scoped_pdu,
            ..
        } => {
            if Some(msg_id) != sent_msg_id {
                return Err(SnmpError::Message("msgID mismatch in response".into()));
            }

            let engine_state = engine_state
                .ok_or_else(|| SnmpError::Message("no engine state for v3 response".into()))?;

            if flags.auth {
                let auth_key = keys.auth_key.ok_or_else(|| {
                    SnmpError::Argument("no authentication key configured".into())
                })?;
                usm::auth::verify(
                    config.auth_protocol,
                    auth_key,
                    raw,
                    &security_parameters.authentication_parameters,
                )?;
                engine_state.check_time_window(
                    security_parameters.authoritative_engine_boots,
                    security_parameters.authoritative_engine_time,
                )?;
            }

            let scoped_pdu = match scoped_pdu {
                ScopedPduData::Plaintext(sp) => sp,
                ScopedPduData::Encrypted(ciphertext) => {
                    let priv_key = keys.priv_key.ok_or_else(|| {
                        SnmpError::Argument("no privacy key configured".into())
                    })?;
                    let plaintext = usm::privacy::decrypt(
                        config.priv_protocol,
                        priv_key,
                        security_parameters.authoritative_engine_boots,
                        security_parameters.authoritative_engine_time,
                        &security_parameters.privacy_parameters,
                        &ciphertext,
                    )?;
                    ScopedPdu::parse(&plaintext)?
                }
            };

            engine_state.observe(
                security_parameters.authoritative_engine_boots,
                security_parameters.authoritative_engine_time,
            );

            let pdu = scoped_pdu.pdu;
            check_report(&pdu)?;
            check_request_id(&pdu, sent_request_id)?;
            Ok(pdu)
        }
    }
}

fn check_request_id(pdu: &Pdu, sent_request_id: i32) -> SnmpResult<()> {
    match pdu.request_id() {
        Some(id) if id == sent_request_id => Ok(()),
        Some(_) => Err(SnmpError::Message("request-id mismatch in response".into())),
        None => Ok(()),
    }
}

const USM_STATS_NOT_IN_TIME_WINDOWS: &str = "1.3.6.1.6.3.15.1.1.2.0";

/// A Report PDU isn't an ordinary response: its sole varbind names the
/// usmStats* counter that explains why the request was rejected.
fn check_report(pdu: &Pdu) -> SnmpResult<()> {
    if pdu.pdu_type() != Asn1Tag::Report {
        return Ok(());
    }
    let varbind = pdu.varbinds().first();
    match varbind {
        Some(vb) if vb.oid.to_string() == USM_STATS_NOT_IN_TIME_WINDOWS => {
            Err(SnmpError::NotInTimeWindow)
        }
        Some(vb) => Err(SnmpError::Response {
            oid: Some(vb.oid.clone()),
        }),
        None => Err(SnmpError::Response { oid: None }),
    }
}

/// Builds the empty-identity, unauthenticated, reportable probe used to
/// discover a v3 agent's engineID/engineBoots/engineTime (RFC 3414 §4):
/// the agent rejects it but echoes its real identity in the Report.
pub fn build_discovery_probe() -> Vec<u8> {
    let mut pdu = Pdu::new_with_varbinds(Asn1Tag::GetRequest, Vec::new());
    pdu.set_request_id(fresh_id());

    let scoped_pdu = ScopedPdu {
        context_engine_id: Vec::new(),
        context_name: Vec::new(),
        pdu,
    };
    let message = SnmpMessage::V3 {
        msg_id: fresh_id(),
        msg_max_size: 1400,
        flags: MsgFlags {
            auth: false,
            priv_: false,
            reportable: true,
        },
        security_parameters: UsmSecurityParameters::default(),
        scoped_pdu: ScopedPduData::Plaintext(scoped_pdu),
    };
    message.to_bytes()
}

/// Extracts the authoritative engine identity/time from a v3 datagram
/// without attempting to verify or decrypt it — used only for discovery,
/// where the probe itself carries no security to check against yet.
pub fn extract_discovered_engine(raw: &[u8]) -> SnmpResult<(Vec<u8>, i32, i32)> {
    match crate::snmp::message::parse_message(raw)? {
        SnmpMessage::V3 {
            security_parameters,
            ..
        } => Ok((
            security_parameters.authoritative_engine_id,
            security_parameters.authoritative_engine_boots,
            security_parameters.authoritative_engine_time,
        )),
        SnmpMessage::Community { .. } => Err(SnmpError::Message(
            "expected a v3 message during engine discovery".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::snmp::pdu::ObjectSyntax;
    use crate::usm::SecurityLevel;

    fn v2c_config() -> SessionConfig {
        SessionConfig {
            version: SnmpVersion::V2c,
            address: "127.0.0.1:161".into(),
            community: "public".into(),
            security_level: SecurityLevel::NoAuthNoPriv,
            ..Default::default()
        }
    }

    fn community_response(request_id: i32) -> Vec<u8> {
        let pdu = Pdu::new_get_response(
            request_id,
            vec![crate::snmp::pdu::VarBind::new(
                "1.3.6.1.2.1.1.1.0".parse().unwrap(),
                ObjectSyntax::OctetString(b"agent".to_vec()),
            )],
        );
        SnmpMessage::Community {
            version: SnmpVersion::V2c,
            community: b"public".to_vec(),
            pdu,
        }
        .to_bytes()
    }

    #[test]
    fn matching_request_id_is_accepted() {
        let config = v2c_config();
        let raw = community_response(42);
        let keys = IncomingKeys {
            auth_key: None,
            priv_key: None,
        };
        let pdu = prepare_data_elements(&config, None, keys, 42, None, &raw).unwrap();
        assert_eq!(pdu.request_id(), Some(42));
    }

    #[test]
    fn mismatched_request_id_is_rejected() {
        let config = v2c_config();
        let raw = community_response(42);
        let keys = IncomingKeys {
            auth_key: None,
            priv_key: None,
        };
        let err = prepare_data_elements(&config, None, keys, 43, None, &raw).unwrap_err();
        assert!(matches!(err, SnmpError::Message(_)));
    }

    #[test]
    fn empty_v3_report_surfaces_as_unspecified_response_error() {
        let report_pdu = Pdu::Standard {
            pdu_type: Asn1Tag::Report,
            request_id: 7,
            error_status: crate::snmp::pdu::ErrorStatus::NoError,
            error_index: 0,
            varbinds: vec![],
        };
        let err = check_report(&report_pdu).unwrap_err();
        assert!(matches!(err, SnmpError::Response { oid: None }));
    }

    #[test]
    fn report_with_not_in_time_window_oid_is_distinguished() {
        let report_pdu = Pdu::Standard {
            pdu_type: Asn1Tag::Report,
            request_id: 7,
            error_status: crate::snmp::pdu::ErrorStatus::NoError,
            error_index: 0,
            varbinds: vec![crate::snmp::pdu::VarBind::new(
                USM_STATS_NOT_IN_TIME_WINDOWS.parse().unwrap(),
                ObjectSyntax::Null,
            )],
        };
        assert!(matches!(
            check_report(&report_pdu).unwrap_err(),
            SnmpError::NotInTimeWindow
        ));
    }
}
