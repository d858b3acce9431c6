//! End-to-end tests against an in-process mock agent over real loopback
//! UDP sockets — no external network, no real device required.

use std::time::Duration;

use snmp_core::config::SessionConfig;
use snmp_core::snmp::message::{SnmpMessage, SnmpVersion, parse_message};
use snmp_core::snmp::pdu::{ErrorStatus, ObjectSyntax, Pdu, VarBind};
use snmp_core::usm::{AuthProtocol, EngineState, PrivProtocol, SecurityLevel};
use snmp_core::{Oid, Session};
use tokio::net::UdpSocket;

fn oid(s: &str) -> Oid {
    s.parse().unwrap()
}

async fn bind_loopback() -> (UdpSocket, String) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap().to_string();
    (socket, addr)
}

fn base_v2c_config(address: String) -> SessionConfig {
    SessionConfig {
        version: SnmpVersion::V2c,
        address,
        community: "public".into(),
        timeout: Duration::from_millis(500),
        retries: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn v2c_get_round_trips_over_the_wire() {
    let (socket, addr) = bind_loopback().await;

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
        let SnmpMessage::Community { pdu, .. } = parse_message(&buf[..len]).unwrap() else {
            panic!("expected a community message");
        };
        let request_id = pdu.request_id().unwrap();
        let response_pdu = Pdu::new_get_response(
            request_id,
            vec![VarBind::new(
                oid("1.3.6.1.2.1.1.1.0"),
                ObjectSyntax::OctetString(b"test agent".to_vec()),
            )],
        );
        let response = SnmpMessage::Community {
            version: SnmpVersion::V2c,
            community: b"public".to_vec(),
            pdu: response_pdu,
        };
        socket.send_to(&response.to_bytes(), peer).await.unwrap();
    });

    let mut session = Session::new(base_v2c_config(addr)).unwrap();
    session.open().await.unwrap();
    let response = session
        .get_request(&[oid("1.3.6.1.2.1.1.1.0")])
        .await
        .unwrap();
    let varbinds = response.into_varbinds();

    assert_eq!(varbinds.len(), 1);
    assert_eq!(
        varbinds[0].value,
        ObjectSyntax::OctetString(b"test agent".to_vec())
    );
}

#[tokio::test]
async fn v2c_bulk_walk_walks_a_small_table_to_completion() {
    let (socket, addr) = bind_loopback().await;

    tokio::spawn(async move {
        let table = [
            (oid("1.3.6.1.2.1.2.2.1.1.1"), 1),
            (oid("1.3.6.1.2.1.2.2.1.1.2"), 2),
            (oid("1.3.6.1.2.1.2.2.1.1.3"), 3),
        ];
        let mut buf = vec![0u8; 4096];
        loop {
            let (len, peer) = match socket.recv_from(&mut buf).await {
                Ok(x) => x,
                Err(_) => break,
            };
            let Ok(SnmpMessage::Community { pdu, .. }) = parse_message(&buf[..len]) else {
                continue;
            };
            let request_id = pdu.request_id().unwrap();
            let requested = pdu.varbinds()[0].oid.clone();

            let next = table.iter().find(|(o, _)| *o > requested);
            let varbinds = match next {
                Some((o, v)) => vec![VarBind::new(o.clone(), ObjectSyntax::Integer(*v))],
                None => vec![VarBind::new(requested.clone(), ObjectSyntax::EndOfMib)],
            };
            let response = SnmpMessage::Community {
                version: SnmpVersion::V2c,
                community: b"public".to_vec(),
                pdu: Pdu::new_get_response(request_id, varbinds),
            };
            let _ = socket.send_to(&response.to_bytes(), peer).await;
        }
    });

    let mut session = Session::new(base_v2c_config(addr)).unwrap();
    session.open().await.unwrap();
    let response = session
        .get_bulk_walk(&[oid("1.3.6.1.2.1.2")], 0, 1)
        .await
        .unwrap();
    let varbinds = response.into_varbinds();

    assert_eq!(varbinds.len(), 3);
    assert_eq!(varbinds[0].oid, oid("1.3.6.1.2.1.2.2.1.1.1"));
    assert_eq!(varbinds[2].oid, oid("1.3.6.1.2.1.2.2.1.1.3"));
}

#[tokio::test]
async fn bulk_walk_surfaces_a_real_error_instead_of_retrying_forever() {
    let (socket, addr) = bind_loopback().await;

    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        let (len, peer) = socket.recv_from(&mut buf).await.unwrap();
        let SnmpMessage::Community { pdu, .. } = parse_message(&buf[..len]).unwrap() else {
            panic!("expected a community message");
        };
        let request_id = pdu.request_id().unwrap();
        let response = SnmpMessage::Community {
            version: SnmpVersion::V2c,
            community: b"public".to_vec(),
            pdu: Pdu::Standard {
                pdu_type: snmp_core::ber::Asn1Tag::GetResponse,
                request_id,
                error_status: ErrorStatus::GenErr,
                error_index: 1,
                varbinds: vec![],
            },
        };
        socket.send_to(&response.to_bytes(), peer).await.unwrap();
    });

    let mut session = Session::new(base_v2c_config(addr)).unwrap();
    session.open().await.unwrap();
    let response = session
        .get_bulk_walk(&[oid("1.3.6.1.2.1.1")], 1, 10)
        .await
        .unwrap();

    assert_eq!(response.error_status(), Some(ErrorStatus::GenErr));
}

#[tokio::test]
async fn v3_short_auth_password_is_rejected_before_any_network_io() {
    let config = SessionConfig {
        version: SnmpVersion::V3,
        address: "127.0.0.1:9".into(),
        user_name: "alice".into(),
        security_level: SecurityLevel::AuthNoPriv,
        auth_password: "short".into(),
        ..Default::default()
    };
    assert!(Session::new(config).is_err());
}

/// A minimal USM agent sharing the client's own crypto helpers, so this
/// test exercises discovery, HMAC authentication, and AES privacy against
/// a real (if in-process) peer rather than a canned byte fixture.
async fn run_v3_agent(socket: UdpSocket, engine_id: Vec<u8>, auth_key: Vec<u8>, priv_key: Vec<u8>) {
    let mut engine = EngineState::new(engine_id.clone(), 1, 500);
    let mut buf = vec![0u8; 4096];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(x) => x,
            Err(_) => break,
        };
        let Ok(SnmpMessage::V3 {
            msg_id,
            flags,
            security_parameters,
            scoped_pdu,
            ..
        }) = parse_message(&buf[..len])
        else {
            continue;
        };

        if security_parameters.authoritative_engine_id.is_empty() {
            // Discovery probe: report our identity, unauthenticated.
            let report = SnmpMessage::V3 {
                msg_id,
                msg_max_size: 1400,
                flags: snmp_core::snmp::message::MsgFlags {
                    auth: false,
                    priv_: false,
                    reportable: false,
                },
                security_parameters: snmp_core::snmp::message::UsmSecurityParameters {
                    authoritative_engine_id: engine_id.clone(),
                    authoritative_engine_boots: engine.engine_boots,
                    authoritative_engine_time: engine.engine_time,
                    ..Default::default()
                },
                scoped_pdu: snmp_core::snmp::message::ScopedPduData::Plaintext(
                    snmp_core::snmp::message::ScopedPdu {
                        context_engine_id: engine_id.clone(),
                        context_name: vec![],
                        pdu: Pdu::Standard {
                            pdu_type: snmp_core::ber::Asn1Tag::Report,
                            request_id: 0,
                            error_status: ErrorStatus::NoError,
                            error_index: 0,
                            varbinds: vec![],
                        },
                    },
                ),
            };
            let _ = socket.send_to(&report.to_bytes(), peer).await;
            continue;
        }

        snmp_core::usm::auth::verify(
            AuthProtocol::Md5,
            &auth_key,
            &buf[..len],
            &security_parameters.authentication_parameters,
        )
        .unwrap();

        let ciphertext = match scoped_pdu {
            snmp_core::snmp::message::ScopedPduData::Encrypted(c) => c,
            _ => panic!("expected an encrypted scoped pdu"),
        };
        let plaintext = snmp_core::usm::privacy::decrypt(
            PrivProtocol::Aes,
            &priv_key,
            engine.engine_boots,
            engine.engine_time,
            &security_parameters.privacy_parameters,
            &ciphertext,
        )
        .unwrap();
        let request_scoped = snmp_core::snmp::message::ScopedPdu::parse(&plaintext).unwrap();
        let request_id = request_scoped.pdu.request_id().unwrap();

        let response_pdu = Pdu::new_get_response(
            request_id,
            vec![VarBind::new(
                oid("1.3.6.1.2.1.1.1.0"),
                ObjectSyntax::OctetString(b"v3 agent".to_vec()),
            )],
        );
        let response_scoped = snmp_core::snmp::message::ScopedPdu {
            context_engine_id: engine_id.clone(),
            context_name: vec![],
            pdu: response_pdu,
        };
        let salt_counter = engine.next_salt();
        let (response_ciphertext, salt) = snmp_core::usm::privacy::encrypt(
            PrivProtocol::Aes,
            &priv_key,
            engine.engine_boots,
            engine.engine_time,
            salt_counter,
            &response_scoped.to_bytes(),
        )
        .unwrap();

        let response = SnmpMessage::V3 {
            msg_id,
            msg_max_size: 1400,
            flags,
            security_parameters: snmp_core::snmp::message::UsmSecurityParameters {
                authoritative_engine_id: engine_id.clone(),
                authoritative_engine_boots: engine.engine_boots,
                authoritative_engine_time: engine.engine_time,
                user_name: security_parameters.user_name.clone(),
                authentication_parameters: vec![0u8; 12],
                privacy_parameters: salt,
            },
            scoped_pdu: snmp_core::snmp::message::ScopedPduData::Encrypted(response_ciphertext),
        };
        let mut bytes = response.to_bytes();
        snmp_core::usm::auth::sign(AuthProtocol::Md5, &auth_key, &mut bytes).unwrap();
        let _ = socket.send_to(&bytes, peer).await;
    }
}

#[tokio::test]
async fn v3_auth_priv_get_discovers_and_round_trips() {
    let (socket, addr) = bind_loopback().await;
    let engine_id = b"v3-test-engine-01".to_vec();
    let auth_key = snmp_core::usm::key::localize(b"maplesyrup", &engine_id, AuthProtocol::Md5);
    let priv_key = snmp_core::usm::key::localize(b"maplesyrup", &engine_id, AuthProtocol::Md5);

    tokio::spawn(run_v3_agent(
        socket,
        engine_id,
        auth_key.to_vec(),
        priv_key.to_vec(),
    ));

    let config = SessionConfig {
        version: SnmpVersion::V3,
        address: addr,
        timeout: Duration::from_millis(500),
        retries: 1,
        user_name: "alice".into(),
        security_level: SecurityLevel::AuthPriv,
        auth_password: "maplesyrup".into(),
        auth_protocol: AuthProtocol::Md5,
        priv_password: "maplesyrup".into(),
        priv_protocol: PrivProtocol::Aes,
        ..Default::default()
    };

    let mut session = Session::new(config).unwrap();
    session.open().await.unwrap();
    let response = session
        .get_request(&[oid("1.3.6.1.2.1.1.1.0")])
        .await
        .unwrap();
    let varbinds = response.into_varbinds();

    assert_eq!(
        varbinds[0].value,
        ObjectSyntax::OctetString(b"v3 agent".to_vec())
    );
}

/// Like `run_v3_agent`, but the first post-discovery request gets an
/// unauthenticated `usmStatsNotInTimeWindows` Report instead of a real
/// answer, so the client must re-run discovery and retry before it
/// succeeds — exercising the `NotInTimeWindow` retry path end to end.
async fn run_v3_agent_failing_once(
    socket: UdpSocket,
    engine_id: Vec<u8>,
    auth_key: Vec<u8>,
    priv_key: Vec<u8>,
) {
    const USM_STATS_NOT_IN_TIME_WINDOWS: &str = "1.3.6.1.6.3.15.1.1.2.0";
    let mut engine = EngineState::new(engine_id.clone(), 1, 500);
    let mut real_requests_seen = 0u32;
    let mut buf = vec![0u8; 4096];
    loop {
        let (len, peer) = match socket.recv_from(&mut buf).await {
            Ok(x) => x,
            Err(_) => break,
        };
        let Ok(SnmpMessage::V3 {
            msg_id,
            flags,
            security_parameters,
            scoped_pdu,
            ..
        }) = parse_message(&buf[..len])
        else {
            continue;
        };

        if security_parameters.authoritative_engine_id.is_empty() {
            let report = SnmpMessage::V3 {
                msg_id,
                msg_max_size: 1400,
                flags: snmp_core::snmp::message::MsgFlags {
                    auth: false,
                    priv_: false,
                    reportable: false,
                },
                security_parameters: snmp_core::snmp::message::UsmSecurityParameters {
                    authoritative_engine_id: engine_id.clone(),
                    authoritative_engine_boots: engine.engine_boots,
                    authoritative_engine_time: engine.engine_time,
                    ..Default::default()
                },
                scoped_pdu: snmp_core::snmp::message::ScopedPduData::Plaintext(
                    snmp_core::snmp::message::ScopedPdu {
                        context_engine_id: engine_id.clone(),
                        context_name: vec![],
                        pdu: Pdu::Standard {
                            pdu_type: snmp_core::ber::Asn1Tag::Report,
                            request_id: 0,
                            error_status: ErrorStatus::NoError,
                            error_index: 0,
                            varbinds: vec![],
                        },
                    },
                ),
            };
            let _ = socket.send_to(&report.to_bytes(), peer).await;
            continue;
        }

        real_requests_seen += 1;
        if real_requests_seen == 1 {
            let report = SnmpMessage::V3 {
                msg_id,
                msg_max_size: 1400,
                flags: snmp_core::snmp::message::MsgFlags {
                    auth: false,
                    priv_: false,
                    reportable: false,
                },
                security_parameters: snmp_core::snmp::message::UsmSecurityParameters {
                    authoritative_engine_id: engine_id.clone(),
                    authoritative_engine_boots: engine.engine_boots,
                    authoritative_engine_time: engine.engine_time,
                    ..Default::default()
                },
                scoped_pdu: snmp_core::snmp::message::ScopedPduData::Plaintext(
                    snmp_core::snmp::message::ScopedPdu {
                        context_engine_id: engine_id.clone(),
                        context_name: vec![],
                        pdu: Pdu::Standard {
                            pdu_type: snmp_core::ber::Asn1Tag::Report,
                            request_id: 0,
                            error_status: ErrorStatus::NoError,
                            error_index: 0,
                            varbinds: vec![VarBind::new(
                                oid(USM_STATS_NOT_IN_TIME_WINDOWS),
                                ObjectSyntax::Null,
                            )],
                        },
                    },
                ),
            };
            let _ = socket.send_to(&report.to_bytes(), peer).await;
            continue;
        }

        snmp_core::usm::auth::verify(
            AuthProtocol::Md5,
            &auth_key,
            &buf[..len],
            &security_parameters.authentication_parameters,
        )
        .unwrap();

        let ciphertext = match scoped_pdu {
            snmp_core::snmp::message::ScopedPduData::Encrypted(c) => c,
            _ => panic!("expected an encrypted scoped pdu"),
        };
        let plaintext = snmp_core::usm::privacy::decrypt(
            PrivProtocol::Aes,
            &priv_key,
            engine.engine_boots,
            engine.engine_time,
            &security_parameters.privacy_parameters,
            &ciphertext,
        )
        .unwrap();
        let request_scoped = snmp_core::snmp::message::ScopedPdu::parse(&plaintext).unwrap();
        let request_id = request_scoped.pdu.request_id().unwrap();

        let response_pdu = Pdu::new_get_response(
            request_id,
            vec![VarBind::new(
                oid("1.3.6.1.2.1.1.1.0"),
                ObjectSyntax::OctetString(b"v3 agent after retry".to_vec()),
            )],
        );
        let response_scoped = snmp_core::snmp::message::ScopedPdu {
            context_engine_id: engine_id.clone(),
            context_name: vec![],
            pdu: response_pdu,
        };
        let salt_counter = engine.next_salt();
        let (response_ciphertext, salt) = snmp_core::usm::privacy::encrypt(
            PrivProtocol::Aes,
            &priv_key,
            engine.engine_boots,
            engine.engine_time,
            salt_counter,
            &response_scoped.to_bytes(),
        )
        .unwrap();

        let response = SnmpMessage::V3 {
            msg_id,
            msg_max_size: 1400,
            flags,
            security_parameters: snmp_core::snmp::message::UsmSecurityParameters {
                authoritative_engine_id: engine_id.clone(),
                authoritative_engine_boots: engine.engine_boots,
                authoritative_engine_time: engine.engine_time,
                user_name: security_parameters.user_name.clone(),
                authentication_parameters: vec![0u8; 12],
                privacy_parameters: salt,
            },
            scoped_pdu: snmp_core::snmp::message::ScopedPduData::Encrypted(response_ciphertext),
        };
        let mut bytes = response.to_bytes();
        snmp_core::usm::auth::sign(AuthProtocol::Md5, &auth_key, &mut bytes).unwrap();
        let _ = socket.send_to(&bytes, peer).await;
    }
}

#[tokio::test]
async fn not_in_time_window_report_triggers_rediscovery_then_succeeds() {
    let (socket, addr) = bind_loopback().await;
    let engine_id = b"v3-test-engine-02".to_vec();
    let auth_key = snmp_core::usm::key::localize(b"maplesyrup", &engine_id, AuthProtocol::Md5);
    let priv_key = snmp_core::usm::key::localize(b"maplesyrup", &engine_id, AuthProtocol::Md5);

    tokio::spawn(run_v3_agent_failing_once(
        socket,
        engine_id,
        auth_key.to_vec(),
        priv_key.to_vec(),
    ));

    let config = SessionConfig {
        version: SnmpVersion::V3,
        address: addr,
        timeout: Duration::from_millis(500),
        retries: 1,
        user_name: "alice".into(),
        security_level: SecurityLevel::AuthPriv,
        auth_password: "maplesyrup".into(),
        auth_protocol: AuthProtocol::Md5,
        priv_password: "maplesyrup".into(),
        priv_protocol: PrivProtocol::Aes,
        ..Default::default()
    };

    let mut session = Session::new(config).unwrap();
    session.open().await.unwrap();
    let response = session
        .get_request(&[oid("1.3.6.1.2.1.1.1.0")])
        .await
        .unwrap();
    let varbinds = response.into_varbinds();

    assert_eq!(
        varbinds[0].value,
        ObjectSyntax::OctetString(b"v3 agent after retry".to_vec())
    );
}
