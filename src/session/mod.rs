//! Client session: opens a socket, performs v3 engine discovery if
//! needed, and exposes the confirmed/unconfirmed request operations on
//! top of message processing and the retry loop.

pub mod network;
pub mod process;

use std::collections::BTreeSet;

use tracing::{debug, instrument, warn};

use crate::ber::Asn1Tag;
use crate::config::SessionConfig;
use crate::error::{SnmpError, SnmpResult};
use crate::oid::Oid;
use crate::snmp::message::SnmpVersion;
use crate::snmp::pdu::{ErrorStatus, Pdu, VarBind};
use crate::usm::{self, EngineState};
use zeroize::Zeroizing;

const DEFAULT_RECV_BUFFER: usize = 4096;

pub struct Session {
    config: SessionConfig,
    socket: Option<network::DatagramSocket>,
    engine_state: Option<EngineState>,
    auth_key: Option<Zeroizing<Vec<u8>>>,
    priv_key: Option<Zeroizing<Vec<u8>>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> SnmpResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            socket: None,
            engine_state: None,
            auth_key: None,
            priv_key: None,
        })
    }

    fn recv_buffer_size(&self) -> usize {
        (self.config.message_max_size as usize).max(DEFAULT_RECV_BUFFER)
    }

    fn localize_keys(&mut self) {
        let engine_id = self
            .engine_state
            .as_ref()
            .map(|s| s.engine_id.clone())
            .unwrap_or_default();
        if self.config.security_level.needs_auth() {
            self.auth_key = Some(usm::key::localize(
                self.config.auth_password.as_bytes(),
                &engine_id,
                self.config.auth_protocol,
            ));
        }
        if self.config.security_level.needs_priv() {
            self.priv_key = Some(usm::key::localize(
                self.config.priv_password.as_bytes(),
                &engine_id,
                self.config.auth_protocol,
            ));
        }
    }

    /// Connects the underlying socket and, for v3, runs engine discovery
    /// before the session is usable.
    #[instrument(skip(self), fields(address = %self.config.address))]
    pub async fn open(&mut self) -> SnmpResult<()> {
        let socket =
            network::DatagramSocket::connect(&self.config.address, self.config.timeout).await?;
        self.socket = Some(socket);

        if self.config.version == SnmpVersion::V3 {
            if let Some(engine_id) = self.config.security_engine_id.clone() {
                self.engine_state = Some(EngineState::new(engine_id, 0, 0));
            }
            if let Err(err) = self.discover_with_retry().await {
                self.socket = None;
                return Err(err);
            }
            self.localize_keys();
        }
        Ok(())
    }

    pub async fn close(&mut self) {
        self.socket = None;
        self.engine_state = None;
        self.auth_key = None;
        self.priv_key = None;
    }

    async fn discover_with_retry(&mut self) -> SnmpResult<()> {
        let budget = self.config.retries;
        let mut last_err = None;
        for attempt in 0..=budget {
            debug!(attempt, "engine discovery attempt");
            match self.discover_once().await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| SnmpError::Argument("discovery never ran".into())))
    }

    async fn discover_once(&mut self) -> SnmpResult<()> {
        let bytes = process::build_discovery_probe();
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| SnmpError::Argument("session is not open".into()))?;
        socket.send(&bytes).await?;
        let response = socket.recv(self.recv_buffer_size()).await?;

        let (engine_id, boots, time) = process::extract_discovered_engine(&response)?;
        match &mut self.engine_state {
            Some(state) => {
                state.engine_id = engine_id;
                state.observe(boots, time);
            }
            None => self.engine_state = Some(EngineState::new(engine_id, boots, time)),
        }
        Ok(())
    }

    /// spec.md §4.6 `sendPdu`: serialize, send, and (for confirmed PDUs)
    /// wait for the matching response, retrying up to `Retries` times and
    /// re-running discovery when the agent reports a time-window failure.
    async fn send_pdu(&mut self, pdu: Pdu) -> SnmpResult<Pdu> {
        let budget = self.config.retries;
        let mut rediscover = false;
        let mut last_err = None;

        for attempt in 0..=budget {
            debug!(attempt, rediscover, "sendPdu attempt");
            if rediscover {
                warn!("response was outside the time window; re-running discovery");
                if let Err(e) = self.discover_once().await {
                    last_err = Some(e);
                    continue;
                }
                self.localize_keys();
                rediscover = false;
            }

            match self.send_pdu_once(pdu.clone()).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    rediscover = matches!(e, SnmpError::NotInTimeWindow);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| SnmpError::Argument("sendPdu never ran".into())))
    }

    async fn send_pdu_once(&mut self, pdu: Pdu) -> SnmpResult<Pdu> {
        let is_unconfirmed = pdu.is_unconfirmed();

        let keys = process::OutgoingKeys {
            auth_key: self.auth_key.as_deref().map(Vec::as_slice),
            priv_key: self.priv_key.as_deref().map(Vec::as_slice),
        };
        let (bytes, request_id, msg_id) = process::prepare_outgoing_message(
            &self.config,
            self.engine_state.as_mut(),
            keys,
            pdu,
        )?;

        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| SnmpError::Argument("session is not open".into()))?;
        socket.send(&bytes).await?;

        if is_unconfirmed {
            return Ok(Pdu::new_get_response(request_id, Vec::new()));
        }

        let response = socket.recv(self.recv_buffer_size()).await?;

        let keys = process::IncomingKeys {
            auth_key: self.auth_key.as_deref().map(Vec::as_slice),
            priv_key: self.priv_key.as_deref().map(Vec::as_slice),
        };
        process::prepare_data_elements(
            &self.config,
            self.engine_state.as_mut(),
            keys,
            request_id,
            msg_id,
            &response,
        )
    }

    fn require_v2_or_later(&self) -> SnmpResult<()> {
        if !self.config.version.is_at_least_v2c() {
            return Err(SnmpError::Argument(
                "this operation requires SNMPv2c or later".into(),
            ));
        }
        Ok(())
    }

    pub async fn get_request(&mut self, oids: &[Oid]) -> SnmpResult<Pdu> {
        let pdu = Pdu::new_with_oids(Asn1Tag::GetRequest, oids.to_vec());
        self.send_pdu(pdu).await
    }

    pub async fn get_next_request(&mut self, oids: &[Oid]) -> SnmpResult<Pdu> {
        let pdu = Pdu::new_with_oids(Asn1Tag::GetNextRequest, oids.to_vec());
        self.send_pdu(pdu).await
    }

    pub async fn get_bulk_request(
        &mut self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> SnmpResult<Pdu> {
        self.require_v2_or_later()?;
        validate_bulk_params(non_repeaters, max_repetitions)?;
        let pdu = Pdu::new_bulk(oids.to_vec(), non_repeaters, max_repetitions);
        self.send_pdu(pdu).await
    }

    pub async fn v2_trap(&mut self, binds: Vec<VarBind>) -> SnmpResult<()> {
        self.require_v2_or_later()?;
        let pdu = Pdu::new_with_varbinds(Asn1Tag::SnmpV2Trap, binds);
        self.send_pdu(pdu).await.map(|_| ())
    }

    pub async fn inform_request(&mut self, binds: Vec<VarBind>) -> SnmpResult<Pdu> {
        self.require_v2_or_later()?;
        let pdu = Pdu::new_with_varbinds(Asn1Tag::InformRequest, binds);
        self.send_pdu(pdu).await
    }

    /// Walks one or more OID subtrees to completion with repeated
    /// `GetBulkRequest`s. `oids`' first `non_repeaters` entries are
    /// fetched once each; the rest are reduced to their minimal set of
    /// roots and walked in lock-step until every root runs past its
    /// subtree, hits an exception, or the agent returns fewer varbinds
    /// than it asked for. Never mutates `oids`; returns a fresh response.
    pub async fn get_bulk_walk(
        &mut self,
        oids: &[Oid],
        non_repeaters: i32,
        max_repetitions: i32,
    ) -> SnmpResult<Pdu> {
        self.require_v2_or_later()?;
        validate_bulk_params(non_repeaters, max_repetitions)?;

        let n = non_repeaters as usize;
        if n > oids.len() {
            return Err(SnmpError::Argument(
                "non-repeaters cannot exceed the number of OIDs given".into(),
            ));
        }
        let m = max_repetitions as usize;

        let non_repeating: Vec<Oid> = oids[..n].to_vec();
        let mut roots = reduce_to_minimal_roots(&oids[n..]);
        let mut req_oids: Vec<Oid> = non_repeating.iter().chain(roots.iter()).cloned().collect();

        let mut current_n = non_repeaters;
        let mut non_repeater_results: Vec<VarBind> = Vec::new();
        let mut walk_results: Vec<VarBind> = Vec::new();
        let mut seen: BTreeSet<Oid> = BTreeSet::new();
        let mut first_iteration = true;
        let mut last_request_id = 0i32;

        while !req_oids.is_empty() {
            let response = self
                .get_bulk_request(&req_oids, current_n, max_repetitions)
                .await?;
            last_request_id = response.request_id().unwrap_or(0);

            let error_status = response.error_status().unwrap_or(ErrorStatus::NoError);
            let error_index = response.error_index().unwrap_or(0);
            if error_status != ErrorStatus::NoError
                && (error_status != ErrorStatus::NoSuchName || error_index <= current_n)
            {
                return Ok(response);
            }

            let mut varbinds = response.into_varbinds();

            if first_iteration && n > 0 {
                let take = n.min(varbinds.len());
                non_repeater_results = varbinds.drain(..take).collect();
                current_n = 0;
                req_oids = roots.clone();
            }
            first_iteration = false;

            let filled = varbinds.len() == req_oids.len() * m;
            varbinds.sort_by(|a, b| a.oid.cmp(&b.oid));
            varbinds.dedup_by(|a, b| a.oid == b.oid);

            let mut next_roots = Vec::with_capacity(roots.len());
            let mut next_req_oids = Vec::with_capacity(roots.len());

            for root in &roots {
                let matched: Vec<&VarBind> = varbinds
                    .iter()
                    .filter(|vb| root.is_strict_prefix_of(&vb.oid))
                    .collect();

                let last_already_emitted = matched
                    .last()
                    .map(|vb| seen.contains(&vb.oid))
                    .unwrap_or(false);
                if matched.is_empty() || last_already_emitted {
                    continue;
                }

                let mut hit_exception = false;
                for vb in &matched {
                    if vb.value.is_exception() {
                        hit_exception = true;
                        continue;
                    }
                    if seen.insert(vb.oid.clone()) {
                        walk_results.push((*vb).clone());
                    }
                }

                if hit_exception || (!filled && matched.len() < m) {
                    continue;
                }

                let advanced = matched.last().unwrap().oid.clone();
                next_roots.push(root.clone());
                next_req_oids.push(advanced);
            }

            roots = next_roots;
            req_oids = next_req_oids;
        }

        walk_results.sort_by(|a, b| a.oid.cmp(&b.oid));
        let mut result_varbinds = non_repeater_results;
        result_varbinds.extend(walk_results);
        Ok(Pdu::new_get_response(last_request_id, result_varbinds))
    }
}

fn validate_bulk_params(non_repeaters: i32, max_repetitions: i32) -> SnmpResult<()> {
    if non_repeaters < 0 || max_repetitions < 0 {
        return Err(SnmpError::Argument(
            "non-repeaters and max-repetitions must be non-negative".into(),
        ));
    }
    Ok(())
}

/// Sorts and discards any OID that is a descendant of another one already
/// in the list, so a walk never requests the same subtree twice.
fn reduce_to_minimal_roots(oids: &[Oid]) -> Vec<Oid> {
    let mut sorted: Vec<Oid> = oids.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut roots: Vec<Oid> = Vec::new();
    for oid in sorted {
        if !roots.iter().any(|r: &Oid| r.is_prefix_of(&oid)) {
            roots.push(oid);
        }
    }
    roots
}
