//! Version-dependent SNMP message envelopes: the v1/v2c `{version,
//! community, pdu}` triple, and the v3 envelope carrying USM security
//! parameters around a (possibly encrypted) scoped PDU.

use crate::ber::decoder::decode_integer;
use crate::ber::{Asn1Tag, BerError, BerObject, BerResult, encoder, parse_ber_object};
use crate::error::{SnmpError, SnmpResult};
use crate::snmp::pdu::{Pdu, parse_pdu};

/// SNMP protocol version, as carried in the message envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
    V3,
}

impl SnmpVersion {
    pub fn as_i32(self) -> i32 {
        match self {
            SnmpVersion::V1 => 0,
            SnmpVersion::V2c => 1,
            SnmpVersion::V3 => 3,
        }
    }

    pub fn from_i32(value: i32) -> SnmpResult<Self> {
        match value {
            0 => Ok(SnmpVersion::V1),
            1 => Ok(SnmpVersion::V2c),
            3 => Ok(SnmpVersion::V3),
            other => Err(SnmpError::Message(format!("unknown SNMP version {other}"))),
        }
    }

    pub fn is_at_least_v2c(self) -> bool {
        matches!(self, SnmpVersion::V2c | SnmpVersion::V3)
    }
}

/// msgFlags (RFC 3412 §6.4): authentication, privacy, and whether a
/// Report is requested for this message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MsgFlags {
    pub auth: bool,
    pub priv_: bool,
    pub reportable: bool,
}

impl MsgFlags {
    pub fn to_byte(self) -> u8 {
        (self.auth as u8) | ((self.priv_ as u8) << 1) | ((self.reportable as u8) << 2)
    }

    pub fn from_byte(b: u8) -> Self {
        Self {
            auth: b & 0x01 != 0,
            priv_: b & 0x02 != 0,
            reportable: b & 0x04 != 0,
        }
    }
}

/// The USM `msgSecurityParameters`, itself BER-encoded as a SEQUENCE
/// inside the outer OCTET STRING.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UsmSecurityParameters {
    pub authoritative_engine_id: Vec<u8>,
    pub authoritative_engine_boots: i32,
    pub authoritative_engine_time: i32,
    pub user_name: Vec<u8>,
    /// 0 octets if unauthenticated, else 12 (HMAC-96 truncation).
    pub authentication_parameters: Vec<u8>,
    /// 0 octets if no privacy, else 8 (the outbound salt).
    pub privacy_parameters: Vec<u8>,
}

impl UsmSecurityParameters {
    fn write_to_buf(&self, buf: &mut Vec<u8>) {
        encoder::encode_sequence_with(buf, |c| {
            encoder::encode_octet_string(c, &self.authoritative_engine_id);
            encoder::encode_integer(c, self.authoritative_engine_boots);
            encoder::encode_integer(c, self.authoritative_engine_time);
            encoder::encode_octet_string(c, &self.user_name);
            encoder::encode_octet_string(c, &self.authentication_parameters);
            encoder::encode_octet_string(c, &self.privacy_parameters);
        });
    }

    fn parse(data: &[u8]) -> BerResult<Self> {
        let (obj, rest) = parse_ber_object(data)?;
        if obj.tag != Asn1Tag::Sequence {
            return Err(BerError::UnexpectedTag {
                expected: Asn1Tag::Sequence,
                got: obj.tag,
            });
        }
        if !rest.is_empty() {
            return Err(BerError::TrailingData);
        }

        let (engine_id_obj, r) = parse_ber_object(obj.value)?;
        let (boots_obj, r) = parse_ber_object(r)?;
        let (time_obj, r) = parse_ber_object(r)?;
        let (user_obj, r) = parse_ber_object(r)?;
        let (auth_params_obj, r) = parse_ber_object(r)?;
        let (priv_params_obj, r) = parse_ber_object(r)?;
        if !r.is_empty() {
            return Err(BerError::TrailingData);
        }

        Ok(UsmSecurityParameters {
            authoritative_engine_id: engine_id_obj.value.to_vec(),
            authoritative_engine_boots: decode_integer(boots_obj.value)?,
            authoritative_engine_time: decode_integer(time_obj.value)?,
            user_name: user_obj.value.to_vec(),
            authentication_parameters: auth_params_obj.value.to_vec(),
            privacy_parameters: priv_params_obj.value.to_vec(),
        })
    }

    /// Offset of the authenticationParameters *value* bytes within
    /// `params_seq_value`, the content of the msgSecurityParameters
    /// SEQUENCE (engineID, boots, time, userName, authParams,
    /// privParams) — used to zero it before signing and splice the
    /// computed HMAC back in afterwards.
    fn auth_params_value_offset(params_seq_value: &[u8]) -> Option<usize> {
        let mut cursor = params_seq_value;
        for _ in 0..4 {
            let (_, rest) = parse_ber_object(cursor).ok()?;
            cursor = rest;
        }
        let (auth_obj, _) = parse_ber_object(cursor).ok()?;
        Some(auth_obj.value.as_ptr() as usize - params_seq_value.as_ptr() as usize)
    }
}

/// Scoped PDU, plaintext or (once privacy is applied) an opaque
/// ciphertext transported as an OCTET STRING.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopedPduData {
    Plaintext(ScopedPdu),
    Encrypted(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedPdu {
    pub context_engine_id: Vec<u8>,
    pub context_name: Vec<u8>,
    pub pdu: Pdu,
}

impl ScopedPdu {
    pub fn write_to_buf(&self, buf: &mut Vec<u8>) {
        encoder::encode_sequence_with(buf, |c| {
            encoder::encode_octet_string(c, &self.context_engine_id);
            encoder::encode_octet_string(c, &self.context_name);
            self.pdu.write_to_buf(c);
        });
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to_buf(&mut buf);
        buf
    }

    pub fn parse(data: &[u8]) -> SnmpResult<Self> {
        let (obj, rest) = parse_ber_object(data)?;
        if obj.tag != Asn1Tag::Sequence {
            return Err(BerError::UnexpectedTag {
                expected: Asn1Tag::Sequence,
                got: obj.tag,
            }
            .into());
        }
        if !rest.is_empty() {
            return Err(BerError::TrailingData.into());
        }

        let (ctx_engine_obj, r) = parse_ber_object(obj.value)?;
        let (ctx_name_obj, r) = parse_ber_object(r)?;
        let (pdu_obj, r) = parse_ber_object(r)?;
        if !r.is_empty() {
            return Err(BerError::TrailingData.into());
        }
        let pdu = parse_pdu(pdu_obj)?;

        Ok(ScopedPdu {
            context_engine_id: ctx_engine_obj.value.to_vec(),
            context_name: ctx_name_obj.value.to_vec(),
            pdu,
        })
    }
}

/// The envelope that goes on the wire. v1/v2c carries a plaintext
/// community string; v3 carries USM security parameters and a scoped
/// PDU that may be encrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnmpMessage {
    Community {
        version: SnmpVersionRaw,
        community: Vec<u8>,
        pdu: Pdu,
    },
    V3 {
        msg_id: i32,
        msg_max_size: i32,
        flags: MsgFlagsRaw,
        security_parameters: UsmSecurityParameters,
        scoped_pdu: ScopedPduData,
    },
}

/// Raw newtypes keep `SnmpMessage` comparable/cloneable without pulling
/// in floating-point-free derive headaches for the byte-level flag type.
pub type SnmpVersionRaw = SnmpVersion;
pub type MsgFlagsRaw = MsgFlags;

impl SnmpMessage {
    pub fn write_to_buf(&self, buf: &mut Vec<u8>) {
        match self {
            SnmpMessage::Community {
                version,
                community,
                pdu,
            } => {
                encoder::encode_sequence_with(buf, |c| {
                    encoder::encode_integer(c, version.as_i32());
                    encoder::encode_octet_string(c, community);
                    pdu.write_to_buf(c);
                });
            }
            SnmpMessage::V3 {
                msg_id,
                msg_max_size,
                flags,
                security_parameters,
                scoped_pdu,
            } => {
                encoder::encode_sequence_with(buf, |c| {
                    encoder::encode_integer(c, SnmpVersion::V3.as_i32());
                    encoder::encode_sequence_with(c, |h| {
                        encoder::encode_integer(h, *msg_id);
                        encoder::encode_integer(h, *msg_max_size);
                        encoder::encode_octet_string(h, &[flags.to_byte()]);
                        encoder::encode_integer(h, 3); // msgSecurityModel = USM
                    });
                    let mut params_buf = Vec::new();
                    security_parameters.write_to_buf(&mut params_buf);
                    encoder::encode_octet_string(c, &params_buf);
                    match scoped_pdu {
                        ScopedPduData::Plaintext(sp) => sp.write_to_buf(c),
                        ScopedPduData::Encrypted(bytes) => encoder::encode_octet_string(c, bytes),
                    }
                });
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to_buf(&mut buf);
        buf
    }

    /// Locates the byte range of the 12-octet `authenticationParameters`
    /// value inside a fully serialized v3 message, so the HMAC step can
    /// zero it before signing and splice the digest back in afterward.
    pub fn find_auth_params_range(serialized: &[u8]) -> Option<(usize, usize)> {
        let (outer, _) = parse_ber_object(serialized).ok()?;
        let (_version_obj, rest) = parse_ber_object(outer.value).ok()?;
        let (_header_obj, rest) = parse_ber_object(rest).ok()?;
        let (params_octet_obj, _) = parse_ber_object(rest).ok()?;

        // params_octet_obj.value holds the msgSecurityParameters SEQUENCE
        // (tag, length and content) as transported inside the outer
        // OCTET STRING; unwrap that header before walking its fields.
        let (seq_obj, _) = parse_ber_object(params_octet_obj.value).ok()?;
        let offset = UsmSecurityParameters::auth_params_value_offset(seq_obj.value)?;
        let base = seq_obj.value.as_ptr() as usize - serialized.as_ptr() as usize;
        let (auth_obj, _) = parse_ber_object(&seq_obj.value[offset..]).ok()?;
        Some((base + offset, base + offset + auth_obj.value.len()))
    }
}

pub fn parse_message(input: &[u8]) -> SnmpResult<SnmpMessage> {
    let (msg_obj, rest) = parse_ber_object(input)?;
    if msg_obj.tag != Asn1Tag::Sequence {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Sequence,
            got: msg_obj.tag,
        }
        .into());
    }
    if !rest.is_empty() {
        return Err(BerError::TrailingData.into());
    }

    let (ver_obj, current) = parse_ber_object(msg_obj.value)?;
    if ver_obj.tag != Asn1Tag::Integer {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Integer,
            got: ver_obj.tag,
        }
        .into());
    }
    let version = SnmpVersion::from_i32(decode_integer(ver_obj.value)?)?;

    match version {
        SnmpVersion::V1 | SnmpVersion::V2c => {
            let (comm_obj, current) = parse_ber_object(current)?;
            if comm_obj.tag != Asn1Tag::OctetString {
                return Err(BerError::UnexpectedTag {
                    expected: Asn1Tag::OctetString,
                    got: comm_obj.tag,
                }
                .into());
            }
            let community = comm_obj.value.to_vec();

            let (pdu_obj, current) = parse_ber_object(current)?;
            let pdu = parse_pdu(pdu_obj)?;
            if !current.is_empty() {
                return Err(BerError::TrailingData.into());
            }

            Ok(SnmpMessage::Community {
                version,
                community,
                pdu,
            })
        }
        SnmpVersion::V3 => parse_v3(current),
    }
}

fn parse_v3(current: &[u8]) -> SnmpResult<SnmpMessage> {
    let (header_obj, current) = parse_ber_object(current)?;
    if header_obj.tag != Asn1Tag::Sequence {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Sequence,
            got: header_obj.tag,
        }
        .into());
    }
    let (msg_id_obj, h) = parse_ber_object(header_obj.value)?;
    let msg_id = decode_integer(msg_id_obj.value)?;
    let (max_size_obj, h) = parse_ber_object(h)?;
    let msg_max_size = decode_integer(max_size_obj.value)?;
    let (flags_obj, h) = parse_ber_object(h)?;
    if flags_obj.value.len() != 1 {
        return Err(SnmpError::Message("msgFlags must be a single octet".into()));
    }
    let flags = MsgFlags::from_byte(flags_obj.value[0]);
    let (sec_model_obj, h) = parse_ber_object(h)?;
    let sec_model = decode_integer(sec_model_obj.value)?;
    if !h.is_empty() {
        return Err(BerError::TrailingData.into());
    }
    if sec_model != 3 {
        return Err(SnmpError::Message(format!(
            "unsupported security model {sec_model}"
        )));
    }

    let (params_octet_obj, current) = parse_ber_object(current)?;
    if params_octet_obj.tag != Asn1Tag::OctetString {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::OctetString,
            got: params_octet_obj.tag,
        }
        .into());
    }
    let security_parameters = UsmSecurityParameters::parse(params_octet_obj.value)?;

    let (scoped_obj, current) = parse_ber_object(current)?;
    if !current.is_empty() {
        return Err(BerError::TrailingData.into());
    }

    let scoped_pdu = if flags.priv_ {
        if scoped_obj.tag != Asn1Tag::OctetString {
            return Err(BerError::UnexpectedTag {
                expected: Asn1Tag::OctetString,
                got: scoped_obj.tag,
            }
            .into());
        }
        ScopedPduData::Encrypted(scoped_obj.value.to_vec())
    } else {
        ScopedPduData::Plaintext(ScopedPdu::parse_sequence_object(scoped_obj)?)
    };

    Ok(SnmpMessage::V3 {
        msg_id,
        msg_max_size,
        flags,
        security_parameters,
        scoped_pdu,
    })
}

impl ScopedPdu {
    fn parse_sequence_object(obj: BerObject) -> SnmpResult<Self> {
        if obj.tag != Asn1Tag::Sequence {
            return Err(BerError::UnexpectedTag {
                expected: Asn1Tag::Sequence,
                got: obj.tag,
            }
            .into());
        }
        let (ctx_engine_obj, r) = parse_ber_object(obj.value)?;
        let (ctx_name_obj, r) = parse_ber_object(r)?;
        let (pdu_obj, r) = parse_ber_object(r)?;
        if !r.is_empty() {
            return Err(BerError::TrailingData.into());
        }
        let pdu = parse_pdu(pdu_obj)?;
        Ok(ScopedPdu {
            context_engine_id: ctx_engine_obj.value.to_vec(),
            context_name: ctx_name_obj.value.to_vec(),
            pdu,
        })
    }
}
