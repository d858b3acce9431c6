use crate::ber::decoder::{decode_integer, decode_unsigned_integer, decode_unsigned_integer64};
use crate::ber::encoder;
use crate::ber::{Asn1Tag, BerError, BerObject, BerResult, decode_oid, parse_ber_object};
use crate::error::{SnmpError, SnmpResult};
use crate::oid::Oid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: ObjectSyntax,
}

impl VarBind {
    pub fn new(oid: Oid, value: ObjectSyntax) -> Self {
        Self { oid, value }
    }

    pub fn write_to_buf(&self, buf: &mut Vec<u8>) {
        encoder::encode_sequence_with(buf, |content_buf| {
            encoder::encode_oid(content_buf, self.oid.as_slice());
            self.value.write_to_buf(content_buf);
        });
    }
}

/// A tagged SNMP value. The BER tag discriminates the variant; the
/// exception sentinels (`NoSuchObject`/`NoSuchInstance`/`EndOfMib`) carry
/// no payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectSyntax {
    Integer(i32),
    OctetString(Vec<u8>),
    Null,
    ObjectIdentifier(Oid),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),

    NoSuchObject,
    NoSuchInstance,
    EndOfMib,
}

impl ObjectSyntax {
    /// Whether this is one of the three exception sentinels.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            ObjectSyntax::NoSuchObject | ObjectSyntax::NoSuchInstance | ObjectSyntax::EndOfMib
        )
    }

    pub fn from_ber(obj: BerObject) -> BerResult<Self> {
        match obj.tag {
            Asn1Tag::Integer => Ok(ObjectSyntax::Integer(decode_integer(obj.value)?)),
            Asn1Tag::OctetString => Ok(ObjectSyntax::OctetString(obj.value.to_vec())),
            Asn1Tag::Null => Ok(ObjectSyntax::Null),
            Asn1Tag::ObjectIdentifier => {
                Ok(ObjectSyntax::ObjectIdentifier(Oid::from(decode_oid(obj.value)?)))
            }
            Asn1Tag::IpAddress => {
                let addr: [u8; 4] = obj
                    .value
                    .try_into()
                    .map_err(|_| BerError::MalformedLength)?;
                Ok(ObjectSyntax::IpAddress(addr))
            }
            Asn1Tag::Counter32 => Ok(ObjectSyntax::Counter32(decode_unsigned_integer(obj.value)?)),
            Asn1Tag::Gauge32 => Ok(ObjectSyntax::Gauge32(decode_unsigned_integer(obj.value)?)),
            Asn1Tag::TimeTicks => Ok(ObjectSyntax::TimeTicks(decode_unsigned_integer(obj.value)?)),
            Asn1Tag::Opaque => Ok(ObjectSyntax::Opaque(obj.value.to_vec())),
            Asn1Tag::Counter64 => Ok(ObjectSyntax::Counter64(decode_unsigned_integer64(obj.value)?)),
            Asn1Tag::NoSuchObject => Ok(ObjectSyntax::NoSuchObject),
            Asn1Tag::NoSuchInstance => Ok(ObjectSyntax::NoSuchInstance),
            Asn1Tag::EndOfMib => Ok(ObjectSyntax::EndOfMib),
            other => Err(BerError::UnsupportedType(other as u8)),
        }
    }

    pub fn write_to_buf(&self, buf: &mut Vec<u8>) {
        match self {
            ObjectSyntax::Integer(val) => encoder::encode_integer(buf, *val),
            ObjectSyntax::OctetString(val) => encoder::encode_octet_string(buf, val),
            ObjectSyntax::Null => encoder::encode_null(buf),
            ObjectSyntax::ObjectIdentifier(val) => encoder::encode_oid(buf, val.as_slice()),
            ObjectSyntax::IpAddress(val) => encoder::encode_ip_address(buf, val),
            ObjectSyntax::Counter32(val) => encoder::encode_counter32(buf, *val),
            ObjectSyntax::Gauge32(val) => encoder::encode_gauge32(buf, *val),
            ObjectSyntax::TimeTicks(val) => encoder::encode_timeticks(buf, *val),
            ObjectSyntax::Opaque(val) => encoder::encode_opaque(buf, val),
            ObjectSyntax::Counter64(val) => encoder::encode_counter64(buf, *val),
            ObjectSyntax::NoSuchObject => {
                buf.push(Asn1Tag::NoSuchObject as u8);
                buf.push(0x00);
            }
            ObjectSyntax::NoSuchInstance => {
                buf.push(Asn1Tag::NoSuchInstance as u8);
                buf.push(0x00);
            }
            ObjectSyntax::EndOfMib => {
                buf.push(Asn1Tag::EndOfMib as u8);
                buf.push(0x00);
            }
        }
    }
}

pub fn parse_varbind(obj: BerObject) -> BerResult<VarBind> {
    if obj.tag != Asn1Tag::Sequence {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Sequence,
            got: obj.tag,
        });
    }

    let (oid_obj, rest_after_oid) = parse_ber_object(obj.value)?;
    if oid_obj.tag != Asn1Tag::ObjectIdentifier {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::ObjectIdentifier,
            got: oid_obj.tag,
        });
    }
    let oid = Oid::from(decode_oid(oid_obj.value)?);

    let (value_obj, rest) = parse_ber_object(rest_after_oid)?;
    if !rest.is_empty() {
        return Err(BerError::TrailingData);
    }

    let value = ObjectSyntax::from_ber(value_obj)?;
    Ok(VarBind { oid, value })
}

pub fn parse_varbind_list(obj: BerObject) -> BerResult<Vec<VarBind>> {
    if obj.tag != Asn1Tag::Sequence {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Sequence,
            got: obj.tag,
        });
    }

    let mut varbinds = Vec::new();
    let mut current_slice = obj.value;

    while !current_slice.is_empty() {
        let (varbind_object, rest) = parse_ber_object(current_slice)?;
        varbinds.push(parse_varbind(varbind_object)?);
        current_slice = rest;
    }

    Ok(varbinds)
}

fn write_varbind_list(buf: &mut Vec<u8>, varbinds: &[VarBind]) {
    encoder::encode_sequence_with(buf, |content_buf| {
        for varbind in varbinds {
            varbind.write_to_buf(content_buf);
        }
    });
}

/// SNMP error-status values (RFC 1157 §4.1.1, extended by RFC 3416 for v2c).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorStatus {
    NoError = 0,
    TooBig = 1,
    NoSuchName = 2,
    BadValue = 3,
    ReadOnly = 4,
    GenErr = 5,
    NoAccess = 6,
    WrongType = 7,
    WrongLength = 8,
    WrongEncoding = 9,
    WrongValue = 10,
    NoCreation = 11,
    InconsistentValue = 12,
    ResourceUnavailable = 13,
    CommitFailed = 14,
    UndoFailed = 15,
    AuthorizationError = 16,
    NotWritable = 17,
    InconsistentName = 18,
}

impl TryFrom<i32> for ErrorStatus {
    type Error = BerError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorStatus::NoError),
            1 => Ok(ErrorStatus::TooBig),
            2 => Ok(ErrorStatus::NoSuchName),
            3 => Ok(ErrorStatus::BadValue),
            4 => Ok(ErrorStatus::ReadOnly),
            5 => Ok(ErrorStatus::GenErr),
            6 => Ok(ErrorStatus::NoAccess),
            7 => Ok(ErrorStatus::WrongType),
            8 => Ok(ErrorStatus::WrongLength),
            9 => Ok(ErrorStatus::WrongEncoding),
            10 => Ok(ErrorStatus::WrongValue),
            11 => Ok(ErrorStatus::NoCreation),
            12 => Ok(ErrorStatus::InconsistentValue),
            13 => Ok(ErrorStatus::ResourceUnavailable),
            14 => Ok(ErrorStatus::CommitFailed),
            15 => Ok(ErrorStatus::UndoFailed),
            16 => Ok(ErrorStatus::AuthorizationError),
            17 => Ok(ErrorStatus::NotWritable),
            18 => Ok(ErrorStatus::InconsistentName),
            _ => Err(BerError::InvalidEnumValue(value)),
        }
    }
}

/// A polymorphic protocol-data-unit. The tag (`pdu_type`) determines how
/// the body is shaped: a standard request/response carries error-status
/// and error-index, a bulk request reinterprets those two fields as
/// non-repeaters/max-repetitions, and a v1 trap has a distinct shape with
/// no request-id at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    Standard {
        pdu_type: Asn1Tag,
        request_id: i32,
        error_status: ErrorStatus,
        error_index: i32,
        varbinds: Vec<VarBind>,
    },
    Bulk {
        request_id: i32,
        non_repeaters: i32,
        max_repetitions: i32,
        varbinds: Vec<VarBind>,
    },
    TrapV1 {
        enterprise: Oid,
        agent_addr: [u8; 4],
        generic_trap: i32,
        specific_trap: i32,
        timestamp: u32,
        varbinds: Vec<VarBind>,
    },
}

impl Pdu {
    /// Builds a request PDU from a list of OIDs, each bound to `Null` —
    /// the shape of a GetRequest/GetNextRequest/SetRequest before a value
    /// is filled in. `request_id` is a placeholder; message processing
    /// assigns the real one at send time.
    pub fn new_with_oids(pdu_type: Asn1Tag, oids: Vec<Oid>) -> Self {
        let varbinds = oids
            .into_iter()
            .map(|oid| VarBind::new(oid, ObjectSyntax::Null))
            .collect();
        Pdu::new_with_varbinds(pdu_type, varbinds)
    }

    pub fn new_with_varbinds(pdu_type: Asn1Tag, varbinds: Vec<VarBind>) -> Self {
        Pdu::Standard {
            pdu_type,
            request_id: 0,
            error_status: ErrorStatus::NoError,
            error_index: 0,
            varbinds,
        }
    }

    pub fn new_bulk(oids: Vec<Oid>, non_repeaters: i32, max_repetitions: i32) -> Self {
        let varbinds = oids
            .into_iter()
            .map(|oid| VarBind::new(oid, ObjectSyntax::Null))
            .collect();
        Pdu::Bulk {
            request_id: 0,
            non_repeaters,
            max_repetitions,
            varbinds,
        }
    }

    /// Synthesizes a GetResponse carrying the given varbinds, used by
    /// `GetBulkWalk` to package its accumulated results.
    pub fn new_get_response(request_id: i32, varbinds: Vec<VarBind>) -> Self {
        Pdu::Standard {
            pdu_type: Asn1Tag::GetResponse,
            request_id,
            error_status: ErrorStatus::NoError,
            error_index: 0,
            varbinds,
        }
    }

    pub fn pdu_type(&self) -> Asn1Tag {
        match self {
            Pdu::Standard { pdu_type, .. } => *pdu_type,
            Pdu::Bulk { .. } => Asn1Tag::GetBulkRequest,
            Pdu::TrapV1 { .. } => Asn1Tag::Trap,
        }
    }

    pub fn request_id(&self) -> Option<i32> {
        match self {
            Pdu::Standard { request_id, .. } => Some(*request_id),
            Pdu::Bulk { request_id, .. } => Some(*request_id),
            Pdu::TrapV1 { .. } => None,
        }
    }

    pub fn set_request_id(&mut self, id: i32) {
        match self {
            Pdu::Standard { request_id, .. } => *request_id = id,
            Pdu::Bulk { request_id, .. } => *request_id = id,
            Pdu::TrapV1 { .. } => {}
        }
    }

    pub fn error_status(&self) -> Option<ErrorStatus> {
        match self {
            Pdu::Standard { error_status, .. } => Some(*error_status),
            _ => None,
        }
    }

    pub fn error_index(&self) -> Option<i32> {
        match self {
            Pdu::Standard { error_index, .. } => Some(*error_index),
            _ => None,
        }
    }

    pub fn non_repeaters(&self) -> Option<i32> {
        match self {
            Pdu::Bulk { non_repeaters, .. } => Some(*non_repeaters),
            _ => None,
        }
    }

    pub fn max_repetitions(&self) -> Option<i32> {
        match self {
            Pdu::Bulk { max_repetitions, .. } => Some(*max_repetitions),
            _ => None,
        }
    }

    pub fn varbinds(&self) -> &[VarBind] {
        match self {
            Pdu::Standard { varbinds, .. } => varbinds,
            Pdu::Bulk { varbinds, .. } => varbinds,
            Pdu::TrapV1 { varbinds, .. } => varbinds,
        }
    }

    pub fn into_varbinds(self) -> Vec<VarBind> {
        match self {
            Pdu::Standard { varbinds, .. } => varbinds,
            Pdu::Bulk { varbinds, .. } => varbinds,
            Pdu::TrapV1 { varbinds, .. } => varbinds,
        }
    }

    /// Unconfirmed PDU types never solicit a response from the peer.
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self.pdu_type(), Asn1Tag::SnmpV2Trap | Asn1Tag::Trap)
    }

    pub fn write_to_buf(&self, buf: &mut Vec<u8>) {
        match self {
            Pdu::Standard {
                pdu_type,
                request_id,
                error_status,
                error_index,
                varbinds,
            } => {
                encoder::encode_container_with(buf, *pdu_type, |content_buf| {
                    encoder::encode_integer(content_buf, *request_id);
                    encoder::encode_integer(content_buf, *error_status as i32);
                    encoder::encode_integer(content_buf, *error_index);
                    write_varbind_list(content_buf, varbinds);
                });
            }
            Pdu::Bulk {
                request_id,
                non_repeaters,
                max_repetitions,
                varbinds,
            } => {
                encoder::encode_container_with(buf, Asn1Tag::GetBulkRequest, |content_buf| {
                    encoder::encode_integer(content_buf, *request_id);
                    encoder::encode_integer(content_buf, *non_repeaters);
                    encoder::encode_integer(content_buf, *max_repetitions);
                    write_varbind_list(content_buf, varbinds);
                });
            }
            Pdu::TrapV1 {
                enterprise,
                agent_addr,
                generic_trap,
                specific_trap,
                timestamp,
                varbinds,
            } => {
                encoder::encode_container_with(buf, Asn1Tag::Trap, |content_buf| {
                    encoder::encode_oid(content_buf, enterprise.as_slice());
                    encoder::encode_ip_address(content_buf, agent_addr);
                    encoder::encode_integer(content_buf, *generic_trap);
                    encoder::encode_integer(content_buf, *specific_trap);
                    encoder::encode_timeticks(content_buf, *timestamp);
                    write_varbind_list(content_buf, varbinds);
                });
            }
        }
    }
}

fn expect_integer(obj: BerObject) -> BerResult<i32> {
    if obj.tag != Asn1Tag::Integer {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::Integer,
            got: obj.tag,
        });
    }
    decode_integer(obj.value)
}

pub fn parse_pdu(obj: BerObject) -> SnmpResult<Pdu> {
    let pdu_type = obj.tag;

    if pdu_type == Asn1Tag::Trap {
        return parse_trap_v1(obj.value).map_err(SnmpError::from);
    }

    let (req_id_obj, rest) = parse_ber_object(obj.value)?;
    let request_id = expect_integer(req_id_obj)?;

    if pdu_type == Asn1Tag::GetBulkRequest {
        let (non_rep_obj, rest) = parse_ber_object(rest)?;
        let non_repeaters = expect_integer(non_rep_obj)?;

        let (max_rep_obj, rest) = parse_ber_object(rest)?;
        let max_repetitions = expect_integer(max_rep_obj)?;

        let (varbind_list_obj, rest) = parse_ber_object(rest)?;
        let varbinds = parse_varbind_list(varbind_list_obj)?;

        if !rest.is_empty() {
            return Err(BerError::TrailingData.into());
        }

        return Ok(Pdu::Bulk {
            request_id,
            non_repeaters,
            max_repetitions,
            varbinds,
        });
    }

    let (err_stat_obj, rest) = parse_ber_object(rest)?;
    let error_status = ErrorStatus::try_from(expect_integer(err_stat_obj)?)?;

    let (err_idx_obj, rest) = parse_ber_object(rest)?;
    let error_index = expect_integer(err_idx_obj)?;

    let (varbind_list_obj, rest) = parse_ber_object(rest)?;
    let varbinds = parse_varbind_list(varbind_list_obj)?;

    if !rest.is_empty() {
        return Err(BerError::TrailingData.into());
    }

    Ok(Pdu::Standard {
        pdu_type,
        request_id,
        error_status,
        error_index,
        varbinds,
    })
}

fn parse_trap_v1(data: &[u8]) -> BerResult<Pdu> {
    let (enterprise_obj, rest) = parse_ber_object(data)?;
    if enterprise_obj.tag != Asn1Tag::ObjectIdentifier {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::ObjectIdentifier,
            got: enterprise_obj.tag,
        });
    }
    let enterprise = Oid::from(decode_oid(enterprise_obj.value)?);

    let (agent_addr_obj, rest) = parse_ber_object(rest)?;
    if agent_addr_obj.tag != Asn1Tag::IpAddress {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::IpAddress,
            got: agent_addr_obj.tag,
        });
    }
    let agent_addr: [u8; 4] = agent_addr_obj
        .value
        .try_into()
        .map_err(|_| BerError::MalformedLength)?;

    let (generic_obj, rest) = parse_ber_object(rest)?;
    let generic_trap = expect_integer(generic_obj)?;

    let (specific_obj, rest) = parse_ber_object(rest)?;
    let specific_trap = expect_integer(specific_obj)?;

    let (timestamp_obj, rest) = parse_ber_object(rest)?;
    if timestamp_obj.tag != Asn1Tag::TimeTicks {
        return Err(BerError::UnexpectedTag {
            expected: Asn1Tag::TimeTicks,
            got: timestamp_obj.tag,
        });
    }
    let timestamp = decode_unsigned_integer(timestamp_obj.value)?;

    let (varbind_list_obj, rest) = parse_ber_object(rest)?;
    let varbinds = parse_varbind_list(varbind_list_obj)?;

    if !rest.is_empty() {
        return Err(BerError::TrailingData);
    }

    Ok(Pdu::TrapV1 {
        enterprise,
        agent_addr,
        generic_trap,
        specific_trap,
        timestamp,
        varbinds,
    })
}
