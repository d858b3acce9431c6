//! Version-dispatched SNMP message and PDU types.

pub mod message;
pub mod pdu;
