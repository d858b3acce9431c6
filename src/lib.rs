//! SNMP v1/v2c/v3 client core: BER codec, PDU model, USM security, session
//! configuration, and the request/retry client session.

pub mod ber;
pub mod config;
pub mod error;
pub mod oid;
pub mod session;
pub mod snmp;
pub mod usm;

pub use config::SessionConfig;
pub use error::{SnmpError, SnmpResult};
pub use oid::Oid;
pub use session::Session;
