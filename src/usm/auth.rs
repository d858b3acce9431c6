//! HMAC-MD5-96 / HMAC-SHA1-96 message authentication (RFC 3414 §6.3).

use digest::Mac;
use hmac::Hmac;
use subtle::ConstantTimeEq;

use super::AuthProtocol;
use crate::error::{SnmpError, SnmpResult};
use crate::snmp::message::SnmpMessage;

/// HMAC-*-96 truncates the digest to this many octets.
const AUTH_PARAMS_LEN: usize = 12;

type HmacMd5 = Hmac<md5::Md5>;
type HmacSha1 = Hmac<sha1::Sha1>;

fn hmac_digest(protocol: AuthProtocol, key: &[u8], data: &[u8]) -> Vec<u8> {
    match protocol {
        AuthProtocol::Md5 => {
            let mut mac =
                <HmacMd5 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
            Mac::update(&mut mac, data);
            mac.finalize().into_bytes().to_vec()
        }
        AuthProtocol::Sha1 => {
            let mut mac =
                <HmacSha1 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
            Mac::update(&mut mac, data);
            mac.finalize().into_bytes().to_vec()
        }
    }
}

/// Signs a fully serialized v3 message in place. `message` must already
/// carry a 12-octet, zero-filled `authenticationParameters` field at its
/// final position — zeroing it never changes the message length, so this
/// can run after the rest of the message (including privacy) is final.
pub fn sign(protocol: AuthProtocol, key: &[u8], message: &mut [u8]) -> SnmpResult<()> {
    let (start, end) = SnmpMessage::find_auth_params_range(message)
        .ok_or_else(|| SnmpError::Auth("could not locate authenticationParameters".into()))?;
    if end - start != AUTH_PARAMS_LEN {
        return Err(SnmpError::Auth(
            "authenticationParameters field has the wrong length".into(),
        ));
    }
    let digest = hmac_digest(protocol, key, message);
    message[start..end].copy_from_slice(&digest[..AUTH_PARAMS_LEN]);
    Ok(())
}

/// Verifies a received message's authentication, given the
/// `authenticationParameters` it actually carried on the wire.
pub fn verify(
    protocol: AuthProtocol,
    key: &[u8],
    message: &[u8],
    received_auth_params: &[u8],
) -> SnmpResult<()> {
    if received_auth_params.len() != AUTH_PARAMS_LEN {
        return Err(SnmpError::Auth(
            "authenticationParameters field has the wrong length".into(),
        ));
    }
    let mut zeroed = message.to_vec();
    let (start, end) = SnmpMessage::find_auth_params_range(&zeroed)
        .ok_or_else(|| SnmpError::Auth("could not locate authenticationParameters".into()))?;
    zeroed[start..end].fill(0);

    let digest = hmac_digest(protocol, key, &zeroed);
    if received_auth_params.ct_eq(&digest[..AUTH_PARAMS_LEN]).unwrap_u8() != 1 {
        return Err(SnmpError::Auth("HMAC verification failed".into()));
    }
    Ok(())
}
