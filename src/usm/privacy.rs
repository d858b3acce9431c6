//! DES-CBC and AES-CFB128 (RFC 3826) privacy: encrypt/decrypt the
//! BER-serialized scoped PDU and derive the per-message IV from the
//! engine's boot counter, time, and an outbound salt.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit as CfbKeyIvInit};

use super::PrivProtocol;
use crate::error::{SnmpError, SnmpResult};

type DesCbcEnc = cbc::Encryptor<des::Des>;
type DesCbcDec = cbc::Decryptor<des::Des>;
type Aes128CfbEnc = cfb_mode::Encryptor<aes::Aes128>;
type Aes128CfbDec = cfb_mode::Decryptor<aes::Aes128>;

/// privParameters transported alongside the ciphertext: 8 octets, an
/// outbound-monotone salt combined with the priv key to form the IV.
const SALT_LEN: usize = 8;

fn des_iv(pre_iv: &[u8], engine_boots: i32, salt_counter: u64) -> ([u8; 8], [u8; 8]) {
    let mut salt = [0u8; 8];
    salt[0..4].copy_from_slice(&(engine_boots as u32).to_be_bytes());
    salt[4..8].copy_from_slice(&(salt_counter as u32).to_be_bytes());

    let mut iv = [0u8; 8];
    for i in 0..8 {
        iv[i] = pre_iv[i] ^ salt[i];
    }
    (iv, salt)
}

fn aes_iv(engine_boots: i32, engine_time: i32, salt_counter: u64) -> ([u8; 16], [u8; 8]) {
    let salt = salt_counter.to_be_bytes();
    let mut iv = [0u8; 16];
    iv[0..4].copy_from_slice(&(engine_boots as u32).to_be_bytes());
    iv[4..8].copy_from_slice(&(engine_time as u32).to_be_bytes());
    iv[8..16].copy_from_slice(&salt);
    (iv, salt)
}

/// Encrypts `plaintext` (the BER-serialized scoped PDU), returning the
/// ciphertext and the `privParameters` salt to transport with it.
pub fn encrypt(
    protocol: PrivProtocol,
    priv_key: &[u8],
    engine_boots: i32,
    engine_time: i32,
    salt_counter: u64,
    plaintext: &[u8],
) -> SnmpResult<(Vec<u8>, Vec<u8>)> {
    if priv_key.len() < 16 {
        return Err(SnmpError::Priv(
            "privacy key must be at least 16 octets".into(),
        ));
    }
    match protocol {
        PrivProtocol::Des => {
            let (iv, salt) = des_iv(&priv_key[8..16], engine_boots, salt_counter);
            let cipher = DesCbcEnc::new_from_slices(&priv_key[..8], &iv)
                .map_err(|_| SnmpError::Priv("invalid DES key/IV length".into()))?;
            let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
            Ok((ciphertext, salt.to_vec()))
        }
        PrivProtocol::Aes => {
            let (iv, salt) = aes_iv(engine_boots, engine_time, salt_counter);
            let cipher = Aes128CfbEnc::new_from_slices(&priv_key[..16], &iv)
                .map_err(|_| SnmpError::Priv("invalid AES key/IV length".into()))?;
            let mut buf = plaintext.to_vec();
            cipher.encrypt(&mut buf);
            Ok((buf, salt.to_vec()))
        }
    }
}

/// Decrypts a received scoped PDU, given the `privParameters` salt it was
/// transported with.
pub fn decrypt(
    protocol: PrivProtocol,
    priv_key: &[u8],
    engine_boots: i32,
    engine_time: i32,
    salt: &[u8],
    ciphertext: &[u8],
) -> SnmpResult<Vec<u8>> {
    if priv_key.len() < 16 {
        return Err(SnmpError::Priv(
            "privacy key must be at least 16 octets".into(),
        ));
    }
    if salt.len() != SALT_LEN {
        return Err(SnmpError::Priv("privacy salt must be 8 octets".into()));
    }
    match protocol {
        PrivProtocol::Des => {
            let pre_iv = &priv_key[8..16];
            let mut iv = [0u8; 8];
            for i in 0..8 {
                iv[i] = pre_iv[i] ^ salt[i];
            }
            let cipher = DesCbcDec::new_from_slices(&priv_key[..8], &iv)
                .map_err(|_| SnmpError::Priv("invalid DES key/IV length".into()))?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| SnmpError::Priv("DES decryption failed (bad padding)".into()))
        }
        PrivProtocol::Aes => {
            let mut iv = [0u8; 16];
            iv[0..4].copy_from_slice(&(engine_boots as u32).to_be_bytes());
            iv[4..8].copy_from_slice(&(engine_time as u32).to_be_bytes());
            iv[8..16].copy_from_slice(salt);
            let cipher = Aes128CfbDec::new_from_slices(&priv_key[..16], &iv)
                .map_err(|_| SnmpError::Priv("invalid AES key/IV length".into()))?;
            let mut buf = ciphertext.to_vec();
            cipher.decrypt(&mut buf);
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn des_round_trips() {
        let key = vec![7u8; 16];
        let plaintext = b"a scoped pdu payload that spans blocks nicely";
        let (ciphertext, salt) = encrypt(PrivProtocol::Des, &key, 3, 100, 1, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let recovered = decrypt(PrivProtocol::Des, &key, 3, 100, &salt, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn aes_round_trips() {
        let key = vec![9u8; 16];
        let plaintext = b"another payload, this time for CFB128";
        let (ciphertext, salt) = encrypt(PrivProtocol::Aes, &key, 3, 100, 1, plaintext).unwrap();
        assert_ne!(ciphertext, plaintext);
        let recovered = decrypt(PrivProtocol::Aes, &key, 3, 100, &salt, &ciphertext).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn aes_ciphertext_has_no_padding_overhead() {
        let key = vec![1u8; 16];
        let plaintext = b"exactly how many bytes you give it";
        let (ciphertext, _) = encrypt(PrivProtocol::Aes, &key, 0, 0, 1, plaintext).unwrap();
        assert_eq!(ciphertext.len(), plaintext.len());
    }

    #[test]
    fn des_decrypt_fails_under_wrong_key() {
        let key = vec![7u8; 16];
        let other_key = vec![8u8; 16];
        let (ciphertext, salt) = encrypt(PrivProtocol::Des, &key, 3, 100, 1, b"12345678").unwrap();
        assert!(decrypt(PrivProtocol::Des, &other_key, 3, 100, &salt, &ciphertext).is_err());
    }
}
