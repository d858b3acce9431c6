//! RFC 3414 §A.2 key derivation: expand a password to a digest-sized key
//! (`Password_to_Key`), then localize it to a specific engine.

use digest::Digest;
use zeroize::Zeroizing;

use super::AuthProtocol;

/// The RFC mandates expanding the password to exactly this many octets
/// before the final digest, regardless of the original password length.
const EXPANDED_LEN: usize = 1_048_576;
const CHUNK_LEN: usize = 64;

fn password_to_key<D: Digest>(password: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut hasher = D::new();
    let mut chunk = [0u8; CHUNK_LEN];
    let mut idx = 0usize;
    for _ in 0..(EXPANDED_LEN / CHUNK_LEN) {
        for b in chunk.iter_mut() {
            *b = password[idx % password.len()];
            idx += 1;
        }
        hasher.update(chunk);
    }
    Zeroizing::new(hasher.finalize().to_vec())
}

fn localize_with<D: Digest>(password: &[u8], engine_id: &[u8]) -> Zeroizing<Vec<u8>> {
    let ku = password_to_key::<D>(password);
    let mut hasher = D::new();
    hasher.update(&*ku);
    hasher.update(engine_id);
    hasher.update(&*ku);
    Zeroizing::new(hasher.finalize().to_vec())
}

/// Localized key `Kul = H(Password_to_Key(password) ∥ engineID ∥
/// Password_to_Key(password))`, 16 octets for MD5 or 20 for SHA-1.
pub fn localize(password: &[u8], engine_id: &[u8], protocol: AuthProtocol) -> Zeroizing<Vec<u8>> {
    match protocol {
        AuthProtocol::Md5 => localize_with::<md5::Md5>(password, engine_id),
        AuthProtocol::Sha1 => localize_with::<sha1::Sha1>(password, engine_id),
    }
}
