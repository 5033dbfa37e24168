use ed25519_dalek::{Signature, VerifyingKey};
use sha2::{Digest, Sha512};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use tracing::debug;

use super::error::{Result, UpgradeError};

/// Public half of the release signing key, hex encoded.
const SIGNING_KEY: &str = "f1ca5e00f7eefcd1cb34496753bcf21d46555ea2c1a989e9ad7e18b6923b273a";

/// Hash of the signed payload: the archive name, a newline, then the binary.
///
/// Binding the archive name means a signature made for one release or
/// platform does not verify for another, even if the binary bytes match.
pub fn signing_digest<R: Read>(archive_name: &str, binary: &mut R) -> io::Result<Sha512> {
    let mut hasher = Sha512::new();
    hasher.update(archive_name.as_bytes());
    hasher.update(b"\n");
    io::copy(binary, &mut hasher)?;
    Ok(hasher)
}

/// Checks release signatures (Ed25519ph) against a trusted public key.
#[derive(Debug, Clone)]
pub struct Verifier {
    key: VerifyingKey,
}

impl Verifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Verifier for the compiled-in release key.
    pub fn embedded() -> Result<Self> {
        let mut raw = [0u8; 32];
        hex::decode_to_slice(SIGNING_KEY, &mut raw)
            .map_err(|e| UpgradeError::InvalidKey(e.to_string()))?;
        let key = VerifyingKey::from_bytes(&raw)
            .map_err(|e| UpgradeError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    /// Verify the temp binary at `binary` for `archive_name`.
    ///
    /// On a bad or undecodable signature the temp binary is deleted before
    /// returning [`UpgradeError::SignatureInvalid`]. On success it is left in
    /// place for the installer.
    pub fn verify(&self, archive_name: &str, binary: &Path, signature: &[u8]) -> Result<()> {
        debug!("checking signature for {}", archive_name);

        let mut fd = fs::File::open(binary)?;
        let digest = signing_digest(archive_name, &mut fd)?;
        drop(fd);

        let verified = decode_signature(signature)
            .and_then(|sig| self.key.verify_prehashed(digest, None, &sig).ok());
        if verified.is_none() {
            let _ = fs::remove_file(binary);
            return Err(UpgradeError::SignatureInvalid);
        }
        Ok(())
    }
}

/// Accept either the raw 64 signature bytes or their hex encoding.
fn decode_signature(data: &[u8]) -> Option<Signature> {
    if let Ok(raw) = <[u8; 64]>::try_from(data) {
        return Some(Signature::from_bytes(&raw));
    }
    let text = std::str::from_utf8(data).ok()?.trim();
    let mut raw = [0u8; 64];
    hex::decode_to_slice(text, &mut raw).ok()?;
    Some(Signature::from_bytes(&raw))
}
