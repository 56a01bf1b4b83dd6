//! Ed25519 signing key handling for the document processor.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub const SIGNATURE_LEN: usize = ed25519_dalek::SIGNATURE_LENGTH;

/// Signing key plus its derived verifying key.
pub struct Keypair {
    pub signing: SigningKey,
    pub verifying: VerifyingKey,
}

impl Keypair {
    pub fn generate() -> Self {
        Self::from_signing(SigningKey::generate(&mut OsRng))
    }

    pub fn from_signing(signing: SigningKey) -> Self {
        let verifying = signing.verifying_key();
        Keypair { signing, verifying }
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        self.signing.sign(msg)
    }

    pub fn verify(&self, msg: &[u8], sig: &Signature) -> bool {
        self.verifying.verify(msg, sig).is_ok()
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.verifying.to_bytes())
    }

    /// Load the seed at `path`, or generate one and write it there.
    pub fn load_or_generate(path: &Path) -> std::io::Result<Self> {
        match load_key(path)? {
            Some(signing) => {
                tracing::info!(path = %path.display(), "loaded signing key");
                Ok(Self::from_signing(signing))
            }
            None => {
                tracing::info!(path = %path.display(), "no usable signing key; generating one");
                let kp = Self::generate();
                save_key(path, &kp.signing)?;
                Ok(kp)
            }
        }
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Keypair({})", self.public_hex())
    }
}

/// Write (overwrite) the 32-byte private seed.
pub fn save_key(path: &Path, signing: &SigningKey) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut f = File::create(path)?;
    f.write_all(&signing.to_bytes())?;
    Ok(())
}

/// Read the 32-byte private seed. A missing file or one of the wrong length
/// yields `None`.
pub fn load_key(path: &Path) -> std::io::Result<Option<SigningKey>> {
    if !path.exists() {
        return Ok(None);
    }
    let mut buf = Vec::new();
    File::open(path)?.read_to_end(&mut buf)?;
    let Ok(seed) = <[u8; 32]>::try_from(buf.as_slice()) else {
        tracing::warn!(path = %path.display(), len = buf.len(), "ignoring malformed key file");
        return Ok(None);
    };
    Ok(Some(SigningKey::from_bytes(&seed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = Keypair::generate();
        let sig = kp.sign(b"payload");
        assert!(kp.verify(b"payload", &sig));
        assert!(!kp.verify(b"payl0ad", &sig));
    }

    #[test]
    fn key_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("key.bin");

        let first = Keypair::load_or_generate(&path).unwrap();
        assert!(path.exists());
        let second = Keypair::load_or_generate(&path).unwrap();
        assert_eq!(first.public_hex(), second.public_hex());
    }

    #[test]
    fn malformed_key_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.bin");
        fs::write(&path, b"short").unwrap();
        assert!(load_key(&path).unwrap().is_none());
    }
}
