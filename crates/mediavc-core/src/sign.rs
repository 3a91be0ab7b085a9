//! Ed25519 signing of version roots.

use crate::link::Link;
use crate::version::Version;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use ed25519_dalek::{Signature, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

/// Produces signatures over version roots.
pub trait Signer: Send + Sync {
    /// Sign the root's digest bytes.
    fn sign_root(&self, root: &Link) -> Vec<u8>;
}

/// Ed25519 signer backed by an in-memory secret key.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Wrap an existing key.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Generate a fresh key from the OS RNG.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Build from a 32-byte seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(SigningKey::from_bytes(seed))
    }

    /// Build from an unpadded base64url seed.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not base64url or not 32 bytes.
    pub fn from_encoded_seed(text: &str) -> Result<Self, SignError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(text.trim())
            .map_err(|e| SignError::InvalidSeed(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| SignError::InvalidSeed(format!("expected 32 bytes, got {}", bytes.len())))?;
        Ok(Self::from_seed(&seed))
    }

    /// Seed as unpadded base64url.
    #[must_use]
    pub fn encoded_seed(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.key.to_bytes())
    }

    /// Public half of the key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }
}

impl Signer for Ed25519Signer {
    fn sign_root(&self, root: &Link) -> Vec<u8> {
        use ed25519_dalek::Signer as _;
        self.key.sign(root.as_bytes()).to_bytes().to_vec()
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &URL_SAFE_NO_PAD.encode(self.verifying_key().as_bytes()))
            .finish()
    }
}

/// Check a raw signature over a root. Any malformed input is just `false`.
#[must_use]
pub fn verify_signature(public_key: &VerifyingKey, root: &Link, signature: &[u8]) -> bool {
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    public_key.verify(root.as_bytes(), &signature).is_ok()
}

/// Check the signature stored in a version's details.
#[must_use]
pub fn verify_version(public_key: &VerifyingKey, version: &Version) -> bool {
    let Some(encoded) = version.details.signature.as_deref() else {
        return false;
    };
    match STANDARD.decode(encoded) {
        Ok(signature) => verify_signature(public_key, &version.root, &signature),
        Err(_) => false,
    }
}

/// Encode a signature for storage in version details.
#[must_use]
pub(crate) fn encode_signature(signature: &[u8]) -> String {
    STANDARD.encode(signature)
}

/// Key handling errors.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// Seed text could not be decoded
    #[error("invalid signing key seed: {0}")]
    InvalidSeed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_verifies_for_same_root_only() {
        let signer = Ed25519Signer::generate();
        let root = Link::digest(b"root");
        let sig = signer.sign_root(&root);

        assert!(verify_signature(&signer.verifying_key(), &root, &sig));
        assert!(!verify_signature(&signer.verifying_key(), &Link::digest(b"other"), &sig));
        assert!(!verify_signature(&Ed25519Signer::generate().verifying_key(), &root, &sig));
        assert!(!verify_signature(&signer.verifying_key(), &root, b"short"));
    }

    #[test]
    fn seed_round_trips() {
        let signer = Ed25519Signer::generate();
        let restored = Ed25519Signer::from_encoded_seed(&signer.encoded_seed()).unwrap();
        assert_eq!(restored.verifying_key(), signer.verifying_key());
        assert!(Ed25519Signer::from_encoded_seed("AAAA").is_err());
    }
}
