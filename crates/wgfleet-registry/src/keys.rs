//! X25519 key material in WireGuard's base64 wire format

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use wgfleet_proto::FleetError;
use x25519_dalek::{PublicKey, StaticSecret};

/// A freshly generated peer keypair, base64-encoded.
///
/// The private half is handed to the registry exactly once at creation;
/// it cannot be re-derived afterwards.
#[derive(Clone)]
pub struct Keypair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl Keypair {
    /// Generate a keypair from OS randomness.
    ///
    /// Fails with `CryptoFailure` when the randomness source is unavailable.
    pub fn generate() -> Result<Self, FleetError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| FleetError::CryptoFailure(e.to_string()))?;

        let private = StaticSecret::from(seed);
        let public = PublicKey::from(&private);

        Ok(Self {
            private_key: STANDARD.encode(private.to_bytes()),
            public_key: STANDARD.encode(public.as_bytes()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_valid_base64() {
        let keypair = Keypair::generate().unwrap();
        let private = STANDARD.decode(&keypair.private_key).unwrap();
        let public = STANDARD.decode(&keypair.public_key).unwrap();
        assert_eq!(private.len(), 32);
        assert_eq!(public.len(), 32);
    }

    #[test]
    fn test_public_key_matches_private() {
        let keypair = Keypair::generate().unwrap();
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&STANDARD.decode(&keypair.private_key).unwrap());
        let rederived = PublicKey::from(&StaticSecret::from(seed));
        assert_eq!(STANDARD.encode(rederived.as_bytes()), keypair.public_key);
    }

    #[test]
    fn test_keypairs_are_unique() {
        let a = Keypair::generate().unwrap();
        let b = Keypair::generate().unwrap();
        assert_ne!(a.public_key, b.public_key);
    }

    #[test]
    fn test_debug_hides_private_key() {
        let keypair = Keypair::generate().unwrap();
        let debug = format!("{:?}", keypair);
        assert!(!debug.contains(&keypair.private_key));
    }
}
