// ── Credential vault ──
//
// Device passwords are stored as AES-256-GCM ciphertext under a key derived
// (PBKDF2-HMAC-SHA256) from the master passphrase and a per-secret salt.
// The passphrase lives only in memory and is swapped atomically on rotation.

use std::num::NonZeroU32;
use std::sync::Arc;

use arc_swap::ArcSwap;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use ring::aead::{self, AES_256_GCM, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// PBKDF2 rounds used unless overridden.
pub const DEFAULT_ITERATIONS: u32 = 480_000;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Wrong passphrase, corrupt salt, tampered or truncated ciphertext.
    /// Deliberately carries no detail.
    #[error("secret could not be decrypted with the active master passphrase")]
    Decryption,

    #[error("encryption failed")]
    Encryption,

    #[error("system random source unavailable")]
    Random,
}

/// An encrypted secret as stored in the `secret` / `salt` columns.
///
/// Both halves are URL-safe base64. The ciphertext is
/// `nonce (12) || ciphertext || tag (16)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SealedSecret {
    pub ciphertext: String,
    pub salt: String,
}

/// Encrypts and decrypts device secrets under the master passphrase.
pub struct Vault {
    passphrase: ArcSwap<SecretString>,
    iterations: NonZeroU32,
    rng: SystemRandom,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl Vault {
    pub fn new(passphrase: SecretString) -> Self {
        Self::with_iterations(passphrase, DEFAULT_ITERATIONS)
    }

    /// Use a non-default PBKDF2 round count (0 is treated as 1).
    pub fn with_iterations(passphrase: SecretString, iterations: u32) -> Self {
        Self {
            passphrase: ArcSwap::from_pointee(passphrase),
            iterations: NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            rng: SystemRandom::new(),
        }
    }

    /// Encrypt under the active passphrase.
    pub fn encrypt(&self, plaintext: &str) -> Result<SealedSecret, VaultError> {
        let passphrase = self.passphrase.load_full();
        self.encrypt_with(plaintext, &passphrase)
    }

    /// Encrypt under an explicit passphrase (used during rotation).
    pub fn encrypt_with(
        &self,
        plaintext: &str,
        passphrase: &SecretString,
    ) -> Result<SealedSecret, VaultError> {
        let mut salt = [0u8; SALT_LEN];
        self.rng.fill(&mut salt).map_err(|_| VaultError::Random)?;
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VaultError::Random)?;

        let key = self.derive_key(passphrase, &salt)?;
        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            aead::Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| VaultError::Encryption)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend(in_out);
        Ok(SealedSecret {
            ciphertext: URL_SAFE.encode(sealed),
            salt: URL_SAFE.encode(salt),
        })
    }

    /// Decrypt under the active passphrase.
    pub fn decrypt(&self, sealed: &SealedSecret) -> Result<SecretString, VaultError> {
        let passphrase = self.passphrase.load_full();
        self.decrypt_with(sealed, &passphrase)
    }

    pub fn decrypt_with(
        &self,
        sealed: &SealedSecret,
        passphrase: &SecretString,
    ) -> Result<SecretString, VaultError> {
        let salt = URL_SAFE
            .decode(&sealed.salt)
            .map_err(|_| VaultError::Decryption)?;
        let raw = URL_SAFE
            .decode(&sealed.ciphertext)
            .map_err(|_| VaultError::Decryption)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Decryption);
        }

        let (nonce_bytes, encrypted) = raw.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| VaultError::Decryption)?;
        let key = self
            .derive_key(passphrase, &salt)
            .map_err(|_| VaultError::Decryption)?;

        let mut in_out = encrypted.to_vec();
        let plaintext = key
            .open_in_place(nonce, aead::Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Decryption)?;
        let text = String::from_utf8(plaintext.to_vec()).map_err(|_| VaultError::Decryption)?;
        Ok(SecretString::from(text))
    }

    /// Replace the active passphrase. Callers must have re-encrypted every
    /// stored secret first.
    pub fn set_passphrase(&self, passphrase: SecretString) {
        self.passphrase.store(Arc::new(passphrase));
    }

    /// Whether `candidate` equals the active passphrase.
    pub fn is_active(&self, candidate: &SecretString) -> bool {
        self.passphrase.load().expose_secret() == candidate.expose_secret()
    }

    fn derive_key(&self, passphrase: &SecretString, salt: &[u8]) -> Result<LessSafeKey, VaultError> {
        let mut key = [0u8; KEY_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            self.iterations,
            salt,
            passphrase.expose_secret().as_bytes(),
            &mut key,
        );
        let unbound = UnboundKey::new(&AES_256_GCM, &key).map_err(|_| VaultError::Encryption)?;
        Ok(LessSafeKey::new(unbound))
    }
}
