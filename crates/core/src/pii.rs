//! Per-tenant encryption of personal fields.
//!
//! Customers and suppliers carry personal data (name, phone, address) that
//! is encrypted with the tenant's data-encryption key before it enters the
//! write path. The key itself comes from an external key-management
//! collaborator; this module only performs the field transformation.
//!
//! Ciphertexts are AES-256-GCM with a random 96-bit nonce, serialized as
//! `enc:v1:<nonce hex>:<ciphertext hex>`. The context string is bound as
//! associated data so a ciphertext cannot be replayed into a different
//! column or tenant.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use crate::error::CoreError;
use crate::hashing;
use crate::normalize::canonical_key;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Tenant key
// ---------------------------------------------------------------------------

pub const TENANT_KEY_LEN: usize = 32;

const ENC_PREFIX: &str = "enc:v1:";
const NONCE_LEN: usize = 12;

/// A per-tenant data-encryption key.
#[derive(Clone)]
pub struct TenantKey([u8; TENANT_KEY_LEN]);

impl TenantKey {
    pub fn new(bytes: [u8; TENANT_KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        <[u8; TENANT_KEY_LEN]>::try_from(bytes).ok().map(Self)
    }
}

// Key material must never reach logs.
impl std::fmt::Debug for TenantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TenantKey(..)")
    }
}

// ---------------------------------------------------------------------------
// Field encryption
// ---------------------------------------------------------------------------

/// Encrypt one personal field under the tenant key.
pub fn encrypt_field(plaintext: &str, context: &str, key: &TenantKey) -> Result<String, CoreError> {
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|_| CoreError::Internal("Invalid tenant key length".to_string()))?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext.as_bytes(),
                aad: context.as_bytes(),
            },
        )
        .map_err(|_| CoreError::Internal("Field encryption failed".to_string()))?;
    Ok(format!(
        "{ENC_PREFIX}{}:{}",
        hex_encode(&nonce),
        hex_encode(&ciphertext)
    ))
}

/// Decrypt a field produced by [`encrypt_field`]. The same context string
/// must be supplied; a mismatch fails authentication.
pub fn decrypt_field(stored: &str, context: &str, key: &TenantKey) -> Result<String, CoreError> {
    let body = stored
        .strip_prefix(ENC_PREFIX)
        .ok_or_else(|| CoreError::Validation("Value is not an encrypted field".to_string()))?;
    let (nonce_hex, ct_hex) = body
        .split_once(':')
        .ok_or_else(|| CoreError::Validation("Malformed encrypted field".to_string()))?;
    let nonce = hex_decode(nonce_hex)
        .filter(|n| n.len() == NONCE_LEN)
        .ok_or_else(|| CoreError::Validation("Malformed encrypted field nonce".to_string()))?;
    let ciphertext = hex_decode(ct_hex)
        .ok_or_else(|| CoreError::Validation("Malformed encrypted field body".to_string()))?;
    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|_| CoreError::Internal("Invalid tenant key length".to_string()))?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: &ciphertext,
                aad: context.as_bytes(),
            },
        )
        .map_err(|_| CoreError::Validation("Field decryption failed".to_string()))?;
    String::from_utf8(plaintext)
        .map_err(|_| CoreError::Validation("Decrypted field is not UTF-8".to_string()))
}

/// Whether a stored value is an encrypted field.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENC_PREFIX)
}

// ---------------------------------------------------------------------------
// Deterministic contact helpers
// ---------------------------------------------------------------------------

/// Deterministic placeholder phone for a contact row that carried none.
///
/// Derived from the tenant and contact name so re-importing the same file
/// collapses onto the same persisted row instead of minting a duplicate.
pub fn generated_phone(tenant_id: &EntityId, name: &str) -> String {
    format!(
        "missing-{}",
        hashing::short_fingerprint(&[&tenant_id.to_string(), &canonical_key(name)])
    )
}

/// Deterministic lookup hash for a phone value. Stored beside the
/// ciphertext as the natural key, keeping upserts idempotent even though
/// the encrypted column differs on every run.
pub fn phone_hash(tenant_id: &EntityId, phone: &str) -> String {
    hashing::fingerprint(&[&tenant_id.to_string(), &canonical_key(phone)])
}

/// Deterministic lookup hash for a contact display name, used to resolve
/// references (a sale naming its customer) without decrypting the column.
pub fn name_hash(tenant_id: &EntityId, name: &str) -> String {
    hashing::fingerprint(&[&tenant_id.to_string(), &canonical_key(name)])
}

// ---------------------------------------------------------------------------
// Hex
// ---------------------------------------------------------------------------

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn hex_decode(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
