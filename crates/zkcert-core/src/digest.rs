//! # Digest Newtypes
//!
//! 32-byte digest values used throughout the registry. Each digest role
//! is a distinct type: a certificate commitment ([`LeafHash`]) is not
//! interchangeable with a Merkle root ([`TreeRoot`]) or with the salted
//! identity hash ([`IdentityHash`]) that guards duplicate issuance.
//!
//! All digests render as lowercase hex and can be reconstructed from
//! 64-char hex strings, rejecting malformed input at the boundary.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Encode 32 bytes as lowercase hex.
pub fn bytes_to_hex(b: &[u8; 32]) -> String {
    b.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Decode a 64-char hex string to 32 bytes.
pub fn hex_to_bytes32(hex: &str) -> Result<[u8; 32], ValidationError> {
    let hex = hex.trim().to_lowercase();
    if hex.len() != 64 {
        return Err(ValidationError::InvalidHexLength(hex.len()));
    }
    let mut out = [0u8; 32];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let s = std::str::from_utf8(chunk).map_err(|e| ValidationError::InvalidHexChar {
            offset: i * 2,
            detail: e.to_string(),
        })?;
        out[i] = u8::from_str_radix(s, 16).map_err(|e| ValidationError::InvalidHexChar {
            offset: i * 2,
            detail: e.to_string(),
        })?;
    }
    Ok(out)
}

/// Helper macro for 32-byte digest newtypes: constructors, hex encoding,
/// and `Display`. Serde representation is the raw byte array.
macro_rules! impl_bytes32_newtype {
    ($ty:ident) => {
        impl $ty {
            /// Wrap raw 32 bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Parse from a 64-char hex string.
            pub fn from_hex(hex: &str) -> Result<Self, ValidationError> {
                Ok(Self(hex_to_bytes32(hex)?))
            }

            /// Access the raw 32-byte value.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Render as a lowercase hex string.
            pub fn to_hex(&self) -> String {
                bytes_to_hex(&self.0)
            }
        }

        impl From<[u8; 32]> for $ty {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }
    };
}

/// A certificate commitment: the content-addressed hash that occupies one
/// leaf slot of the sparse Merkle tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeafHash([u8; 32]);
impl_bytes32_newtype!(LeafHash);

/// A Merkle tree root. The registry's history is an append-only list of
/// these; the replication protocol ships suffixes of that list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeRoot([u8; 32]);
impl_bytes32_newtype!(TreeRoot);

/// A salted identity hash. At most one live certificate of a given kind
/// may reference an identity hash at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityHash([u8; 32]);
impl_bytes32_newtype!(IdentityHash);

/// An opaque identity commitment produced by the holder's wallet. The
/// registry stores it verbatim for audit; it never interprets the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityCommitment([u8; 32]);
impl_bytes32_newtype!(IdentityCommitment);
