//! Signer trait and implementations.
//!
//! A `Signer` knows which account it signs for and produces secp256k1
//! signatures over transaction sign documents.
//!
//! # Implementations
//!
//! - [`InMemorySigner`] - Single key stored in memory
//! - [`EnvSigner`] - Key loaded from environment variables
//!
//! # Example
//!
//! ```rust,no_run
//! use bluzelle_kit::{Bluzelle, InMemorySigner};
//!
//! # fn example() -> Result<(), bluzelle_kit::Error> {
//! let signer = InMemorySigner::new(
//!     "bluzelle1qyqszqgpqyqszqgpqyqszqgpqyqszqgpjnp7du",
//!     "0101010101010101010101010101010101010101010101010101010101010101",
//! )?;
//!
//! let bz = Bluzelle::builder("http://localhost:1317", "bluzelle", "my-namespace")
//!     .signer(signer)
//!     .build();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use k256::ecdsa::signature::DigestSigner;
use k256::ecdsa::{Signature, SigningKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256};

use crate::error::Error;

/// Future returned by [`Signer::sign`]: a 64-byte `r || s` signature.
pub type SignFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>, Error>> + Send + 'a>>;

// ============================================================================
// Signer Trait
// ============================================================================

/// Trait for signing transactions.
///
/// Implement this for hardware wallets or remote key services; the
/// broadcaster only needs the account address, the compressed public key and
/// an asynchronous signature over the sign bytes.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use bluzelle_kit::{Signer, SignFuture};
///
/// struct RemoteSigner { address: String, public_key: Vec<u8> }
///
/// impl Signer for RemoteSigner {
///     fn address(&self) -> &str { &self.address }
///     fn public_key(&self) -> &[u8] { &self.public_key }
///     fn sign<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
///         Box::pin(async move { call_remote_signer(message).await })
///     }
/// }
/// ```
pub trait Signer: Send + Sync {
    /// The bech32 account address this signer signs for.
    fn address(&self) -> &str;

    /// The 33-byte compressed secp256k1 public key.
    fn public_key(&self) -> &[u8];

    /// Sign `message` (SHA-256, secp256k1, low-S).
    fn sign<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a>;
}

/// Implement `Signer` for `Arc<dyn Signer>` for convenience.
impl Signer for Arc<dyn Signer> {
    fn address(&self) -> &str {
        (**self).address()
    }

    fn public_key(&self) -> &[u8] {
        (**self).public_key()
    }

    fn sign<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        (**self).sign(message)
    }
}

// ============================================================================
// InMemorySigner
// ============================================================================

/// A signer with a single secp256k1 key stored in memory.
#[derive(Clone)]
pub struct InMemorySigner {
    address: String,
    signing_key: SigningKey,
    public_key: Vec<u8>,
}

impl InMemorySigner {
    /// Create a new signer from an account address and a hex-encoded
    /// 32-byte secret key.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty or the key is not a valid
    /// secp256k1 scalar.
    pub fn new(address: impl AsRef<str>, secret_key_hex: impl AsRef<str>) -> Result<Self, Error> {
        let address = address.as_ref().trim();
        if address.is_empty() {
            return Err(Error::Config("signer address is empty".to_string()));
        }

        let hex_key = secret_key_hex.as_ref().trim();
        let hex_key = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let bytes = hex::decode(hex_key)
            .map_err(|e| Error::Signing(format!("invalid secret key hex: {e}")))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|_| Error::Signing("invalid secp256k1 secret key".to_string()))?;

        Ok(Self::from_signing_key(address, signing_key))
    }

    /// Create a signer from a `k256` signing key directly.
    pub fn from_signing_key(address: impl Into<String>, signing_key: SigningKey) -> Self {
        let public_key = signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        Self {
            address: address.into(),
            signing_key,
            public_key,
        }
    }
}

impl std::fmt::Debug for InMemorySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySigner")
            .field("address", &self.address)
            .field("public_key", &hex::encode(&self.public_key))
            .finish()
    }
}

impl Signer for InMemorySigner {
    fn address(&self) -> &str {
        &self.address
    }

    fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    fn sign<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        let digest = Sha256::new_with_prefix(message);
        let signature: Signature = self.signing_key.sign_digest(digest);
        let bytes = signature.to_bytes().to_vec();
        Box::pin(async move { Ok(bytes) })
    }
}

// ============================================================================
// EnvSigner
// ============================================================================

/// A signer loaded from `BLUZELLE_ADDRESS` and `BLUZELLE_PRIVATE_KEY`.
#[derive(Clone, Debug)]
pub struct EnvSigner {
    inner: InMemorySigner,
}

impl EnvSigner {
    pub const ADDRESS_VAR: &'static str = "BLUZELLE_ADDRESS";
    pub const PRIVATE_KEY_VAR: &'static str = "BLUZELLE_PRIVATE_KEY";

    /// Load the signer from the default environment variables.
    pub fn new() -> Result<Self, Error> {
        Self::from_vars(Self::ADDRESS_VAR, Self::PRIVATE_KEY_VAR)
    }

    /// Load the signer from custom environment variable names.
    pub fn from_vars(address_var: &str, private_key_var: &str) -> Result<Self, Error> {
        let address = std::env::var(address_var)
            .map_err(|_| Error::Config(format!("{address_var} is not set")))?;
        let private_key = std::env::var(private_key_var)
            .map_err(|_| Error::Config(format!("{private_key_var} is not set")))?;
        Ok(Self {
            inner: InMemorySigner::new(address, private_key)?,
        })
    }
}

impl Signer for EnvSigner {
    fn address(&self) -> &str {
        self.inner.address()
    }

    fn public_key(&self) -> &[u8] {
        self.inner.public_key()
    }

    fn sign<'a>(&'a self, message: &'a [u8]) -> SignFuture<'a> {
        self.inner.sign(message)
    }
}
