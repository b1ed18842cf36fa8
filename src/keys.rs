//! Version-tagged key material.
//!
//! A key value carries the version it was validated for as a type
//! parameter, so handing a key to an operation of another version is a
//! compile error rather than a runtime one. Secret material is scrubbed
//! on drop, compared in constant time and kept out of `Debug` output.

use crate::errors::Error;
use crate::version::private::Version;
use core::fmt;
use core::marker::PhantomData;

/// A type `T` that can be generated for a given version `V`.
pub trait Generate<T, V: Version> {
    /// Generate `T` using the OS CSPRNG.
    fn generate() -> Result<T, Error>;
}

/// Decode a hex-encoded key string. Upper- and lowercase digits are
/// accepted; separators and odd lengths are not.
fn decode_hex(hex_str: &str) -> Result<Vec<u8>, Error> {
    hex::decode(hex_str).map_err(|_| Error::Key)
}

/// Validated raw key material, shared by every key kind.
pub(crate) struct KeyBytes(Vec<u8>);

impl KeyBytes {
    fn copy_from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl Drop for KeyBytes {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.0.zeroize();
    }
}

impl Clone for KeyBytes {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl PartialEq for KeyBytes {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for KeyBytes {}

impl fmt::Debug for KeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<scrubbed>")
    }
}

/// An Ed25519 secret key on the wire is the seed followed by the public
/// half. Reject byte strings whose trailing half is not the public key the
/// seed expands to.
pub(crate) fn validate_ed25519_secret(key_bytes: &[u8]) -> Result<(), Error> {
    use subtle::ConstantTimeEq;

    debug_assert!(key_bytes.len() >= 32);
    let seed = ed25519_compact::Seed::from_slice(&key_bytes[..32]).map_err(|_| Error::Key)?;
    let expanded = ed25519_compact::KeyPair::from_seed(seed);

    if bool::from(expanded.pk.as_slice().ct_eq(&key_bytes[32..])) {
        Ok(())
    } else {
        Err(Error::Key)
    }
}

#[derive(Clone, PartialEq, Eq)]
/// A symmetric key used for `.local` tokens, given a version `V`.
pub struct SymmetricKey<V> {
    material: KeyBytes,
    version: PhantomData<V>,
}

impl<V: Version> SymmetricKey<V> {
    /// Create a `SymmetricKey` from `bytes`.
    pub fn from(bytes: &[u8]) -> Result<Self, Error> {
        V::validate_local_key(bytes)?;

        Ok(Self {
            material: KeyBytes::copy_from(bytes),
            version: PhantomData,
        })
    }

    /// Create a `SymmetricKey` from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        Self::from(&decode_hex(hex_str)?)
    }

    /// Return this as a byte-slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.material.as_slice()
    }
}

impl<V> fmt::Debug for SymmetricKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({:?})", self.material)
    }
}

#[derive(Clone, PartialEq, Eq)]
/// An asymmetric secret key used for `.public` tokens, given a version `V`.
///
/// For Ed25519, which is used in V2 and V4, this is the seed concatenated
/// with the public key. For V3, this is the P-384 scalar in big-endian.
pub struct AsymmetricSecretKey<V> {
    material: KeyBytes,
    version: PhantomData<V>,
}

impl<V: Version> AsymmetricSecretKey<V> {
    /// Create an `AsymmetricSecretKey` from `bytes`.
    pub fn from(bytes: &[u8]) -> Result<Self, Error> {
        V::validate_secret_key(bytes)?;

        Ok(Self {
            material: KeyBytes::copy_from(bytes),
            version: PhantomData,
        })
    }

    /// Create an `AsymmetricSecretKey` from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        Self::from(&decode_hex(hex_str)?)
    }

    /// Return this as a byte-slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.material.as_slice()
    }
}

impl<V> fmt::Debug for AsymmetricSecretKey<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AsymmetricSecretKey({:?})", self.material)
    }
}

#[derive(Clone, PartialEq, Eq)]
/// An asymmetric public key used for `.public` tokens, given a version `V`.
pub struct AsymmetricPublicKey<V> {
    material: KeyBytes,
    version: PhantomData<V>,
}

impl<V: Version> AsymmetricPublicKey<V> {
    /// Create an `AsymmetricPublicKey` from `bytes`.
    pub fn from(bytes: &[u8]) -> Result<Self, Error> {
        V::validate_public_key(bytes)?;

        Ok(Self {
            material: KeyBytes::copy_from(bytes),
            version: PhantomData,
        })
    }

    /// Create an `AsymmetricPublicKey` from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, Error> {
        Self::from(&decode_hex(hex_str)?)
    }

    /// Return this as a byte-slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.material.as_slice()
    }
}

impl<V> fmt::Debug for AsymmetricPublicKey<V> {
    // Public keys are not secret, so their bytes may be shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AsymmetricPublicKey({})",
            hex::encode(self.material.as_slice())
        )
    }
}

#[derive(Debug, Clone)]
/// A keypair of an [`AsymmetricSecretKey`] and its corresponding [`AsymmetricPublicKey`].
pub struct AsymmetricKeyPair<V> {
    /// The [`AsymmetricPublicKey`].
    pub public: AsymmetricPublicKey<V>,
    /// The [`AsymmetricSecretKey`].
    pub secret: AsymmetricSecretKey<V>,
}
