//! PASERK: serialized keys and key identifiers.
//!
//! Keys serialize to `k{version}.{type}.{base64url-body}` strings and parse
//! back with [`TryFrom`]. [`Id`] derives the matching `lid`/`sid`/`pid`
//! identifier, which is safe to expose (e.g. as a `kid` footer claim) where
//! the key itself is not. Key-wrapping, sealing and password-based modes are
//! not provided.

use crate::encoding::{decode_b64, encode_b64};
use crate::errors::Error;
use crate::keys::{AsymmetricPublicKey, AsymmetricSecretKey, SymmetricKey};
use crate::version::private::Version;
use crate::version2::V2;
use crate::version3::V3;
use crate::version4::V4;
use core::fmt::Write;
use orion::hazardous::hash::blake2::blake2b::Blake2b;
use orion::hazardous::hash::sha2::sha384::Sha384;

/// Number of bytes in a key identifier digest.
const ID_DIGEST_LEN: usize = 33;

/// Number of characters in an encoded key identifier.
const ID_ENCODED_LEN: usize = 44;

/// Validate an input string to check if it is a well-formatted PASERK.
///
/// Return the decoded Base64 body of the serialized string.
fn validate_paserk_string(
    input: &str,
    version_id: &str,
    type_id: &str,
) -> Result<Vec<u8>, Error> {
    let split = input.split('.').collect::<Vec<&str>>();
    if split.len() != 3 {
        return Err(Error::PaserkFormat);
    }

    if split[0] == version_id && split[1] == type_id {
        decode_b64(split[2]).map_err(|_| Error::PaserkFormat)
    } else {
        Err(Error::PaserkFormat)
    }
}

/// Compute a v2/v4 identifier: BLAKE2b over the id header and the PASERK
/// string, truncated to 33 bytes.
fn id_blake2b(header: &str, paserk_string: &str) -> String {
    let mut hasher = Blake2b::new(ID_DIGEST_LEN).unwrap();
    hasher.update(header.as_bytes()).unwrap();
    hasher.update(paserk_string.as_bytes()).unwrap();
    let identifier = encode_b64(hasher.finalize().unwrap().as_ref()).unwrap();
    debug_assert_eq!(identifier.len(), ID_ENCODED_LEN);

    identifier
}

/// Compute a v3 identifier: SHA-384 over the id header and the PASERK
/// string, truncated to 33 bytes.
fn id_sha384(header: &str, paserk_string: &str) -> String {
    let mut hasher = Sha384::new();
    hasher.update(header.as_bytes()).unwrap();
    hasher.update(paserk_string.as_bytes()).unwrap();
    let identifier =
        encode_b64(&hasher.finalize().unwrap().as_ref()[..ID_DIGEST_LEN]).unwrap();
    debug_assert_eq!(identifier.len(), ID_ENCODED_LEN);

    identifier
}

/// A trait for serializing a type as PASERK.
pub trait FormatAsPaserk {
    /// Format a key as PASERK.
    fn fmt(&self, write: &mut dyn Write) -> core::fmt::Result;
}

impl<V: Version> FormatAsPaserk for SymmetricKey<V> {
    fn fmt(&self, write: &mut dyn Write) -> core::fmt::Result {
        write.write_str(V::PASERK_VERSION)?;
        write.write_str(".local.")?;
        write.write_str(&encode_b64(self.as_bytes()).map_err(|_| core::fmt::Error)?)
    }
}

impl<V: Version> FormatAsPaserk for AsymmetricSecretKey<V> {
    fn fmt(&self, write: &mut dyn Write) -> core::fmt::Result {
        write.write_str(V::PASERK_VERSION)?;
        write.write_str(".secret.")?;
        write.write_str(&encode_b64(self.as_bytes()).map_err(|_| core::fmt::Error)?)
    }
}

impl<V: Version> FormatAsPaserk for AsymmetricPublicKey<V> {
    fn fmt(&self, write: &mut dyn Write) -> core::fmt::Result {
        write.write_str(V::PASERK_VERSION)?;
        write.write_str(".public.")?;
        write.write_str(&encode_b64(self.as_bytes()).map_err(|_| core::fmt::Error)?)
    }
}

impl<V: Version> TryFrom<&str> for SymmetricKey<V> {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let buf = validate_paserk_string(value, V::PASERK_VERSION, "local")?;
        Self::from(&buf).map_err(|_| Error::PaserkFormat)
    }
}

impl<V: Version> TryFrom<&str> for AsymmetricSecretKey<V> {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        use zeroize::Zeroize;

        let mut buf = validate_paserk_string(value, V::PASERK_VERSION, "secret")?;
        let ret = Self::from(&buf).map_err(|_| Error::PaserkFormat)?;
        buf.iter_mut().zeroize();

        Ok(ret)
    }
}

impl<V: Version> TryFrom<&str> for AsymmetricPublicKey<V> {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let buf = validate_paserk_string(value, V::PASERK_VERSION, "public")?;
        Self::from(&buf).map_err(|_| Error::PaserkFormat)
    }
}

#[derive(Debug, Clone)]
/// A unique identifier for a given PASERK.
///
/// Identifiers are deterministic over the key's PASERK serialization, so
/// equal keys yield equal ids, and never reveal key material.
pub struct Id {
    header: String,
    identifier: String,
}

impl PartialEq<Id> for Id {
    fn eq(&self, other: &Id) -> bool {
        use subtle::ConstantTimeEq;
        (self.header.as_bytes().ct_eq(other.header.as_bytes())
            & self
                .identifier
                .as_bytes()
                .ct_eq(other.identifier.as_bytes()))
        .into()
    }
}

impl Eq for Id {}

impl From<&SymmetricKey<V2>> for Id {
    fn from(key: &SymmetricKey<V2>) -> Self {
        let header = String::from("k2.lid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl From<&SymmetricKey<V3>> for Id {
    fn from(key: &SymmetricKey<V3>) -> Self {
        let header = String::from("k3.lid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_sha384(&header, &paserk_string),
            header,
        }
    }
}

impl From<&SymmetricKey<V4>> for Id {
    fn from(key: &SymmetricKey<V4>) -> Self {
        let header = String::from("k4.lid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricSecretKey<V2>> for Id {
    fn from(key: &AsymmetricSecretKey<V2>) -> Self {
        let header = String::from("k2.sid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricSecretKey<V3>> for Id {
    fn from(key: &AsymmetricSecretKey<V3>) -> Self {
        let header = String::from("k3.sid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_sha384(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricSecretKey<V4>> for Id {
    fn from(key: &AsymmetricSecretKey<V4>) -> Self {
        let header = String::from("k4.sid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricPublicKey<V2>> for Id {
    fn from(key: &AsymmetricPublicKey<V2>) -> Self {
        let header = String::from("k2.pid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricPublicKey<V3>> for Id {
    fn from(key: &AsymmetricPublicKey<V3>) -> Self {
        let header = String::from("k3.pid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_sha384(&header, &paserk_string),
            header,
        }
    }
}

impl From<&AsymmetricPublicKey<V4>> for Id {
    fn from(key: &AsymmetricPublicKey<V4>) -> Self {
        let header = String::from("k4.pid.");
        let mut paserk_string = String::new();
        key.fmt(&mut paserk_string).unwrap();

        Self {
            identifier: id_blake2b(&header, &paserk_string),
            header,
        }
    }
}

impl FormatAsPaserk for Id {
    fn fmt(&self, write: &mut dyn Write) -> core::fmt::Result {
        write.write_str(&self.header)?;
        write.write_str(&self.identifier)
    }
}

impl TryFrom<&str> for Id {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let split = value.split('.').collect::<Vec<&str>>();
        if split.len() != 3 {
            return Err(Error::PaserkFormat);
        }
        if !matches!(split[0], "k2" | "k3" | "k4") {
            return Err(Error::PaserkFormat);
        }
        if !matches!(split[1], "lid" | "sid" | "pid") {
            return Err(Error::PaserkFormat);
        }

        let body = decode_b64(split[2]).map_err(|_| Error::PaserkFormat)?;
        if body.len() != ID_DIGEST_LEN {
            return Err(Error::PaserkFormat);
        }

        Ok(Self {
            header: format!("{}.{}.", split[0], split[1]),
            identifier: split[2].to_string(),
        })
    }
}
