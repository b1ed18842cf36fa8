use crate::errors::Error;
use chrono::prelude::*;
use chrono::Duration;
use serde_json::{Map, Value};

/// Serialize a UTC instant the way registered time claims store it.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[derive(Debug, PartialEq, Clone)]
/// A collection of claims that are passed as payload for a token.
///
/// The claims keep their insertion order when serialized, so a set of claims
/// round-trips through a token byte-for-byte.
pub struct Claims {
    list_of: Map<String, Value>,
}

impl Claims {
    /// Keys for registered claims, that are reserved for usage at top-level.
    pub const REGISTERED_CLAIMS: [&'static str; 7] =
        ["iss", "sub", "aud", "exp", "nbf", "iat", "jti"];

    /// Create a new `Claims` instance, setting:
    /// - `iat`, `nbf` to the current UTC time
    /// - `exp` to one hour from now
    ///
    /// Errors:
    /// - If adding one hour to the current time would overflow
    pub fn new() -> Result<Self, Error> {
        Self::new_expires_in(&Duration::hours(1))
    }

    /// Create a new `Claims` instance expiring in `duration`, setting:
    /// - `iat`, `nbf` to the current UTC time
    ///
    /// Errors:
    /// - If adding `duration` to the current time would overflow
    pub fn new_expires_in(duration: &Duration) -> Result<Self, Error> {
        let iat = Utc::now();
        let nbf = iat;
        let exp = iat.checked_add_signed(*duration).ok_or(Error::InvalidClaim)?;

        let mut claims = Self {
            list_of: Map::new(),
        };

        claims.issued_at(&format_datetime(&iat))?;
        claims.not_before(&format_datetime(&nbf))?;
        claims.expiration(&format_datetime(&exp))?;

        Ok(claims)
    }

    /// Removes the `exp` claim, indicating a token that never expires.
    pub fn non_expiring(&mut self) {
        self.list_of.remove("exp");
    }

    /// Add additional claims. If `claim` already exists, it is replaced with the new.
    ///
    /// Errors:
    /// - `claim` is a reserved claim (see [`Self::REGISTERED_CLAIMS`])
    pub fn add_additional(&mut self, claim: &str, value: impl Into<Value>) -> Result<(), Error> {
        if !Self::REGISTERED_CLAIMS.contains(&claim) {
            self.list_of.insert(claim.into(), value.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Checks whether a specific claim has been added to the list.
    ///
    /// E.g `contains_claim("iss") == true` if `iss` has been added before.
    pub fn contains_claim(&self, claim: &str) -> bool {
        self.list_of.contains_key(claim)
    }

    /// Return Some(claim value) if the claims list contains `claim`.
    /// None otherwise.
    pub fn get_claim(&self, claim: &str) -> Option<&Value> {
        self.list_of.get(claim)
    }

    /// Set the `iss` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `iss` is empty
    pub fn issuer(&mut self, iss: &str) -> Result<(), Error> {
        if !iss.is_empty() {
            self.list_of.insert("iss".into(), iss.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `sub` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `sub` is empty
    pub fn subject(&mut self, sub: &str) -> Result<(), Error> {
        if !sub.is_empty() {
            self.list_of.insert("sub".into(), sub.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `aud` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `aud` is empty
    pub fn audience(&mut self, aud: &str) -> Result<(), Error> {
        if !aud.is_empty() {
            self.list_of.insert("aud".into(), aud.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `exp` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `exp` cannot be parsed as an RFC 3339 timestamp
    pub fn expiration(&mut self, exp: &str) -> Result<(), Error> {
        if DateTime::parse_from_rfc3339(exp).is_ok() {
            self.list_of.insert("exp".into(), exp.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `nbf` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `nbf` cannot be parsed as an RFC 3339 timestamp
    pub fn not_before(&mut self, nbf: &str) -> Result<(), Error> {
        if DateTime::parse_from_rfc3339(nbf).is_ok() {
            self.list_of.insert("nbf".into(), nbf.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `iat` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `iat` cannot be parsed as an RFC 3339 timestamp
    pub fn issued_at(&mut self, iat: &str) -> Result<(), Error> {
        if DateTime::parse_from_rfc3339(iat).is_ok() {
            self.list_of.insert("iat".into(), iat.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Set the `jti` claim. If it already exists, replace it with the new.
    ///
    /// Errors:
    /// - `jti` is empty
    pub fn token_identifier(&mut self, jti: &str) -> Result<(), Error> {
        if !jti.is_empty() {
            self.list_of.insert("jti".into(), jti.into());
            Ok(())
        } else {
            Err(Error::InvalidClaim)
        }
    }

    /// Return the `iss` claim as a string, if present.
    pub fn get_issuer(&self) -> Option<&str> {
        self.get_claim("iss").and_then(Value::as_str)
    }

    /// Return the `sub` claim as a string, if present.
    pub fn get_subject(&self) -> Option<&str> {
        self.get_claim("sub").and_then(Value::as_str)
    }

    /// Return the `aud` claim as a string, if present.
    pub fn get_audience(&self) -> Option<&str> {
        self.get_claim("aud").and_then(Value::as_str)
    }

    /// Return the `jti` claim as a string, if present.
    pub fn get_token_identifier(&self) -> Option<&str> {
        self.get_claim("jti").and_then(Value::as_str)
    }

    /// Return the `exp` claim as a timestamp, if present.
    pub fn get_expiration(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("exp")
    }

    /// Return the `nbf` claim as a timestamp, if present.
    pub fn get_not_before(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("nbf")
    }

    /// Return the `iat` claim as a timestamp, if present.
    pub fn get_issued_at(&self) -> Option<DateTime<FixedOffset>> {
        self.get_datetime("iat")
    }

    fn get_datetime(&self, claim: &str) -> Option<DateTime<FixedOffset>> {
        // Timestamps were validated on their way in, by the setters or by
        // from_string.
        self.get_claim(claim)
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
    }

    /// Attempt to create `Claims` from a sequence of bytes.
    ///
    /// Errors:
    /// - `bytes` contains non-UTF-8 sequences
    /// - `bytes` does not decode as a JSON object
    /// - a registered claim has an invalid value
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_string(
            core::str::from_utf8(bytes).map_err(|_| Error::PayloadInvalidUtf8)?,
        )
    }

    /// Attempt to create `Claims` from a string.
    ///
    /// Errors:
    /// - `string` does not decode as a JSON object
    /// - a registered claim has an invalid value
    pub fn from_string(string: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(string).map_err(|_| Error::ClaimsJson)?;
        let list_of = match value {
            Value::Object(map) => map,
            _ => return Err(Error::ClaimsJson),
        };

        let claims = Self { list_of };

        // Registered claims are typed: strings throughout, and valid
        // RFC 3339 timestamps for the time claims.
        for claim in ["iss", "sub", "aud", "jti"] {
            if claims.contains_claim(claim) && claims.get_claim(claim).unwrap().as_str().is_none()
            {
                return Err(Error::InvalidClaim);
            }
        }
        for claim in ["exp", "nbf", "iat"] {
            if claims.contains_claim(claim) && claims.get_datetime(claim).is_none() {
                return Err(Error::InvalidClaim);
            }
        }

        Ok(claims)
    }

    /// Return the JSON serialized representation of `Self`.
    ///
    /// Errors:
    /// - `self` cannot be serialized as JSON
    pub fn to_string(&self) -> Result<String, Error> {
        serde_json::to_string(&self.list_of).map_err(|_| Error::ClaimsJson)
    }
}
