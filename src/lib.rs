//! # Getting started
//! This library has two levels for working with tokens. The high level is
//! the [`parser::Parser`]: it parses, verifies and claim-validates tokens of
//! any supported version in one call, using [`claims::Claims`] and
//! [`parser::Rule`]s. The low level is the per-version modules
//! ([`version2`], [`version3`], [`version4`]), where payloads are provided
//! as byte-slices and claims handling is up to the caller.
//!
//! ## Creating and verifying public tokens
//! ```rust
//! use paseto_kit::claims::Claims;
//! use paseto_kit::keys::{AsymmetricKeyPair, Generate};
//! use paseto_kit::parser::{IssuedBy, Parser};
//! use paseto_kit::version4::{PublicToken, V4};
//!
//! // Setup the default claims, which include `iat` and `nbf` as the current
//! // time and `exp` of one hour. Add a custom `data` claim as well.
//! let mut claims = Claims::new()?;
//! claims.issuer("paragonie.com")?;
//! claims.add_additional("data", "A public, signed message")?;
//!
//! // Generate the keys and sign the claims.
//! let kp = AsymmetricKeyPair::<V4>::generate()?;
//! let token = PublicToken::sign(
//!     &kp.secret,
//!     claims.to_string()?.as_bytes(),
//!     None,
//!     Some(b"implicit assertion"),
//! )?;
//!
//! // Decide how to validate the claims after verifying the token itself.
//! let mut parser = Parser::valid_now();
//! parser.add_rule(IssuedBy("paragonie.com".into()));
//!
//! let trusted = parser.parse_v4_public(&kp.public, &token, Some(b"implicit assertion"))?;
//! assert_eq!(
//!     trusted.payload_claims().unwrap().get_issuer(),
//!     Some("paragonie.com")
//! );
//! # Ok::<(), paseto_kit::errors::Error>(())
//! ```
//!
//! ## Creating and parsing local tokens
//! ```rust
//! use paseto_kit::claims::Claims;
//! use paseto_kit::keys::{Generate, SymmetricKey};
//! use paseto_kit::parser::Parser;
//! use paseto_kit::version4::{LocalToken, V4};
//!
//! let sk = SymmetricKey::<V4>::generate()?;
//!
//! let mut claims = Claims::new()?;
//! claims.add_additional("data", "A secret, encrypted message")?;
//! let token = LocalToken::encrypt(&sk, claims.to_string()?.as_bytes(), None, None)?;
//!
//! let trusted = Parser::valid_now().parse_v4_local(&sk, &token, None)?;
//! assert_eq!(
//!     trusted.payload_claims().unwrap().get_claim("data").unwrap().as_str(),
//!     Some("A secret, encrypted message")
//! );
//! # Ok::<(), paseto_kit::errors::Error>(())
//! ```
//!
//! ## Key lookup through the untrusted footer
//! ```rust
//! use paseto_kit::keys::{Generate, SymmetricKey};
//! use paseto_kit::message::{Local, Message};
//! use paseto_kit::paserk::{FormatAsPaserk, Id};
//! use paseto_kit::version4::{LocalToken, V4};
//!
//! let sk = SymmetricKey::<V4>::generate()?;
//! // Serialize the key id, safe to transmit in the clear.
//! let mut kid = String::new();
//! Id::from(&sk).fmt(&mut kid).unwrap();
//!
//! let footer = format!("{{\"kid\":\"{kid}\"}}");
//! let token = LocalToken::encrypt(&sk, b"{\"data\":\"x\"}", Some(footer.as_bytes()), None)?;
//!
//! // The footer is readable before verification, for key selection only;
//! // nothing from it can be trusted until decryption has succeeded.
//! let message = Message::<Local, V4>::try_from(token.as_str())?;
//! let found = core::str::from_utf8(message.untrusted_footer()).unwrap();
//! assert!(found.contains(&kid));
//!
//! let _trusted = LocalToken::decrypt(&sk, &message, Some(footer.as_bytes()), None)?;
//! # Ok::<(), paseto_kit::errors::Error>(())
//! ```
//!
//! ## PASERK serialization
//! ```rust
//! use paseto_kit::keys::{Generate, SymmetricKey};
//! use paseto_kit::paserk::FormatAsPaserk;
//! use paseto_kit::version4::V4;
//!
//! // Generate the key and serialize to and from PASERK.
//! let sk = SymmetricKey::<V4>::generate()?;
//! let mut paserk = String::new();
//! sk.fmt(&mut paserk).unwrap();
//! let sk2 = SymmetricKey::<V4>::try_from(paserk.as_str())?;
//! assert_eq!(sk, sk2);
//! # Ok::<(), paseto_kit::errors::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::mem_forget)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_qualifications,
    overflowing_literals
)]

mod encoding;
mod version;

#[cfg(test)]
mod test_support;

/// Claims for token payloads.
pub mod claims;

/// Errors for token operations.
pub mod errors;

/// Keys used for tokens.
pub mod keys;

/// Token framing: parsing and serialization.
pub mod message;

/// Rule-driven parsing of tokens.
pub mod parser;

/// PASERK key serialization and identifiers.
pub mod paserk;

/// Types for verified tokens.
pub mod token;

/// PASETO version 2 tokens.
pub mod version2;

/// PASETO version 3 tokens.
pub mod version3;

/// PASETO version 4 tokens.
pub mod version4;

pub use message::{Local, Message, Public};
pub use token::TrustedToken;
pub use version2::V2;
pub use version3::V3;
pub use version4::V4;
