use crate::claims::Claims;
use crate::errors::Error;

#[derive(Clone, Debug, PartialEq)]
/// A `TrustedToken` is returned by a `verify()` or `decrypt()` operation and
/// represents an authenticated, non-tampered token.
///
/// Its footer is cryptographically bound to the payload, so unlike
/// [`Message::untrusted_footer`], [`TrustedToken::footer`] may take part in
/// trust decisions.
///
/// Cryptographic verification says nothing about the claims inside the
/// payload; these are checked by the rules of a [`Parser`], or manually.
///
/// [`Message::untrusted_footer`]: crate::message::Message::untrusted_footer
/// [`Parser`]: crate::parser::Parser
pub struct TrustedToken {
    header: String,
    // The payload is required to be UTF-8 encoded JSON, so a String holds it.
    payload: String,
    payload_claims: Option<Claims>,
    footer: Vec<u8>,
    implicit_assert: Vec<u8>,
}

impl TrustedToken {
    pub(crate) fn new(
        header: &str,
        payload: &[u8],
        footer: &[u8],
        implicit_assert: &[u8],
    ) -> Result<Self, Error> {
        Ok(Self {
            header: header.to_string(),
            payload: String::from_utf8(payload.to_vec()).map_err(|_| Error::PayloadInvalidUtf8)?,
            payload_claims: None,
            footer: footer.to_vec(),
            implicit_assert: implicit_assert.to_vec(),
        })
    }

    /// Get the header that is used for this token.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Get the payload that is used for this token.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Return the [`Claims`] parsed from the token payload.
    ///
    /// - `None`: if no [`Claims`] have been parsed.
    /// - `Some`: if [`Claims`] have been parsed (done by [`Parser`] entry points).
    ///
    /// [`Parser`]: crate::parser::Parser
    pub fn payload_claims(&self) -> Option<&Claims> {
        self.payload_claims.as_ref()
    }

    pub(crate) fn set_payload_claims(&mut self, claims: Claims) {
        self.payload_claims = Some(claims);
    }

    /// Get the footer used to create the token.
    ///
    /// Empty if no footer was used during creation.
    pub fn footer(&self) -> &[u8] {
        &self.footer
    }

    /// Get the implicit assertion used to create the token.
    ///
    /// Empty if `None` was used during creation. Always empty for V2 tokens.
    pub fn implicit_assert(&self) -> &[u8] {
        &self.implicit_assert
    }
}
