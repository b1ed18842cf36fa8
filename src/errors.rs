use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Errors for token and key operations.
pub enum Error {
    /// Error for a token with an invalid format: wrong number of segments,
    /// an empty payload segment or a payload that is too short for its
    /// declared purpose.
    TokenFormat,
    /// Error for a failed Base64 decoding.
    Base64Decoding,
    /// Error for a token whose `vN.purpose.` prefix does not match the one
    /// that was requested.
    WrongHeader,
    /// Error for attempting to create a token with an empty payload.
    EmptyPayload,
    /// Error for a decrypted payload that is not valid UTF-8.
    PayloadInvalidUtf8,
    /// Error for an invalid key, during construction or use.
    Key,
    /// Error during generation of a key.
    KeyGeneration,
    /// Error for failure to retrieve randomness from the OS.
    Csprng,
    /// Error during the encryption or signing of a token.
    Encryption,
    /// Error during validation of a token: an invalid MAC, signature or
    /// AEAD tag, or a mismatched footer or implicit assertion. Intentionally
    /// coarse, so that callers cannot tell which step failed.
    TokenValidation,
    /// Error for a registered claim with an invalid or wrongly typed value.
    InvalidClaim,
    /// Error for a payload that is not a JSON object.
    ClaimsJson,
    /// Error for a token that was rejected by a parser rule.
    RuleViolation {
        /// Name of the rule that rejected the token.
        rule: &'static str,
        /// Why the rule rejected the token.
        reason: String,
    },
    /// Error for an invalid PASERK string.
    PaserkFormat,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TokenFormat => write!(f, "Invalid token format"),
            Error::Base64Decoding => write!(f, "Failed to decode Base64 data"),
            Error::WrongHeader => {
                write!(f, "Token header does not match the requested version and purpose")
            }
            Error::EmptyPayload => write!(f, "Token payload may not be empty"),
            Error::PayloadInvalidUtf8 => write!(f, "Token payload was not valid UTF-8"),
            Error::Key => write!(f, "Invalid key"),
            Error::KeyGeneration => write!(f, "Failed to generate key"),
            Error::Csprng => write!(f, "Failed to read from the CSPRNG"),
            Error::Encryption => write!(f, "Failed to encrypt or sign token"),
            Error::TokenValidation => write!(f, "Token failed validation"),
            Error::InvalidClaim => write!(f, "Invalid claim"),
            Error::ClaimsJson => write!(f, "Claims were not a valid JSON object"),
            Error::RuleViolation { rule, reason } => {
                write!(f, "Rule '{rule}' rejected the token: {reason}")
            }
            Error::PaserkFormat => write!(f, "Invalid PASERK format"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ct_codecs::Error> for Error {
    fn from(_: ct_codecs::Error) -> Self {
        Error::Base64Decoding
    }
}

impl From<getrandom::Error> for Error {
    fn from(_: getrandom::Error) -> Self {
        Error::Csprng
    }
}
