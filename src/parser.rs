//! Rule-driven parsing on top of verification.
//!
//! A [`Parser`] first parses and decrypts/verifies a token, then parses its
//! payload as JSON claims, and finally applies its [`Rule`]s in insertion
//! order. The first rule to reject short-circuits with
//! [`Error::RuleViolation`]. Cryptographic verification is never affected
//! by rules; they only ever narrow which verified tokens are acceptable.

use crate::claims::Claims;
use crate::errors::Error;
use crate::keys::{AsymmetricPublicKey, SymmetricKey};
use crate::message::{Local, Message, Public};
use crate::token::TrustedToken;
use crate::version2::V2;
use crate::version3::V3;
use crate::version4::V4;
use crate::{version2, version3, version4};
use chrono::prelude::*;

/// A predicate over a verified token.
pub trait Rule {
    /// Name of this rule, used in error reporting.
    fn name(&self) -> &'static str;
    /// Check the token, returning why it is unacceptable if it is.
    fn check(&self, token: &TrustedToken) -> Result<(), Error>;
}

fn violation(rule: &'static str, reason: impl Into<String>) -> Error {
    Error::RuleViolation {
        rule,
        reason: reason.into(),
    }
}

fn claims_of<'a>(rule: &'static str, token: &'a TrustedToken) -> Result<&'a Claims, Error> {
    token
        .payload_claims()
        .ok_or_else(|| violation(rule, "token carries no claims"))
}

fn expect_string_claim(
    rule: &'static str,
    token: &TrustedToken,
    claim: &str,
    expected: &str,
) -> Result<(), Error> {
    let claims = claims_of(rule, token)?;
    match claims.get_claim(claim).and_then(|v| v.as_str()) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(violation(
            rule,
            format!("expected '{expected}', found '{actual}'"),
        )),
        None => Err(violation(rule, format!("claim '{claim}' is missing"))),
    }
}

fn expect_time_claim(
    rule: &'static str,
    token: &TrustedToken,
    claim: &str,
) -> Result<DateTime<Utc>, Error> {
    let claims = claims_of(rule, token)?;
    match claim {
        "exp" => claims.get_expiration(),
        "nbf" => claims.get_not_before(),
        _ => claims.get_issued_at(),
    }
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| violation(rule, format!("claim '{claim}' is missing")))
}

/// Requires the `aud` claim to equal the given audience.
pub struct ForAudience(
    /// The expected audience.
    pub String,
);

impl Rule for ForAudience {
    fn name(&self) -> &'static str {
        "ForAudience"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        expect_string_claim(self.name(), token, "aud", &self.0)
    }
}

/// Requires the `jti` claim to equal the given identifier.
pub struct IdentifiedBy(
    /// The expected token identifier.
    pub String,
);

impl Rule for IdentifiedBy {
    fn name(&self) -> &'static str {
        "IdentifiedBy"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        expect_string_claim(self.name(), token, "jti", &self.0)
    }
}

/// Requires the `iss` claim to equal the given issuer.
pub struct IssuedBy(
    /// The expected issuer.
    pub String,
);

impl Rule for IssuedBy {
    fn name(&self) -> &'static str {
        "IssuedBy"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        expect_string_claim(self.name(), token, "iss", &self.0)
    }
}

/// Requires the `sub` claim to equal the given subject.
pub struct Subject(
    /// The expected subject.
    pub String,
);

impl Rule for Subject {
    fn name(&self) -> &'static str {
        "Subject"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        expect_string_claim(self.name(), token, "sub", &self.0)
    }
}

/// Requires the `exp` claim to be in the future.
pub struct NotExpired;

impl Rule for NotExpired {
    fn name(&self) -> &'static str {
        "NotExpired"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        let exp = expect_time_claim(self.name(), token, "exp")?;
        if Utc::now() > exp {
            return Err(violation(self.name(), "this token has expired"));
        }

        Ok(())
    }
}

/// Requires the `nbf` claim to be in the past.
pub struct NotBeforeNbf;

impl Rule for NotBeforeNbf {
    fn name(&self) -> &'static str {
        "NotBeforeNbf"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        let nbf = expect_time_claim(self.name(), token, "nbf")?;
        if Utc::now() < nbf {
            return Err(violation(self.name(), "this token is not valid yet"));
        }

        Ok(())
    }
}

/// Requires the token to be valid at the given time: issued at or before it,
/// valid from at or before it and expiring after it. All three time claims
/// must be present.
pub struct ValidAt(
    /// The instant the token must be valid at.
    pub DateTime<Utc>,
);

impl Rule for ValidAt {
    fn name(&self) -> &'static str {
        "ValidAt"
    }

    fn check(&self, token: &TrustedToken) -> Result<(), Error> {
        let iat = expect_time_claim(self.name(), token, "iat")?;
        let nbf = expect_time_claim(self.name(), token, "nbf")?;
        let exp = expect_time_claim(self.name(), token, "exp")?;

        if self.0 < iat {
            return Err(violation(self.name(), "this token was issued in the future"));
        }
        if self.0 < nbf {
            return Err(violation(self.name(), "this token is not valid yet"));
        }
        if self.0 > exp {
            return Err(violation(self.name(), "this token has expired"));
        }

        Ok(())
    }
}

/// A parser for tokens of any version and purpose, carrying an ordered list
/// of rules.
#[derive(Default)]
pub struct Parser {
    rules: Vec<Box<dyn Rule>>,
}

impl Parser {
    /// Create a parser with no rules set: any verified token is accepted.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a parser that requires parsed tokens to be valid now.
    pub fn valid_now() -> Self {
        let mut parser = Self::new();
        parser.add_rule(ValidAt(Utc::now()));
        parser
    }

    /// Add `rule` to any already specified.
    pub fn add_rule(&mut self, rule: impl Rule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Overwrite any currently set rules with those specified.
    pub fn set_rules(&mut self, rules: Vec<Box<dyn Rule>>) {
        self.rules = rules;
    }

    /// Parse and decrypt a v2 local token, then validate it against this
    /// parser's rules.
    pub fn parse_v2_local(
        &self,
        key: &SymmetricKey<V2>,
        token: &str,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Local, V2>::try_from(token)?;
        let trusted = version2::LocalToken::decrypt(key, &message, None)?;
        self.validate(trusted)
    }

    /// Parse and verify a v2 public token, then validate it against this
    /// parser's rules.
    pub fn parse_v2_public(
        &self,
        key: &AsymmetricPublicKey<V2>,
        token: &str,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Public, V2>::try_from(token)?;
        let trusted = version2::PublicToken::verify(key, &message, None)?;
        self.validate(trusted)
    }

    /// Parse and decrypt a v3 local token, then validate it against this
    /// parser's rules.
    pub fn parse_v3_local(
        &self,
        key: &SymmetricKey<V3>,
        token: &str,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Local, V3>::try_from(token)?;
        let trusted = version3::LocalToken::decrypt(key, &message, None, implicit_assert)?;
        self.validate(trusted)
    }

    /// Parse and verify a v3 public token, then validate it against this
    /// parser's rules.
    pub fn parse_v3_public(
        &self,
        key: &AsymmetricPublicKey<V3>,
        token: &str,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Public, V3>::try_from(token)?;
        let trusted = version3::PublicToken::verify(key, &message, None, implicit_assert)?;
        self.validate(trusted)
    }

    /// Parse and decrypt a v4 local token, then validate it against this
    /// parser's rules.
    pub fn parse_v4_local(
        &self,
        key: &SymmetricKey<V4>,
        token: &str,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Local, V4>::try_from(token)?;
        let trusted = version4::LocalToken::decrypt(key, &message, None, implicit_assert)?;
        self.validate(trusted)
    }

    /// Parse and verify a v4 public token, then validate it against this
    /// parser's rules.
    pub fn parse_v4_public(
        &self,
        key: &AsymmetricPublicKey<V4>,
        token: &str,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        let message = Message::<Public, V4>::try_from(token)?;
        let trusted = version4::PublicToken::verify(key, &message, None, implicit_assert)?;
        self.validate(trusted)
    }

    fn validate(&self, mut trusted: TrustedToken) -> Result<TrustedToken, Error> {
        let claims = Claims::from_string(trusted.payload())?;
        trusted.set_payload_claims(claims);

        for rule in &self.rules {
            rule.check(&trusted)?;
        }

        Ok(trusted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{AsymmetricKeyPair, Generate};

    fn claims_expiring_in_one_hour() -> Claims {
        let mut claims = Claims::new().unwrap();
        claims.issuer("paragonie.com").unwrap();
        claims.subject("test").unwrap();
        claims.audience("pie-hosted.com").unwrap();
        claims
            .token_identifier("87IFSGFgPNtQNNuw0AtuLttPYFfYwOkjhqdWcLoYQHvL")
            .unwrap();
        claims
    }

    fn encrypt_v4(claims: &Claims) -> (SymmetricKey<V4>, String) {
        let sk = SymmetricKey::<V4>::generate().unwrap();
        let token = version4::LocalToken::encrypt(
            &sk,
            claims.to_string().unwrap().as_bytes(),
            None,
            None,
        )
        .unwrap();
        (sk, token)
    }

    #[test]
    fn no_rules_accepts_any_verified_token() {
        let (sk, token) = encrypt_v4(&claims_expiring_in_one_hour());
        let parser = Parser::new();
        let trusted = parser.parse_v4_local(&sk, &token, None).unwrap();
        assert_eq!(
            trusted.payload_claims().unwrap().get_issuer(),
            Some("paragonie.com")
        );
    }

    #[test]
    fn rules_run_against_parsed_claims() {
        let (sk, token) = encrypt_v4(&claims_expiring_in_one_hour());

        let mut parser = Parser::valid_now();
        parser.add_rule(IssuedBy("paragonie.com".into()));
        parser.add_rule(Subject("test".into()));
        parser.add_rule(ForAudience("pie-hosted.com".into()));
        parser.add_rule(IdentifiedBy(
            "87IFSGFgPNtQNNuw0AtuLttPYFfYwOkjhqdWcLoYQHvL".into(),
        ));
        parser.add_rule(NotExpired);
        parser.add_rule(NotBeforeNbf);
        assert!(parser.parse_v4_local(&sk, &token, None).is_ok());

        let mut parser = Parser::new();
        parser.add_rule(IssuedBy("paragonie.net".into()));
        let err = parser.parse_v4_local(&sk, &token, None).unwrap_err();
        match err {
            Error::RuleViolation { rule, .. } => assert_eq!(rule, "IssuedBy"),
            _ => panic!("expected a rule violation"),
        }
    }

    #[test]
    fn missing_claim_is_a_violation() {
        let (sk, token) = encrypt_v4(&claims_expiring_in_one_hour());

        let mut parser = Parser::new();
        // No `custom` claim and no such registered claim either.
        parser.add_rule(IdentifiedBy("some-other-jti".into()));
        assert!(parser.parse_v4_local(&sk, &token, None).is_err());

        let mut claims = Claims::new().unwrap();
        claims.non_expiring();
        let (sk, token) = encrypt_v4(&claims);
        let mut parser = Parser::new();
        parser.add_rule(NotExpired);
        let err = parser.parse_v4_local(&sk, &token, None).unwrap_err();
        match err {
            Error::RuleViolation { rule, reason } => {
                assert_eq!(rule, "NotExpired");
                assert!(reason.contains("exp"));
            }
            _ => panic!("expected a rule violation"),
        }
    }

    #[test]
    fn first_failing_rule_short_circuits() {
        let (sk, token) = encrypt_v4(&claims_expiring_in_one_hour());

        let mut parser = Parser::new();
        parser.add_rule(Subject("someone else".into()));
        parser.add_rule(IssuedBy("paragonie.net".into()));
        let err = parser.parse_v4_local(&sk, &token, None).unwrap_err();
        match err {
            Error::RuleViolation { rule, .. } => assert_eq!(rule, "Subject"),
            _ => panic!("expected a rule violation"),
        }
    }

    #[test]
    fn valid_at_rejects_expired_and_future_tokens() {
        let (sk, token) = encrypt_v4(&claims_expiring_in_one_hour());

        // Before issuance.
        let past = Utc::now() - chrono::Duration::hours(2);
        let mut parser = Parser::new();
        parser.add_rule(ValidAt(past));
        assert!(parser.parse_v4_local(&sk, &token, None).is_err());

        // After expiry.
        let future = Utc::now() + chrono::Duration::hours(2);
        let mut parser = Parser::new();
        parser.add_rule(ValidAt(future));
        assert!(parser.parse_v4_local(&sk, &token, None).is_err());

        // In the validity window.
        assert!(Parser::valid_now().parse_v4_local(&sk, &token, None).is_ok());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let sk = SymmetricKey::<V4>::generate().unwrap();
        let token = version4::LocalToken::encrypt(&sk, b"\"just a string\"", None, None).unwrap();
        assert_eq!(
            Parser::new().parse_v4_local(&sk, &token, None).unwrap_err(),
            Error::ClaimsJson
        );
    }

    #[test]
    fn all_parse_entry_points_roundtrip() {
        let claims = claims_expiring_in_one_hour();
        let raw = claims.to_string().unwrap();
        let parser = Parser::valid_now();

        let sk = SymmetricKey::<V2>::generate().unwrap();
        let token = version2::LocalToken::encrypt(&sk, raw.as_bytes(), None).unwrap();
        assert!(parser.parse_v2_local(&sk, &token).is_ok());

        let kp = AsymmetricKeyPair::<V2>::generate().unwrap();
        let token = version2::PublicToken::sign(&kp.secret, raw.as_bytes(), None).unwrap();
        assert!(parser.parse_v2_public(&kp.public, &token).is_ok());

        let sk = SymmetricKey::<V3>::generate().unwrap();
        let token = version3::LocalToken::encrypt(&sk, raw.as_bytes(), None, Some(b"i")).unwrap();
        assert!(parser.parse_v3_local(&sk, &token, Some(b"i")).is_ok());
        assert!(parser.parse_v3_local(&sk, &token, None).is_err());

        let kp = AsymmetricKeyPair::<V3>::generate().unwrap();
        let token = version3::PublicToken::sign(&kp.secret, raw.as_bytes(), None, None).unwrap();
        assert!(parser.parse_v3_public(&kp.public, &token, None).is_ok());

        let sk = SymmetricKey::<V4>::generate().unwrap();
        let token = version4::LocalToken::encrypt(&sk, raw.as_bytes(), None, Some(b"i")).unwrap();
        assert!(parser.parse_v4_local(&sk, &token, Some(b"i")).is_ok());

        let kp = AsymmetricKeyPair::<V4>::generate().unwrap();
        let token = version4::PublicToken::sign(&kp.secret, raw.as_bytes(), None, None).unwrap();
        assert!(parser.parse_v4_public(&kp.public, &token, None).is_ok());
    }

    #[test]
    fn wrong_version_token_is_rejected_before_crypto() {
        let claims = claims_expiring_in_one_hour();
        let raw = claims.to_string().unwrap();

        let sk4 = SymmetricKey::<V4>::generate().unwrap();
        let token = version4::LocalToken::encrypt(&sk4, raw.as_bytes(), None, None).unwrap();

        let sk2 = SymmetricKey::<V2>::generate().unwrap();
        assert_eq!(
            Parser::new().parse_v2_local(&sk2, &token).unwrap_err(),
            Error::WrongHeader
        );
    }
}
