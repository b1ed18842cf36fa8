use crate::encoding::{decode_b64, encode_b64};
use crate::errors::Error;
use crate::version::private::Version;
use core::marker::PhantomData;
use subtle::ConstantTimeEq;

mod private {
    pub trait Sealed {}

    impl Sealed for super::Local {}
    impl Sealed for super::Public {}
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// Marker for the `local` purpose: shared-key authenticated encryption.
pub struct Local;

#[derive(Debug, PartialEq, Eq, Clone)]
/// Marker for the `public` purpose: public-key digital signatures.
pub struct Public;

/// The purpose half of a protocol. Together with a version it fixes the
/// token header and the layout of the raw payload bytes.
pub trait Purpose<V: Version>: private::Sealed {
    /// The `vN.purpose.` header for this version and purpose.
    fn header() -> &'static str;
    /// Bytes of payload taken up by the nonce and tag, or the signature.
    fn wrapping_len() -> usize;
    /// The embedded message, with the nonce and tag, or the signature, stripped.
    fn strip_wrapping(payload: &[u8]) -> &[u8];
}

impl<V: Version> Purpose<V> for Local {
    fn header() -> &'static str {
        V::LOCAL_HEADER
    }

    fn wrapping_len() -> usize {
        V::LOCAL_NONCE + V::LOCAL_TAG
    }

    fn strip_wrapping(payload: &[u8]) -> &[u8] {
        debug_assert!(payload.len() > V::LOCAL_NONCE + V::LOCAL_TAG);
        &payload[V::LOCAL_NONCE..payload.len() - V::LOCAL_TAG]
    }
}

impl<V: Version> Purpose<V> for Public {
    fn header() -> &'static str {
        V::PUBLIC_HEADER
    }

    fn wrapping_len() -> usize {
        V::PUBLIC_SIG
    }

    fn strip_wrapping(payload: &[u8]) -> &[u8] {
        debug_assert!(payload.len() > V::PUBLIC_SIG);
        &payload[..payload.len() - V::PUBLIC_SIG]
    }
}

/// A token taken apart at its `.` separators, before any decoding.
struct DeconstructedToken<'a> {
    header: String,
    encoded_payload: &'a str,
    encoded_footer: Option<&'a str>,
}

/// Split a token into its 3 or 4 segments.
fn deconstruct(token: &str) -> Result<DeconstructedToken<'_>, Error> {
    let parts = token.split('.').collect::<Vec<&str>>();
    if parts.len() != 3 && parts.len() != 4 {
        return Err(Error::TokenFormat);
    }

    Ok(DeconstructedToken {
        header: format!("{}.{}.", parts[0], parts[1]),
        encoded_payload: parts[2],
        encoded_footer: parts.get(3).copied(),
    })
}

/// The nonce ‖ ciphertext ‖ tag layout of a `local` payload.
pub(crate) struct LocalParts<'a> {
    pub(crate) nonce: &'a [u8],
    pub(crate) ciphertext: &'a [u8],
    pub(crate) tag: &'a [u8],
}

impl<'a> LocalParts<'a> {
    /// Split a raw payload whose length was validated at parse time.
    pub(crate) fn split<V: Version>(payload: &'a [u8]) -> Self {
        debug_assert!(payload.len() > V::LOCAL_NONCE + V::LOCAL_TAG);
        Self {
            nonce: &payload[..V::LOCAL_NONCE],
            ciphertext: &payload[V::LOCAL_NONCE..payload.len() - V::LOCAL_TAG],
            tag: &payload[payload.len() - V::LOCAL_TAG..],
        }
    }
}

/// The message ‖ signature layout of a `public` payload.
pub(crate) struct SignedParts<'a> {
    pub(crate) message: &'a [u8],
    pub(crate) signature: &'a [u8],
}

impl<'a> SignedParts<'a> {
    /// Split a raw payload whose length was validated at parse time.
    pub(crate) fn split<V: Version>(payload: &'a [u8]) -> Self {
        debug_assert!(payload.len() > V::PUBLIC_SIG);
        Self {
            message: &payload[..payload.len() - V::PUBLIC_SIG],
            signature: &payload[payload.len() - V::PUBLIC_SIG..],
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
/// A parsed but unverified token for a protocol, i.e. a purpose `T` and a
/// version `V`.
///
/// Parsing validates the framing only: header, segment count, Base64
/// encoding and payload sizes. A use-case for `Message` on its own is
/// reading the token's footer (e.g. a `kid` claim for key lookup) before
/// deciding which key to verify with.
///
/// __WARNING__: Anything returned by this type must be treated as
/// **UNTRUSTED** until the message has passed decryption or signature
/// verification.
pub struct Message<T, V> {
    payload: Vec<u8>,
    footer: Vec<u8>,
    phantom: PhantomData<(T, V)>,
}

impl<T: Purpose<V>, V: Version> TryFrom<&str> for Message<T, V> {
    type Error = Error;

    /// Parse `value` as a token of this protocol.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(Error::TokenFormat);
        }

        let parts = deconstruct(value)?;
        // The header comparison runs before any decoding, so a version or
        // purpose mismatch is reported as such and never reaches crypto.
        if parts.header != T::header() {
            return Err(Error::WrongHeader);
        }
        if parts.encoded_payload.is_empty() {
            return Err(Error::TokenFormat);
        }

        let payload = decode_b64(parts.encoded_payload)?;
        // An empty embedded message is disallowed, so the payload must be
        // strictly larger than its nonce and tag, or its signature.
        if payload.len() <= T::wrapping_len() {
            return Err(Error::TokenFormat);
        }

        let footer = match parts.encoded_footer {
            Some(encoded) => decode_b64(encoded)?,
            None => Vec::new(),
        };

        Ok(Self {
            payload,
            footer,
            phantom: PhantomData,
        })
    }
}

impl<T: Purpose<V>, V: Version> TryFrom<&String> for Message<T, V> {
    type Error = Error;

    /// Parse `value` as a token of this protocol.
    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl<T: Purpose<V>, V: Version> Message<T, V> {
    /// The `vN.purpose.` header of this message.
    pub fn header(&self) -> &'static str {
        T::header()
    }

    /// Return the untrusted, raw payload bytes of this message.
    /// For a local token this includes the nonce and tag; for a public
    /// token the signature.
    pub fn untrusted_message(&self) -> &[u8] {
        &self.payload
    }

    /// Return the untrusted embedded message only: the ciphertext of a
    /// local token, or the unverified cleartext of a public token.
    pub fn untrusted_payload(&self) -> &[u8] {
        T::strip_wrapping(&self.payload)
    }

    /// Return the untrusted footer of this message.
    /// Empty if there was no footer in the token.
    pub fn untrusted_footer(&self) -> &[u8] {
        &self.footer
    }

    /// Serialize this message back into its token form.
    pub fn encode(&self) -> Result<String, Error> {
        assemble(T::header(), &self.payload, &self.footer)
    }

    /// When a known footer is supplied, this message must carry one equal
    /// to it. The comparison is constant time.
    pub(crate) fn check_footer_matches(&self, expected: Option<&[u8]>) -> Result<(), Error> {
        let expected = match expected {
            Some(expected) => expected,
            None => return Ok(()),
        };

        if self.footer.is_empty() || !bool::from(expected.ct_eq(&self.footer)) {
            return Err(Error::TokenValidation);
        }

        Ok(())
    }
}

impl<V: Version> Message<Local, V> {
    pub(crate) fn parts(&self) -> LocalParts<'_> {
        LocalParts::split::<V>(&self.payload)
    }
}

impl<V: Version> Message<Public, V> {
    pub(crate) fn parts(&self) -> SignedParts<'_> {
        SignedParts::split::<V>(&self.payload)
    }
}

/// Join a header, raw payload and optional footer into a token string.
pub(crate) fn assemble(header: &str, payload: &[u8], footer: &[u8]) -> Result<String, Error> {
    let token_no_footer = format!("{}{}", header, encode_b64(payload)?);

    if footer.is_empty() {
        Ok(token_no_footer)
    } else {
        Ok(format!("{}.{}", token_no_footer, encode_b64(footer)?))
    }
}

#[cfg(test)]
mod tests_untrusted {
    use super::*;
    use crate::errors::Error;
    use crate::version2::V2;
    use crate::version3::V3;
    use crate::version4::V4;

    const V2_PUBLIC_TOKEN: &str = "v2.public.eyJkYXRhIjoidGhpcyBpcyBhIHNpZ25lZCBtZXNzYWdlIiwiZXhwIjoiMjAxOS0wMS0wMVQwMDowMDowMCswMDowMCJ9flsZsx_gYCR0N_Ec2QxJFFpvQAs7h9HtKwbVK2n1MJ3Rz-hwe8KUqjnd8FAnIJZ601tp7lGkguU63oGbomhoBw.eyJraWQiOiJ6VmhNaVBCUDlmUmYyc25FY1Q3Z0ZUaW9lQTlDT2NOeTlEZmdMMVc2MGhhTiJ9";
    const V2_LOCAL_TOKEN: &str = "v2.local.5K4SCXNhItIhyNuVIZcwrdtaDKiyF81-eWHScuE0idiVqCo72bbjo07W05mqQkhLZdVbxEa5I_u5sgVk1QLkcWEcOSlLHwNpCkvmGGlbCdNExn6Qclw3qTKIIl5-zSLIrxZqOLwcFLYbVK1SrQ.eyJraWQiOiJ6VmhNaVBCUDlmUmYyc25FY1Q3Z0ZUaW9lQTlDT2NOeTlEZmdMMVc2MGhhTiJ9";
    const V3_PUBLIC_TOKEN: &str = "v3.public.eyJkYXRhIjoidGhpcyBpcyBhIHNpZ25lZCBtZXNzYWdlIiwiZXhwIjoiMjAyMi0wMS0wMVQwMDowMDowMCswMDowMCJ9ZWrbGZ6L0MDK72skosUaS0Dz7wJ_2bMcM6tOxFuCasO9GhwHrvvchqgXQNLQQyWzGC2wkr-VKII71AvkLpC8tJOrzJV1cap9NRwoFzbcXjzMZyxQ0wkshxZxx8ImmNWP.eyJraWQiOiJkWWtJU3lseFFlZWNFY0hFTGZ6Rjg4VVpyd2JMb2xOaUNkcHpVSEd3OVVxbiJ9";
    const V4_PUBLIC_TOKEN: &str = "v4.public.eyJkYXRhIjoidGhpcyBpcyBhIHNpZ25lZCBtZXNzYWdlIiwiZXhwIjoiMjAyMi0wMS0wMVQwMDowMDowMCswMDowMCJ9v3Jt8mx_TdM2ceTGoqwrh4yDFn0XsHvvV_D0DtwQxVrJEBMl0F2caAdgnpKlt4p7xBnx1HcO-SPo8FPp214HDw.eyJraWQiOiJ6VmhNaVBCUDlmUmYyc25FY1Q3Z0ZUaW9lQTlDT2NOeTlEZmdMMVc2MGhhTiJ9";
    const V4_LOCAL_TOKEN: &str = "v4.local.32VIErrEkmY4JVILovbmfPXKW9wT1OdQepjMTC_MOtjA4kiqw7_tcaOM5GNEcnTxl60WkwMsYXw6FSNb_UdJPXjpzm0KW9ojM5f4O2mRvE2IcweP-PRdoHjd5-RHCiExR1IK6t4x-RMNXtQNbz7FvFZ_G-lFpk5RG3EOrwDL6CgDqcerSQ.eyJraWQiOiJ6VmhNaVBCUDlmUmYyc25FY1Q3Z0ZUaW9lQTlDT2NOeTlEZmdMMVc2MGhhTiJ9";

    #[test]
    fn empty_string() {
        assert_eq!(
            Message::<Local, V2>::try_from("").unwrap_err(),
            Error::TokenFormat
        );
        assert_eq!(
            Message::<Public, V3>::try_from("").unwrap_err(),
            Error::TokenFormat
        );
        assert_eq!(
            Message::<Local, V4>::try_from("").unwrap_err(),
            Error::TokenFormat
        );
    }

    #[test]
    fn no_separators() {
        let invalid: String = V4_LOCAL_TOKEN.split('.').collect();
        assert_eq!(
            Message::<Local, V4>::try_from(invalid.as_str()).unwrap_err(),
            Error::TokenFormat
        );
    }

    #[test]
    fn extra_after_footer() {
        let mut invalid = V4_LOCAL_TOKEN.to_string();
        invalid.push_str(".shouldNotBeHere");
        assert_eq!(
            Message::<Local, V4>::try_from(invalid.as_str()).unwrap_err(),
            Error::TokenFormat
        );
    }

    #[test]
    fn missing_payload() {
        let split = V4_PUBLIC_TOKEN.split('.').collect::<Vec<&str>>();
        let invalid: String = format!("{}.{}..{}", split[0], split[1], split[3]);
        assert_eq!(
            Message::<Public, V4>::try_from(invalid.as_str()).unwrap_err(),
            Error::TokenFormat
        );
    }

    #[test]
    fn wrong_version_or_purpose() {
        // A valid token parsed against every other protocol fails on the
        // header, before any base64 decoding takes place.
        assert_eq!(
            Message::<Local, V2>::try_from(V4_LOCAL_TOKEN).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Local, V4>::try_from(V2_LOCAL_TOKEN).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Public, V4>::try_from(V4_LOCAL_TOKEN).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Local, V4>::try_from(V4_PUBLIC_TOKEN).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Public, V3>::try_from(V4_PUBLIC_TOKEN).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Public, V2>::try_from(&V2_PUBLIC_TOKEN.replace("v2", "v5")).unwrap_err(),
            Error::WrongHeader
        );
        assert_eq!(
            Message::<Public, V2>::try_from(&V2_PUBLIC_TOKEN.replace("public", "remote"))
                .unwrap_err(),
            Error::WrongHeader
        );
    }

    #[test]
    fn invalid_base64() {
        let split = V4_LOCAL_TOKEN.split('.').collect::<Vec<&str>>();

        let invalid: String = format!("{}.{}.{}!.{}", split[0], split[1], split[2], split[3]);
        assert_eq!(
            Message::<Local, V4>::try_from(invalid.as_str()).unwrap_err(),
            Error::Base64Decoding
        );

        let invalid: String = format!("{}.{}.{}.{}!", split[0], split[1], split[2], split[3]);
        assert_eq!(
            Message::<Local, V4>::try_from(invalid.as_str()).unwrap_err(),
            Error::Base64Decoding
        );
    }

    #[test]
    fn local_token_nonce_tag_no_payload() {
        assert!(Message::<Local, V4>::try_from(
            "v4.local.444444bbbbb444444444bbb444444bbb44444444444444888888888888888cJJbbb44444444",
        )
        .is_err());
        assert!(Message::<Local, V3>::try_from(
            "v3.local.oooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooooo",
        )
        .is_err());
    }

    #[test]
    fn valid_public_accessors() {
        let no_footer =
            Message::<Public, V4>::try_from(&V4_PUBLIC_TOKEN[..V4_PUBLIC_TOKEN.rfind('.').unwrap()])
                .unwrap();
        let with_footer = Message::<Public, V4>::try_from(V4_PUBLIC_TOKEN).unwrap();

        assert_eq!(no_footer.header(), "v4.public.");
        assert_eq!(
            no_footer.untrusted_payload(),
            "{\"data\":\"this is a signed message\",\"exp\":\"2022-01-01T00:00:00+00:00\"}"
                .as_bytes()
        );
        assert_eq!(no_footer.untrusted_footer(), &[0u8; 0]);
        assert_eq!(
            with_footer.untrusted_footer(),
            "{\"kid\":\"zVhMiPBP9fRf2snEcT7gFTioeA9COcNy9DfgL1W60haN\"}".as_bytes()
        );
        assert_eq!(
            with_footer.untrusted_message().len(),
            with_footer.untrusted_payload().len() + 64
        );
    }

    #[test]
    fn valid_local_accessors() {
        let message = Message::<Local, V4>::try_from(V4_LOCAL_TOKEN).unwrap();

        assert_eq!(message.header(), "v4.local.");
        assert_eq!(
            message.untrusted_footer(),
            "{\"kid\":\"zVhMiPBP9fRf2snEcT7gFTioeA9COcNy9DfgL1W60haN\"}".as_bytes()
        );
        let parts = message.parts();
        assert_eq!(parts.nonce.len(), 32);
        assert_eq!(parts.tag.len(), 32);
        assert_eq!(parts.ciphertext, message.untrusted_payload());

        let message = Message::<Local, V2>::try_from(V2_LOCAL_TOKEN).unwrap();
        let parts = message.parts();
        assert_eq!(parts.nonce.len(), 24);
        assert_eq!(parts.tag.len(), 16);

        let message = Message::<Public, V3>::try_from(V3_PUBLIC_TOKEN).unwrap();
        assert_eq!(message.parts().signature.len(), 96);
    }

    #[test]
    fn encode_roundtrips() {
        for token in [
            V2_PUBLIC_TOKEN,
            V3_PUBLIC_TOKEN,
            V4_PUBLIC_TOKEN,
        ] {
            match token.split('.').nth(0).unwrap() {
                "v2" => {
                    let m = Message::<Public, V2>::try_from(token).unwrap();
                    assert_eq!(m.encode().unwrap(), token);
                }
                "v3" => {
                    let m = Message::<Public, V3>::try_from(token).unwrap();
                    assert_eq!(m.encode().unwrap(), token);
                }
                _ => {
                    let m = Message::<Public, V4>::try_from(token).unwrap();
                    assert_eq!(m.encode().unwrap(), token);
                }
            }
        }

        let m = Message::<Local, V4>::try_from(V4_LOCAL_TOKEN).unwrap();
        assert_eq!(m.encode().unwrap(), V4_LOCAL_TOKEN);
    }
}
