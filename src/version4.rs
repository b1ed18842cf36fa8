//! PASETO version 4 tokens: XChaCha20 with a keyed BLAKE2b MAC for `local`
//! and Ed25519 for `public`. Both operations bind an optional, untransmitted
//! implicit assertion into their transcripts.

use crate::encoding::pae;
use crate::errors::Error;
use crate::keys::{
    AsymmetricKeyPair, AsymmetricPublicKey, AsymmetricSecretKey, Generate, SymmetricKey,
};
use crate::keys::validate_ed25519_secret;
use crate::message::{assemble, Local, Message, Public};
use crate::token::TrustedToken;
use crate::version::private::Version;
use blake2b::SecretKey as AuthKey;
use ed25519_compact::{KeyPair, PublicKey, SecretKey as SigningKey, Seed, Signature};
use orion::hazardous::mac::blake2b;
use orion::hazardous::mac::blake2b::Blake2b;
use orion::hazardous::stream::xchacha20;
use xchacha20::Nonce as EncNonce;
use xchacha20::SecretKey as EncKey;
use zeroize::Zeroize;

#[derive(Debug, PartialEq, Eq, Clone)]
/// Version 4 of the PASETO spec.
pub struct V4;

impl Version for V4 {
    const LOCAL_KEY: usize = 32;
    const SECRET_KEY: usize = 32 + Self::PUBLIC_KEY; // Seed || PK
    const PUBLIC_KEY: usize = 32;
    const PUBLIC_SIG: usize = 64;
    const LOCAL_NONCE: usize = 32;
    const LOCAL_TAG: usize = 32;
    const LOCAL_HEADER: &'static str = "v4.local.";
    const PUBLIC_HEADER: &'static str = "v4.public.";
    const PASERK_VERSION: &'static str = "k4";

    fn validate_local_key(key_bytes: &[u8]) -> Result<(), Error> {
        if key_bytes.len() != Self::LOCAL_KEY {
            return Err(Error::Key);
        }

        Ok(())
    }

    fn validate_secret_key(key_bytes: &[u8]) -> Result<(), Error> {
        if key_bytes.len() != Self::SECRET_KEY {
            return Err(Error::Key);
        }

        validate_ed25519_secret(key_bytes)
    }

    fn validate_public_key(key_bytes: &[u8]) -> Result<(), Error> {
        if key_bytes.len() != Self::PUBLIC_KEY {
            return Err(Error::Key);
        }

        Ok(())
    }
}

impl AsymmetricSecretKey<V4> {
    /// Create a secret key from a 32-byte Ed25519 seed, deriving the public
    /// half.
    pub fn from_seed(seed_bytes: &[u8]) -> Result<Self, Error> {
        let seed = Seed::from_slice(seed_bytes).map_err(|_| Error::Key)?;
        let kp = KeyPair::from_seed(seed);

        Self::from(kp.sk.as_ref())
    }
}

impl TryFrom<&AsymmetricSecretKey<V4>> for AsymmetricPublicKey<V4> {
    type Error = Error;

    fn try_from(value: &AsymmetricSecretKey<V4>) -> Result<Self, Self::Error> {
        AsymmetricPublicKey::<V4>::from(&value.as_bytes()[32..])
    }
}

impl Generate<AsymmetricKeyPair<V4>, V4> for AsymmetricKeyPair<V4> {
    fn generate() -> Result<AsymmetricKeyPair<V4>, Error> {
        let raw = KeyPair::generate();

        Ok(AsymmetricKeyPair {
            public: AsymmetricPublicKey::<V4>::from(raw.pk.as_ref())
                .map_err(|_| Error::KeyGeneration)?,
            secret: AsymmetricSecretKey::<V4>::from(raw.sk.as_ref())
                .map_err(|_| Error::KeyGeneration)?,
        })
    }
}

impl Generate<SymmetricKey<V4>, V4> for SymmetricKey<V4> {
    fn generate() -> Result<SymmetricKey<V4>, Error> {
        let mut rng_bytes = [0u8; V4::LOCAL_KEY];
        getrandom::getrandom(&mut rng_bytes)?;

        let key = SymmetricKey::<V4>::from(&rng_bytes);
        rng_bytes.zeroize();

        key
    }
}

/// PASETO v4 public tokens.
pub struct PublicToken;

impl PublicToken {
    /// The header and purpose for the public token: `v4.public.`.
    pub const HEADER: &'static str = "v4.public.";

    /// Create a public token.
    pub fn sign(
        secret_key: &AsymmetricSecretKey<V4>,
        message: &[u8],
        footer: Option<&[u8]>,
        implicit_assert: Option<&[u8]>,
    ) -> Result<String, Error> {
        if message.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let sk = SigningKey::from_slice(secret_key.as_bytes()).map_err(|_| Error::Key)?;

        let f = footer.unwrap_or(&[]);
        let i = implicit_assert.unwrap_or(&[]);
        let m2 = pae(&[Self::HEADER.as_bytes(), message, f, i]);
        let sig = sk.sign(m2, None);

        let mut payload = Vec::with_capacity(message.len() + V4::PUBLIC_SIG);
        payload.extend_from_slice(message);
        payload.extend_from_slice(sig.as_ref());

        assemble(Self::HEADER, &payload, f)
    }

    /// Verify a public token.
    ///
    /// A `Some(footer)` is additionally compared in constant time against
    /// the footer the token carries; `None` authenticates whatever footer
    /// the token carries without comparing it to a known value.
    pub fn verify(
        public_key: &AsymmetricPublicKey<V4>,
        message: &Message<Public, V4>,
        footer: Option<&[u8]>,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        message.check_footer_matches(footer)?;

        let f = message.untrusted_footer();
        let i = implicit_assert.unwrap_or(&[]);
        let parts = message.parts();

        let m2 = pae(&[Self::HEADER.as_bytes(), parts.message, f, i]);
        let pk = PublicKey::from_slice(public_key.as_bytes()).map_err(|_| Error::Key)?;

        // If the below fails, it is an invalid signature.
        let sig = Signature::from_slice(parts.signature).map_err(|_| Error::TokenValidation)?;

        if pk.verify(m2, &sig).is_ok() {
            TrustedToken::new(Self::HEADER, parts.message, f, i)
        } else {
            Err(Error::TokenValidation)
        }
    }
}

/// PASETO v4 local tokens.
pub struct LocalToken;

impl LocalToken {
    /// The header and purpose for the local token: `v4.local.`.
    pub const HEADER: &'static str = "v4.local.";

    /// Domain separator for key-splitting the encryption key (21 in length as bytes).
    const DOMAIN_SEPARATOR_ENC: &'static str = "paseto-encryption-key";

    /// Domain separator for key-splitting the authentication key (24 in length as bytes).
    const DOMAIN_SEPARATOR_AUTH: &'static str = "paseto-auth-key-for-aead";

    /// Keyed BLAKE2b over `separator` and the nonce, producing `out_len`
    /// bytes of subkey material.
    ///
    /// All lengths involved are fixed by the protocol, so the inner calls
    /// cannot fail.
    fn derive_subkey(
        master: &blake2b::SecretKey,
        separator: &str,
        nonce: &[u8],
        out_len: usize,
    ) -> Vec<u8> {
        let mut input = Vec::with_capacity(separator.len() + nonce.len());
        input.extend_from_slice(separator.as_bytes());
        input.extend_from_slice(nonce);

        let mut ctx = Blake2b::new(master, out_len).unwrap();
        ctx.update(&input).unwrap();
        ctx.finalize().unwrap().unprotected_as_bytes().to_vec()
    }

    /// Split the user-provided secret key into keys used for encryption and authentication.
    fn key_split(sk: &[u8], n: &[u8]) -> Result<(EncKey, EncNonce, AuthKey), Error> {
        debug_assert_eq!(n.len(), V4::LOCAL_NONCE);

        let master = blake2b::SecretKey::from_slice(sk).map_err(|_| Error::Key)?;

        let mut tmp = Self::derive_subkey(&master, Self::DOMAIN_SEPARATOR_ENC, n, 56);
        let enc_key = EncKey::from_slice(&tmp[..32]).unwrap();
        let n2 = EncNonce::from_slice(&tmp[32..]).unwrap();
        tmp.zeroize();

        let mut tmp = Self::derive_subkey(&master, Self::DOMAIN_SEPARATOR_AUTH, n, V4::LOCAL_TAG);
        let auth_key = AuthKey::from_slice(&tmp).unwrap();
        tmp.zeroize();

        Ok((enc_key, n2, auth_key))
    }

    /// Encrypt and authenticate a message using the nonce directly.
    pub(crate) fn encrypt_with_nonce(
        secret_key: &SymmetricKey<V4>,
        nonce: &[u8],
        message: &[u8],
        footer: Option<&[u8]>,
        implicit_assert: Option<&[u8]>,
    ) -> Result<String, Error> {
        debug_assert_eq!(nonce.len(), V4::LOCAL_NONCE);
        let f = footer.unwrap_or(&[]);
        let i = implicit_assert.unwrap_or(&[]);

        let (enc_key, n2, auth_key) = Self::key_split(secret_key.as_bytes(), nonce)?;

        let mut ciphertext = vec![0u8; message.len()];
        xchacha20::encrypt(&enc_key, &n2, 0, message, &mut ciphertext)
            .map_err(|_| Error::Encryption)?;
        let pre_auth = pae(&[Self::HEADER.as_bytes(), nonce, ciphertext.as_slice(), f, i]);

        let mut b2_ctx = Blake2b::new(&auth_key, V4::LOCAL_TAG).unwrap();
        b2_ctx
            .update(pre_auth.as_slice())
            .map_err(|_| Error::Encryption)?;
        let tag = b2_ctx.finalize().map_err(|_| Error::Encryption)?;

        let mut payload = Vec::with_capacity(nonce.len() + ciphertext.len() + V4::LOCAL_TAG);
        payload.extend_from_slice(nonce);
        payload.extend_from_slice(&ciphertext);
        payload.extend_from_slice(tag.unprotected_as_bytes());

        assemble(Self::HEADER, &payload, f)
    }

    /// Create a local token.
    pub fn encrypt(
        secret_key: &SymmetricKey<V4>,
        message: &[u8],
        footer: Option<&[u8]>,
        implicit_assert: Option<&[u8]>,
    ) -> Result<String, Error> {
        if message.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let mut n = [0u8; V4::LOCAL_NONCE];
        getrandom::getrandom(&mut n)?;

        Self::encrypt_with_nonce(secret_key, &n, message, footer, implicit_assert)
    }

    /// Verify and decrypt a local token.
    ///
    /// A `Some(footer)` is additionally compared in constant time against
    /// the footer the token carries; `None` authenticates whatever footer
    /// the token carries without comparing it to a known value.
    pub fn decrypt(
        secret_key: &SymmetricKey<V4>,
        message: &Message<Local, V4>,
        footer: Option<&[u8]>,
        implicit_assert: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        message.check_footer_matches(footer)?;

        let f = message.untrusted_footer();
        let i = implicit_assert.unwrap_or(&[]);
        let parts = message.parts();

        let (enc_key, n2, auth_key) = Self::key_split(secret_key.as_bytes(), parts.nonce)?;

        let pre_auth = pae(&[Self::HEADER.as_bytes(), parts.nonce, parts.ciphertext, f, i]);
        let expected_tag = blake2b::Tag::from_slice(parts.tag).map_err(|_| Error::TokenValidation)?;
        // Constant-time tag check before any decryption takes place.
        Blake2b::verify(&expected_tag, &auth_key, V4::LOCAL_TAG, pre_auth.as_slice())
            .map_err(|_| Error::TokenValidation)?;

        let mut out = vec![0u8; parts.ciphertext.len()];
        xchacha20::decrypt(&enc_key, &n2, 0, parts.ciphertext, &mut out)
            .map_err(|_| Error::TokenValidation)?;

        TrustedToken::new(Self::HEADER, &out, f, i)
    }
}



#[cfg(test)]
mod test_keys {
    use super::*;
    use crate::version4::test_tokens::TEST_SK_BYTES;

    #[test]
    fn test_symmetric_gen() {
        let random_sk = SymmetricKey::<V4>::generate().unwrap();
        assert_ne!(random_sk.as_bytes(), &[0u8; 32]);
    }

    #[test]
    fn test_invalid_sizes() {
        assert!(AsymmetricSecretKey::<V4>::from(&[1u8; 63]).is_err());
        assert!(AsymmetricSecretKey::<V4>::from(&TEST_SK_BYTES).is_ok());
        assert!(AsymmetricSecretKey::<V4>::from(&[1u8; 65]).is_err());

        // A secret key whose trailing public half does not match its seed.
        let mut mismatched = TEST_SK_BYTES;
        mismatched[63] ^= 0xFF;
        assert!(AsymmetricSecretKey::<V4>::from(&mismatched).is_err());

        assert!(AsymmetricPublicKey::<V4>::from(&[1u8; 31]).is_err());
        assert!(AsymmetricPublicKey::<V4>::from(&[1u8; 32]).is_ok());
        assert!(AsymmetricPublicKey::<V4>::from(&[1u8; 33]).is_err());

        assert!(SymmetricKey::<V4>::from(&[0u8; 31]).is_err());
        assert!(SymmetricKey::<V4>::from(&[0u8; 32]).is_ok());
        assert!(SymmetricKey::<V4>::from(&[0u8; 33]).is_err());
    }

    #[test]
    fn try_from_secret_to_public() {
        let kp = AsymmetricKeyPair::<V4>::generate().unwrap();
        let pubv4 = AsymmetricPublicKey::<V4>::try_from(&kp.secret).unwrap();
        assert_eq!(pubv4.as_bytes(), kp.public.as_bytes());
        assert_eq!(pubv4, kp.public);
        assert_eq!(&kp.secret.as_bytes()[32..], pubv4.as_bytes());
    }

    #[test]
    fn test_clone() {
        let sk = SymmetricKey::<V4>::generate().unwrap();
        assert_eq!(sk, sk.clone());

        let kp = AsymmetricKeyPair::<V4>::generate().unwrap();
        assert_eq!(kp.secret, kp.secret.clone());
        assert_eq!(kp.public, kp.public.clone());
    }
}
