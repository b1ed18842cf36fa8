//! PASETO version 2 tokens: XChaCha20-Poly1305 for `local` and Ed25519 for
//! `public`. Version 2 predates implicit assertions, so none of its
//! operations accept one.

use crate::encoding::pae;
use crate::errors::Error;
use crate::keys::validate_ed25519_secret;
use crate::keys::{
    AsymmetricKeyPair, AsymmetricPublicKey, AsymmetricSecretKey, Generate, SymmetricKey,
};
use crate::message::{assemble, Local, Message, Public};
use crate::token::TrustedToken;
use crate::version::private::Version;
use ed25519_compact::{KeyPair, PublicKey, SecretKey as SigningKey, Seed, Signature};
use orion::hazardous::aead::xchacha20poly1305::{open, seal, Nonce, SecretKey};
use orion::hazardous::mac::blake2b;
use orion::hazardous::mac::poly1305::POLY1305_OUTSIZE;
use orion::hazardous::stream::xchacha20::XCHACHA_NONCESIZE;
use zeroize::Zeroize;

#[derive(Debug, PartialEq, Eq, Clone)]
/// Version 2 of the PASETO spec.
pub struct V2;

impl Version for V2 {
    const LOCAL_KEY: usize = 32;
    const SECRET_KEY: usize = 32 + Self::PUBLIC_KEY; // Seed || PK
    const PUBLIC_KEY: usize = 32;
    const PUBLIC_SIG: usize = 64;
    const LOCAL_NONCE: usize = 24;
    const LOCAL_TAG: usize = 16;
    const LOCAL_HEADER: &'static str = "v2.local.";
    const PUBLIC_HEADER: &'static str = "v2.public.";
    const PASERK_VERSION: &'static str = "k2";

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

impl AsymmetricSecretKey<V2> {
    /// Create a secret key from a 32-byte Ed25519 seed, deriving the public
    /// half.
    pub fn from_seed(seed_bytes: &[u8]) -> Result<Self, Error> {
        let seed = Seed::from_slice(seed_bytes).map_err(|_| Error::Key)?;
        let kp = KeyPair::from_seed(seed);

        Self::from(kp.sk.as_ref())
    }
}

impl TryFrom<&AsymmetricSecretKey<V2>> for AsymmetricPublicKey<V2> {
    type Error = Error;

    fn try_from(value: &AsymmetricSecretKey<V2>) -> Result<Self, Self::Error> {
        AsymmetricPublicKey::<V2>::from(&value.as_bytes()[32..])
    }
}

impl Generate<AsymmetricKeyPair<V2>, V2> for AsymmetricKeyPair<V2> {
    fn generate() -> Result<AsymmetricKeyPair<V2>, Error> {
        let raw = KeyPair::generate();

        Ok(AsymmetricKeyPair {
            public: AsymmetricPublicKey::<V2>::from(raw.pk.as_ref())
                .map_err(|_| Error::KeyGeneration)?,
            secret: AsymmetricSecretKey::<V2>::from(raw.sk.as_ref())
                .map_err(|_| Error::KeyGeneration)?,
        })
    }
}

impl Generate<SymmetricKey<V2>, V2> for SymmetricKey<V2> {
    fn generate() -> Result<SymmetricKey<V2>, Error> {
        let mut rng_bytes = [0u8; V2::LOCAL_KEY];
        getrandom::getrandom(&mut rng_bytes)?;

        let key = SymmetricKey::<V2>::from(&rng_bytes);
        rng_bytes.zeroize();

        key
    }
}

/// PASETO v2 public tokens.
pub struct PublicToken;

impl PublicToken {
    /// The header and purpose for the public token: `v2.public.`.
    pub const HEADER: &'static str = "v2.public.";

    /// Create a public token.
    pub fn sign(
        secret_key: &AsymmetricSecretKey<V2>,
        message: &[u8],
        footer: Option<&[u8]>,
    ) -> Result<String, Error> {
        if message.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let sk = SigningKey::from_slice(secret_key.as_bytes()).map_err(|_| Error::Key)?;
        let f = footer.unwrap_or(&[]);
        let sig = sk.sign(pae(&[Self::HEADER.as_bytes(), message, f]), None);

        let mut payload = Vec::with_capacity(message.len() + V2::PUBLIC_SIG);
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
        public_key: &AsymmetricPublicKey<V2>,
        message: &Message<Public, V2>,
        footer: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        message.check_footer_matches(footer)?;

        let f = message.untrusted_footer();
        let parts = message.parts();

        let m2 = pae(&[Self::HEADER.as_bytes(), parts.message, f]);
        let pk = PublicKey::from_slice(public_key.as_bytes()).map_err(|_| Error::Key)?;

        // If the below fails, it is an invalid signature.
        let sig = Signature::from_slice(parts.signature).map_err(|_| Error::TokenValidation)?;

        if pk.verify(m2, &sig).is_ok() {
            TrustedToken::new(Self::HEADER, parts.message, f, &[])
        } else {
            Err(Error::TokenValidation)
        }
    }
}

/// PASETO v2 local tokens.
pub struct LocalToken;

impl LocalToken {
    /// The header and purpose for the local token: `v2.local.`.
    pub const HEADER: &'static str = "v2.local.";

    /// The effective AEAD nonce is keyed BLAKE2b over the message, so a
    /// random key input yields a nonce that is unique per encryption yet
    /// deterministic with respect to the plaintext.
    fn derive_nonce(nonce_key_bytes: &[u8], message: &[u8]) -> Result<Nonce, Error> {
        debug_assert_eq!(nonce_key_bytes.len(), XCHACHA_NONCESIZE);

        let nonce_key =
            blake2b::SecretKey::from_slice(nonce_key_bytes).map_err(|_| Error::Key)?;
        let mut ctx =
            blake2b::Blake2b::new(&nonce_key, XCHACHA_NONCESIZE).map_err(|_| Error::Key)?;
        ctx.update(message).map_err(|_| Error::Encryption)?;
        let digest = ctx.finalize().map_err(|_| Error::Encryption)?;

        // 24-byte digest into a 24-byte nonce.
        Ok(Nonce::from_slice(digest.unprotected_as_bytes()).unwrap())
    }

    /// Encrypt and authenticate a message, deriving the effective nonce
    /// from `nonce_key_bytes` and the message.
    pub(crate) fn encrypt_with_derived_nonce(
        secret_key: &SymmetricKey<V2>,
        nonce_key_bytes: &[u8],
        message: &[u8],
        footer: Option<&[u8]>,
    ) -> Result<String, Error> {
        let f = footer.unwrap_or(&[]);
        let nonce = Self::derive_nonce(nonce_key_bytes, message)?;
        let pre_auth = pae(&[Self::HEADER.as_bytes(), nonce.as_ref(), f]);

        let sk = SecretKey::from_slice(secret_key.as_bytes()).map_err(|_| Error::Key)?;
        let mut sealed = vec![0u8; message.len() + POLY1305_OUTSIZE];
        seal(&sk, &nonce, message, Some(&pre_auth), &mut sealed)
            .map_err(|_| Error::Encryption)?;

        let mut payload = Vec::with_capacity(nonce.len() + sealed.len());
        payload.extend_from_slice(nonce.as_ref());
        payload.extend_from_slice(&sealed);

        assemble(Self::HEADER, &payload, f)
    }

    /// Create a local token.
    pub fn encrypt(
        secret_key: &SymmetricKey<V2>,
        message: &[u8],
        footer: Option<&[u8]>,
    ) -> Result<String, Error> {
        if message.is_empty() {
            return Err(Error::EmptyPayload);
        }

        let mut rng_bytes = [0u8; XCHACHA_NONCESIZE];
        getrandom::getrandom(&mut rng_bytes)?;

        Self::encrypt_with_derived_nonce(secret_key, &rng_bytes, message, footer)
    }

    /// Verify and decrypt a local token.
    ///
    /// A `Some(footer)` is additionally compared in constant time against
    /// the footer the token carries; `None` authenticates whatever footer
    /// the token carries without comparing it to a known value.
    pub fn decrypt(
        secret_key: &SymmetricKey<V2>,
        message: &Message<Local, V2>,
        footer: Option<&[u8]>,
    ) -> Result<TrustedToken, Error> {
        message.check_footer_matches(footer)?;

        let f = message.untrusted_footer();
        let parts = message.parts();
        let nonce = Nonce::from_slice(parts.nonce).map_err(|_| Error::TokenValidation)?;

        let pre_auth = pae(&[Self::HEADER.as_bytes(), parts.nonce, f]);

        // The AEAD interface takes ciphertext and tag as one unit.
        let ct_tag = &message.untrusted_message()[V2::LOCAL_NONCE..];
        let sk = SecretKey::from_slice(secret_key.as_bytes()).map_err(|_| Error::Key)?;
        let mut out = vec![0u8; ct_tag.len() - POLY1305_OUTSIZE];
        open(&sk, &nonce, ct_tag, Some(&pre_auth), &mut out)
            .map_err(|_| Error::TokenValidation)?;

        TrustedToken::new(Self::HEADER, &out, f, &[])
    }
}
