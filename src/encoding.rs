use crate::errors::Error;
use ct_codecs::{Base64UrlSafeNoPadding, Decoder, Encoder};

/// Encode bytes with Base64 URL-safe and no padding.
pub(crate) fn encode_b64<T: AsRef<[u8]>>(bytes: T) -> Result<String, Error> {
    let inlen = bytes.as_ref().len();
    let mut buf = vec![0u8; Base64UrlSafeNoPadding::encoded_len(inlen)?];

    let ret: String = Base64UrlSafeNoPadding::encode_to_str(&mut buf, bytes)?.into();

    Ok(ret)
}

/// Decode string with Base64 URL-safe and no padding. Any byte outside the
/// alphabet, including `=`, is rejected.
pub(crate) fn decode_b64<T: AsRef<[u8]>>(encoded: T) -> Result<Vec<u8>, Error> {
    let inlen = encoded.as_ref().len();
    // The encoded length is always enough for the decoded output, which
    // ct-codecs allows.
    let mut buf = vec![0u8; Base64UrlSafeNoPadding::encoded_len(inlen)?];

    let ret: Vec<u8> = Base64UrlSafeNoPadding::decode(&mut buf, encoded, None)?.into();

    Ok(ret)
}

/// Little-endian encoding of `n`, with the MSB cleared for interoperability
/// with languages that lack unsigned 64-bit integers.
pub(crate) fn le64(n: u64) -> [u8; 8] {
    (n & 0x7FFF_FFFF_FFFF_FFFF).to_le_bytes()
}

/// Pre-authentication encoding: the piece count followed by each piece,
/// both length-prefixed with [`le64`]. Unambiguously binds the pieces into
/// MAC/signature transcripts.
pub(crate) fn pae(pieces: &[&[u8]]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(64);

    out.extend_from_slice(&le64(pieces.len() as u64));
    for elem in pieces.iter() {
        out.extend_from_slice(&le64(elem.len() as u64));
        out.extend_from_slice(elem);
    }

    out
}
