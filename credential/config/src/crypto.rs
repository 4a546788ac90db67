// SPDX-License-Identifier: Apache-2.0

//! Here we select the cryptographic types that are used by default in the code base.
//! Higher layers should only refer to the `Signer`/`Validator` traits and the
//! `PublicKey`/`PrivateKey`/`Signature` wrappers, never to the underlying scheme
//! implementation, so the scheme can be swapped without touching the payload layer.
//!
//! The primary scheme is RSA with a 1024-bit modulus, public exponent 65537,
//! PKCS#1 v1.5 padding and SHA-256 digests. Keys travel as fixed-width base64url:
//! the public form encodes the big-endian modulus padded to 128 bytes, the private
//! form encodes modulus || private exponent (128 + 128 bytes).

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use rsa::pkcs1v15::{Signature as RsaSignature, SigningKey, VerifyingKey};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding as _, Signer as _, Verifier as _};
use rsa::traits::{PrivateKeyParts as _, PublicKeyParts as _};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// Width of the big-endian modulus in the public wire form.
pub const MODULUS_LENGTH: usize = 128;

/// Width of the private wire form: modulus || private exponent.
pub const PRIVATE_KEY_LENGTH: usize = 2 * MODULUS_LENGTH;

const PUBLIC_EXPONENT: u64 = 65537;

/// Errors from decoding or rebuilding key material. Signing is infallible and
/// verification reports malformed inputs as a plain `false`, so this surfaces
/// only from the wire-decoding entry points.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("rejected RSA key material: {0}")]
    InvalidKey(String),
}

/// An opaque signature. Empty means "unsigned"; all operations treat an empty
/// signature as absent. Equality is byte-equality.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature(Vec<u8>);

impl Signature {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// The unsigned placeholder.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64url form; the empty signature encodes as the empty string.
    pub fn to_base64(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        URL_SAFE.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        if encoded.is_empty() {
            return Ok(Self::empty());
        }
        let bytes = URL_SAFE
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.to_base64())
    }
}

/// Verifies `(message, signature)` pairs. Returns false for any malformed
/// input: empty message, empty signature, wrong length, wrong padding.
pub trait Validator {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool;
}

/// Produces a `Signature` over a message. Never fails.
pub trait Signer {
    fn sign(&self, message: &[u8]) -> Signature;
}

/// The public half of a keypair. Only a `Validator`.
#[derive(Clone)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    fn from_modulus(n: BigUint) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::new(n, BigUint::from(PUBLIC_EXPONENT))
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Base64url of the big-endian modulus, left-padded to `MODULUS_LENGTH`.
    pub fn to_base64(&self) -> String {
        URL_SAFE.encode(to_fixed_width(self.0.n(), MODULUS_LENGTH))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        if bytes.len() != MODULUS_LENGTH {
            return Err(CryptoError::InvalidLength {
                expected: MODULUS_LENGTH,
                actual: bytes.len(),
            });
        }
        Self::from_modulus(BigUint::from_bytes_be(&bytes))
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.n() == other.0.n()
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.to_base64())
    }
}

impl Validator for PublicKey {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        if message.is_empty() || signature.is_empty() {
            return false;
        }
        let Ok(signature) = RsaSignature::try_from(signature.as_bytes()) else {
            return false;
        };
        VerifyingKey::<Sha256>::new(self.0.clone())
            .verify(message, &signature)
            .is_ok()
    }
}

/// A full keypair. Both a `Signer` and a `Validator`.
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
    public: PublicKey,
}

impl PrivateKey {
    /// Generates a fresh 1024-bit keypair from the given RNG (pass a seeded rng in tests).
    pub fn generate<R: rand::CryptoRng + rand::RngCore>(rng: &mut R) -> Self {
        let inner = RsaPrivateKey::new(rng, MODULUS_LENGTH * 8)
            .expect("RSA key generation should not fail");
        let public = PublicKey(inner.to_public_key());
        Self { inner, public }
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    /// Base64url of modulus || private exponent, each left-padded to `MODULUS_LENGTH`.
    pub fn to_base64(&self) -> String {
        let mut bytes = to_fixed_width(self.inner.n(), MODULUS_LENGTH);
        bytes.extend(to_fixed_width(self.inner.d(), MODULUS_LENGTH));
        URL_SAFE.encode(bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = URL_SAFE
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        if bytes.len() != PRIVATE_KEY_LENGTH {
            return Err(CryptoError::InvalidLength {
                expected: PRIVATE_KEY_LENGTH,
                actual: bytes.len(),
            });
        }
        let n = BigUint::from_bytes_be(&bytes[..MODULUS_LENGTH]);
        let d = BigUint::from_bytes_be(&bytes[MODULUS_LENGTH..]);
        let e = BigUint::from(PUBLIC_EXPONENT);
        // The wire form carries only n and d; p and q are recovered here so
        // the rebuilt key is constructed from a full set of components.
        let (p, q) = recover_primes(&n, &e, &d).ok_or_else(|| {
            CryptoError::InvalidKey("cannot recover prime factors from key material".to_string())
        })?;
        let inner = RsaPrivateKey::from_components(n, e, d, vec![p, q])
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        let public = PublicKey(inner.to_public_key());
        Ok(Self { inner, public })
    }
}

/// Recovers the prime factors of a two-prime RSA modulus from (n, e, d),
/// using the probabilistic-turned-deterministic sweep of NIST SP 800-56B
/// Appendix C.2 (also RFC 8017's `RSASP1` consistency argument): e*d − 1 is a
/// multiple of lcm(p−1, q−1), so square roots of unity mod n expose a factor.
/// Returns `None` when the material is not a consistent RSA key.
fn recover_primes(n: &BigUint, e: &BigUint, d: &BigUint) -> Option<(BigUint, BigUint)> {
    let zero = BigUint::from(0u8);
    let one = BigUint::from(1u8);
    let two = BigUint::from(2u8);

    let k = d * e;
    if k == zero {
        return None;
    }
    let k = k - &one;
    if &k % &two != zero {
        return None;
    }

    // k = r * 2^t with r odd.
    let mut r = k;
    let mut t = 0usize;
    while &r % &two == zero {
        r >>= 1;
        t += 1;
    }

    for g in 2u64..=100 {
        let mut y = BigUint::from(g).modpow(&r, n);
        if y == one || y == n - &one {
            continue;
        }
        for _ in 0..t {
            let x = y.modpow(&two, n);
            if x == one {
                // y is a nontrivial square root of 1 mod n.
                let p = gcd(&y - &one, n.clone());
                if p == one || p == *n {
                    return None;
                }
                let q = n / &p;
                if &p * &q != *n {
                    return None;
                }
                return Some((p, q));
            }
            if x == n - &one {
                break;
            }
            y = x;
        }
    }
    None
}

fn gcd(mut a: BigUint, mut b: BigUint) -> BigUint {
    let zero = BigUint::from(0u8);
    while b != zero {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
    }
}

impl Eq for PrivateKey {}

impl fmt::Debug for PrivateKey {
    // Never prints the private exponent.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "PrivateKey({})", self.public.to_base64())
    }
}

impl Signer for PrivateKey {
    fn sign(&self, message: &[u8]) -> Signature {
        let signature = SigningKey::<Sha256>::new(self.inner.clone()).sign(message);
        Signature::new(signature.to_vec())
    }
}

impl Validator for PrivateKey {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public.verify(message, signature)
    }
}

fn to_fixed_width(value: &BigUint, width: usize) -> Vec<u8> {
    let bytes = value.to_bytes_be();
    debug_assert!(bytes.len() <= width, "value wider than wire width");
    let mut buf = vec![0u8; width.saturating_sub(bytes.len())];
    buf.extend_from_slice(&bytes);
    buf
}
