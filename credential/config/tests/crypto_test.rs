// SPDX-License-Identifier: Apache-2.0

use credential_config::{
    PrivateKey, PublicKey, Signature, Signer as _, Validator as _, CryptoError, MODULUS_LENGTH,
    PRIVATE_KEY_LENGTH,
};
use rand::{rngs::StdRng, SeedableRng as _};

#[test]
fn sign_and_verify_round_trip() {
    let mut rng = StdRng::from_seed([7; 32]);
    let key = PrivateKey::generate(&mut rng);

    let message = b"attestation bytes";
    let signature = key.sign(message);

    assert!(!signature.is_empty());
    assert!(key.public().verify(message, &signature));
    assert!(key.verify(message, &signature));
}

#[test]
fn verify_rejects_malformed_inputs() {
    let mut rng = StdRng::from_seed([8; 32]);
    let key = PrivateKey::generate(&mut rng);
    let message = b"attestation bytes";
    let signature = key.sign(message);

    // Empty signature and empty message are absent, not errors.
    assert!(!key.public().verify(message, &Signature::empty()));
    assert!(!key.public().verify(b"", &signature));

    // A tampered message fails.
    assert!(!key.public().verify(b"attestation bytez", &signature));

    // A truncated or bit-flipped signature fails.
    let mut bytes = signature.as_bytes().to_vec();
    bytes[0] ^= 0x01;
    assert!(!key.public().verify(message, &Signature::new(bytes)));
    assert!(!key
        .public()
        .verify(message, &Signature::new(signature.as_bytes()[..64].to_vec())));
}

#[test]
fn verify_rejects_foreign_key() {
    let mut rng = StdRng::from_seed([9; 32]);
    let key = PrivateKey::generate(&mut rng);
    let other = PrivateKey::generate(&mut rng);

    let signature = key.sign(b"message");
    assert!(!other.public().verify(b"message", &signature));
}

#[test]
fn public_key_base64_round_trip() {
    let mut rng = StdRng::from_seed([10; 32]);
    let key = PrivateKey::generate(&mut rng);

    let encoded = key.public().to_base64();
    let decoded = PublicKey::from_base64(&encoded).unwrap();

    assert_eq!(key.public(), &decoded);
    assert_eq!(encoded, decoded.to_base64());
}

#[test]
fn private_key_base64_round_trip_preserves_signatures() {
    let mut rng = StdRng::from_seed([11; 32]);
    let key = PrivateKey::generate(&mut rng);

    let decoded = PrivateKey::from_base64(&key.to_base64()).unwrap();
    assert_eq!(key, decoded);

    // PKCS#1 v1.5 signing is deterministic, so the rebuilt key signs identically.
    let message = b"deterministic";
    assert_eq!(key.sign(message), decoded.sign(message));
}

#[test]
fn key_decoding_enforces_fixed_widths() {
    use base64::{engine::general_purpose::URL_SAFE, Engine as _};

    let short = URL_SAFE.encode(vec![1u8; MODULUS_LENGTH - 1]);
    assert_eq!(
        PublicKey::from_base64(&short),
        Err(CryptoError::InvalidLength {
            expected: MODULUS_LENGTH,
            actual: MODULUS_LENGTH - 1,
        })
    );

    let long = URL_SAFE.encode(vec![1u8; PRIVATE_KEY_LENGTH + 1]);
    assert!(matches!(
        PrivateKey::from_base64(&long),
        Err(CryptoError::InvalidLength { .. })
    ));

    assert!(matches!(
        PublicKey::from_base64("not base64!"),
        Err(CryptoError::InvalidEncoding(_))
    ));
}

#[test]
fn signature_base64_round_trip() {
    let signature = Signature::new(vec![0, 1, 2, 254, 255]);
    let encoded = signature.to_base64();
    assert_eq!(Signature::from_base64(&encoded).unwrap(), signature);

    // The unsigned placeholder encodes as the empty string.
    assert_eq!(Signature::empty().to_base64(), "");
    assert_eq!(Signature::from_base64("").unwrap(), Signature::empty());
}

// A keypair generated outside this crate (1024-bit modulus, e = 65537), with
// the PKCS#1 v1.5 / SHA-256 signature of FIXED_MESSAGE computed independently
// as EM^d mod n. Proves that a key rebuilt from its wire form (which requires
// recovering p and q from n, e, d) signs and verifies correctly.
const FIXED_PRIVATE_KEY: &str = "rr0RydSgWaCvr65DNIGR9LkMpT5LoJG7noFXoQV00NG_i2IkUeYmFufhK7yyJvZwMSpjpISfnsBij7PlW7XRLJbYBABxOhxNpwgFSVurfruJeLJMe2IU2c-7Dq_4iqJIrmXWZV9MU64fmFVW5jytwbLatl1-u1jDc9DCQsUET1EHTCwfArtDovtTWfLCkZq33raRfB2KciukvgAb4G91fR0DxDCCHxt-H2b-_Z1vFSGwW_XXXBaSebRkDf5JKzm2ElfnQzkVNTQayNhbQPLu0JJx8sdawan56ik7jICjFDHo7NYDNOMyArPwd6gP9KN-pkT5JaN_N_UL7_fLHrSp9Q==";
const FIXED_PUBLIC_KEY: &str = "rr0RydSgWaCvr65DNIGR9LkMpT5LoJG7noFXoQV00NG_i2IkUeYmFufhK7yyJvZwMSpjpISfnsBij7PlW7XRLJbYBABxOhxNpwgFSVurfruJeLJMe2IU2c-7Dq_4iqJIrmXWZV9MU64fmFVW5jytwbLatl1-u1jDc9DCQsUET1E=";
const FIXED_MESSAGE: &[u8] = b"reconstructed keys sign deterministically";
const FIXED_SIGNATURE: &str = "Dl6n_vhPQ2n6PJ40p2oaVj386kjZxBKDO1tgxtBYoHgSOUoXo0mcyzDLOeih6iWyKcQHCxcrh8Q6Ap5mstB0l63q2XXY0QWOGrrMiicnY5bfIcAssBlXGNAPxlzmLfe7L12I9OQ0Sh_0CALY5rbyT7Go8SK1KJ_EQBrBG10YYrQ=";

#[test]
fn fixed_private_key_reconstructs_and_signs_correctly() {
    let key = PrivateKey::from_base64(FIXED_PRIVATE_KEY).unwrap();
    assert_eq!(key.to_base64(), FIXED_PRIVATE_KEY);
    assert_eq!(key.public().to_base64(), FIXED_PUBLIC_KEY);

    // Deterministic padding: the rebuilt key reproduces the reference
    // signature exactly, and it verifies under the bare public key.
    let signature = key.sign(FIXED_MESSAGE);
    assert_eq!(signature.to_base64(), FIXED_SIGNATURE);
    assert!(key.public().verify(FIXED_MESSAGE, &signature));

    let public = PublicKey::from_base64(FIXED_PUBLIC_KEY).unwrap();
    let reference = Signature::from_base64(FIXED_SIGNATURE).unwrap();
    assert!(public.verify(FIXED_MESSAGE, &reference));
}

#[test]
fn private_key_from_garbage_material_fails() {
    use base64::{engine::general_purpose::URL_SAFE, Engine as _};

    // Correct width, but (n, e, d) are not a consistent RSA key.
    let garbage = URL_SAFE.encode(vec![0xABu8; PRIVATE_KEY_LENGTH]);
    assert!(matches!(
        PrivateKey::from_base64(&garbage),
        Err(CryptoError::InvalidKey(_))
    ));
}
