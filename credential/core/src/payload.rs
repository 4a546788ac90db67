// SPDX-License-Identifier: Apache-2.0

//! The closed payload taxonomy and its polymorphic decoder.
//!
//! Every payload is one arm of the [`Payload`] sum, self-described by the `t`
//! field of its raw map. Decoding dispatches through the tag table and never
//! returns a value of a different variant than the tag names.

use enum_dispatch::enum_dispatch;
use serde_json::Value;

use credential_config::{PrivateKey, PublicKey, Signature, Signer, Validator};

use crate::codec::{self, RawMap};
use crate::credential::{Data, DataRequest, DataTransfer};
use crate::delegation::{
    AuthorityApproval, AuthorityRequest, PermissionApproval, PermissionRequest,
};
use crate::error::{CredentialError, CredentialResult};
use crate::keyholder::{Authority, Individual};
use crate::wallet::Wallet;

/// The closed set of wire tags. Lowercase in raw maps, uppercase in transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum PayloadTag {
    #[strum(serialize = "a")]
    Authority,
    #[strum(serialize = "u")]
    Individual,
    #[strum(serialize = "ar")]
    AuthorityRequest,
    #[strum(serialize = "aa")]
    AuthorityApproval,
    #[strum(serialize = "pr")]
    PermissionRequest,
    #[strum(serialize = "pa")]
    PermissionApproval,
    #[strum(serialize = "d")]
    Data,
    #[strum(serialize = "dt")]
    DataTransfer,
    #[strum(serialize = "dr")]
    DataRequest,
    #[strum(serialize = "w")]
    Wallet,
    #[strum(serialize = "k")]
    PublicKey,
    #[strum(serialize = "pk")]
    PrivateKey,
    #[strum(serialize = "s")]
    Signature,
}

impl PayloadTag {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }
}

/// A payload whose canonical bytes (with the signature field omitted) can be
/// signed, and whose signature can later be validated against the variant's
/// designated key.
#[enum_dispatch]
pub trait Signable {
    fn tag(&self) -> PayloadTag;

    /// The ordered raw map of this payload, `t` first, `s` omitted.
    fn raw_body(&self) -> RawMap;

    fn signature(&self) -> &Signature;

    fn set_signature(&mut self, signature: Signature);

    /// Combined check: the signature verifies under the variant's key and all
    /// embedded signables validate too.
    fn validate(&self) -> bool;
}

/// Derived operations over [`Signable`]. Blanket-implemented; payload types
/// only pin their field order and key choice.
pub trait SignableExt: Signable {
    /// The exact message covered by the signature.
    fn signing_bytes(&self) -> Vec<u8> {
        codec::canonical_bytes(&self.raw_body())
    }

    /// The full raw map, with `s` appended last (empty string when unsigned).
    fn raw_value(&self) -> Value {
        let mut map = self.raw_body();
        map.insert("s".to_string(), Value::String(self.signature().to_base64()));
        Value::Object(map)
    }

    /// Canonical bytes of the full raw map.
    fn canonical_bytes(&self) -> Vec<u8> {
        match self.raw_value() {
            Value::Object(map) => codec::canonical_bytes(&map),
            _ => unreachable!("raw_value always returns a map"),
        }
    }

    fn is_signed(&self) -> bool {
        !self.signature().is_empty()
    }

    fn sign(&mut self, signer: &dyn Signer) {
        let signature = signer.sign(&self.signing_bytes());
        self.set_signature(signature);
    }

    /// True iff a signature is present and verifies under `key`.
    fn verify_signature(&self, key: &dyn Validator) -> bool {
        !self.signature().is_empty() && key.verify(&self.signing_bytes(), self.signature())
    }

    /// The `TAG:DIGITS` transport form.
    fn transport(&self) -> String {
        match self.raw_value() {
            Value::Object(map) => codec::encode_transport(self.tag().as_str(), &map),
            _ => unreachable!("raw_value always returns a map"),
        }
    }
}

impl<T: Signable + ?Sized> SignableExt for T {}

/// The closed sum of signable payload variants.
#[enum_dispatch(Signable)]
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Authority,
    Individual,
    AuthorityRequest,
    AuthorityApproval,
    PermissionRequest,
    PermissionApproval,
    Data,
    DataTransfer,
    DataRequest,
    Wallet,
}

impl Payload {
    /// Dispatches on the `t` tag. Unknown tags fail with `UnknownTag`.
    pub fn from_raw(value: &Value) -> CredentialResult<Payload> {
        let map = codec::as_object(value)?;
        match codec::get_str(map, "t")? {
            "a" => Ok(Authority::from_raw(map)?.into()),
            "u" => Ok(Individual::from_raw(map)?.into()),
            "ar" => Ok(AuthorityRequest::from_raw(map)?.into()),
            "aa" => Ok(AuthorityApproval::from_raw(map)?.into()),
            "pr" => Ok(PermissionRequest::from_raw(map)?.into()),
            "pa" => Ok(PermissionApproval::from_raw(map)?.into()),
            "d" => Ok(Data::from_raw(map)?.into()),
            "dt" => Ok(DataTransfer::from_raw(map)?.into()),
            "dr" => Ok(DataRequest::from_raw(map)?.into()),
            "w" => Ok(Wallet::from_raw(map)?.into()),
            other => Err(CredentialError::UnknownTag(other.to_string())),
        }
    }
}

/// Result of decoding an arbitrary transport string: a signable payload, or
/// one of the bare (uncompressed) forms.
#[derive(Clone, Debug, PartialEq)]
pub enum Decoded {
    Payload(Payload),
    PublicKey(PublicKey),
    PrivateKey(PrivateKey),
    Signature(Signature),
}

impl Decoded {
    /// Re-encodes to the transport form that `decode` accepts.
    pub fn transport(&self) -> String {
        match self {
            Decoded::Payload(payload) => payload.transport(),
            Decoded::PublicKey(key) => codec::encode_bare_transport("k", &key.to_base64()),
            Decoded::PrivateKey(key) => codec::encode_bare_transport("pk", &key.to_base64()),
            Decoded::Signature(signature) => {
                codec::encode_bare_transport("s", &signature.to_base64())
            }
        }
    }
}

/// Decodes any transport-form string. `K:`/`PK:`/`S:` bodies are bare base64;
/// everything else is a compressed raw map dispatched on its `t` tag, which
/// must agree with the transport tag.
pub fn decode(data: &str) -> CredentialResult<Decoded> {
    let (tag, body) = codec::split_transport(data)?;
    match tag {
        "K" => Ok(Decoded::PublicKey(PublicKey::from_base64(&body)?)),
        "PK" => Ok(Decoded::PrivateKey(PrivateKey::from_base64(&body)?)),
        "S" => Ok(Decoded::Signature(Signature::from_base64(&body)?)),
        _ => {
            let value = codec::decompress(&body)?;
            let payload = Payload::from_raw(&value)?;
            if !tag.eq_ignore_ascii_case(payload.tag().as_str()) {
                return Err(CredentialError::MalformedPayload(format!(
                    "transport tag '{tag}' does not match payload tag '{}'",
                    payload.tag()
                )));
            }
            Ok(Decoded::Payload(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyholder::KeyHolder;
    use rand::{rngs::StdRng, SeedableRng as _};

    fn private_key(seed: u8) -> PrivateKey {
        PrivateKey::generate(&mut StdRng::from_seed([seed; 32]))
    }

    #[test]
    fn decode_returns_the_tagged_variant() {
        let authority = Authority::self_signed("Auth490", private_key(20));
        let transport = authority.transport();
        assert!(transport.starts_with("A:"));

        let decoded = decode(&transport).unwrap();
        match decoded {
            Decoded::Payload(Payload::Authority(decoded)) => assert_eq!(decoded, authority),
            other => panic!("decoded into the wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decoded_payloads_stay_valid_after_reencoding() {
        let authority = Authority::self_signed("Auth490", private_key(21));

        let Decoded::Payload(Payload::Authority(decoded)) =
            decode(&authority.transport()).unwrap()
        else {
            panic!("expected an authority");
        };
        assert!(decoded.validate());
        assert_eq!(decoded.transport(), authority.transport());
        assert_eq!(decoded.canonical_bytes(), authority.canonical_bytes());
    }

    #[test]
    fn signing_bytes_equal_canonical_form_without_signature() {
        let key = private_key(22);
        let unsigned = Authority::new("Auth490", key.public().clone());
        let signed = Authority::self_signed("Auth490", key);

        // The signed message is the canonical form of the unsigned body.
        assert_eq!(signed.signing_bytes(), unsigned.signing_bytes());
        assert_ne!(signed.canonical_bytes(), unsigned.canonical_bytes());
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("zz".to_string()));
        assert_eq!(
            Payload::from_raw(&Value::Object(map)),
            Err(CredentialError::UnknownTag("zz".to_string()))
        );
    }

    #[test]
    fn mismatched_transport_tag_is_rejected() {
        let individual = Individual::self_signed(private_key(23));
        let transport = individual.transport();
        let relabeled = transport.replacen("U:", "D:", 1);

        assert!(matches!(
            decode(&relabeled),
            Err(CredentialError::MalformedPayload(_))
        ));
    }

    #[test]
    fn bare_key_transport_round_trip() {
        let key = private_key(24);

        let public = Decoded::PublicKey(key.public().clone());
        let transport = public.transport();
        assert!(transport.starts_with("K:"));
        assert_eq!(decode(&transport).unwrap(), public);

        let private = Decoded::PrivateKey(key);
        let transport = private.transport();
        assert!(transport.starts_with("PK:"));
        assert_eq!(decode(&transport).unwrap(), private);
    }

    #[test]
    fn bare_signature_transport_round_trip() {
        let signature = private_key(25).sign(b"message");
        let decoded = decode(&Decoded::Signature(signature.clone()).transport()).unwrap();
        assert_eq!(decoded, Decoded::Signature(signature));
    }

    #[test]
    fn keyholder_raw_round_trip_is_byte_exact() {
        let holder = KeyHolder::from(Individual::self_signed(private_key(26)));
        let Value::Object(map) = holder.raw_value() else {
            panic!("raw_value always returns a map");
        };
        let reparsed = KeyHolder::from_raw(&map).unwrap();
        assert_eq!(reparsed.canonical_bytes(), holder.canonical_bytes());
        assert!(reparsed.validate());
    }
}
