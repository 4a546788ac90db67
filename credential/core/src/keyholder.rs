// SPDX-License-Identifier: Apache-2.0

//! Self-signed identities. A key holder carries one key (public or private),
//! proves possession of the private half with a self-signature, and acts as a
//! validator for payloads signed by it. Only the public half is ever encoded.

use enum_dispatch::enum_dispatch;
use serde_json::Value;

use credential_config::{PrivateKey, PublicKey, Signature, Validator};

use crate::codec::{self, RawMap};
use crate::error::{CredentialError, CredentialResult};
use crate::payload::{PayloadTag, Signable, SignableExt as _};

/// The key held by an identity. Equality compares the public halves, so a
/// holder rebuilt from the wire compares equal to the private original.
#[derive(Clone, Debug)]
pub enum KeyHolderKey {
    Public(PublicKey),
    Private(PrivateKey),
}

impl KeyHolderKey {
    pub fn public(&self) -> &PublicKey {
        match self {
            KeyHolderKey::Public(key) => key,
            KeyHolderKey::Private(key) => key.public(),
        }
    }

    pub fn private(&self) -> Option<&PrivateKey> {
        match self {
            KeyHolderKey::Public(_) => None,
            KeyHolderKey::Private(key) => Some(key),
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, KeyHolderKey::Private(_))
    }
}

impl PartialEq for KeyHolderKey {
    fn eq(&self, other: &Self) -> bool {
        self.public() == other.public()
    }
}

impl Eq for KeyHolderKey {}

impl From<PublicKey> for KeyHolderKey {
    fn from(key: PublicKey) -> Self {
        KeyHolderKey::Public(key)
    }
}

impl From<PrivateKey> for KeyHolderKey {
    fn from(key: PrivateKey) -> Self {
        KeyHolderKey::Private(key)
    }
}

/// A named identity, admitted to the registry through the delegation chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authority {
    name: String,
    key: KeyHolderKey,
    signature: Signature,
}

impl Authority {
    /// An unsigned authority; attach a signature with `sign` or decode one.
    pub fn new(name: impl Into<String>, key: impl Into<KeyHolderKey>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            signature: Signature::empty(),
        }
    }

    /// Constructs with a private key and proves possession by self-signing.
    pub fn self_signed(name: impl Into<String>, key: PrivateKey) -> Self {
        let mut authority = Self::new(name, key.clone());
        authority.sign(&key);
        authority
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &KeyHolderKey {
        &self.key
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key.public()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let key = PublicKey::from_base64(codec::get_str(map, "k")?)?;
        let mut authority = Self::new(codec::get_str(map, "n")?, key);
        authority.signature = codec::get_signature(map)?;
        Ok(authority)
    }
}

impl Signable for Authority {
    fn tag(&self) -> PayloadTag {
        PayloadTag::Authority
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("a".to_string()));
        map.insert("k".to_string(), Value::String(self.public_key().to_base64()));
        map.insert("n".to_string(), Value::String(self.name.clone()));
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.verify_signature(self.key.public())
    }
}

/// An unnamed subject identity, typically a credential recipient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Individual {
    key: KeyHolderKey,
    signature: Signature,
}

impl Individual {
    pub fn new(key: impl Into<KeyHolderKey>) -> Self {
        Self {
            key: key.into(),
            signature: Signature::empty(),
        }
    }

    /// Constructs with a private key and proves possession by self-signing.
    pub fn self_signed(key: PrivateKey) -> Self {
        let mut individual = Self::new(key.clone());
        individual.sign(&key);
        individual
    }

    pub fn key(&self) -> &KeyHolderKey {
        &self.key
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key.public()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let key = PublicKey::from_base64(codec::get_str(map, "k")?)?;
        let mut individual = Self::new(key);
        individual.signature = codec::get_signature(map)?;
        Ok(individual)
    }
}

impl Signable for Individual {
    fn tag(&self) -> PayloadTag {
        PayloadTag::Individual
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("u".to_string()));
        map.insert("k".to_string(), Value::String(self.public_key().to_base64()));
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.verify_signature(self.key.public())
    }
}

/// Either concrete identity. Requesters, approvers, providers and recipients
/// are all key holders; which variant is acceptable where is a policy of the
/// consuming component, not of the type.
#[enum_dispatch(Signable)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyHolder {
    Authority,
    Individual,
}

impl KeyHolder {
    pub fn key(&self) -> &KeyHolderKey {
        match self {
            KeyHolder::Authority(authority) => authority.key(),
            KeyHolder::Individual(individual) => individual.key(),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        self.key().public()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.key().private()
    }

    pub fn is_private(&self) -> bool {
        self.key().is_private()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        match codec::get_str(map, "t")? {
            "a" => Ok(Authority::from_raw(map)?.into()),
            "u" => Ok(Individual::from_raw(map)?.into()),
            other => Err(CredentialError::UnknownTag(other.to_string())),
        }
    }
}

impl Validator for KeyHolder {
    fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature)
    }
}
