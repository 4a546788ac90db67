// SPDX-License-Identifier: Apache-2.0

//! Credentials and the challenge-bound payloads that move them: a `Data` is a
//! signed assertion by a provider about a recipient, a `DataRequest` asks a
//! subject to present credentials of given types, and a `DataTransfer` is the
//! subject's answer.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_json::Value;

use credential_config::Signature;

use crate::codec::{self, RawMap};
use crate::error::{CredentialError, CredentialResult};
use crate::keyholder::KeyHolder;
use crate::payload::{PayloadTag, Signable, SignableExt as _};

/// What a credential asserts. The integer codes are wire-stable; never
/// renumber.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DataType {
    Name = 1,
    Vaccine = 2,
}

fn data_type_from_value(value: &Value, field: &str) -> CredentialResult<DataType> {
    let code = codec::as_code(value, field)?;
    DataType::try_from(code)
        .map_err(|_| CredentialError::MalformedPayload(format!("unknown data type code {code}")))
}

/// A credential: `provider` asserts `value` about `recipient`. Signed by the
/// provider; the recipient needs only a public identity.
#[derive(Clone, Debug, PartialEq)]
pub struct Data {
    provider: KeyHolder,
    recipient: KeyHolder,
    value: String,
    data_type: DataType,
    signature: Signature,
}

impl Data {
    pub fn new(
        provider: impl Into<KeyHolder>,
        recipient: impl Into<KeyHolder>,
        value: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        Self {
            provider: provider.into(),
            recipient: recipient.into(),
            value: value.into(),
            data_type,
            signature: Signature::empty(),
        }
    }

    pub fn provider(&self) -> &KeyHolder {
        &self.provider
    }

    pub fn recipient(&self) -> &KeyHolder {
        &self.recipient
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let provider = KeyHolder::from_raw(codec::get_map(map, "p")?)?;
        let recipient = KeyHolder::from_raw(codec::get_map(map, "r")?)?;
        let value = codec::get_str(map, "v")?.to_string();
        let data_type = data_type_from_value(
            map.get("d").ok_or_else(|| {
                CredentialError::MalformedPayload("missing field 'd'".to_string())
            })?,
            "d",
        )?;
        let mut data = Self::new(provider, recipient, value, data_type);
        data.signature = codec::get_signature(map)?;
        Ok(data)
    }
}

impl Signable for Data {
    fn tag(&self) -> PayloadTag {
        PayloadTag::Data
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("d".to_string()));
        map.insert("p".to_string(), self.provider.raw_value());
        map.insert("r".to_string(), self.recipient.raw_value());
        map.insert("v".to_string(), Value::String(self.value.clone()));
        map.insert("d".to_string(), Value::from(u8::from(self.data_type)));
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.verify_signature(self.provider.public_key())
    }
}

/// A bundle of credentials presented by a subject under a challenge. The
/// `provider` here is the presenting subject, not the credential issuer.
#[derive(Clone, Debug, PartialEq)]
pub struct DataTransfer {
    provider: KeyHolder,
    datas: Vec<Data>,
    challenge: Option<String>,
    signature: Signature,
}

impl DataTransfer {
    pub fn new(
        provider: impl Into<KeyHolder>,
        datas: Vec<Data>,
        challenge: Option<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            datas,
            challenge,
            signature: Signature::empty(),
        }
    }

    pub fn provider(&self) -> &KeyHolder {
        &self.provider
    }

    pub fn datas(&self) -> &[Data] {
        &self.datas
    }

    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let provider = KeyHolder::from_raw(codec::get_map(map, "p")?)?;
        let datas = codec::get_array(map, "d")?
            .iter()
            .map(|value| Data::from_raw(codec::as_object(value)?))
            .collect::<CredentialResult<Vec<_>>>()?;
        let challenge = codec::get_opt_str(map, "c")?;
        let mut transfer = Self::new(provider, datas, challenge);
        transfer.signature = codec::get_signature(map)?;
        Ok(transfer)
    }
}

impl Signable for DataTransfer {
    fn tag(&self) -> PayloadTag {
        PayloadTag::DataTransfer
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("dt".to_string()));
        map.insert("p".to_string(), self.provider.raw_value());
        map.insert(
            "d".to_string(),
            Value::Array(self.datas.iter().map(|data| data.raw_value()).collect()),
        );
        map.insert(
            "c".to_string(),
            self.challenge.clone().map_or(Value::Null, Value::String),
        );
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.provider.validate()
            && self.datas.iter().all(|data| data.validate())
            && self.verify_signature(self.provider.public_key())
    }
}

/// Asks a subject to present credentials of the given types, bound to a
/// challenge nonce. Signed by the requesting verifier.
#[derive(Clone, Debug, PartialEq)]
pub struct DataRequest {
    requester: KeyHolder,
    types: Vec<DataType>,
    challenge: Option<String>,
    signature: Signature,
}

impl DataRequest {
    pub fn new(
        requester: impl Into<KeyHolder>,
        types: Vec<DataType>,
        challenge: Option<String>,
    ) -> Self {
        Self {
            requester: requester.into(),
            types,
            challenge,
            signature: Signature::empty(),
        }
    }

    pub fn requester(&self) -> &KeyHolder {
        &self.requester
    }

    pub fn types(&self) -> &[DataType] {
        &self.types
    }

    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let requester = KeyHolder::from_raw(codec::get_map(map, "r")?)?;
        let types = codec::get_array(map, "d")?
            .iter()
            .map(|value| data_type_from_value(value, "d"))
            .collect::<CredentialResult<Vec<_>>>()?;
        let challenge = codec::get_opt_str(map, "c")?;
        let mut request = Self::new(requester, types, challenge);
        request.signature = codec::get_signature(map)?;
        Ok(request)
    }
}

impl Signable for DataRequest {
    fn tag(&self) -> PayloadTag {
        PayloadTag::DataRequest
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("dr".to_string()));
        map.insert("r".to_string(), self.requester.raw_value());
        map.insert(
            "d".to_string(),
            Value::Array(
                self.types
                    .iter()
                    .map(|t| Value::from(u8::from(*t)))
                    .collect(),
            ),
        );
        map.insert(
            "c".to_string(),
            self.challenge.clone().map_or(Value::Null, Value::String),
        );
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.requester.validate() && self.verify_signature(self.requester.public_key())
    }
}
