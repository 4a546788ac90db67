// SPDX-License-Identifier: Apache-2.0

//! The delegation protocol: requests to admit an authority or grant
//! permissions, and the approvals that answer them. Approvals embed the
//! request they answer by value, so one signature covers the whole chain.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde_json::Value;

use credential_config::Signature;

use crate::codec::{self, RawMap};
use crate::error::{CredentialError, CredentialResult};
use crate::keyholder::{Authority, KeyHolder};
use crate::payload::{PayloadTag, Signable, SignableExt as _};

/// What an approved entity is allowed to do. The integer codes are
/// wire-stable; never renumber.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum PermissionType {
    AuthorityApproval = 1,
    PermissionApproval = 2,
    DataCreation = 3,
}

impl PermissionType {
    pub fn all() -> Vec<PermissionType> {
        vec![
            PermissionType::AuthorityApproval,
            PermissionType::PermissionApproval,
            PermissionType::DataCreation,
        ]
    }
}

pub(crate) fn permissions_to_value(permissions: &[PermissionType]) -> Value {
    Value::Array(
        permissions
            .iter()
            .map(|p| Value::from(u8::from(*p)))
            .collect(),
    )
}

pub(crate) fn permissions_from_values(
    values: &[Value],
    field: &str,
) -> CredentialResult<Vec<PermissionType>> {
    values
        .iter()
        .map(|value| {
            let code = codec::as_code(value, field)?;
            PermissionType::try_from(code).map_err(|_| {
                CredentialError::MalformedPayload(format!("unknown permission code {code}"))
            })
        })
        .collect()
}

/// Asks the registry to admit `authority`. Signed by the requester.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorityRequest {
    requester: KeyHolder,
    authority: Authority,
    signature: Signature,
}

impl AuthorityRequest {
    pub fn new(requester: impl Into<KeyHolder>, authority: Authority) -> Self {
        Self {
            requester: requester.into(),
            authority,
            signature: Signature::empty(),
        }
    }

    pub fn requester(&self) -> &KeyHolder {
        &self.requester
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let requester = KeyHolder::from_raw(codec::get_map(map, "r")?)?;
        let authority = Authority::from_raw(codec::get_map(map, "d")?)?;
        let mut request = Self::new(requester, authority);
        request.signature = codec::get_signature(map)?;
        Ok(request)
    }
}

impl Signable for AuthorityRequest {
    fn tag(&self) -> PayloadTag {
        PayloadTag::AuthorityRequest
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("ar".to_string()));
        map.insert("r".to_string(), self.requester.raw_value());
        map.insert("d".to_string(), self.authority.raw_value());
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.requester.validate()
            && self.authority.validate()
            && self.verify_signature(self.requester.public_key())
    }
}

/// Admits the authority named by the embedded request. Signed by the approver.
#[derive(Clone, Debug, PartialEq)]
pub struct AuthorityApproval {
    approver: KeyHolder,
    request: AuthorityRequest,
    signature: Signature,
}

impl AuthorityApproval {
    pub fn new(approver: impl Into<KeyHolder>, request: AuthorityRequest) -> Self {
        Self {
            approver: approver.into(),
            request,
            signature: Signature::empty(),
        }
    }

    pub fn approver(&self) -> &KeyHolder {
        &self.approver
    }

    pub fn request(&self) -> &AuthorityRequest {
        &self.request
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let approver = KeyHolder::from_raw(codec::get_map(map, "a")?)?;
        let request = AuthorityRequest::from_raw(codec::get_map(map, "r")?)?;
        let mut approval = Self::new(approver, request);
        approval.signature = codec::get_signature(map)?;
        Ok(approval)
    }
}

impl Signable for AuthorityApproval {
    fn tag(&self) -> PayloadTag {
        PayloadTag::AuthorityApproval
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("aa".to_string()));
        map.insert("a".to_string(), self.approver.raw_value());
        map.insert("r".to_string(), self.request.raw_value());
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.approver.validate()
            && self.request.validate()
            && self.verify_signature(self.approver.public_key())
    }
}

/// Asks for a set of permissions. Signed by the requester.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionRequest {
    requester: KeyHolder,
    permissions: Vec<PermissionType>,
    signature: Signature,
}

impl PermissionRequest {
    pub fn new(requester: impl Into<KeyHolder>, permissions: Vec<PermissionType>) -> Self {
        Self {
            requester: requester.into(),
            permissions,
            signature: Signature::empty(),
        }
    }

    pub fn requester(&self) -> &KeyHolder {
        &self.requester
    }

    pub fn permissions(&self) -> &[PermissionType] {
        &self.permissions
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let requester = KeyHolder::from_raw(codec::get_map(map, "r")?)?;
        let permissions = permissions_from_values(codec::get_array(map, "d")?, "d")?;
        let mut request = Self::new(requester, permissions);
        request.signature = codec::get_signature(map)?;
        Ok(request)
    }
}

impl Signable for PermissionRequest {
    fn tag(&self) -> PayloadTag {
        PayloadTag::PermissionRequest
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("pr".to_string()));
        map.insert("r".to_string(), self.requester.raw_value());
        map.insert("d".to_string(), permissions_to_value(&self.permissions));
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

/// Grants a subset of the permissions named by the embedded request.
/// Signed by the approver.
#[derive(Clone, Debug, PartialEq)]
pub struct PermissionApproval {
    approver: KeyHolder,
    permissions: Vec<PermissionType>,
    request: PermissionRequest,
    signature: Signature,
}

impl PermissionApproval {
    pub fn new(
        approver: impl Into<KeyHolder>,
        permissions: Vec<PermissionType>,
        request: PermissionRequest,
    ) -> Self {
        Self {
            approver: approver.into(),
            permissions,
            request,
            signature: Signature::empty(),
        }
    }

    pub fn approver(&self) -> &KeyHolder {
        &self.approver
    }

    /// The granted set, not necessarily everything the request asked for.
    pub fn permissions(&self) -> &[PermissionType] {
        &self.permissions
    }

    pub fn request(&self) -> &PermissionRequest {
        &self.request
    }

    pub(crate) fn from_raw(map: &RawMap) -> CredentialResult<Self> {
        let approver = KeyHolder::from_raw(codec::get_map(map, "a")?)?;
        let permissions = permissions_from_values(codec::get_array(map, "p")?, "p")?;
        let request = PermissionRequest::from_raw(codec::get_map(map, "r")?)?;
        let mut approval = Self::new(approver, permissions, request);
        approval.signature = codec::get_signature(map)?;
        Ok(approval)
    }
}

impl Signable for PermissionApproval {
    fn tag(&self) -> PayloadTag {
        PayloadTag::PermissionApproval
    }

    fn raw_body(&self) -> RawMap {
        let mut map = RawMap::new();
        map.insert("t".to_string(), Value::String("pa".to_string()));
        map.insert("a".to_string(), self.approver.raw_value());
        map.insert("p".to_string(), permissions_to_value(&self.permissions));
        map.insert("r".to_string(), self.request.raw_value());
        map
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn set_signature(&mut self, signature: Signature) {
        self.signature = signature;
    }

    fn validate(&self) -> bool {
        self.approver.validate()
            && self.request.validate()
            && self.verify_signature(self.approver.public_key())
    }
}
