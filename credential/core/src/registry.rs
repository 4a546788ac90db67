// SPDX-License-Identifier: Apache-2.0

//! The delegation registry: an append-only log of requests and approvals,
//! and the permissions oracle derived from it.
//!
//! The registry is a plain value owned by the hosting process and passed
//! explicitly to consumers. It is not internally synchronized; wrap `insert`
//! in a mutual-exclusion region when sharing across threads.

use tracing::{debug, warn};

use credential_config::PrivateKey;

use crate::delegation::{
    AuthorityApproval, AuthorityRequest, PermissionApproval, PermissionRequest, PermissionType,
};
use crate::error::{CredentialError, CredentialResult};
use crate::keyholder::{Authority, KeyHolder};
use crate::payload::{Payload, Signable as _, SignableExt as _};

/// Process-local delegation state, bootstrapped from a main authority that
/// holds its private key. The first entry of both approval logs is the main
/// authority's self-grant.
pub struct Registry {
    main_authority: Authority,
    authority_requests: Vec<AuthorityRequest>,
    authority_approvals: Vec<AuthorityApproval>,
    permission_requests: Vec<PermissionRequest>,
    permission_approvals: Vec<PermissionApproval>,
}

impl Registry {
    /// Bootstraps the registry: the main authority approves itself as an
    /// authority and grants itself every permission. All later privileges
    /// derive from these two entries.
    pub fn new(main_authority: Authority) -> CredentialResult<Self> {
        if !main_authority.validate() {
            return Err(CredentialError::InvalidSignature);
        }
        let key: PrivateKey = main_authority
            .key()
            .private()
            .ok_or_else(|| {
                CredentialError::MalformedPayload(
                    "main authority must hold a private key".to_string(),
                )
            })?
            .clone();

        let holder = KeyHolder::from(main_authority.clone());

        let mut authority_request =
            AuthorityRequest::new(holder.clone(), main_authority.clone());
        authority_request.sign(&key);
        let mut authority_approval = AuthorityApproval::new(holder.clone(), authority_request);
        authority_approval.sign(&key);

        let mut permission_request = PermissionRequest::new(holder.clone(), PermissionType::all());
        permission_request.sign(&key);
        let mut permission_approval =
            PermissionApproval::new(holder, PermissionType::all(), permission_request);
        permission_approval.sign(&key);

        debug!(name = main_authority.name(), "bootstrapped registry");
        Ok(Self {
            main_authority,
            authority_requests: Vec::new(),
            authority_approvals: vec![authority_approval],
            permission_requests: Vec::new(),
            permission_approvals: vec![permission_approval],
        })
    }

    pub fn main_authority(&self) -> &Authority {
        &self.main_authority
    }

    /// Ingests a request or approval. Only the four delegation variants are
    /// accepted; everything else is rejected without mutating the registry.
    pub fn insert(&mut self, payload: Payload) -> CredentialResult<()> {
        match payload {
            Payload::AuthorityRequest(request) => self.insert_authority_request(request),
            Payload::AuthorityApproval(approval) => self.insert_authority_approval(approval),
            Payload::PermissionRequest(request) => self.insert_permission_request(request),
            Payload::PermissionApproval(approval) => self.insert_permission_approval(approval),
            other => Err(CredentialError::MalformedPayload(format!(
                "registry cannot ingest '{}' payloads",
                other.tag()
            ))),
        }
    }

    /// The authorities admitted so far, in approval order. The first is the
    /// main authority.
    pub fn authorities(&self) -> Vec<&Authority> {
        self.authority_approvals
            .iter()
            .map(|approval| approval.request().authority())
            .collect()
    }

    pub fn is_authority(&self, holder: &KeyHolder) -> bool {
        self.authorities()
            .iter()
            .any(|authority| authority.public_key() == holder.public_key())
    }

    /// True iff every permission in `permissions` has been granted to the
    /// holder by some approval. Grants are additive and never revoked.
    pub fn has_permissions(&self, holder: &KeyHolder, permissions: &[PermissionType]) -> bool {
        permissions.iter().all(|permission| {
            self.permission_approvals.iter().any(|approval| {
                approval.request().requester().public_key() == holder.public_key()
                    && approval.permissions().contains(permission)
            })
        })
    }

    /// The aggregated granted set of the holder.
    pub fn permissions_of(&self, holder: &KeyHolder) -> Vec<PermissionType> {
        PermissionType::all()
            .into_iter()
            .filter(|permission| self.has_permissions(holder, &[*permission]))
            .collect()
    }

    pub fn authority_requests(&self) -> &[AuthorityRequest] {
        &self.authority_requests
    }

    pub fn authority_approvals(&self) -> &[AuthorityApproval] {
        &self.authority_approvals
    }

    pub fn permission_requests(&self) -> &[PermissionRequest] {
        &self.permission_requests
    }

    pub fn permission_approvals(&self) -> &[PermissionApproval] {
        &self.permission_approvals
    }

    fn insert_authority_request(&mut self, request: AuthorityRequest) -> CredentialResult<()> {
        if !request.validate() {
            warn!("rejected authority request with an invalid signature");
            return Err(CredentialError::InvalidSignature);
        }
        debug!(candidate = request.authority().name(), "pending authority request");
        self.authority_requests.push(request);
        Ok(())
    }

    fn insert_authority_approval(&mut self, approval: AuthorityApproval) -> CredentialResult<()> {
        if !approval.validate() {
            warn!("rejected authority approval with an invalid signature");
            return Err(CredentialError::InvalidSignature);
        }
        if !self.has_permissions(approval.approver(), &[PermissionType::AuthorityApproval]) {
            warn!("rejected authority approval from an unauthorized approver");
            return Err(CredentialError::Unauthorized(
                PermissionType::AuthorityApproval,
            ));
        }

        self.remove_pending_authority_request(&approval);
        debug!(authority = approval.request().authority().name(), "admitted authority");
        self.authority_approvals.push(approval);
        Ok(())
    }

    fn insert_permission_request(&mut self, request: PermissionRequest) -> CredentialResult<()> {
        if !request.validate() {
            warn!("rejected permission request with an invalid signature");
            return Err(CredentialError::InvalidSignature);
        }
        debug!(permissions = ?request.permissions(), "pending permission request");
        self.permission_requests.push(request);
        Ok(())
    }

    fn insert_permission_approval(
        &mut self,
        approval: PermissionApproval,
    ) -> CredentialResult<()> {
        if !approval.validate() {
            warn!("rejected permission approval with an invalid signature");
            return Err(CredentialError::InvalidSignature);
        }
        if !self.has_permissions(approval.approver(), &[PermissionType::PermissionApproval]) {
            warn!("rejected permission approval from an unauthorized approver");
            return Err(CredentialError::Unauthorized(
                PermissionType::PermissionApproval,
            ));
        }
        // No privilege escalation: the grant must stay inside the request.
        let overscoped: Vec<PermissionType> = approval
            .permissions()
            .iter()
            .copied()
            .filter(|permission| !approval.request().permissions().contains(permission))
            .collect();
        if !overscoped.is_empty() {
            warn!(?overscoped, "rejected overscoped permission approval");
            return Err(CredentialError::OverscopedGrant(overscoped));
        }

        self.remove_pending_permission_request(&approval);
        debug!(granted = ?approval.permissions(), "granted permissions");
        self.permission_approvals.push(approval);
        Ok(())
    }

    // Matching is structural: the pending entry whose canonical bytes equal
    // the approval's embedded request is moved out of the pending list.
    fn remove_pending_authority_request(&mut self, approval: &AuthorityApproval) {
        let request_bytes = approval.request().canonical_bytes();
        if let Some(index) = self
            .authority_requests
            .iter()
            .position(|pending| pending.canonical_bytes() == request_bytes)
        {
            self.authority_requests.remove(index);
        }
    }

    fn remove_pending_permission_request(&mut self, approval: &PermissionApproval) {
        let request_bytes = approval.request().canonical_bytes();
        if let Some(index) = self
            .permission_requests
            .iter()
            .position(|pending| pending.canonical_bytes() == request_bytes)
        {
            self.permission_requests.remove(index);
        }
    }
}
