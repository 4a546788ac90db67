// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

use crate::delegation::PermissionType;

/// Errors surfaced by decoding, registry mutation and presentation checks.
/// The core never swallows these; callers decide whether to retry or drop.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("signature missing or failed verification")]
    InvalidSignature,

    #[error("unknown payload tag '{0}'")]
    UnknownTag(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("approver lacks the {0:?} permission")]
    Unauthorized(PermissionType),

    #[error("approval grants permissions outside its request: {0:?}")]
    OverscopedGrant(Vec<PermissionType>),

    #[error("challenge mismatch: expected {expected:?}, got {actual:?}")]
    ChallengeMismatch {
        expected: Option<String>,
        actual: Option<String>,
    },

    #[error("credential provider lacks the DataCreation permission")]
    UnauthorizedIssuer,

    #[error("credential recipient does not match the presenting subject")]
    RecipientMismatch,

    #[error("wallet cannot hold '{0}' payloads")]
    UnsupportedWalletItem(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;

impl From<credential_config::CryptoError> for CredentialError {
    fn from(err: credential_config::CryptoError) -> Self {
        CredentialError::MalformedPayload(err.to_string())
    }
}
