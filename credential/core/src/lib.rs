// SPDX-License-Identifier: Apache-2.0

//! The trust substrate of the credential system: canonical serialization,
//! the signed payload taxonomy, the delegation registry, the presentation
//! verifier and the client-side wallet. Byte-level key and signature
//! primitives live in `credential-config`.

mod codec;
mod credential;
mod delegation;
mod error;
mod payload;
mod keyholder;
mod registry;
mod verifier;
mod wallet;

pub use codec::RawMap;
pub use credential::{Data, DataRequest, DataTransfer, DataType};
pub use delegation::{
    AuthorityApproval, AuthorityRequest, PermissionApproval, PermissionRequest, PermissionType,
};
pub use error::{CredentialError, CredentialResult};
pub use keyholder::{Authority, Individual, KeyHolder, KeyHolderKey};
pub use payload::{decode, Decoded, Payload, PayloadTag, Signable, SignableExt};
pub use registry::Registry;
pub use verifier::{Verifier, VerifierPolicy};
pub use wallet::{Wallet, WalletItem};
