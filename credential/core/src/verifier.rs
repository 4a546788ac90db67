// SPDX-License-Identifier: Apache-2.0

//! The challenge-based presentation protocol. A verifier issues a signed
//! `DataRequest` carrying a session nonce; the subject answers with a
//! `DataTransfer`; `validate_data` confirms provenance, subject binding and
//! freshness against the registry.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use credential_config::PrivateKey;

use crate::credential::{DataRequest, DataTransfer, DataType};
use crate::delegation::PermissionType;
use crate::error::{CredentialError, CredentialResult};
use crate::keyholder::KeyHolder;
use crate::payload::{Signable as _, SignableExt as _};
use crate::registry::Registry;

/// Presentation acceptance policy.
///
/// All fields default to the strict behavior; loosening any of them is a
/// deliberate caller decision.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct VerifierPolicy {
    /// Accept a transfer whose presenter is an admitted authority even when
    /// the embedded credentials name someone else (the self-issued flow).
    #[serde(default = "VerifierPolicy::default_accept_authority_presenter")]
    pub accept_authority_presenter: bool,
}

impl VerifierPolicy {
    pub fn default_accept_authority_presenter() -> bool {
        false
    }
}

impl Default for VerifierPolicy {
    fn default() -> Self {
        Self {
            accept_authority_presenter: VerifierPolicy::default_accept_authority_presenter(),
        }
    }
}

/// One verification session: an identity, its signing key, an optional
/// challenge nonce, and a read-only view of the registry.
pub struct Verifier<'a> {
    registry: &'a Registry,
    identity: KeyHolder,
    key: PrivateKey,
    challenge: Option<String>,
    policy: VerifierPolicy,
}

impl<'a> Verifier<'a> {
    pub fn new(
        registry: &'a Registry,
        identity: impl Into<KeyHolder>,
        key: PrivateKey,
        challenge: Option<String>,
    ) -> Self {
        Self {
            registry,
            identity: identity.into(),
            key,
            challenge,
            policy: VerifierPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: VerifierPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn challenge(&self) -> Option<&str> {
        self.challenge.as_deref()
    }

    /// A signed request for credentials of the given types, bound to the
    /// session challenge.
    pub fn request_data(&self, types: Vec<DataType>) -> DataRequest {
        let mut request = DataRequest::new(self.identity.clone(), types, self.challenge.clone());
        request.sign(&self.key);
        request
    }

    /// Accepts a presentation iff the challenge matches, the transfer is
    /// cryptographically valid, every credential comes from an issuer holding
    /// `DataCreation`, and every credential names the presenting subject
    /// (unless the policy accepts an admitted-authority presenter).
    pub fn validate_data(&self, transfer: &DataTransfer) -> CredentialResult<()> {
        if let Some(expected) = &self.challenge {
            if transfer.challenge() != Some(expected.as_str()) {
                warn!("rejected presentation with a stale or missing challenge");
                return Err(CredentialError::ChallengeMismatch {
                    expected: Some(expected.clone()),
                    actual: transfer.challenge().map(str::to_string),
                });
            }
        }

        if !transfer.validate() {
            warn!("rejected presentation with an invalid signature");
            return Err(CredentialError::InvalidSignature);
        }

        let authority_presenter = self.policy.accept_authority_presenter
            && self.registry.is_authority(transfer.provider());

        for data in transfer.datas() {
            if !self
                .registry
                .has_permissions(data.provider(), &[PermissionType::DataCreation])
            {
                warn!("rejected credential from an unauthorized issuer");
                return Err(CredentialError::UnauthorizedIssuer);
            }
            let recipient_matches =
                data.recipient().public_key() == transfer.provider().public_key();
            if !recipient_matches && !authority_presenter {
                warn!("rejected credential not issued to the presenting subject");
                return Err(CredentialError::RecipientMismatch);
            }
        }

        debug!(credentials = transfer.datas().len(), "accepted presentation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Data;
    use crate::delegation::{
        AuthorityApproval, AuthorityRequest, PermissionApproval, PermissionRequest,
    };
    use crate::keyholder::{Authority, Individual};
    use crate::payload::{Signable as _, SignableExt as _};
    use rand::{rngs::StdRng, SeedableRng as _};

    fn private_key(seed: u8) -> PrivateKey {
        PrivateKey::generate(&mut StdRng::from_seed([seed; 32]))
    }

    struct Fixture {
        registry: Registry,
        gov: Authority,
        gov_key: PrivateKey,
        subject: Individual,
        subject_key: PrivateKey,
    }

    /// Main authority admits Gov, Gov gets DataCreation, a subject exists.
    fn fixture(seed: u8) -> Fixture {
        let main_key = private_key(seed);
        let main = Authority::self_signed("Auth490", main_key.clone());
        let mut registry = Registry::new(main.clone()).unwrap();

        let gov_key = private_key(seed.wrapping_add(1));
        let gov = Authority::self_signed("Gov", gov_key.clone());

        let mut request = AuthorityRequest::new(main.clone(), gov.clone());
        request.sign(&main_key);
        let mut approval = AuthorityApproval::new(main.clone(), request);
        approval.sign(&main_key);
        registry.insert(approval.into()).unwrap();

        let mut permission_request =
            PermissionRequest::new(gov.clone(), vec![PermissionType::DataCreation]);
        permission_request.sign(&gov_key);
        let mut permission_approval = PermissionApproval::new(
            main,
            vec![PermissionType::DataCreation],
            permission_request,
        );
        permission_approval.sign(&main_key);
        registry.insert(permission_approval.into()).unwrap();

        let subject_key = private_key(seed.wrapping_add(2));
        let subject = Individual::self_signed(subject_key.clone());

        Fixture {
            registry,
            gov,
            gov_key,
            subject,
            subject_key,
        }
    }

    fn name_credential(fixture: &Fixture) -> Data {
        let mut data = Data::new(
            fixture.gov.clone(),
            fixture.subject.clone(),
            "JOHN DOE",
            DataType::Name,
        );
        data.sign(&fixture.gov_key);
        data
    }

    fn presentation(fixture: &Fixture, challenge: Option<&str>) -> DataTransfer {
        let mut transfer = DataTransfer::new(
            fixture.subject.clone(),
            vec![name_credential(fixture)],
            challenge.map(str::to_string),
        );
        transfer.sign(&fixture.subject_key);
        transfer
    }

    #[test]
    fn accepts_a_fresh_presentation_from_the_subject() {
        let fixture = fixture(80);
        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("CHALLENGE".to_string()),
        );

        let request = verifier.request_data(vec![DataType::Name]);
        assert!(request.validate());
        assert_eq!(request.challenge(), Some("CHALLENGE"));

        let transfer = presentation(&fixture, Some("CHALLENGE"));
        verifier.validate_data(&transfer).unwrap();
    }

    #[test]
    fn rejects_a_stale_challenge() {
        let fixture = fixture(83);
        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("CHALLENGE".to_string()),
        );

        let transfer = presentation(&fixture, Some("REPLAYED"));
        assert_eq!(
            verifier.validate_data(&transfer).err(),
            Some(CredentialError::ChallengeMismatch {
                expected: Some("CHALLENGE".to_string()),
                actual: Some("REPLAYED".to_string()),
            })
        );
    }

    #[test]
    fn accepts_any_challenge_when_the_verifier_has_none() {
        let fixture = fixture(86);
        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            None,
        );
        let transfer = presentation(&fixture, Some("WHATEVER"));
        verifier.validate_data(&transfer).unwrap();
    }

    #[test]
    fn rejects_an_issuer_without_data_creation() {
        let fixture = fixture(89);
        let rogue_key = private_key(200);
        let rogue = Authority::self_signed("Rogue", rogue_key.clone());

        let mut data = Data::new(
            rogue,
            fixture.subject.clone(),
            "JOHN DOE",
            DataType::Name,
        );
        data.sign(&rogue_key);
        let mut transfer =
            DataTransfer::new(fixture.subject.clone(), vec![data], Some("C".to_string()));
        transfer.sign(&fixture.subject_key);

        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("C".to_string()),
        );
        assert_eq!(
            verifier.validate_data(&transfer).err(),
            Some(CredentialError::UnauthorizedIssuer)
        );
    }

    #[test]
    fn rejects_credentials_presented_by_someone_else() {
        let fixture = fixture(92);
        let thief_key = private_key(210);
        let thief = Individual::self_signed(thief_key.clone());

        let mut transfer = DataTransfer::new(
            thief,
            vec![name_credential(&fixture)],
            Some("C".to_string()),
        );
        transfer.sign(&thief_key);

        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("C".to_string()),
        );
        assert_eq!(
            verifier.validate_data(&transfer).err(),
            Some(CredentialError::RecipientMismatch)
        );
    }

    #[test]
    fn policy_accepts_an_authority_presenting_credentials_it_issued() {
        let fixture = fixture(95);

        // Gov presents a credential naming the subject, not itself.
        let mut transfer = DataTransfer::new(
            fixture.gov.clone(),
            vec![name_credential(&fixture)],
            Some("C".to_string()),
        );
        transfer.sign(&fixture.gov_key);

        let strict = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("C".to_string()),
        );
        assert_eq!(
            strict.validate_data(&transfer).err(),
            Some(CredentialError::RecipientMismatch)
        );

        let relaxed = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("C".to_string()),
        )
        .with_policy(VerifierPolicy {
            accept_authority_presenter: true,
        });
        relaxed.validate_data(&transfer).unwrap();
    }

    #[test]
    fn rejects_a_transfer_signed_by_the_wrong_key() {
        let fixture = fixture(98);
        let mut transfer = DataTransfer::new(
            fixture.subject.clone(),
            vec![name_credential(&fixture)],
            Some("C".to_string()),
        );
        // Signed by gov instead of the presenting subject.
        transfer.sign(&fixture.gov_key);

        let verifier = Verifier::new(
            &fixture.registry,
            fixture.gov.clone(),
            fixture.gov_key.clone(),
            Some("C".to_string()),
        );
        assert_eq!(
            verifier.validate_data(&transfer).err(),
            Some(CredentialError::InvalidSignature)
        );
    }
}
