use crate::{Card, Fingerprint, IdentityError, TrustStore};
use keycard_crypto::Crypto;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// How registered verifiers that did not sign a card are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifierPolicy {
    /// Only verifiers registered as mandatory must have signed.
    #[default]
    Lenient,
    /// Every registered verifier must have signed.
    Strict,
}

/// The step of validation a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationStage {
    SnapshotVerification,
    SignatureCheck,
}

/// Why a card was judged invalid. One card may collect several.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("card id {claimed} does not match snapshot fingerprint {computed}")]
    IdMismatch { claimed: String, computed: String },

    #[error("snapshot cannot be decoded: {0}")]
    MalformedSnapshot(String),

    #[error("public key embedded in the snapshot is unusable: {0}")]
    InvalidEmbeddedKey(String),

    #[error("self-signature is missing")]
    MissingSelfSignature,

    #[error("self-signature does not verify")]
    InvalidSelfSignature,

    #[error("signature from verifier `{0}` is missing")]
    MissingVerifierSignature(String),

    #[error("signature from verifier `{0}` does not verify")]
    InvalidVerifierSignature(String),
}

impl ValidationFailure {
    pub fn stage(&self) -> ValidationStage {
        match self {
            ValidationFailure::IdMismatch { .. } | ValidationFailure::MalformedSnapshot(_) => {
                ValidationStage::SnapshotVerification
            }
            ValidationFailure::InvalidEmbeddedKey(_)
            | ValidationFailure::MissingSelfSignature
            | ValidationFailure::InvalidSelfSignature
            | ValidationFailure::MissingVerifierSignature(_)
            | ValidationFailure::InvalidVerifierSignature(_) => ValidationStage::SignatureCheck,
        }
    }
}

/// Outcome of validating one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    /// The card predates signatures and was accepted without checking any.
    LegacyAccepted,
    /// At least one check failed; never empty.
    Invalid(Vec<ValidationFailure>),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid | Verdict::LegacyAccepted)
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        match self {
            Verdict::Invalid(failures) => failures,
            _ => &[],
        }
    }
}

/// Verdict for one card of a batch.
#[derive(Debug, Clone)]
pub struct CardVerdict {
    pub card_id: Fingerprint,
    pub verdict: Verdict,
}

/// Per-card results of [`CardValidator::validate_all`].
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    results: Vec<CardVerdict>,
}

impl BatchReport {
    pub fn results(&self) -> &[CardVerdict] {
        &self.results
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn valid(&self) -> impl Iterator<Item = &CardVerdict> {
        self.results.iter().filter(|r| r.verdict.is_valid())
    }

    pub fn invalid(&self) -> impl Iterator<Item = &CardVerdict> {
        self.results.iter().filter(|r| !r.verdict.is_valid())
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid().count()
    }

    pub fn all_valid(&self) -> bool {
        self.invalid_count() == 0
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} cards are invalid",
            self.invalid_count(),
            self.total()
        )
    }
}

/// Decides whether a card's signatures satisfy the trust policy.
///
/// Checks run in order: the card id must equal the snapshot fingerprint;
/// legacy cards are then accepted as-is; otherwise the self-signature and
/// every registered verifier's signature are checked and folded into one
/// verdict. A single bad signature invalidates the card.
#[derive(Clone)]
pub struct CardValidator {
    crypto: Arc<dyn Crypto>,
    trust_store: TrustStore,
    policy: VerifierPolicy,
}

impl CardValidator {
    pub fn new(crypto: Arc<dyn Crypto>, trust_store: TrustStore, policy: VerifierPolicy) -> Self {
        Self {
            crypto,
            trust_store,
            policy,
        }
    }

    pub fn policy(&self) -> VerifierPolicy {
        self.policy
    }

    pub fn trust_store(&self) -> &TrustStore {
        &self.trust_store
    }

    /// Validate one card.
    ///
    /// `Err` only for capability faults (e.g. an unusable trusted key);
    /// an untrusted card is `Ok(Verdict::Invalid(..))`.
    pub fn validate(&self, card: &Card) -> Result<Verdict, IdentityError> {
        let computed = card.snapshot().fingerprint(self.crypto.as_ref());
        if &computed != card.id() {
            tracing::warn!(
                card = %card.id(),
                computed = %computed,
                "Card id does not match its content"
            );
            return Ok(Verdict::Invalid(vec![ValidationFailure::IdMismatch {
                claimed: card.id().to_hex(),
                computed: computed.to_hex(),
            }]));
        }
        tracing::debug!(card = %computed, "Snapshot verified");

        if card.version().is_legacy() {
            tracing::debug!(
                card = %computed,
                version = %card.version(),
                "Legacy card accepted without signatures"
            );
            return Ok(Verdict::LegacyAccepted);
        }

        let mut failures = Vec::new();
        self.check_self_signature(card, &computed, &mut failures);
        self.check_verifiers(card, &computed, &mut failures)?;

        if failures.is_empty() {
            tracing::debug!(card = %computed, "Card valid");
            Ok(Verdict::Valid)
        } else {
            tracing::warn!(card = %computed, failures = failures.len(), "Card invalid");
            Ok(Verdict::Invalid(failures))
        }
    }

    fn check_self_signature(
        &self,
        card: &Card,
        fingerprint: &Fingerprint,
        failures: &mut Vec<ValidationFailure>,
    ) {
        let fields = match card.snapshot().parse() {
            Ok(fields) => fields,
            Err(e) => {
                failures.push(ValidationFailure::MalformedSnapshot(e.to_string()));
                return;
            }
        };
        let Some(signature) = card.signature(&fingerprint.to_hex()) else {
            failures.push(ValidationFailure::MissingSelfSignature);
            return;
        };
        let public_key = match self.crypto.import_public_key(&fields.public_key) {
            Ok(key) => key,
            Err(e) => {
                failures.push(ValidationFailure::InvalidEmbeddedKey(e.to_string()));
                return;
            }
        };
        // The key came from the card, so a fault here is the card's problem.
        match self.crypto.verify(fingerprint.digest(), signature, &public_key) {
            Ok(true) => {}
            Ok(false) => failures.push(ValidationFailure::InvalidSelfSignature),
            Err(e) => failures.push(ValidationFailure::InvalidEmbeddedKey(e.to_string())),
        }
    }

    fn check_verifiers(
        &self,
        card: &Card,
        fingerprint: &Fingerprint,
        failures: &mut Vec<ValidationFailure>,
    ) -> Result<(), IdentityError> {
        for (verifier_id, public_key, mandatory) in self.trust_store.entries()? {
            match card.signature(&verifier_id) {
                Some(signature) => {
                    let ok = self
                        .crypto
                        .verify(fingerprint.digest(), signature, &public_key)
                        .map_err(IdentityError::Verification)?;
                    if !ok {
                        failures.push(ValidationFailure::InvalidVerifierSignature(verifier_id));
                    }
                }
                None if mandatory || self.policy == VerifierPolicy::Strict => {
                    failures.push(ValidationFailure::MissingVerifierSignature(verifier_id));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Validate every card, reporting per card instead of stopping at the
    /// first invalid one.
    pub fn validate_all(&self, cards: &[Card]) -> Result<BatchReport, IdentityError> {
        let results = cards
            .iter()
            .map(|card| {
                Ok(CardVerdict {
                    card_id: card.id().clone(),
                    verdict: self.validate(card)?,
                })
            })
            .collect::<Result<Vec<_>, IdentityError>>()?;
        let report = BatchReport { results };
        if !report.all_valid() {
            tracing::warn!("{}", report);
        }
        Ok(report)
    }
}
