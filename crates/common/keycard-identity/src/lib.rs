//! Keycard Identity – binding public keys to identities with multiply-signed,
//! offline-verifiable cards.
//!
//! - Builds a canonical, deterministic [`Snapshot`] of a card's fields.
//! - [`RequestSigner`] adds the owner's self-signature and any number of
//!   authority signatures, all over the snapshot [`Fingerprint`].
//! - [`CardValidator`] checks a [`Card`] against a [`TrustStore`] under a
//!   [`VerifierPolicy`], with a bypass for pre-signature protocol versions.
//! - [`ValidationTokenGenerator`] issues and checks stateless identity
//!   validation tokens.
//! - All cryptography goes through [`keycard_crypto::Crypto`], held by a
//!   [`Context`].

#![forbid(unsafe_code)]

mod b64;
mod card;
mod config;
mod context;
mod error;
mod fingerprint;
mod identity_type;
mod signer;
mod snapshot;
mod token;
mod trust_store;
mod validator;
mod version;
#[cfg(test)]
mod tests;

pub use card::{Card, CardRequest};
pub use config::{TrustStoreConfig, VerifierEntry};
pub use context::Context;
pub use error::IdentityError;
pub use fingerprint::Fingerprint;
pub use identity_type::{CardScope, IdentityType};
pub use signer::RequestSigner;
pub use snapshot::{build_snapshot, CardSnapshot, Snapshot};
pub use token::{ValidationToken, ValidationTokenGenerator};
pub use trust_store::TrustStore;
pub use validator::{
    BatchReport, CardValidator, CardVerdict, ValidationFailure, ValidationStage, Verdict,
    VerifierPolicy,
};
pub use version::ProtocolVersion;
