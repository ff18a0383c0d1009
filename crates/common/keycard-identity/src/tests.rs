use crate::{
    build_snapshot, Card, CardRequest, CardScope, Context, Fingerprint, IdentityError,
    IdentityType, ProtocolVersion, ValidationFailure, ValidationStage, Verdict, VerifierPolicy,
};
use assert_matches::assert_matches;
use keycard_crypto::KeyPair;
use std::collections::BTreeMap;

fn owner_request(ctx: &Context, owner: &KeyPair) -> CardRequest {
    let snapshot = build_snapshot(
        "alice",
        IdentityType::Custom("username".into()),
        &ctx.crypto().export_public_key(&owner.public),
        CardScope::Application,
        BTreeMap::new(),
    )
    .unwrap();
    CardRequest::new(snapshot)
}

fn self_signed_card(ctx: &Context, owner: &KeyPair) -> Card {
    let mut request = owner_request(ctx, owner);
    ctx.request_signer()
        .self_sign(&mut request, &owner.private)
        .unwrap();
    request.build(ctx.crypto()).unwrap()
}

#[test]
fn self_signed_card_valid_with_empty_trust_store() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let card = self_signed_card(&ctx, &owner);

    assert_eq!(card.id(), &card.snapshot().fingerprint(ctx.crypto()));
    let validator = ctx.card_validator(VerifierPolicy::Lenient);
    assert_eq!(validator.validate(&card).unwrap(), Verdict::Valid);
    assert_eq!(card.public_key(ctx.crypto()).unwrap(), owner.public);
}

#[test]
fn tampered_snapshot_fails_before_signature_checks() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let card = self_signed_card(&ctx, &owner);
    let (id, snapshot, signatures, version) = card.into_parts();

    let mut bytes = snapshot.as_bytes().to_vec();
    bytes[3] ^= 0x01;
    let tampered = crate::Snapshot::from_bytes(bytes);

    // Keeping the original id
    let forged = Card::from_parts(id, tampered.clone(), signatures.clone(), version.clone());
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&forged)
        .unwrap();
    assert_matches!(&verdict.failures()[..], [ValidationFailure::IdMismatch { .. }]);
    assert_eq!(verdict.failures()[0].stage(), ValidationStage::SnapshotVerification);

    // Recomputing the id: the content check passes but the self-signature
    // no longer exists under the new fingerprint.
    let recomputed = Card::from_parts(
        tampered.fingerprint(ctx.crypto()),
        tampered,
        signatures,
        version,
    );
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&recomputed)
        .unwrap();
    assert!(!verdict.is_valid());
    assert!(!verdict.failures().is_empty());
}

#[test]
fn missing_self_signature_is_invalid() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let card = owner_request(&ctx, &owner).build(ctx.crypto()).unwrap();
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&card)
        .unwrap();
    assert_eq!(verdict, Verdict::Invalid(vec![ValidationFailure::MissingSelfSignature]));
}

#[test]
fn legacy_card_without_signatures_is_accepted() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let request = CardRequest::with_version(
        owner_request(&ctx, &owner).snapshot().clone(),
        ProtocolVersion::new("3.0"),
    );
    let card = request.build(ctx.crypto()).unwrap();
    assert!(card.signatures().is_empty());

    let authority = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_mandatory_verifier("app-1", &ctx.crypto().export_public_key(&authority.public))
        .unwrap();
    let verdict = ctx
        .card_validator(VerifierPolicy::Strict)
        .validate(&card)
        .unwrap();
    assert_eq!(verdict, Verdict::LegacyAccepted);
    assert!(verdict.is_valid());
}

#[test]
fn legacy_card_still_needs_matching_id() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let snapshot = owner_request(&ctx, &owner).snapshot().clone();
    let card = Card::from_parts(
        Fingerprint::from_digest(vec![0; 32]).unwrap(),
        snapshot,
        BTreeMap::new(),
        ProtocolVersion::new("3.0"),
    );
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&card)
        .unwrap();
    assert_matches!(verdict, Verdict::Invalid(_));
}

#[test]
fn signature_over_a_different_fingerprint_is_rejected() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let mut request = owner_request(&ctx, &owner);
    ctx.request_signer()
        .self_sign(&mut request, &owner.private)
        .unwrap();

    let stale = Fingerprint::from_digest(vec![0xAA; 32]).unwrap();
    assert_matches!(
        request.attach_signature(&stale, "app-1".into(), vec![1, 2, 3]),
        Err(IdentityError::SnapshotMutated { .. })
    );
    assert!(!request.signatures().contains_key("app-1"));
}

#[test]
fn mandatory_verifier_must_sign_under_lenient_policy() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let revoker = ctx.crypto().generate_key_pair().unwrap();
    let app = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_mandatory_verifier("revocation", &ctx.crypto().export_public_key(&revoker.public))
        .unwrap();
    ctx.add_verifier("app-1", &ctx.crypto().export_public_key(&app.public))
        .unwrap();

    let card = self_signed_card(&ctx, &owner);
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&card)
        .unwrap();
    assert_eq!(
        verdict,
        Verdict::Invalid(vec![ValidationFailure::MissingVerifierSignature(
            "revocation".into()
        )])
    );

    let strict = ctx
        .card_validator(VerifierPolicy::Strict)
        .validate(&card)
        .unwrap();
    assert_eq!(
        strict.failures(),
        &[
            ValidationFailure::MissingVerifierSignature("app-1".into()),
            ValidationFailure::MissingVerifierSignature("revocation".into()),
        ]
    );
}

#[test]
fn unknown_signers_are_ignored() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let stranger = ctx.crypto().generate_key_pair().unwrap();
    let mut request = owner_request(&ctx, &owner);
    let signer = ctx.request_signer();
    signer.self_sign(&mut request, &owner.private).unwrap();
    signer
        .authority_sign(&mut request, "someone-else", &stranger.private)
        .unwrap();
    let card = request.build(ctx.crypto()).unwrap();

    assert_eq!(card.signatures().len(), 2);
    let verdict = ctx
        .card_validator(VerifierPolicy::Strict)
        .validate(&card)
        .unwrap();
    assert_eq!(verdict, Verdict::Valid);
}

#[test]
fn malformed_snapshot_is_reported_not_raised() {
    let ctx = Context::ed25519();
    let snapshot = crate::Snapshot::from_bytes(b"{\"identity\":1}".to_vec());
    let card = Card::from_parts(
        snapshot.fingerprint(ctx.crypto()),
        snapshot,
        BTreeMap::new(),
        ProtocolVersion::current(),
    );
    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&card)
        .unwrap();
    assert_matches!(&verdict.failures()[..], [ValidationFailure::MalformedSnapshot(_)]);
}

#[test]
fn card_serde_roundtrip_keeps_validity() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let card = self_signed_card(&ctx, &owner);

    let json = serde_json::to_string(&card).unwrap();
    let back: Card = serde_json::from_str(&json).unwrap();
    assert_eq!(back, card);
    assert!(ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&back)
        .unwrap()
        .is_valid());
}

#[test]
fn edited_request_file_fails_to_build() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let mut request = owner_request(&ctx, &owner);
    ctx.request_signer()
        .self_sign(&mut request, &owner.private)
        .unwrap();
    let stored = serde_json::to_value(&request).unwrap();

    // Snapshot swapped after signing
    let other = build_snapshot(
        "mallory",
        IdentityType::Custom("username".into()),
        &ctx.crypto().export_public_key(&owner.public),
        CardScope::Application,
        BTreeMap::new(),
    )
    .unwrap();
    let mut edited = stored.clone();
    edited["snapshot"] = serde_json::to_value(&other).unwrap();
    let edited: CardRequest = serde_json::from_value(edited).unwrap();
    assert_matches!(
        edited.build(ctx.crypto()),
        Err(IdentityError::SnapshotMutated { .. })
    );

    // Signed fingerprint removed along with the swap
    let mut stripped = stored.clone();
    stripped["snapshot"] = serde_json::to_value(&other).unwrap();
    stripped
        .as_object_mut()
        .unwrap()
        .remove("signed_fingerprint")
        .unwrap();
    let stripped: CardRequest = serde_json::from_value(stripped).unwrap();
    assert_matches!(
        stripped.build(ctx.crypto()),
        Err(IdentityError::InvalidField {
            field: "signed_fingerprint",
            ..
        })
    );

    // The untouched file still builds
    let intact: CardRequest = serde_json::from_value(stored).unwrap();
    assert!(intact.build(ctx.crypto()).is_ok());
}

#[test]
fn unsigned_request_builds_without_fingerprint() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let json = serde_json::to_value(owner_request(&ctx, &owner)).unwrap();
    assert!(json.get("signed_fingerprint").is_none());
    let request: CardRequest = serde_json::from_value(json).unwrap();
    assert!(request.build(ctx.crypto()).is_ok());
}
