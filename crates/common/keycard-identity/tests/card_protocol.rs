use assert_matches::assert_matches;
use keycard_crypto::{Crypto, Ed25519Crypto, KeyPair};
use keycard_identity::{
    build_snapshot, Card, CardRequest, CardScope, Context, IdentityType, ProtocolVersion,
    TrustStore, ValidationFailure, ValidationStage, Verdict, VerifierPolicy,
};
use std::collections::BTreeMap;
use std::sync::Arc;

fn card_signed_by(ctx: &Context, owner: &KeyPair, authorities: &[(&str, &KeyPair)]) -> Card {
    let mut data = BTreeMap::new();
    data.insert("device".to_string(), "laptop".to_string());
    let snapshot = build_snapshot(
        "alice@example.com",
        IdentityType::Email,
        &ctx.crypto().export_public_key(&owner.public),
        CardScope::Global,
        data,
    )
    .expect("Failed to build snapshot");

    let mut request = CardRequest::new(snapshot);
    let signer = ctx.request_signer();
    signer
        .self_sign(&mut request, &owner.private)
        .expect("Failed to self-sign");
    for (id, key) in authorities {
        signer
            .authority_sign(&mut request, id, &key.private)
            .expect("Failed to authority-sign");
    }
    request.build(ctx.crypto()).expect("Failed to build card")
}

#[test]
fn test_multi_signer_independence() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let app = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_verifier("app-1", &ctx.crypto().export_public_key(&app.public))
        .unwrap();

    let card = card_signed_by(&ctx, &owner, &[("app-1", &app)]);
    let validator = ctx.card_validator(VerifierPolicy::Lenient);
    assert_eq!(validator.validate(&card).unwrap(), Verdict::Valid);

    // Both signatures verify independently over the same fingerprint
    let fingerprint = card.snapshot().fingerprint(ctx.crypto());
    let self_sig = card.signature(&fingerprint.to_hex()).unwrap();
    let app_sig = card.signature("app-1").unwrap();
    assert!(ctx.crypto().verify(fingerprint.digest(), self_sig, &owner.public).unwrap());
    assert!(ctx.crypto().verify(fingerprint.digest(), app_sig, &app.public).unwrap());

    // Corrupt only the app-1 signature
    let (id, snapshot, mut signatures, version) = card.into_parts();
    signatures.get_mut("app-1").unwrap()[5] ^= 0x40;
    let corrupted = Card::from_parts(id, snapshot, signatures, version);

    let verdict = validator.validate(&corrupted).unwrap();
    assert_eq!(
        verdict,
        Verdict::Invalid(vec![ValidationFailure::InvalidVerifierSignature(
            "app-1".into()
        )])
    );
    assert_eq!(verdict.failures()[0].stage(), ValidationStage::SignatureCheck);
}

#[test]
fn test_corrupt_self_signature_only() {
    let ctx = Context::ed25519();
    let owner = ctx.crypto().generate_key_pair().unwrap();
    let app = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_verifier("app-1", &ctx.crypto().export_public_key(&app.public))
        .unwrap();
    let card = card_signed_by(&ctx, &owner, &[("app-1", &app)]);

    let (id, snapshot, mut signatures, version) = card.into_parts();
    signatures.get_mut(&id.to_hex()).unwrap()[0] ^= 0x01;
    let corrupted = Card::from_parts(id, snapshot, signatures, version);

    let verdict = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate(&corrupted)
        .unwrap();
    assert_eq!(
        verdict,
        Verdict::Invalid(vec![ValidationFailure::InvalidSelfSignature])
    );
}

#[test]
fn test_username_scenario_with_empty_trust_store() {
    let crypto: Arc<dyn Crypto> = Arc::new(Ed25519Crypto::new());
    let ctx = Context::new(crypto.clone(), TrustStore::new());
    let owner = crypto.generate_key_pair().unwrap();

    let snapshot = build_snapshot(
        "alice",
        "username".parse().unwrap(),
        &crypto.export_public_key(&owner.public),
        "application".parse().unwrap(),
        BTreeMap::new(),
    )
    .unwrap();
    let again = build_snapshot(
        "alice",
        IdentityType::Custom("username".into()),
        &crypto.export_public_key(&owner.public),
        CardScope::Application,
        BTreeMap::new(),
    )
    .unwrap();
    assert_eq!(snapshot, again, "snapshot must be deterministic");

    let mut request = CardRequest::new(snapshot);
    ctx.request_signer()
        .self_sign(&mut request, &owner.private)
        .unwrap();
    let card = request.build(crypto.as_ref()).unwrap();

    assert_eq!(card.version(), &ProtocolVersion::current());
    assert_eq!(
        ctx.card_validator(VerifierPolicy::Lenient)
            .validate(&card)
            .unwrap(),
        Verdict::Valid
    );
}

#[test]
fn test_batch_reports_each_card() {
    let ctx = Context::ed25519();
    let app = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_mandatory_verifier("app-1", &ctx.crypto().export_public_key(&app.public))
        .unwrap();

    let signed: Vec<Card> = (0..3)
        .map(|_| {
            let owner = ctx.crypto().generate_key_pair().unwrap();
            card_signed_by(&ctx, &owner, &[("app-1", &app)])
        })
        .collect();
    let unsigned_owner = ctx.crypto().generate_key_pair().unwrap();
    let mut cards = signed.clone();
    cards.insert(1, card_signed_by(&ctx, &unsigned_owner, &[]));

    let report = ctx
        .card_validator(VerifierPolicy::Lenient)
        .validate_all(&cards)
        .unwrap();
    assert_eq!(report.total(), 4);
    assert_eq!(report.invalid_count(), 1);
    assert!(!report.all_valid());
    assert_eq!(report.to_string(), "1 of 4 cards are invalid");

    let invalid: Vec<_> = report.invalid().collect();
    assert_eq!(&invalid[0].card_id, cards[1].id());
    assert_matches!(
        invalid[0].verdict.failures(),
        [ValidationFailure::MissingVerifierSignature(id)] if id == "app-1"
    );
    assert_eq!(report.valid().count(), 3);
}

#[test]
fn test_concurrent_validation_shares_trust_store() {
    let ctx = Context::ed25519();
    let app = ctx.crypto().generate_key_pair().unwrap();
    ctx.add_verifier("app-1", &ctx.crypto().export_public_key(&app.public))
        .unwrap();
    let validator = ctx.card_validator(VerifierPolicy::Strict);

    let cards: Vec<Card> = (0..8)
        .map(|_| {
            let owner = ctx.crypto().generate_key_pair().unwrap();
            card_signed_by(&ctx, &owner, &[("app-1", &app)])
        })
        .collect();

    std::thread::scope(|scope| {
        let handles: Vec<_> = cards
            .iter()
            .map(|card| {
                let validator = &validator;
                scope.spawn(move || validator.validate(card).unwrap())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Verdict::Valid);
        }
    });
}
