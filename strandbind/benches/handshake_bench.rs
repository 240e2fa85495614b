// StrandBind benchmarks using criterion.
//
// Measures:
//   - Ed25519 key generation and sign / verify
//   - AEAD seal throughput for both cipher suites
//   - Binding verification per trust model
//   - Full handshake latency per trust model

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

use strandbind::cert::builder::CertificateBuilder;
use strandbind::crypto::aead::AeadKey;
use strandbind::registry::{AuthenticatedUpdate, BindingRecord, Credential, InMemoryRegistry};
use strandbind::trust::OfferedCredential;
use strandbind::{
    BindingVerifier, CipherSuite, Identity, IdentityKeyPair, Initiator, InitiatorConfig,
    LocalIdentity, Responder, ResponderConfig, TrustTable,
};

const NOW: u64 = 5_000;

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

struct Fixture {
    identity: Identity,
    keypair: Arc<IdentityKeyPair>,
    registry: Arc<InMemoryRegistry>,
    cert_registry: Arc<InMemoryRegistry>,
    certificate: strandbind::Certificate,
    table: TrustTable,
}

fn publish(registry: &InMemoryRegistry, record: BindingRecord) {
    let credential = Credential::generate();
    registry
        .enroll(record.identity.clone(), credential.clone())
        .unwrap();
    registry
        .submit_update(&AuthenticatedUpdate::new(record, &credential).unwrap())
        .unwrap();
}

fn fixture() -> Fixture {
    let identity = Identity::new("bench.example").unwrap();
    let keypair = Arc::new(IdentityKeyPair::generate());
    let certificate = CertificateBuilder::self_signed(&keypair, identity.clone())
        .validity(0, 1_000_000)
        .build()
        .unwrap();

    let registry = Arc::new(InMemoryRegistry::generate());
    publish(
        &registry,
        BindingRecord::raw_key(identity.clone(), &keypair.public_key_bytes()),
    );
    let cert_registry = Arc::new(InMemoryRegistry::generate());
    publish(
        &cert_registry,
        BindingRecord::certificate(identity.clone(), &certificate),
    );

    let table = TrustTable::new();
    table.insert(identity.clone(), keypair.public_key_bytes());

    Fixture {
        identity,
        keypair,
        registry,
        cert_registry,
        certificate,
        table,
    }
}

fn models(f: &Fixture) -> Vec<(&'static str, BindingVerifier, LocalIdentity)> {
    let raw = LocalIdentity::raw_key(f.identity.clone(), f.keypair.clone());
    let cert = LocalIdentity::with_certificate(
        f.identity.clone(),
        f.keypair.clone(),
        f.certificate.clone(),
    )
    .unwrap();
    vec![
        (
            "dane_raw_key",
            BindingVerifier::dane_raw_key(f.registry.clone(), f.registry.public_key()),
            raw.clone(),
        ),
        (
            "dane_certificate",
            BindingVerifier::dane_certificate(f.cert_registry.clone(), f.cert_registry.public_key()),
            cert,
        ),
        ("pinned", BindingVerifier::pinned(f.table.clone()), raw),
    ]
}

// ---------------------------------------------------------------------------
// Key generation, sign / verify
// ---------------------------------------------------------------------------

fn bench_keys(c: &mut Criterion) {
    c.bench_function("ed25519_keygen", |b| {
        b.iter(|| {
            black_box(IdentityKeyPair::generate());
        });
    });

    let kp = IdentityKeyPair::generate();
    let message = [0x5Au8; 57];
    c.bench_function("ed25519_sign", |b| {
        b.iter(|| {
            black_box(kp.sign(black_box(&message)));
        });
    });

    let sig = kp.sign(&message);
    c.bench_function("ed25519_verify", |b| {
        b.iter(|| {
            black_box(kp.verify(black_box(&message), black_box(&sig)).unwrap());
        });
    });
}

// ---------------------------------------------------------------------------
// AEAD seal
// ---------------------------------------------------------------------------

fn bench_aead(c: &mut Criterion) {
    let nonce = [0u8; 12];
    let sizes: &[usize] = &[64, 1024, 16 * 1024];

    for suite in [CipherSuite::ChaCha20Poly1305, CipherSuite::Aes256Gcm] {
        let key = AeadKey::new(suite, [0x42u8; 32]);
        let mut group = c.benchmark_group(format!("{}_encrypt", suite.name()));
        for &size in sizes {
            let plaintext = vec![0xABu8; size];
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::from_parameter(format!("{size}B")),
                &plaintext,
                |b, pt| {
                    b.iter(|| {
                        black_box(key.encrypt(&nonce, black_box(pt), b"").unwrap());
                    });
                },
            );
        }
        group.finish();
    }
}

// ---------------------------------------------------------------------------
// Binding verification
// ---------------------------------------------------------------------------

fn bench_verify_binding(c: &mut Criterion) {
    let f = fixture();
    let public_key = f.keypair.public_key_bytes();
    let blob = f.certificate.to_bytes();

    let mut group = c.benchmark_group("verify_binding");
    for (name, verifier, local) in models(&f) {
        let offered = match local.credential() {
            strandbind::LocalCredential::Certificate(_) => OfferedCredential::Certificate(&blob),
            strandbind::LocalCredential::RawKey => OfferedCredential::RawKey(&public_key),
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                black_box(verifier.verify(&f.identity, offered, NOW).unwrap());
            });
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Full handshake latency
// ---------------------------------------------------------------------------

fn handshake(verifier: &BindingVerifier, expected: &Identity, config: &Arc<ResponderConfig>) {
    let mut initiator = Initiator::new(InitiatorConfig::new(expected.clone(), verifier.clone()));
    let mut responder = Responder::new(config.clone());

    let hello = initiator.start().unwrap();
    let flight = responder.handle(&hello, NOW).unwrap().outgoing;
    let mut reply = Vec::new();
    for message in &flight {
        reply.extend(initiator.handle(message, NOW).unwrap().outgoing);
    }
    for message in &reply {
        responder.handle(message, NOW).unwrap();
    }

    black_box(initiator.session().unwrap());
    black_box(responder.session().unwrap());
}

fn bench_full_handshake(c: &mut Criterion) {
    let f = fixture();

    let mut group = c.benchmark_group("full_handshake");
    for (name, verifier, local) in models(&f) {
        let config = Arc::new(ResponderConfig::new(local));
        group.bench_function(name, |b| {
            b.iter(|| handshake(&verifier, &f.identity, &config));
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// Criterion harness
// ---------------------------------------------------------------------------

criterion_group! {
    name = handshake_benches;
    config = Criterion::default()
        .sample_size(100)
        .measurement_time(Duration::from_secs(5));
    targets =
        bench_keys,
        bench_aead,
        bench_verify_binding,
        bench_full_handshake
}

criterion_main!(handshake_benches);
