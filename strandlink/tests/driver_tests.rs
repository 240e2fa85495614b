//! Driver and acceptor tests over the in-memory transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use strandbind::registry::{AuthenticatedUpdate, BindingRecord, Credential, InMemoryRegistry};
use strandbind::{
    BindingVerifier, FailureKind, HandshakePhase, Identity, IdentityKeyPair, Initiator,
    InitiatorConfig, LocalIdentity, Responder, ResponderConfig, TrustTable,
};
use strandlink::{
    run_initiator, run_responder, Acceptor, DriverConfig, MemoryTransport, StrandLinkError, Transport,
};
use tokio::sync::mpsc;

fn server() -> (LocalIdentity, Arc<InMemoryRegistry>) {
    let identity = Identity::new("alice.example").unwrap();
    let keypair = Arc::new(IdentityKeyPair::generate());
    let registry = Arc::new(InMemoryRegistry::generate());
    let credential = Credential::generate();
    registry.enroll(identity.clone(), credential.clone()).unwrap();
    let record = BindingRecord::raw_key(identity.clone(), &keypair.public_key_bytes());
    registry
        .submit_update(&AuthenticatedUpdate::new(record, &credential).unwrap())
        .unwrap();
    (LocalIdentity::raw_key(identity, keypair), registry)
}

fn initiator_for(expected: &str, registry: &Arc<InMemoryRegistry>) -> Initiator {
    Initiator::new(InitiatorConfig::new(
        Identity::new(expected).unwrap(),
        BindingVerifier::dane_raw_key(registry.clone(), registry.public_key()),
    ))
}

#[tokio::test]
async fn drivers_complete_handshake() {
    let (local, registry) = server();
    let (mut client_end, mut server_end) = MemoryTransport::pair(8);
    let config = DriverConfig::default();

    let server_config = config.clone();
    let server_task = tokio::spawn(async move {
        let mut responder = Responder::new(ResponderConfig::new(local));
        run_responder(&mut server_end, &mut responder, &server_config).await
    });

    let mut initiator = initiator_for("alice.example", &registry);
    let client = run_initiator(&mut client_end, &mut initiator, &config)
        .await
        .unwrap();
    let server = server_task.await.unwrap().unwrap();

    assert_eq!(client.master_secret(), server.master_secret());
    assert_eq!(client.peer_identity().unwrap().as_str(), "alice.example");
    assert_eq!(initiator.phase(), HandshakePhase::Complete);
}

#[tokio::test]
async fn mutual_pinned_over_drivers() {
    let client_id = Identity::new("client.example").unwrap();
    let server_id = Identity::new("server.example").unwrap();
    let client_kp = Arc::new(IdentityKeyPair::generate());
    let server_kp = Arc::new(IdentityKeyPair::generate());

    let client_table = TrustTable::new();
    client_table.insert(server_id.clone(), server_kp.public_key_bytes());
    let server_table = TrustTable::new();
    server_table.insert(client_id.clone(), client_kp.public_key_bytes());

    let (mut client_end, mut server_end) = MemoryTransport::pair(8);
    let config = DriverConfig::default();
    let responder_config = ResponderConfig::new(LocalIdentity::raw_key(server_id.clone(), server_kp))
        .require_client_auth(BindingVerifier::pinned(server_table));

    let server_config = config.clone();
    let server_task = tokio::spawn(async move {
        let mut responder = Responder::new(responder_config);
        run_responder(&mut server_end, &mut responder, &server_config).await
    });

    let mut initiator = Initiator::new(
        InitiatorConfig::new(server_id.clone(), BindingVerifier::pinned(client_table))
            .with_client_identity(LocalIdentity::raw_key(client_id.clone(), client_kp)),
    );
    let client = run_initiator(&mut client_end, &mut initiator, &config)
        .await
        .unwrap();
    let server = server_task.await.unwrap().unwrap();

    assert_eq!(server.peer_identity(), Some(&client_id));
    assert_eq!(client.peer_identity(), Some(&server_id));
    assert_eq!(client.master_secret(), server.master_secret());
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let (_, registry) = server();
    let (mut client_end, _server_end) = MemoryTransport::pair(8);
    let config = DriverConfig::default().with_receive_timeout(Duration::from_secs(3));

    let mut initiator = initiator_for("alice.example", &registry);
    let err = run_initiator(&mut client_end, &mut initiator, &config)
        .await
        .unwrap_err();

    assert!(matches!(err, StrandLinkError::Timeout(_)));
    assert_eq!(err.kind(), FailureKind::TransportFailure);
    assert_eq!(initiator.phase(), HandshakePhase::Aborted);
    assert!(initiator.session().is_none());
    assert!(client_end.is_closed());
}

#[tokio::test]
async fn closed_peer_aborts_handshake() {
    let (local, _) = server();
    let (client_end, mut server_end) = MemoryTransport::pair(8);
    drop(client_end);

    let mut responder = Responder::new(ResponderConfig::new(local));
    let err = run_responder(&mut server_end, &mut responder, &DriverConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, StrandLinkError::Closed));
    assert_eq!(err.kind(), FailureKind::TransportFailure);
    assert_eq!(responder.phase(), HandshakePhase::Aborted);
}

#[tokio::test]
async fn oversized_message_aborts() {
    let (local, _) = server();
    let (mut client_end, mut server_end) = MemoryTransport::pair(8);
    client_end
        .send(Bytes::from(vec![0u8; 4096]))
        .await
        .unwrap();

    let config = DriverConfig::default().with_max_message_len(1024);
    let mut responder = Responder::new(ResponderConfig::new(local));
    let err = run_responder(&mut server_end, &mut responder, &config)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StrandLinkError::MessageTooLarge { size: 4096, max: 1024 }
    ));
    assert_eq!(responder.phase(), HandshakePhase::Aborted);
}

#[tokio::test]
async fn binding_failure_closes_transport() {
    let (_, registry) = server();
    // Same name, different key: the registry does not attest it.
    let impostor = LocalIdentity::raw_key(
        Identity::new("alice.example").unwrap(),
        Arc::new(IdentityKeyPair::generate()),
    );
    let (mut client_end, mut server_end) = MemoryTransport::pair(8);
    let config = DriverConfig::default();

    let server_config = config.clone();
    let server_task = tokio::spawn(async move {
        let mut responder = Responder::new(ResponderConfig::new(impostor));
        run_responder(&mut server_end, &mut responder, &server_config).await
    });

    let mut initiator = initiator_for("alice.example", &registry);
    let err = run_initiator(&mut client_end, &mut initiator, &config)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::BindingFailure);

    // The responder learns only that the connection went away.
    let server_err = server_task.await.unwrap().unwrap_err();
    assert_eq!(server_err.kind(), FailureKind::TransportFailure);
}

#[tokio::test]
async fn acceptor_runs_concurrent_handshakes() {
    let (local, registry) = server();
    let acceptor = Acceptor::new(ResponderConfig::new(local), DriverConfig::default());

    let (incoming_tx, incoming_rx) = mpsc::channel(8);
    let (outcome_tx, mut outcome_rx) = mpsc::channel(8);
    let accept_task = tokio::spawn(acceptor.run(incoming_rx, outcome_tx));

    let mut clients = Vec::new();
    for expected in ["alice.example", "alice.example", "alice.example", "bob.example"] {
        let (mut client_end, server_end) = MemoryTransport::pair(8);
        incoming_tx.send(server_end).await.unwrap();
        let mut initiator = initiator_for(expected, &registry);
        clients.push(tokio::spawn(async move {
            run_initiator(&mut client_end, &mut initiator, &DriverConfig::default()).await
        }));
    }
    drop(incoming_tx);

    let mut client_ok = 0;
    for client in clients {
        if client.await.unwrap().is_ok() {
            client_ok += 1;
        }
    }
    accept_task.await.unwrap();

    let mut outcomes = Vec::new();
    while let Some(outcome) = outcome_rx.recv().await {
        outcomes.push(outcome);
    }
    outcomes.sort_by_key(|o| o.connection);

    assert_eq!(client_ok, 3);
    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[..3].iter().all(|o| o.result.is_ok()));
    // bob.example is not served here.
    let rejected = outcomes[3].result.as_ref().unwrap_err();
    assert_eq!(rejected.kind(), FailureKind::IdentityRejected);
}
