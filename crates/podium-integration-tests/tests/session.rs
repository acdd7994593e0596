//! End-to-end nickname registration scenarios.

use std::time::Duration;

use podium_client::wire::ROSTER_EVENT;
use podium_client::{
    ChannelStatus, Client, ClientConfig, Error, IdentityStore, NicknameRegistry, SessionState,
    DEFAULT_CATALOG,
};
use podium_integration_tests::{init_tracing, MockBackend};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn store(dir: &tempfile::TempDir, name: &str) -> IdentityStore {
    IdentityStore::open(dir.path().join(name))
}

fn client(backend: &MockBackend) -> Client {
    Client::connect(ClientConfig::new(backend.base_url())).unwrap()
}

async fn wait_connected(client: &Client) {
    let mut status = client.channel().status();
    timeout(WAIT, status.wait_for(|s| *s == ChannelStatus::Connected))
        .await
        .expect("channel did not connect")
        .unwrap();
}

#[tokio::test]
async fn fresh_session_claims_an_icon() {
    init_tracing();
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&backend);
    let mut registry = client.registry(store(&dir, "a.json"), DEFAULT_CATALOG);

    registry.load().await.unwrap();
    assert!(matches!(registry.state(), SessionState::Unclaimed(_)));
    assert!(registry.icons().iter().all(|icon| icon.available));

    registry.claim("Fisch").await.unwrap();
    assert_eq!(registry.nickname(), Some("Fisch"));
    assert!(backend.roster().contains(&"Fisch".to_owned()));

    // Claimed is terminal for the session: another pick is blocked
    // before it can reach the network.
    let before = client.transport().requests_sent();
    let err = registry.claim("Eule").await.unwrap_err();
    assert!(matches!(err, Error::LocalPreconditionFailed(_)));
    assert_eq!(client.transport().requests_sent(), before);
}

#[tokio::test]
async fn reload_recovers_claim_from_server() {
    init_tracing();
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&backend);

    let mut registry = client.registry(store(&dir, "a.json"), DEFAULT_CATALOG);
    registry.load().await.unwrap();
    registry.claim("Ameise").await.unwrap();
    let identity = registry.state().identity().unwrap();

    // Same persisted identity, fresh session: the lookup restores the
    // claim without issuing a new one.
    let mut reloaded = client.registry(store(&dir, "a.json"), DEFAULT_CATALOG);
    reloaded.load().await.unwrap();
    assert_eq!(reloaded.state().identity(), Some(identity));
    assert_eq!(reloaded.nickname(), Some("Ameise"));
}

#[tokio::test]
async fn stale_cached_nickname_is_cleared_on_load() {
    init_tracing();
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();
    let client = client(&backend);

    let store = store(&dir, "a.json");
    store.set_nickname("Geist").unwrap();

    let mut registry = client.registry(store, DEFAULT_CATALOG);
    registry.load().await.unwrap();
    assert!(matches!(registry.state(), SessionState::Unclaimed(_)));
}

#[tokio::test]
async fn already_claimed_icon_is_not_interactive() {
    init_tracing();
    let backend = MockBackend::start().await;
    backend.seed_claim("11111111-2222-4333-8444-555555555555", "Igel");

    let dir = tempfile::tempdir().unwrap();
    let client = client(&backend);
    let mut registry = client.registry(store(&dir, "a.json"), DEFAULT_CATALOG);
    registry.load().await.unwrap();

    let igel = registry
        .icons()
        .into_iter()
        .find(|icon| icon.name == "Igel")
        .unwrap();
    assert!(!igel.available);

    // Clicking a taken icon never issues a claim request.
    let before = client.transport().requests_sent();
    let err = registry.claim("Igel").await.unwrap_err();
    assert!(matches!(err, Error::LocalPreconditionFailed(_)));
    assert_eq!(client.transport().requests_sent(), before);
    assert!(matches!(registry.state(), SessionState::Unclaimed(_)));
}

async fn verify_loser(
    client: &Client,
    registry: &mut NicknameRegistry,
    result: podium_client::Result<()>,
) {
    assert!(matches!(result.unwrap_err(), Error::RemoteRejected { .. }));
    assert!(matches!(registry.state(), SessionState::Unclaimed(_)));

    // The icon renders non-interactive once the push event landed, and
    // re-clicking it issues no request.
    let fisch = registry
        .icons()
        .into_iter()
        .find(|icon| icon.name == "Fisch")
        .unwrap();
    assert!(!fisch.available);

    let before = client.transport().requests_sent();
    let err = registry.claim("Fisch").await.unwrap_err();
    assert!(matches!(err, Error::LocalPreconditionFailed(_)));
    assert_eq!(client.transport().requests_sent(), before);
}

#[tokio::test]
async fn concurrent_double_claim_has_one_winner() {
    init_tracing();
    let backend = MockBackend::start().await;
    let dir = tempfile::tempdir().unwrap();

    let client_a = client(&backend);
    let client_b = client(&backend);
    let mut registry_a = client_a.registry(store(&dir, "a.json"), DEFAULT_CATALOG);
    let mut registry_b = client_b.registry(store(&dir, "b.json"), DEFAULT_CATALOG);
    registry_a.load().await.unwrap();
    registry_b.load().await.unwrap();
    assert_ne!(registry_a.state().identity(), registry_b.state().identity());

    let mut events_a = client_a.channel().subscribe(ROSTER_EVENT);
    let mut events_b = client_b.channel().subscribe(ROSTER_EVENT);
    wait_connected(&client_a).await;
    wait_connected(&client_b).await;

    let (result_a, result_b) = tokio::join!(registry_a.claim("Fisch"), registry_b.claim("Fisch"));
    assert!(
        result_a.is_ok() != result_b.is_ok(),
        "exactly one claim may win: {result_a:?} vs {result_b:?}"
    );

    // Both rosters converge on the winner's claim via the push event.
    let payload_a = timeout(WAIT, events_a.recv()).await.unwrap().unwrap();
    let payload_b = timeout(WAIT, events_b.recv()).await.unwrap().unwrap();
    registry_a.apply_roster_event(&payload_a);
    registry_b.apply_roster_event(&payload_b);
    assert!(registry_a.roster().contains("Fisch"));
    assert!(registry_b.roster().contains("Fisch"));
    assert_eq!(backend.roster(), vec!["Fisch".to_owned()]);

    if result_a.is_err() {
        verify_loser(&client_a, &mut registry_a, result_a).await;
        assert_eq!(registry_b.nickname(), Some("Fisch"));
    } else {
        verify_loser(&client_b, &mut registry_b, result_b).await;
        assert_eq!(registry_a.nickname(), Some("Fisch"));
    }
}
