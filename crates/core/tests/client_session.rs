//! Tests for FactCheckClient against the in-memory transport

use std::sync::Arc;
use std::time::Duration;

use facto::{ErrorKind, FactCheckClient, Phase, ProgressStage, ReconnectPolicy, SessionSnapshot, TransportConfig};
use facto_runtime::fake_transport::{FakeConnector, FakePeer, FakeServer};
use facto_protocol::ClientRequest;
use serde_json::json;
use tokio::sync::watch;

const WAIT: Duration = Duration::from_secs(5);

fn client() -> (FactCheckClient, FakeServer) {
	let (connector, server) = FakeConnector::new();
	let config = TransportConfig::default().with_reconnect(ReconnectPolicy::fixed(
		Duration::from_millis(20),
		Duration::from_millis(80),
		2.0,
	));
	let client = FactCheckClient::with_connector(config, Arc::new(connector)).unwrap();
	(client, server)
}

async fn accept(server: &FakeServer) -> FakePeer {
	tokio::time::timeout(WAIT, server.accept()).await.unwrap().unwrap()
}

async fn until(state: &mut watch::Receiver<SessionSnapshot>, predicate: impl FnMut(&SessionSnapshot) -> bool) -> SessionSnapshot {
	tokio::time::timeout(WAIT, state.wait_for(predicate))
		.await
		.expect("timed out waiting for snapshot")
		.unwrap()
		.clone()
}

async fn wait_for_requests(peer: &FakePeer, count: usize) -> Vec<ClientRequest> {
	tokio::time::timeout(WAIT, async {
		loop {
			let requests = peer.requests();
			if requests.len() >= count {
				return requests;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("timed out waiting for requests")
}

#[tokio::test]
async fn extraction_verification_complete_cycle() {
	let (client, server) = client();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	until(&mut state, |s| s.connected).await;

	peer.push(json!({"type": "connection", "message": "Connected to fact checking service", "client_id": "srv-1"}));
	assert_eq!(client.wait_for_session_id().await.unwrap(), "srv-1");

	client.submit("The sky is blue. Water is dry.").await.unwrap();
	assert_eq!(
		wait_for_requests(&peer, 1).await,
		vec![ClientRequest::new("The sky is blue. Water is dry.")]
	);

	peer.push(json!({"type": "progress", "stage": "extraction"}));
	let snapshot = until(&mut state, |s| s.progress.is_some()).await;
	assert_eq!(snapshot.phase, Phase::Progressing);

	peer.push(json!({"type": "progress", "stage": "extraction_complete", "statements": ["The sky is blue.", "Water is dry."], "totalStatements": 2}));
	peer.push(json!({"type": "progress", "stage": "verification", "statementIndex": 1, "totalStatements": 2}));
	let snapshot = until(&mut state, |s| {
		s.progress.as_ref().is_some_and(|p| p.stage == ProgressStage::Verification)
	})
	.await;
	assert_eq!(snapshot.progress.unwrap().statement_index, Some(1));

	peer.push(json!({"type": "complete", "results": [
		{"statement": "The sky is blue.", "probability": "high", "reason": "Rayleigh scattering.", "sources": ["https://example.org/sky"]},
		{"statement": "Water is dry.", "probability": "low", "reason": "Water is wet.", "sources": []}
	]}));
	let outcome = tokio::time::timeout(WAIT, client.wait_for_outcome()).await.unwrap().unwrap();
	assert_eq!(outcome.phase, Phase::Completed);
	assert!(outcome.progress.is_none());
	let results = outcome.results.unwrap();
	assert_eq!(results.len(), 2);
	assert_eq!(results[1].statement, "Water is dry.");

	client.shutdown().await;
	assert!(peer.closed_by_client());
}

#[tokio::test]
async fn session_id_waits_for_server_announcement() {
	let (connector, server) = FakeConnector::new();
	let config = TransportConfig::default().with_session_id(Some("client-guess".into()));
	let client = FactCheckClient::with_connector(config, Arc::new(connector)).unwrap();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	assert_eq!(peer.url().path(), "/ws/fact-check/client-guess");
	until(&mut state, |s| s.connected).await;

	assert!(tokio::time::timeout(Duration::from_millis(100), client.wait_for_session_id()).await.is_err());

	peer.push(json!({"type": "connection", "client_id": "srv-2"}));
	let session_id = tokio::time::timeout(WAIT, client.wait_for_session_id()).await.unwrap().unwrap();
	assert_eq!(session_id, "srv-2");

	client.shutdown().await;
}

#[tokio::test]
async fn submit_before_open_is_replayed_exactly_once() {
	let (connector, server) = FakeConnector::new();
	server.refuse_next("connection refused");
	let config = TransportConfig::default().with_reconnect(ReconnectPolicy::fixed(
		Duration::from_millis(50),
		Duration::from_millis(50),
		2.0,
	));
	let client = FactCheckClient::with_connector(config, Arc::new(connector)).unwrap();
	let mut state = client.subscribe();

	client.submit("The sky is blue.").await.unwrap();
	let snapshot = until(&mut state, |s| s.error.is_some()).await;
	assert_eq!(snapshot.error.unwrap().kind, ErrorKind::Usage);
	assert!(!snapshot.connected);

	let peer = accept(&server).await;
	let snapshot = until(&mut state, |s| s.connected).await;
	assert!(snapshot.error.is_none());
	assert_eq!(wait_for_requests(&peer, 1).await, vec![ClientRequest::new("The sky is blue.")]);

	// a later reconnect does not resend
	peer.disconnect();
	until(&mut state, |s| !s.connected).await;
	let second = accept(&server).await;
	until(&mut state, |s| s.connected).await;
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert!(second.requests().is_empty());
	assert_eq!(peer.requests().len(), 1);

	client.shutdown().await;
}

#[tokio::test]
async fn application_error_fails_the_cycle() {
	let (client, server) = client();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	until(&mut state, |s| s.connected).await;

	client.submit("https://www.youtube.com/watch?v=none").await.unwrap();
	wait_for_requests(&peer, 1).await;
	peer.push(json!({"type": "progress", "stage": "video-processing"}));
	peer.push(json!({"type": "error", "message": "Could not fetch the video"}));

	let outcome = tokio::time::timeout(WAIT, client.wait_for_outcome()).await.unwrap().unwrap();
	assert_eq!(outcome.phase, Phase::Failed);
	assert!(outcome.progress.is_none());
	let error = outcome.error.unwrap();
	assert_eq!(error.kind, ErrorKind::Application);
	assert_eq!(error.message, "Could not fetch the video");

	client.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_keeps_connection() {
	let (client, server) = client();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	until(&mut state, |s| s.connected).await;

	peer.push_raw("this is not json");
	let snapshot = until(&mut state, |s| s.error.is_some()).await;
	assert!(snapshot.connected);
	assert_eq!(snapshot.error.unwrap().kind, ErrorKind::Protocol);

	client.shutdown().await;
}

#[tokio::test]
async fn connection_loss_is_reported_and_recovered() {
	let (client, server) = client();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	until(&mut state, |s| s.connected).await;

	peer.push(json!({"type": "connection", "client_id": "srv-9"}));
	until(&mut state, |s| s.session_id.is_some()).await;

	peer.fail("connection reset by peer");
	let snapshot = until(&mut state, |s| !s.connected).await;
	assert_eq!(snapshot.error.unwrap().kind, ErrorKind::Transport);

	let second = accept(&server).await;
	assert_eq!(second.url().path(), "/ws/fact-check/srv-9");
	let snapshot = until(&mut state, |s| s.connected).await;
	assert!(snapshot.error.is_none());
	assert_eq!(snapshot.session_id.as_deref(), Some("srv-9"));

	client.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_everything() {
	let (client, server) = client();
	let mut state = client.subscribe();
	let peer = accept(&server).await;
	until(&mut state, |s| s.connected).await;

	client.shutdown().await;
	assert!(peer.closed_by_client());
	tokio::time::sleep(Duration::from_millis(100)).await;
	assert_eq!(server.attempts().len(), 1);
	assert!(state.changed().await.is_err());
}
