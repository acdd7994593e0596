//! In-process mock of the interaction backend for end-to-end tests.
//!
//! Serves the endpoints the client consumes (`ipsocket`, nickname
//! lookup/claim/roster, likert, answer, `events`) over real HTTP on an
//! ephemeral port. Push events fan out to every connected client over
//! server-sent events, mirroring the production wire contract: claims
//! broadcast the full roster as `NICKNAME`, answers and votes broadcast
//! board/tally updates as `A-{qid}`.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::response::sse::{Event, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::Stream;
use serde_json::{json, Value};
use tokio::sync::broadcast;

/// Install a test-friendly tracing subscriber (idempotent).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct BackendState {
    /// identity -> claimed nickname
    claims: HashMap<String, String>,
    /// qid -> submitted answers
    answers: HashMap<String, Vec<String>>,
    /// qid -> (user -> latest vote)
    votes: HashMap<String, HashMap<String, u8>>,
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<BackendState>>,
    events: broadcast::Sender<(String, Value)>,
}

/// Handle to a running mock backend.
pub struct MockBackend {
    shared: Shared,
    addr: SocketAddr,
}

impl MockBackend {
    /// Bind on an ephemeral port and start serving.
    pub async fn start() -> Self {
        let shared = Shared {
            state: Arc::default(),
            events: broadcast::channel(64).0,
        };
        let app = Router::new()
            .route("/ipsocket", get(ipsocket))
            .route("/nickname/{identity}", get(nickname_lookup))
            .route("/nickname", post(nickname_claim))
            .route("/nicknames", get(nickname_roster))
            .route("/likert/{qid}", get(likert_aggregate))
            .route("/likert", post(likert_vote))
            .route("/answer/{qid}", get(answer_list))
            .route("/answer", post(answer_submit))
            .route("/events", get(event_stream))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { shared, addr }
    }

    /// Base URL clients should be configured with.
    pub fn base_url(&self) -> podium_client::Url {
        format!("http://{}/", self.addr).parse().unwrap()
    }

    /// Emit a named push event to every connected client.
    pub fn emit(&self, name: &str, payload: Value) {
        let _ = self.shared.events.send((name.to_owned(), payload));
    }

    /// Emit a keep-alive ping.
    pub fn ping(&self) {
        self.emit("KEEPALIVE", json!({}));
    }

    /// Names currently claimed, in no particular order.
    pub fn roster(&self) -> Vec<String> {
        let state = self.shared.state.lock().unwrap();
        state.claims.values().cloned().collect()
    }

    /// Pre-claim a nickname for an identity (test setup).
    pub fn seed_claim(&self, identity: &str, nickname: &str) {
        let mut state = self.shared.state.lock().unwrap();
        state.claims.insert(identity.to_owned(), nickname.to_owned());
    }
}

async fn ipsocket() -> Json<Value> {
    Json(json!({ "ip": "127.0.0.1", "socketNr": 3000 }))
}

async fn nickname_lookup(
    State(shared): State<Shared>,
    Path(identity): Path<String>,
) -> Json<Value> {
    let state = shared.state.lock().unwrap();
    match state.claims.get(&identity) {
        Some(name) => Json(json!({ "nickname": name })),
        None => Json(json!({})),
    }
}

async fn nickname_claim(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let user = body["user"].as_str().unwrap_or_default().to_owned();
    let uuid = body["uuid"].as_str().unwrap_or_default().to_owned();

    // One atomic check-and-claim; concurrent claims on the same name get
    // exactly one winner.
    let accepted = {
        let mut state = shared.state.lock().unwrap();
        let name_taken = state.claims.values().any(|name| *name == user);
        if user.is_empty() || uuid.is_empty() || name_taken || state.claims.contains_key(&uuid) {
            false
        } else {
            state.claims.insert(uuid, user);
            true
        }
    };

    if accepted {
        let nicknames: Vec<String> = {
            let state = shared.state.lock().unwrap();
            state.claims.values().cloned().collect()
        };
        let _ = shared
            .events
            .send(("NICKNAME".to_owned(), json!({ "nicknames": nicknames })));
        Json(json!({ "status": "success" }))
    } else {
        Json(json!({ "status": "taken" }))
    }
}

async fn nickname_roster(State(shared): State<Shared>) -> Json<Value> {
    let state = shared.state.lock().unwrap();
    let nicknames: Vec<&String> = state.claims.values().collect();
    Json(json!({ "nicknames": nicknames }))
}

fn percentage_of(votes: &HashMap<String, u8>) -> f64 {
    if votes.is_empty() {
        return 0.0;
    }
    let sum: f64 = votes.values().map(|value| f64::from(*value)).sum();
    sum / (votes.len() as f64 * 4.0) * 100.0
}

async fn likert_aggregate(State(shared): State<Shared>, Path(qid): Path<String>) -> Json<Value> {
    let state = shared.state.lock().unwrap();
    let percentage = state.votes.get(&qid).map(percentage_of).unwrap_or(0.0);
    Json(json!({ "likert": percentage }))
}

async fn likert_vote(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let qid = body["likert"].as_str().unwrap_or_default().to_owned();
    let user = body["user"].as_str().unwrap_or_default().to_owned();
    let value = body["value"].as_u64().unwrap_or(0) as u8;

    let percentage = {
        let mut state = shared.state.lock().unwrap();
        let votes = state.votes.entry(qid.clone()).or_default();
        // Revotes overwrite; one vote per (qid, user).
        votes.insert(user, value);
        percentage_of(votes)
    };
    let _ = shared
        .events
        .send((format!("A-{qid}"), json!({ "percentage": percentage })));
    Json(json!({ "status": "success" }))
}

async fn answer_list(State(shared): State<Shared>, Path(qid): Path<String>) -> Json<Value> {
    let state = shared.state.lock().unwrap();
    match state.answers.get(&qid) {
        Some(answers) if !answers.is_empty() => Json(json!({ "answers": answers })),
        _ => Json(json!({ "warning": "no answers yet" })),
    }
}

async fn answer_submit(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let qid = body["qid"].as_str().unwrap_or_default().to_owned();
    let answer = body["answer"].as_str().unwrap_or_default().to_owned();

    let answers = {
        let mut state = shared.state.lock().unwrap();
        let list = state.answers.entry(qid.clone()).or_default();
        list.push(answer);
        list.clone()
    };
    let _ = shared
        .events
        .send((format!("A-{qid}"), json!({ "answers": answers })));
    Json(json!({ "status": "success" }))
}

async fn event_stream(
    State(shared): State<Shared>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = shared.events.subscribe();
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok((name, payload)) => {
                    let event = Event::default().event(name).data(payload.to_string());
                    return Some((Ok::<_, Infallible>(event), rx));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream)
}
