//! Wire types for the interaction backend's JSON protocol.
//!
//! Field names match the backend exactly; everything the client reads
//! that may legitimately be absent is an `Option` so a missing field
//! decodes as the semantically empty value instead of failing.

use serde::{Deserialize, Serialize};

/// Name of the roster-change push event.
pub const ROSTER_EVENT: &str = "NICKNAME";

/// Prefix of per-question push event names.
const ANSWER_EVENT_PREFIX: &str = "A-";

/// Push event name carrying updates scoped to one question id.
pub fn answer_event_name(qid: &str) -> String {
    format!("{ANSWER_EVENT_PREFIX}{qid}")
}

/// Backend address advertisement (`GET ipsocket`).
#[derive(Debug, Clone, Deserialize)]
pub struct BackendInfo {
    pub ip: String,
    #[serde(rename = "socketNr")]
    pub socket_nr: u16,
}

/// Response of `GET nickname/{identity}`; an absent field means unclaimed.
#[derive(Debug, Clone, Deserialize)]
pub struct NicknameLookup {
    #[serde(default)]
    pub nickname: Option<String>,
}

/// Body of `POST nickname`.
#[derive(Debug, Clone, Serialize)]
pub struct ClaimRequest<'a> {
    pub user: &'a str,
    pub uuid: &'a str,
}

/// Response of `POST nickname`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimResponse {
    #[serde(default)]
    pub status: String,
}

impl ClaimResponse {
    /// Whether the backend accepted the claim.
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Response of `GET nicknames` and payload of the roster push event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    #[serde(default)]
    pub nicknames: Vec<String>,
}

/// Response of `GET likert/{qid}`; the percentage is computed server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct LikertAggregate {
    pub likert: f64,
}

/// Body of `POST likert`; the `likert` field carries the question id.
#[derive(Debug, Clone, Serialize)]
pub struct LikertVote<'a> {
    pub user: &'a str,
    pub likert: &'a str,
    pub value: u8,
}

/// Body of `POST answer`.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerSubmission<'a> {
    pub answer: &'a str,
    pub qid: &'a str,
    pub user: &'a str,
}

/// Response of `GET answer/{qid}`; an empty board is signalled with a
/// `warning` instead of an answer list.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerList {
    #[serde(default)]
    pub answers: Option<Vec<String>>,
    #[serde(default)]
    pub warning: Option<String>,
}

/// Payload of an `A-{qid}` push event feeding an answer board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardUpdate {
    #[serde(default)]
    pub answers: Vec<String>,
}

/// Payload of an `A-{qid}` push event feeding a live tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyUpdate {
    pub percentage: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn answer_events_are_scoped_by_qid() {
        assert_eq!(answer_event_name("q1"), "A-q1");
    }

    #[test]
    fn missing_nickname_field_means_unclaimed() {
        let lookup: NicknameLookup = serde_json::from_value(json!({})).unwrap();
        assert!(lookup.nickname.is_none());

        let lookup: NicknameLookup =
            serde_json::from_value(json!({ "nickname": "Fisch" })).unwrap();
        assert_eq!(lookup.nickname.as_deref(), Some("Fisch"));
    }

    #[test]
    fn only_the_success_status_counts() {
        let ok: ClaimResponse = serde_json::from_value(json!({ "status": "success" })).unwrap();
        assert!(ok.is_success());

        let taken: ClaimResponse = serde_json::from_value(json!({ "status": "taken" })).unwrap();
        assert!(!taken.is_success());

        let silent: ClaimResponse = serde_json::from_value(json!({})).unwrap();
        assert!(!silent.is_success());
    }

    #[test]
    fn claim_request_uses_backend_field_names() {
        let body = serde_json::to_value(ClaimRequest { user: "Fisch", uuid: "abc" }).unwrap();
        assert_eq!(body, json!({ "user": "Fisch", "uuid": "abc" }));
    }

    #[test]
    fn likert_vote_uses_backend_field_names() {
        let body =
            serde_json::to_value(LikertVote { user: "Fisch", likert: "q7", value: 3 }).unwrap();
        assert_eq!(body, json!({ "user": "Fisch", "likert": "q7", "value": 3 }));
    }

    #[test]
    fn backend_info_reads_camel_case_socket() {
        let info: BackendInfo =
            serde_json::from_value(json!({ "ip": "10.0.0.1", "socketNr": 3000 })).unwrap();
        assert_eq!(info.socket_nr, 3000);
    }

    #[test]
    fn answer_list_decodes_both_shapes() {
        let full: AnswerList =
            serde_json::from_value(json!({ "answers": ["a", "b"] })).unwrap();
        assert_eq!(full.answers.unwrap().len(), 2);
        assert!(full.warning.is_none());

        let empty: AnswerList =
            serde_json::from_value(json!({ "warning": "no answers yet" })).unwrap();
        assert!(empty.answers.is_none());
        assert_eq!(empty.warning.as_deref(), Some("no answers yet"));
    }
}
