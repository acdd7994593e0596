//! Five-point Likert scale with a shared aggregate percentage.

use std::sync::Arc;

use podium_client::wire::{answer_event_name, LikertAggregate, LikertVote, TallyUpdate};
use podium_client::{Error, EventChannel, Result, Subscription, Transport};

/// Number of points on the scale; votes carry values `0..SCALE_POINTS`.
pub const SCALE_POINTS: u8 = 5;

/// How the aggregate display is kept current. A configuration choice,
/// not a protocol difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyMode {
    /// Follow push events; no initial fetch.
    Live,
    /// Fetch once on demand.
    OnDemand,
}

/// Configuration for one Likert widget.
#[derive(Debug, Clone)]
pub struct LikertConfig {
    /// Question id the votes are scoped to.
    pub qid: String,
    /// Aggregate display mode.
    pub mode: TallyMode,
}

impl LikertConfig {
    pub fn new(qid: impl Into<String>, mode: TallyMode) -> Self {
        Self { qid: qid.into(), mode }
    }
}

/// Client-side Likert widget for one question id.
///
/// Selection is exclusive: picking a point replaces the previous one, and
/// the backend overwrites the previous vote for this identity, so the
/// tally only ever reflects the latest value per voter. The aggregate
/// percentage is computed server-side and only read here.
pub struct LikertWidget {
    transport: Arc<Transport>,
    config: LikertConfig,
    selection: Option<u8>,
    percentage: Option<f64>,
    updates: Option<Subscription>,
}

impl LikertWidget {
    pub fn new(transport: Arc<Transport>, config: LikertConfig) -> Self {
        Self { transport, config, selection: None, percentage: None, updates: None }
    }

    /// Currently selected point, if any.
    pub fn selection(&self) -> Option<u8> {
        self.selection
    }

    /// Last known aggregate percentage.
    pub fn percentage(&self) -> Option<f64> {
        self.percentage
    }

    /// Configured display mode.
    pub fn mode(&self) -> TallyMode {
        self.config.mode
    }

    /// Select one scale point and submit the vote.
    ///
    /// The same precondition as the answer board applies: without a
    /// claimed nickname nothing is sent. The local selection only changes
    /// once the backend accepted the vote.
    pub async fn select(&mut self, nickname: Option<&str>, value: u8) -> Result<()> {
        if value >= SCALE_POINTS {
            return Err(Error::LocalPreconditionFailed(format!(
                "scale point {value} out of range"
            )));
        }
        let Some(user) = nickname.filter(|name| !name.is_empty()) else {
            return Err(Error::LocalPreconditionFailed(
                "claim a nickname before voting".to_owned(),
            ));
        };
        let body = LikertVote { user, likert: &self.config.qid, value };
        self.transport.post("likert", &body).await?;
        self.selection = Some(value);
        Ok(())
    }

    /// One-shot aggregate fetch (`OnDemand` mode).
    pub async fn fetch_percentage(&mut self) -> Result<f64> {
        let path = format!("likert/{}", self.config.qid);
        let aggregate: LikertAggregate = self.transport.get_json(&path).await?;
        self.percentage = Some(aggregate.likert);
        Ok(aggregate.likert)
    }

    /// Start following push updates (`Live` mode).
    pub fn attach(&mut self, channel: &EventChannel) {
        self.updates = Some(channel.subscribe(&answer_event_name(&self.config.qid)));
    }

    /// Wait for the next push update and apply it.
    ///
    /// Returns `false` once the channel is gone or [`attach`](Self::attach)
    /// was never called.
    pub async fn next_update(&mut self) -> bool {
        let Some(updates) = self.updates.as_mut() else {
            return false;
        };
        let Some(payload) = updates.recv().await else {
            return false;
        };
        self.apply_event(&payload);
        true
    }

    /// Apply a `{ percentage }` push payload.
    pub fn apply_event(&mut self, payload: &serde_json::Value) {
        match serde_json::from_value::<TallyUpdate>(payload.clone()) {
            Ok(update) => self.percentage = Some(update.percentage),
            Err(err) => {
                tracing::warn!(qid = %self.config.qid, %err, "undecodable tally update");
            }
        }
    }
}
