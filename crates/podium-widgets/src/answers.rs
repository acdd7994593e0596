//! Answer board: free-text submissions scattered over a shared canvas.

use std::sync::Arc;

use podium_client::wire::{answer_event_name, AnswerList, AnswerSubmission, BoardUpdate};
use podium_client::{Error, EventChannel, Result, Subscription, Transport};

use crate::layout::{scatter, LayoutConfig, Note};

/// Configuration for one answer board.
#[derive(Debug, Clone)]
pub struct AnswerBoardConfig {
    /// Question id this board is scoped to.
    pub qid: String,
    /// Message rendered while the board has no answers.
    pub placeholder: String,
    /// Scatter layout tuning.
    pub layout: LayoutConfig,
}

impl AnswerBoardConfig {
    /// Defaults for the given question id.
    pub fn new(qid: impl Into<String>) -> Self {
        Self {
            qid: qid.into(),
            placeholder: "Noch keine Antworten".to_owned(),
            layout: LayoutConfig::default(),
        }
    }

    /// Set the empty-board placeholder message.
    #[must_use]
    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = text.into();
        self
    }

    /// Set the scatter layout tuning.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }
}

/// What the board currently renders.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardView {
    /// Nothing fetched yet.
    Empty,
    /// Fixed placeholder shown instead of an empty canvas.
    Placeholder(String),
    /// Scattered notes.
    Notes(Vec<Note>),
}

/// Client-side answer board for one question id.
///
/// Every update is a full redraw: a push payload discards the current
/// layout and re-scatters from scratch. There is no incremental diffing.
pub struct AnswerBoard {
    transport: Arc<Transport>,
    config: AnswerBoardConfig,
    view: BoardView,
    updates: Option<Subscription>,
}

impl AnswerBoard {
    pub fn new(transport: Arc<Transport>, config: AnswerBoardConfig) -> Self {
        Self { transport, config, view: BoardView::Empty, updates: None }
    }

    /// Current render state.
    pub fn view(&self) -> &BoardView {
        &self.view
    }

    /// Fetch the current answer list once. A `warning` response or an
    /// empty list renders the placeholder instead of an empty canvas.
    pub async fn load(&mut self) -> Result<()> {
        let path = format!("answer/{}", self.config.qid);
        let list: AnswerList = self.transport.get_json(&path).await?;
        if let Some(reason) = &list.warning {
            tracing::debug!(qid = %self.config.qid, %reason, "board has no answers");
        }
        self.render(&list.answers.unwrap_or_default());
        Ok(())
    }

    /// Start listening for push updates scoped to this board's qid.
    pub fn attach(&mut self, channel: &EventChannel) {
        self.updates = Some(channel.subscribe(&answer_event_name(&self.config.qid)));
    }

    /// Wait for the next push update and re-render from its payload.
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

    /// Replace the whole view from a push payload.
    pub fn apply_event(&mut self, payload: &serde_json::Value) {
        match serde_json::from_value::<BoardUpdate>(payload.clone()) {
            Ok(update) => self.render(&update.answers),
            Err(err) => {
                tracing::warn!(qid = %self.config.qid, %err, "undecodable board update");
            }
        }
    }

    /// Submit a free-text answer under the claimed nickname.
    ///
    /// Without a nickname the submission is blocked before any network
    /// call. A successful submission has no confirmation beyond `Ok`;
    /// the board itself updates when the backend pushes the new list.
    pub async fn submit(&self, nickname: Option<&str>, text: &str) -> Result<()> {
        let Some(user) = nickname.filter(|name| !name.is_empty()) else {
            return Err(Error::LocalPreconditionFailed(
                "claim a nickname before answering".to_owned(),
            ));
        };
        let body = AnswerSubmission { answer: text, qid: &self.config.qid, user };
        self.transport.post("answer", &body).await
    }

    fn render(&mut self, answers: &[String]) {
        if answers.is_empty() {
            self.view = BoardView::Placeholder(self.config.placeholder.clone());
        } else {
            self.view = BoardView::Notes(scatter(answers, &self.config.layout));
        }
    }
}
