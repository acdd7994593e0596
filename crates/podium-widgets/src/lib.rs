//! Podium Widgets
//!
//! Interactive audience widgets built on [`podium_client`]: free-text
//! answer boards and five-point Likert scales, both scoped to a question
//! id (qid) and kept current by the shared push channel.
//!
//! Widgets are headless render models: they hold the state a view layer
//! draws from (`BoardView`, selection, percentage) and leave the actual
//! drawing and user notification (toasts, alerts) to the embedder.
//!
//! # Usage
//!
//! ```ignore
//! let mut board = AnswerBoard::new(client.transport(), AnswerBoardConfig::new("q1"));
//! board.load().await?;
//! board.attach(client.channel());
//! while board.next_update().await {
//!     draw(board.view());
//! }
//! ```

pub mod answers;
pub mod layout;
pub mod likert;

pub use answers::{AnswerBoard, AnswerBoardConfig, BoardView};
pub use layout::{scatter, LayoutConfig, Note};
pub use likert::{LikertConfig, LikertWidget, TallyMode, SCALE_POINTS};
