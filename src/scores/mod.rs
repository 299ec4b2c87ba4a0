//! Score management
//!
//! - `service`: admission, ranking and statistics over the score store
//! - `context`: mediates between finished runs and the service, and
//!   publishes leaderboard/loading/error state to presentation

pub mod context;
pub mod service;

pub use context::{ScoreAction, ScoreContext, ScoreViewState, reduce};
pub use service::{PerformanceMetrics, ScoreError, ScoreService};
