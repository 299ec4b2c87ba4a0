//! Score context
//!
//! Sits between the game and the score service. Finished runs come in as
//! `GameEvent`s; leaderboard, stats, loading and error state go out through
//! a watch channel. State only changes through `reduce`.
//!
//! The view is eventually consistent: a submission is always followed by a
//! refresh, but a reader may see the old board until that refresh lands.

use std::sync::Arc;

use tokio::sync::watch;

use super::service::ScoreService;
use crate::consts::MAX_TOP_SCORES;
use crate::highscores::{Leaderboard, Score, ScoreStats};
use crate::platform::StorageBackend;
use crate::sim::GameEvent;

const LOAD_FAILED: &str = "Failed to load scores";
const SAVE_FAILED: &str = "Failed to save score";
const REFRESH_FAILED: &str = "Failed to refresh scores";
const CLEAR_FAILED: &str = "Failed to clear scores";

/// What presentation sees
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreViewState {
    pub top_scores: Vec<Score>,
    pub highest_score: u64,
    pub score_stats: Option<ScoreStats>,
    pub is_loading: bool,
    /// Last failure only
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreAction {
    SetLoading(bool),
    /// Records the failure and ends loading
    SetError(String),
    /// Board, best and stats replaced together
    Refreshed {
        top_scores: Vec<Score>,
        highest_score: u64,
        score_stats: ScoreStats,
    },
    ScoresCleared,
}

/// Transition function for the view state
pub fn reduce(state: &ScoreViewState, action: ScoreAction) -> ScoreViewState {
    match action {
        ScoreAction::SetLoading(is_loading) => ScoreViewState {
            is_loading,
            ..state.clone()
        },
        ScoreAction::SetError(message) => ScoreViewState {
            error: Some(message),
            is_loading: false,
            ..state.clone()
        },
        ScoreAction::Refreshed {
            top_scores,
            highest_score,
            score_stats,
        } => ScoreViewState {
            top_scores,
            highest_score,
            score_stats: Some(score_stats),
            error: None,
            is_loading: state.is_loading,
        },
        ScoreAction::ScoresCleared => ScoreViewState {
            top_scores: Vec::new(),
            highest_score: 0,
            score_stats: None,
            ..state.clone()
        },
    }
}

pub struct ScoreContext<B> {
    service: Arc<ScoreService<B>>,
    state: watch::Sender<ScoreViewState>,
}

impl<B: StorageBackend> ScoreContext<B> {
    pub fn new(service: Arc<ScoreService<B>>) -> Self {
        let (state, _) = watch::channel(ScoreViewState::default());
        Self { service, state }
    }

    pub fn service(&self) -> &Arc<ScoreService<B>> {
        &self.service
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ScoreViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ScoreViewState {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: ScoreAction) {
        self.state.send_modify(|state| {
            let next = reduce(state, action);
            *state = next;
        });
    }

    /// First load when presentation mounts
    pub async fn load_initial(&self) {
        self.refresh(LOAD_FAILED).await;
    }

    /// Re-read board, best and stats
    pub async fn refresh_scores(&self) {
        self.refresh(REFRESH_FAILED).await;
    }

    /// Drop the store cache, then refresh from storage
    pub async fn force_refresh(&self) {
        self.service.clear_cache();
        self.refresh(REFRESH_FAILED).await;
    }

    /// The three reads run concurrently; the view updates once, after all
    /// of them finish
    async fn refresh(&self, failure: &str) -> bool {
        self.dispatch(ScoreAction::SetLoading(true));

        let (top_scores, highest_score, score_stats) = tokio::join!(
            self.service.top_scores(MAX_TOP_SCORES),
            self.service.highest_score(),
            self.service.score_stats(),
        );

        match score_stats {
            Ok(score_stats) => {
                self.dispatch(ScoreAction::Refreshed {
                    top_scores,
                    highest_score,
                    score_stats,
                });
                self.dispatch(ScoreAction::SetLoading(false));
                true
            }
            Err(e) => {
                log::error!("{}: {}", failure, e);
                self.dispatch(ScoreAction::SetError(failure.to_string()));
                false
            }
        }
    }

    /// Save a finished run and refresh. Returns whether it is a new high
    /// score; failures land in the error slot and return `false`.
    pub async fn submit_score(&self, value: u64) -> bool {
        self.dispatch(ScoreAction::SetLoading(true));

        match self.service.submit_score(value).await {
            Ok(is_new_high_score) => {
                self.refresh(REFRESH_FAILED).await;
                self.dispatch(ScoreAction::SetLoading(false));
                is_new_high_score
            }
            Err(e) => {
                log::error!("{}: {}", SAVE_FAILED, e);
                self.dispatch(ScoreAction::SetError(SAVE_FAILED.to_string()));
                false
            }
        }
    }

    /// React to a simulation event
    pub async fn handle_event(&self, event: GameEvent) -> bool {
        match event {
            GameEvent::RunEnded { score } => self.submit_score(score).await,
        }
    }

    pub async fn clear_scores(&self) {
        self.dispatch(ScoreAction::SetLoading(true));

        match self.service.clear_all_scores().await {
            Ok(()) => {
                self.dispatch(ScoreAction::ScoresCleared);
                self.dispatch(ScoreAction::SetLoading(false));
            }
            Err(e) => {
                log::error!("{}: {}", CLEAR_FAILED, e);
                self.dispatch(ScoreAction::SetError(CLEAR_FAILED.to_string()));
            }
        }
    }

    /// Target for the running score, from the board currently in view.
    /// Same policy as `ScoreService::next_target_score`.
    pub fn next_target_score(&self, current: u64) -> u64 {
        let top_scores = self.state.borrow().top_scores.clone();
        Leaderboard::from_entries(top_scores).next_target(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::CACHE_TTL_MILLIS;
    use crate::persistence::ScoreStore;
    use crate::platform::{ManualClock, MemoryBackend};

    fn test_context() -> (ScoreContext<Arc<MemoryBackend>>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let store = ScoreStore::new(backend.clone(), clock.clone(), CACHE_TTL_MILLIS);
        let service = Arc::new(ScoreService::new(store, clock));
        (ScoreContext::new(service), backend)
    }

    fn values(state: &ScoreViewState) -> Vec<u64> {
        state.top_scores.iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_reduce_error_ends_loading() {
        let loading = reduce(&ScoreViewState::default(), ScoreAction::SetLoading(true));
        assert!(loading.is_loading);

        let failed = reduce(&loading, ScoreAction::SetError("boom".to_string()));
        assert!(!failed.is_loading);
        assert_eq!(failed.error.as_deref(), Some("boom"));

        // Last error wins
        let again = reduce(&failed, ScoreAction::SetError("again".to_string()));
        assert_eq!(again.error.as_deref(), Some("again"));
    }

    #[test]
    fn test_reduce_refresh_and_clear() {
        let state = ScoreViewState {
            error: Some("old".to_string()),
            is_loading: true,
            ..ScoreViewState::default()
        };
        let refreshed = reduce(
            &state,
            ScoreAction::Refreshed {
                top_scores: vec![Score::new(8, 0)],
                highest_score: 8,
                score_stats: ScoreStats::default(),
            },
        );
        assert_eq!(refreshed.highest_score, 8);
        assert!(refreshed.error.is_none());
        assert!(refreshed.is_loading);

        let cleared = reduce(&refreshed, ScoreAction::ScoresCleared);
        assert!(cleared.top_scores.is_empty());
        assert_eq!(cleared.highest_score, 0);
        assert!(cleared.score_stats.is_none());
    }

    #[tokio::test]
    async fn test_load_initial_reads_saved_scores() {
        let (context, _backend) = test_context();
        context.service().submit_score(40).await.unwrap();
        assert!(context.snapshot().top_scores.is_empty());

        context.load_initial().await;
        let state = context.snapshot();
        assert_eq!(values(&state), vec![40]);
        assert_eq!(state.highest_score, 40);
        assert_eq!(state.score_stats.map(|s| s.total_games), Some(1));
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_submit_refreshes_view() {
        let (context, _backend) = test_context();
        let mut rx = context.subscribe();

        assert!(context.submit_score(50).await);
        assert!(!context.submit_score(30).await);
        assert!(rx.has_changed().unwrap());

        let state = rx.borrow_and_update().clone();
        assert_eq!(values(&state), vec![50, 30]);
        assert_eq!(state.highest_score, 50);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_submit_failure_sets_error() {
        let (context, backend) = test_context();
        backend.set_fail_writes(true);

        assert!(!context.submit_score(50).await);
        let state = context.snapshot();
        assert_eq!(state.error.as_deref(), Some(SAVE_FAILED));
        assert!(!state.is_loading);
        assert!(state.top_scores.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_failure_sets_error() {
        let (context, backend) = test_context();
        context.submit_score(5).await;
        backend.set_fail_writes(true);

        context.refresh_scores().await;
        let state = context.snapshot();
        assert_eq!(state.error.as_deref(), Some(REFRESH_FAILED));
        assert!(!state.is_loading);
        // Previous view is kept
        assert_eq!(values(&state), vec![5]);
    }

    #[tokio::test]
    async fn test_clear_scores() {
        let (context, _backend) = test_context();
        context.submit_score(5).await;
        context.submit_score(6).await;

        context.clear_scores().await;
        let state = context.snapshot();
        assert!(state.top_scores.is_empty());
        assert_eq!(state.highest_score, 0);
        assert!(context.service().top_scores(MAX_TOP_SCORES).await.is_empty());
        assert_eq!(context.service().highest_score().await, 0);
    }

    #[tokio::test]
    async fn test_clear_failure_sets_error() {
        let (context, backend) = test_context();
        context.submit_score(5).await;
        backend.fail_remove_of(crate::persistence::keys::HIGHEST_SCORE);

        context.clear_scores().await;
        assert_eq!(context.snapshot().error.as_deref(), Some(CLEAR_FAILED));
    }

    #[tokio::test]
    async fn test_force_refresh_sees_external_changes() {
        let (context, backend) = test_context();
        context.submit_score(5).await;

        let replaced = vec![Score::new(77, 2)];
        backend.insert_raw(
            crate::persistence::keys::TOP_SCORES,
            &serde_json::to_string(&replaced).unwrap(),
        );

        // Cached board still served
        context.refresh_scores().await;
        assert_eq!(values(&context.snapshot()), vec![5]);

        context.force_refresh().await;
        assert_eq!(values(&context.snapshot()), vec![77]);
    }

    #[tokio::test]
    async fn test_next_target_matches_service() {
        let (context, _backend) = test_context();
        assert_eq!(context.next_target_score(7), 107);

        for value in [90, 70, 60, 50, 30] {
            context.submit_score(value).await;
        }
        for current in [0, 55, 95] {
            assert_eq!(
                context.next_target_score(current),
                context.service().next_target_score(current).await
            );
        }
        assert_eq!(context.next_target_score(55), 60);
    }

    #[tokio::test]
    async fn test_run_ended_event_is_submitted() {
        let (context, _backend) = test_context();
        assert!(context.handle_event(GameEvent::RunEnded { score: 12 }).await);
        assert!(!context.handle_event(GameEvent::RunEnded { score: 0 }).await);
        assert_eq!(values(&context.snapshot()), vec![12]);
    }

    #[tokio::test]
    async fn test_cold_refresh_during_submission_keeps_every_score() {
        let (context, backend) = test_context();
        let context = Arc::new(context);
        context.submit_score(10).await;
        context.service().clear_cache();
        backend.stall_next_read(std::time::Duration::from_millis(50));

        let refresh = {
            let context = context.clone();
            tokio::spawn(async move { context.refresh_scores().await })
        };
        tokio::task::yield_now().await;
        assert!(context.submit_score(100).await);
        refresh.await.unwrap();
        assert!(!context.submit_score(50).await);

        let state = context.snapshot();
        assert_eq!(values(&state), vec![100, 50, 10]);
        assert_eq!(state.highest_score, 100);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_submissions() {
        let (context, _backend) = test_context();
        let context = Arc::new(context);

        let handles: Vec<_> = [50, 30, 90, 10, 70, 60]
            .into_iter()
            .map(|value| {
                let context = context.clone();
                tokio::spawn(async move { context.submit_score(value).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        context.refresh_scores().await;
        assert_eq!(values(&context.snapshot()), vec![90, 70, 60, 50, 30]);
        assert_eq!(context.snapshot().highest_score, 90);
    }
}
