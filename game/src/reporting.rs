//! Fire-and-forget score submission and leaderboard refresh after a game
//! ends. Results come back over a channel tagged with the session id so a
//! host that already restarted can drop them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{LeaderboardEntry, LeaderboardService, PersonalBest, ScoreService, SubmitOutcome};
use crate::session::FinalScore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaderboardPanel {
    Loading,
    Ready {
        top: Vec<LeaderboardEntry>,
        /// `None` when signed out.
        own: Option<PersonalBest>,
    },
    Unavailable,
}

impl LeaderboardPanel {
    /// Index into `top` of the signed-in player's row, matched by nickname.
    pub fn own_row(&self) -> Option<usize> {
        let LeaderboardPanel::Ready { top, own: Some(own) } = self else {
            return None;
        };
        top.iter()
            .position(|entry| !own.nickname.is_empty() && entry.nickname == own.nickname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUpdate {
    pub session_id: u64,
    /// `None` when signed out or when submission failed.
    pub submitted: Option<SubmitOutcome>,
    pub panel: LeaderboardPanel,
}

pub async fn load_leaderboard<L: LeaderboardService>(service: &L, limit: u32) -> LeaderboardPanel {
    let top = match service.fetch_top(limit).await {
        Ok(top) => top,
        Err(err) => {
            eprintln!("[report] leaderboard fetch failed: {err}");
            return LeaderboardPanel::Unavailable;
        }
    };
    let own = match service.fetch_own_best().await {
        Ok(own) => own,
        Err(err) => {
            eprintln!("[report] personal best fetch failed: {err}");
            None
        }
    };
    LeaderboardPanel::Ready { top, own }
}

pub struct GameOverReporter<S> {
    service: Arc<S>,
    limit: u32,
    tx: mpsc::UnboundedSender<ReportUpdate>,
}

impl<S> GameOverReporter<S>
where
    S: ScoreService + LeaderboardService + 'static,
{
    pub fn new(service: Arc<S>, limit: u32) -> (Self, mpsc::UnboundedReceiver<ReportUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { service, limit, tx }, rx)
    }

    /// Submits `score`, then refreshes the leaderboard. Must be called from
    /// within a tokio runtime.
    pub fn report(&self, session_id: u64, score: FinalScore) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let limit = self.limit;
        tokio::spawn(async move {
            let submitted = match service.submit(score).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    eprintln!("[report] score submission failed: {err}");
                    None
                }
            };
            let panel = load_leaderboard(service.as_ref(), limit).await;
            let update = ReportUpdate {
                session_id,
                submitted,
                panel,
            };
            if tx.send(update).is_err() {
                eprintln!("[report] receiver dropped before session {session_id} report");
            }
        })
    }

    /// Leaderboard refresh without a submission (e.g. on startup).
    pub fn refresh(&self, session_id: u64) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let limit = self.limit;
        tokio::spawn(async move {
            let panel = load_leaderboard(service.as_ref(), limit).await;
            let _ = tx.send(ReportUpdate {
                session_id,
                submitted: None,
                panel,
            });
        })
    }
}

/// Drops updates that belong to an earlier session.
pub fn accept_update(update: ReportUpdate, current_session: u64) -> Option<ReportUpdate> {
    (update.session_id == current_session).then_some(update)
}
