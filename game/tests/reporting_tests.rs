use std::sync::{Arc, Mutex};
use std::time::Duration;

use tetris::api::{
    ApiError, LeaderboardEntry, LeaderboardService, PersonalBest, ScoreService, SubmitOutcome,
};
use tetris::reporting::{GameOverReporter, LeaderboardPanel, accept_update, load_leaderboard};
use tetris::session::FinalScore;

/// In-memory backend; `delay` holds submissions back to simulate a slow server.
#[derive(Default)]
struct FakeBackend {
    signed_in: bool,
    top_fails: bool,
    delay: Option<Duration>,
    submitted: Mutex<Vec<FinalScore>>,
}

fn entry(user_id: i64, nickname: &str, score: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        user_id,
        username: nickname.to_lowercase(),
        nickname: nickname.to_string(),
        score,
        lines: score / 100,
        level: 1,
    }
}

impl ScoreService for FakeBackend {
    async fn submit(&self, score: FinalScore) -> Result<Option<SubmitOutcome>, ApiError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.signed_in {
            return Ok(None);
        }
        self.submitted.lock().expect("submitted lock").push(score);
        Ok(Some(SubmitOutcome {
            is_new_high_score: true,
            rank: Some(2),
            current_high_score: None,
        }))
    }
}

impl LeaderboardService for FakeBackend {
    async fn fetch_top(&self, limit: u32) -> Result<Vec<LeaderboardEntry>, ApiError> {
        if self.top_fails {
            return Err(ApiError::Transport("connection refused".to_string()));
        }
        let mut top = vec![entry(1, "Ace", 9000), entry(2, "Kim", 4200), entry(3, "Lee", 100)];
        top.truncate(limit as usize);
        Ok(top)
    }

    async fn fetch_own_best(&self) -> Result<Option<PersonalBest>, ApiError> {
        if !self.signed_in {
            return Ok(None);
        }
        Ok(Some(PersonalBest {
            username: "kim".to_string(),
            nickname: "Kim".to_string(),
            high_score: 4200,
            has_record: true,
            rank: 2,
            lines: Some(42),
            level: Some(3),
        }))
    }
}

fn final_score(score: u32) -> FinalScore {
    FinalScore {
        score,
        lines: 12,
        level: 2,
    }
}

#[tokio::test]
async fn report_submits_then_refreshes_the_board() {
    let backend = Arc::new(FakeBackend {
        signed_in: true,
        ..FakeBackend::default()
    });
    let (reporter, mut updates) = GameOverReporter::new(Arc::clone(&backend), 10);

    reporter.report(4, final_score(4200)).await.expect("report task");
    let update = updates.recv().await.expect("update");

    assert_eq!(update.session_id, 4);
    assert_eq!(update.submitted.map(|o| o.rank), Some(Some(2)));
    assert_eq!(update.panel.own_row(), Some(1));
    assert_eq!(*backend.submitted.lock().expect("submitted lock"), vec![final_score(4200)]);
}

#[tokio::test]
async fn signed_out_report_shows_board_without_submitting() {
    let backend = Arc::new(FakeBackend::default());
    let (reporter, mut updates) = GameOverReporter::new(Arc::clone(&backend), 2);

    reporter.report(1, final_score(500)).await.expect("report task");
    let update = updates.recv().await.expect("update");

    assert_eq!(update.submitted, None);
    let LeaderboardPanel::Ready { top, own } = &update.panel else {
        panic!("expected a ready panel, got {:?}", update.panel);
    };
    assert_eq!(top.len(), 2);
    assert_eq!(*own, None);
    assert_eq!(update.panel.own_row(), None);
    assert!(backend.submitted.lock().expect("submitted lock").is_empty());
}

#[tokio::test]
async fn failed_board_fetch_marks_panel_unavailable() {
    let backend = FakeBackend {
        signed_in: true,
        top_fails: true,
        ..FakeBackend::default()
    };
    assert_eq!(load_leaderboard(&backend, 10).await, LeaderboardPanel::Unavailable);
}

#[tokio::test]
async fn late_report_for_previous_session_is_dropped() {
    let backend = Arc::new(FakeBackend {
        signed_in: true,
        delay: Some(Duration::from_millis(50)),
        ..FakeBackend::default()
    });
    let (reporter, mut updates) = GameOverReporter::new(backend, 10);

    let slow = reporter.report(1, final_score(300));
    // The player restarted while the first submission was in flight.
    let current_session = 2;
    let refresh = reporter.refresh(current_session);
    refresh.await.expect("refresh task");
    slow.await.expect("report task");

    let mut accepted = Vec::new();
    while let Ok(update) = updates.try_recv() {
        if let Some(update) = accept_update(update, current_session) {
            accepted.push(update);
        }
    }
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].session_id, 2);
    assert_eq!(accepted[0].submitted, None);
}
