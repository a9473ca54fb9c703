//! Backend adapter for the draw engine.
//!
//! [`HttpStore`] implements the engine's store seam over the event backend's
//! REST API, [`wire`] owns the JSON vocabulary translation, and
//! [`coalesce::PatchBuffer`] batches bursty writes.

pub mod coalesce;
pub mod store;
pub mod wire;

pub use store::HttpStore;

use thiserror::Error;

/// Error type for store operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("failed: {status}: {body}")]
    FailedWithBody {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{WirePerson, WirePersonPatch, WirePrize};
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::{get, patch, post},
        Json, Router,
    };
    use stagedraw_engine::mocks::{self, FixedClock, RecordingPresenter};
    use stagedraw_engine::{Continuation, DrawEngine, EngineConfig, Store};
    use stagedraw_types::{DrawPhase, PrizePatch};
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use tokio::time::{sleep, Duration};

    #[derive(Default)]
    struct Backend {
        participants: BTreeMap<u64, WirePerson>,
        prizes: BTreeMap<u64, WirePrize>,
        current: Option<u64>,
        prize_patch_bodies: Vec<serde_json::Value>,
    }

    type Shared = Arc<Mutex<Backend>>;

    async fn list_participants(State(state): State<Shared>) -> Json<Vec<WirePerson>> {
        Json(state.lock().unwrap().participants.values().cloned().collect())
    }

    async fn list_prizes(State(state): State<Shared>) -> Json<Vec<WirePrize>> {
        Json(state.lock().unwrap().prizes.values().cloned().collect())
    }

    async fn set_current(
        State(state): State<Shared>,
        Path(id): Path<u64>,
    ) -> std::result::Result<Json<WirePrize>, StatusCode> {
        let mut backend = state.lock().unwrap();
        let prize = backend
            .prizes
            .get(&id)
            .cloned()
            .ok_or(StatusCode::NOT_FOUND)?;
        backend.current = Some(id);
        Ok(Json(prize))
    }

    async fn update_prize(
        State(state): State<Shared>,
        Path(id): Path<u64>,
        Json(body): Json<serde_json::Value>,
    ) -> std::result::Result<Json<WirePrize>, StatusCode> {
        let mut backend = state.lock().unwrap();
        backend.prize_patch_bodies.push(body.clone());
        let prize = backend.prizes.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        if let Some(count) = body.get("is_used_count").and_then(|v| v.as_u64()) {
            prize.is_used_count = count as u32;
        }
        if let Some(used) = body.get("is_used").and_then(|v| v.as_bool()) {
            prize.is_used = used;
        }
        if let Some(list) = body.get("separate_count_list") {
            prize.separate_count_list =
                serde_json::from_value(list.clone()).map_err(|_| StatusCode::BAD_REQUEST)?;
        }
        Ok(Json(prize.clone()))
    }

    async fn update_participant(
        State(state): State<Shared>,
        Path(id): Path<u64>,
        Json(body): Json<WirePersonPatch>,
    ) -> std::result::Result<Json<WirePerson>, StatusCode> {
        let mut backend = state.lock().unwrap();
        let person = backend
            .participants
            .get_mut(&id)
            .ok_or(StatusCode::NOT_FOUND)?;
        if let Some(is_win) = body.is_win {
            person.is_win = is_win;
        }
        if let Some(names) = body.prize_name {
            person.prize_name = names;
        }
        if let Some(ids) = body.prize_id {
            person.prize_id = ids;
        }
        if let Some(times) = body.prize_time {
            person.prize_time = times;
        }
        Ok(Json(person.clone()))
    }

    struct TestContext {
        backend: Shared,
        base_url: String,
        server_handle: tokio::task::JoinHandle<()>,
    }

    impl TestContext {
        async fn new(participants: Vec<WirePerson>, prizes: Vec<WirePrize>) -> Self {
            let backend: Shared = Arc::new(Mutex::new(Backend {
                participants: participants.into_iter().map(|p| (p.id, p)).collect(),
                prizes: prizes.into_iter().map(|p| (p.id, p)).collect(),
                current: None,
                prize_patch_bodies: Vec::new(),
            }));
            let router = Router::new()
                .route("/api/participants", get(list_participants))
                .route("/api/participants/:id", patch(update_participant))
                .route("/api/prizes", get(list_prizes))
                .route("/api/prizes/:id", patch(update_prize))
                .route("/api/prizes/:id/current", post(set_current))
                .with_state(backend.clone());

            let addr = SocketAddr::from(([127, 0, 0, 1], 0));
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            let actual_addr = listener.local_addr().unwrap();
            let base_url = format!("http://{actual_addr}");

            let server_handle = tokio::spawn(async move {
                axum::serve(listener, router).await.unwrap();
            });

            // Give server time to start
            sleep(Duration::from_millis(100)).await;

            Self {
                backend,
                base_url,
                server_handle,
            }
        }

        fn seeded() -> (Vec<WirePerson>, Vec<WirePrize>) {
            let participants = mocks::roster(5).iter().map(WirePerson::from).collect();
            let prizes = vec![
                WirePrize::from(&mocks::prize(1, "First", 1, 2)),
                WirePrize::from(&mocks::prize(2, "Second", 2, 1)),
            ];
            (participants, prizes)
        }

        fn create_store(&self) -> HttpStore {
            HttpStore::new(&self.base_url).unwrap()
        }
    }

    impl Drop for TestContext {
        fn drop(&mut self) {
            self.server_handle.abort();
        }
    }

    #[tokio::test]
    async fn lists_translate_wire_records_to_domain() {
        let (participants, prizes) = TestContext::seeded();
        let ctx = TestContext::new(participants, prizes).await;
        let store = ctx.create_store();

        let participants = store.list_participants().await.unwrap();
        assert_eq!(participants.len(), 5);
        assert_eq!(participants[0].badge, "B001");
        assert!(!participants[0].has_won);

        let prizes = store.list_prizes().await.unwrap();
        assert_eq!(prizes.len(), 2);
        let first = prizes.iter().find(|p| p.id == 1).unwrap();
        assert_eq!(first.quota, 2);
        assert!(first.is_open());
    }

    #[tokio::test]
    async fn prize_patch_sends_only_set_fields() {
        let (participants, prizes) = TestContext::seeded();
        let ctx = TestContext::new(participants, prizes).await;
        let store = ctx.create_store();

        let updated = store
            .update_prize(
                1,
                PrizePatch {
                    consumed: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.consumed, 1);
        assert!(!updated.completed);

        let bodies = ctx.backend.lock().unwrap().prize_patch_bodies.clone();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0], serde_json::json!({ "is_used_count": 1 }));
    }

    #[tokio::test]
    async fn backend_errors_surface_with_status_and_body() {
        let ctx = TestContext::new(Vec::new(), Vec::new()).await;
        let store = ctx.create_store();

        let error = store
            .update_prize(99, PrizePatch::default())
            .await
            .expect_err("prize does not exist");
        match error {
            Error::FailedWithBody { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // The handlers above spell out `std::result::Result` because the crate's
    // `Result<T>` alias is fixed to `Error` and takes one parameter.
    #[test]
    fn crate_result_alias_defaults_to_the_client_error() {
        fn build(base: &str) -> Result<HttpStore> {
            HttpStore::new(base)
        }
        assert!(build("http://draw.example").is_ok());
        assert!(matches!(
            build("ftp://draw.example"),
            Err(Error::InvalidScheme(_))
        ));
    }

    #[test]
    fn non_http_schemes_are_rejected() {
        let error = HttpStore::new("ftp://draw.example").expect_err("bad scheme");
        assert!(matches!(error, Error::InvalidScheme(scheme) if scheme == "ftp"));
    }

    #[tokio::test]
    async fn full_draw_cycle_runs_over_http() {
        let (participants, prizes) = TestContext::seeded();
        let ctx = TestContext::new(participants, prizes).await;

        let mut engine = DrawEngine::new(
            ctx.create_store(),
            RecordingPresenter::default(),
            FixedClock::at(7_000),
            EngineConfig {
                row_width: 3,
                ..EngineConfig::default()
            },
        )
        .unwrap();
        engine.load().await.unwrap();
        assert_eq!(ctx.backend.lock().unwrap().current, Some(1));

        engine.arm().await.unwrap();
        engine.start().await.unwrap();
        engine.stop().await.unwrap();
        let winner_ids: Vec<u64> = engine.pending_winners().iter().map(|w| w.id).collect();
        assert_eq!(winner_ids.len(), 2);

        let outcome = match engine.continue_draw().await.unwrap() {
            Continuation::Committed(outcome) => outcome,
            Continuation::Ignored => panic!("commit was ignored"),
        };
        assert!(outcome.prize_completed);
        assert_eq!(outcome.next_prize, Some(2));
        assert_eq!(engine.phase(), DrawPhase::Armed);

        let backend = ctx.backend.lock().unwrap();
        assert_eq!(backend.current, Some(2));
        assert_eq!(backend.prizes[&1].is_used_count, 2);
        assert!(backend.prizes[&1].is_used);
        for id in winner_ids {
            let person = &backend.participants[&id];
            assert!(person.is_win);
            assert_eq!(person.prize_id, vec![1]);
            assert_eq!(person.prize_time, vec![7_000]);
        }
    }
}
