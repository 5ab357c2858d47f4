// Shared fakes for driving a session without a store, feed or renderer.
#![allow(dead_code)]

use async_trait::async_trait;
use dungeon_chase::domain::ports::{Clock, RemoteStore, Renderer, SnapshotSource, StoreRequest};
use dungeon_chase::domain::tuning::Tuning;
use dungeon_chase::domain::view::RenderView;
use dungeon_chase::domain::{
    ChangeEvent, EntitySnapshot, Lobby, MatchSnapshot, Role, Status, StoreError, Vec2,
};
use dungeon_chase::use_cases::{Session, SessionEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub const T0: u64 = 1_700_000_000_000;

// Records every submitted request in order.
#[derive(Default)]
pub struct RecordingStore {
    requests: Mutex<Vec<StoreRequest>>,
}

impl RecordingStore {
    pub fn take(&self) -> Vec<StoreRequest> {
        std::mem::take(&mut *self.requests.lock().expect("store lock"))
    }

    /// Drained requests without the own-row updates that movement produces.
    pub fn take_match_requests(&self) -> Vec<StoreRequest> {
        self.take()
            .into_iter()
            .filter(|r| !matches!(r, StoreRequest::UpdateOwnEntity(_)))
            .collect()
    }
}

impl RemoteStore for RecordingStore {
    fn submit(&self, request: StoreRequest) {
        self.requests.lock().expect("store lock").push(request);
    }
}

// Wall clock under test control.
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self(AtomicU64::new(now))
    }

    pub fn set(&self, now: u64) {
        self.0.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// Keeps the last view and a frame count.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    pub last: Arc<Mutex<Option<RenderView>>>,
    pub frames: Arc<AtomicU64>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, view: &RenderView) {
        self.frames.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("renderer lock") = Some(view.clone());
    }
}

pub struct FakeSource {
    pub entities: Vec<EntitySnapshot>,
    pub record: Option<MatchSnapshot>,
}

#[async_trait]
impl SnapshotSource for FakeSource {
    async fn list_entities(&self) -> Result<Vec<EntitySnapshot>, StoreError> {
        Ok(self.entities.clone())
    }

    async fn read_match(&self) -> Result<Option<MatchSnapshot>, StoreError> {
        Ok(self.record.clone())
    }
}

pub struct Harness {
    pub session: Session,
    pub store: Arc<RecordingStore>,
    pub clock: Arc<ManualClock>,
    pub renderer: RecordingRenderer,
}

pub fn harness(session_id: &str) -> Harness {
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(ManualClock::new(T0));
    let renderer = RecordingRenderer::default();
    let session = Session::new(
        session_id,
        Tuning::default(),
        Vec2::new(1280.0, 720.0),
        store.clone(),
        clock.clone(),
        Box::new(renderer.clone()),
        StdRng::seed_from_u64(42),
    );
    Harness {
        session,
        store,
        clock,
        renderer,
    }
}

pub fn row(id: &str, x: f32, y: f32) -> EntitySnapshot {
    EntitySnapshot {
        display_name: Some(id.to_uppercase()),
        ..EntitySnapshot::new(id, Vec2::new(x, y))
    }
}

pub fn dungeon_row(id: &str, x: f32, y: f32, role: Role, status: Status) -> EntitySnapshot {
    EntitySnapshot {
        lobby: Lobby::Dungeon,
        role,
        status,
        ..row(id, x, y)
    }
}

pub fn upserted(snapshot: EntitySnapshot) -> SessionEvent {
    SessionEvent::Change(ChangeEvent::EntityUpserted(snapshot))
}

pub fn match_changed(record: MatchSnapshot) -> SessionEvent {
    SessionEvent::Change(ChangeEvent::MatchChanged(record))
}
