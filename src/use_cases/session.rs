// One client session: owns the simulated world and everything the loop drives.

use crate::domain::camera::Camera;
use crate::domain::character::character_animations;
use crate::domain::chat::ChatOutcome;
use crate::domain::ports::{Clock, EntityPatch, RemoteStore, Renderer, SnapshotSource, StoreRequest};
use crate::domain::systems::movement::{self, MoveIntent, MovementConfig};
use crate::domain::tuning::Tuning;
use crate::domain::view::{EntityView, RenderView};
use crate::domain::{
    ChangeEvent, CoreError, EntitySnapshot, Facing, Lobby, MessageSnapshot, Role, SimEntity, Status, Vec2,
};
use crate::use_cases::match_machine::MatchStateMachine;
use crate::use_cases::reconciler::{EntityReconciler, UpsertOutcome};
use crate::use_cases::sim_loop::Simulation;
use crate::use_cases::types::{LocalInput, SessionEvent};
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

// Locally-owned fields last pushed to the store.
#[derive(Debug, Clone, PartialEq)]
struct SyncedState {
    position: Vec2,
    facing: Facing,
    command_animation: Option<String>,
    is_typing: bool,
}

impl SyncedState {
    fn of(e: &SimEntity) -> Self {
        Self {
            position: e.position,
            facing: e.facing,
            command_animation: e.command_animation.clone(),
            is_typing: e.chat.is_composing(),
        }
    }
}

pub struct Session {
    session_id: String,
    tuning: Tuning,
    entities: EntityReconciler,
    machine: MatchStateMachine,
    camera: Camera,
    store: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
    renderer: Box<dyn Renderer>,
    rng: StdRng,
    intent: MoveIntent,
    since_sync: Duration,
    last_sync: Option<SyncedState>,
}

impl Session {
    pub fn new(
        session_id: impl Into<String>,
        tuning: Tuning,
        viewport: Vec2,
        store: Arc<dyn RemoteStore>,
        clock: Arc<dyn Clock>,
        renderer: Box<dyn Renderer>,
        rng: StdRng,
    ) -> Self {
        let session_id = session_id.into();
        Self {
            entities: EntityReconciler::new(session_id.clone(), character_animations(), tuning.player),
            machine: MatchStateMachine::new(tuning.match_rules, tuning.world),
            camera: Camera::new(viewport, tuning.world.world_size),
            session_id,
            tuning,
            store,
            clock,
            renderer,
            rng,
            intent: MoveIntent::default(),
            since_sync: Duration::ZERO,
            last_sync: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn entities(&self) -> &EntityReconciler {
        &self.entities
    }

    pub fn machine(&self) -> &MatchStateMachine {
        &self.machine
    }

    /// Resets the own row to a fresh commons spawn.
    pub fn bootstrap(&mut self) {
        let spawn = self.tuning.world.commons_spawn.into();
        info!(session_id = %self.session_id, "resetting own entity to the commons");
        self.store.submit(StoreRequest::UpdateOwnEntity(EntityPatch {
            position: Some(spawn),
            facing: Some(Facing::Right),
            role: Some(Role::Normal),
            status: Some(Status::Alive),
            lobby: Some(Lobby::Commons),
            command_animation: Some(None),
            is_typing: Some(false),
        }));
    }

    /// Initial snapshot read. Guarantees the local entity exists afterwards.
    pub async fn load(&mut self, source: &dyn SnapshotSource) -> Result<(), CoreError> {
        let now = self.clock.now_epoch_millis();

        let rows = source.list_entities().await?;
        let count = rows.len();
        for row in rows {
            let row = if row.id == self.session_id {
                // The row may predate the bootstrap reset; keep only the name.
                EntitySnapshot {
                    display_name: row.display_name,
                    ..self.fresh_local_snapshot()
                }
            } else {
                row
            };
            self.apply_entity(row, now)?;
        }
        self.entities.ensure_local(self.fresh_local_snapshot(), now)?;
        self.last_sync = self.entities.local().map(SyncedState::of);

        if let Some(record) = source.read_match().await? {
            self.machine.apply_snapshot(&record);
        }
        info!(entities = count, "initial snapshot loaded");
        Ok(())
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> Result<(), CoreError> {
        match event {
            SessionEvent::Change(change) => self.apply_change(change),
            SessionEvent::Input(input) => self.handle_input(input),
            SessionEvent::RequestFailed { request, error } => {
                warn!(request = request.name(), error = %error, "store request failed");
                self.machine.on_request_failed(&request, &mut self.entities);
                Ok(())
            }
        }
    }

    pub fn handle_input(&mut self, input: LocalInput) -> Result<(), CoreError> {
        if let LocalInput::Move(intent) = input {
            self.intent = intent;
            return Ok(());
        }
        if input == LocalInput::ReturnToLobby {
            if !self.machine.request_return_to_lobby(self.store.as_ref()) {
                debug!("return requested without a result; ignored");
            }
            return Ok(());
        }

        let local = self
            .entities
            .local_mut()
            .ok_or_else(|| CoreError::LocalEntityMissing(self.session_id.clone()))?;
        match input {
            LocalInput::ChatStart => local.chat.start_composing(),
            LocalInput::ChatKey(c) => {
                local.chat.append_char(c);
            }
            LocalInput::ChatBackspace => {
                local.chat.backspace();
            }
            LocalInput::ChatCommit => match local.chat.commit() {
                ChatOutcome::Nothing => {}
                ChatOutcome::Send(text) => {
                    self.store.submit(StoreRequest::SendChat { text });
                }
                ChatOutcome::Emote(emote) => {
                    if !local.begin_emote(emote) {
                        debug!(emote, "emote not applicable now");
                    }
                }
            },
            LocalInput::Move(_) | LocalInput::ReturnToLobby => {}
        }
        Ok(())
    }

    /// One fixed simulation step.
    pub fn update(&mut self, dt: Duration) -> Result<(), CoreError> {
        let now = self.clock.now_epoch_millis();
        let store = Arc::clone(&self.store);

        let local_moving = self.step_local(now, dt);
        self.entities.interpolate_remotes();

        let epsilon = self.tuning.player.moving_epsilon;
        let mut animation_error = None;
        for e in self.entities.iter_mut() {
            let moving = if e.is_local {
                local_moving
            } else {
                e.position.distance(e.target_position) > epsilon
            };
            if let Err(err) = e.step_animation(dt, moving) {
                animation_error.get_or_insert(err);
            }
            e.chat.update(dt);
        }

        if !self.entities.sweep_stale(now).is_empty() {
            self.machine.check_disconnect_win(&self.entities, store.as_ref());
        }

        match self.entities.local().map(|e| e.lobby) {
            Some(Lobby::Commons) => self.machine.tick_commons(dt, &self.entities, store.as_ref()),
            Some(Lobby::Dungeon) => self.machine.tick_dungeon(now, &mut self.entities, store.as_ref()),
            None => {}
        }
        self.machine.tick_auto_return(dt, store.as_ref());

        self.sync_local(dt);

        match animation_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    pub fn render_view(&self) -> RenderView {
        let now = self.clock.now_epoch_millis();
        let local = self.entities.local();
        let lobby = local.map(|e| e.lobby).unwrap_or_default();

        RenderView {
            lobby,
            camera_offset: local.map(|e| self.camera.follow(e.position)).unwrap_or_default(),
            entities: self
                .entities
                .iter()
                .filter(|e| e.lobby == lobby)
                .map(EntityView::from)
                .collect(),
            summary: self.machine.summary(now, local),
        }
    }

    pub fn render(&mut self) {
        let view = self.render_view();
        self.renderer.render(&view);
    }

    fn apply_change(&mut self, change: ChangeEvent) -> Result<(), CoreError> {
        match change {
            ChangeEvent::EntityUpserted(snapshot) => {
                let now = self.clock.now_epoch_millis();
                self.apply_entity(snapshot, now)
            }
            ChangeEvent::EntityRemoved { id } => {
                if self.entities.remove(&id).is_some() {
                    self.machine
                        .check_disconnect_win(&self.entities, self.store.as_ref());
                }
                Ok(())
            }
            ChangeEvent::MatchChanged(record) => {
                self.machine.apply_snapshot(&record);
                Ok(())
            }
            ChangeEvent::MessageInserted(message) => {
                self.show_message(message);
                Ok(())
            }
        }
    }

    fn apply_entity(&mut self, snapshot: EntitySnapshot, now: u64) -> Result<(), CoreError> {
        self.machine.on_entity_snapshot(&snapshot);
        let outcome = self.entities.upsert(snapshot, now)?;

        if let UpsertOutcome::LocalLobbyChanged { to, .. } = outcome {
            let local = self
                .entities
                .local_mut()
                .ok_or_else(|| CoreError::LocalEntityMissing(self.session_id.clone()))?;
            self.machine
                .on_local_lobby_changed(to, local, &mut self.rng, self.store.as_ref());
            // Either adopted from the store or pushed just now.
            self.last_sync = Some(SyncedState::of(local));
            self.since_sync = Duration::ZERO;
        }
        Ok(())
    }

    fn show_message(&mut self, message: MessageSnapshot) {
        let Some(sender) = self.entities.get_mut(&message.sender_id) else {
            debug!(sender_id = %message.sender_id, "message from unknown sender");
            return;
        };
        // Our own echo must not clobber a draft in progress.
        if sender.is_local && sender.chat.is_composing() {
            return;
        }
        sender.chat.set_remote_display(&message.text);
    }

    // Local prediction. Returns whether the local entity moved.
    fn step_local(&mut self, now: u64, dt: Duration) -> bool {
        let player = self.tuning.player;
        let world = self.tuning.world;
        let Some(local) = self.entities.local_mut() else {
            return false;
        };

        let intent = if self.machine.hunter_movement_locked(now, local) {
            MoveIntent::default()
        } else {
            self.intent
        };
        let speed = if local.is_hunter() && local.is_alive() {
            player.hunter_speed
        } else {
            player.survivor_speed
        };
        let cfg = MovementConfig {
            speed,
            min: world.edge_padding,
            max: (world.world_size - world.edge_padding).max(world.edge_padding),
        };
        movement::tick_entity(local, intent, dt.as_secs_f32(), cfg)
    }

    // Pushes locally-owned fields at most once per sync interval when they changed, and
    // re-sends them as a heartbeat when nothing has been pushed for a heartbeat interval.
    fn sync_local(&mut self, dt: Duration) {
        self.since_sync = self.since_sync.saturating_add(dt);
        if self.since_sync < self.tuning.player.sync_interval() {
            return;
        }
        let Some(local) = self.entities.local() else {
            return;
        };
        let current = SyncedState::of(local);
        let heartbeat_due = self.since_sync >= self.tuning.player.heartbeat_interval();
        if self.last_sync.as_ref() == Some(&current) && !heartbeat_due {
            return;
        }

        self.since_sync = Duration::ZERO;
        self.store.submit(StoreRequest::UpdateOwnEntity(EntityPatch {
            position: Some(current.position),
            facing: Some(current.facing),
            command_animation: Some(current.command_animation.clone()),
            is_typing: Some(current.is_typing),
            ..EntityPatch::default()
        }));
        self.last_sync = Some(current);
    }

    fn fresh_local_snapshot(&self) -> EntitySnapshot {
        EntitySnapshot::new(self.session_id.clone(), self.tuning.world.commons_spawn.into())
    }
}

impl Simulation for Session {
    fn update(&mut self, dt: Duration) -> Result<(), CoreError> {
        Session::update(self, dt)
    }

    fn render(&mut self) {
        Session::render(self);
    }
}
