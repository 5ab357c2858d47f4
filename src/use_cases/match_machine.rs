// Portal queue, dungeon hunt and results flow for the local client.
//
// The store is authoritative for the match record. Everything here either mirrors it or
// decides when this client should ask the store to change it.

use crate::domain::ports::{EntityPatch, RemoteStore, StoreRequest};
use crate::domain::tuning::{MatchTuning, WorldTuning};
use crate::domain::view::MatchSummary;
use crate::domain::{EntitySnapshot, Lobby, MatchSnapshot, MatchState, Role, SimEntity, Status, Vec2, Winner};
use crate::use_cases::reconciler::EntityReconciler;
use rand::Rng;
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct MatchStateMachine {
    tuning: MatchTuning,
    world: WorldTuning,
    state: MatchState,
    // Victims with a tag in flight; a victim is never tagged twice.
    pending_tags: BTreeSet<String>,
    // At most one win request per match.
    win_requested: bool,
    // Remaining time before the automatic return fires.
    auto_return: Option<Duration>,
    // At most one return request per observed winner.
    return_requested: bool,
    exit_requested: bool,
}

impl MatchStateMachine {
    pub fn new(tuning: MatchTuning, world: WorldTuning) -> Self {
        Self {
            state: MatchState::new(tuning.countdown()),
            tuning,
            world,
            pending_tags: BTreeSet::new(),
            win_requested: false,
            auto_return: None,
            return_requested: false,
            exit_requested: false,
        }
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    pub fn is_tag_pending(&self, victim_id: &str) -> bool {
        self.pending_tags.contains(victim_id)
    }

    pub fn win_requested(&self) -> bool {
        self.win_requested
    }

    pub fn auto_return_remaining(&self) -> Option<Duration> {
        self.auto_return
    }

    /// Mirrors an authoritative match record.
    pub fn apply_snapshot(&mut self, snapshot: &MatchSnapshot) {
        let previous_winner = self.state.winner;
        let previous_start = self.state.match_start_time;

        self.state.is_active = snapshot.is_active;
        self.state.match_start_time = snapshot.match_start_time;
        self.state.match_end_time = snapshot
            .match_start_time
            .map(|start| start.saturating_add(self.tuning.match_duration_ms));
        self.state.winner = snapshot.winner;

        // Any match record answers an in-flight start request.
        self.state.is_starting = false;
        if snapshot.is_active {
            self.state.countdown_remaining = self.tuning.countdown();
        }

        let new_match =
            snapshot.match_start_time.is_some() && snapshot.match_start_time != previous_start;
        let reset = !snapshot.is_active && snapshot.winner.is_none();
        if new_match || reset {
            self.win_requested = false;
            self.pending_tags.clear();
        }

        match (previous_winner, snapshot.winner) {
            (None, Some(winner)) => {
                info!(?winner, delay_ms = self.tuning.auto_return_ms, "match resolved; auto-return armed");
                self.auto_return = Some(self.tuning.auto_return());
                self.return_requested = false;
            }
            (Some(_), None) => {
                if self.auto_return.take().is_some() {
                    info!("winner cleared; auto-return cancelled");
                }
                self.return_requested = false;
            }
            _ => {}
        }
    }

    /// Bookkeeping for an entity row; confirmed eliminations settle pending tags.
    pub fn on_entity_snapshot(&mut self, snapshot: &EntitySnapshot) {
        if snapshot.status == Status::Eliminated && self.pending_tags.remove(&snapshot.id) {
            debug!(victim_id = %snapshot.id, "tag confirmed");
        }
    }

    /// Side effects of the local entity switching lobbies.
    pub fn on_local_lobby_changed(
        &mut self,
        to: Lobby,
        local: &mut SimEntity,
        rng: &mut impl Rng,
        store: &dyn RemoteStore,
    ) {
        self.state.reset_countdown(self.tuning.countdown());
        self.win_requested = false;
        self.exit_requested = false;

        if to != Lobby::Dungeon {
            return;
        }

        let spawn = if local.is_hunter() {
            self.world.center()
        } else {
            let min = self.world.spawn_padding;
            let max = (self.world.world_size - self.world.spawn_padding).max(min);
            Vec2::new(rng.gen_range(min..=max), rng.gen_range(min..=max))
        };
        local.position = spawn;
        local.target_position = spawn;
        info!(x = spawn.x, y = spawn.y, hunter = local.is_hunter(), "entered dungeon");

        store.submit(StoreRequest::UpdateOwnEntity(EntityPatch {
            position: Some(spawn),
            ..EntityPatch::default()
        }));
    }

    /// Portal queue tick; runs while the local player is in the commons.
    pub fn tick_commons(&mut self, dt: Duration, entities: &EntityReconciler, store: &dyn RemoteStore) {
        let portal = self.world.portal;
        // Id order comes from the reconciler's map.
        let occupants: Vec<&str> = entities
            .iter()
            .filter(|e| e.lobby == Lobby::Commons && portal.contains(e.position))
            .map(|e| e.id.as_str())
            .collect();
        self.state.portal_population = occupants.len();

        if occupants.len() < self.tuning.quorum {
            self.state.reset_countdown(self.tuning.countdown());
            return;
        }
        if self.state.is_starting {
            return;
        }

        self.state.countdown_remaining = self.state.countdown_remaining.saturating_sub(dt);
        if !self.state.countdown_remaining.is_zero() {
            return;
        }

        self.state.is_starting = true;
        self.state.countdown_remaining = self.tuning.countdown();

        let Some(host) = occupants.first() else {
            return;
        };
        if *host != entities.session_id() {
            debug!(host = %host, "countdown finished; another client starts the match");
            return;
        }

        let participant_ids: Vec<String> = occupants.iter().map(|id| id.to_string()).collect();
        info!(participants = participant_ids.len(), "countdown finished; starting match");
        store.submit(StoreRequest::StartMatch { participant_ids });
    }

    /// Dungeon tick: match timer, tag adjudication, elimination win check and the exit region.
    pub fn tick_dungeon(&mut self, now_ms: u64, entities: &mut EntityReconciler, store: &dyn RemoteStore) {
        if !self.state.is_active || self.state.winner.is_some() {
            return;
        }
        let Some(local) = entities.local() else {
            return;
        };
        if local.lobby != Lobby::Dungeon {
            return;
        }
        let local_hunter = local.is_hunter();
        let local_alive = local.is_alive();
        let local_position = local.position;

        if self.state.has_expired(now_ms) && local_hunter {
            self.request_win(Winner::Survivors, store);
        }

        if self.exit_region_entered(local_position) {
            self.leave_dungeon(store);
            return;
        }

        if self.state.in_headstart(now_ms, self.tuning.headstart()) {
            return;
        }

        if local_hunter && local_alive {
            self.adjudicate_tags(local_position, entities, store);
        }

        if let Some(winner) = evaluate_win(entities) {
            debug!(?winner, "elimination check decided the match");
            self.request_win(winner, store);
        }
    }

    /// Win check after an entity disappears from the world.
    pub fn check_disconnect_win(&mut self, entities: &EntityReconciler, store: &dyn RemoteStore) {
        if !self.state.is_active || self.state.winner.is_some() || self.win_requested {
            return;
        }
        if let Some(winner) = evaluate_win(entities) {
            info!(?winner, "departure decided the match");
            self.request_win(winner, store);
        }
    }

    pub fn tick_auto_return(&mut self, dt: Duration, store: &dyn RemoteStore) {
        let Some(remaining) = self.auto_return else {
            return;
        };
        let remaining = remaining.saturating_sub(dt);
        if !remaining.is_zero() {
            self.auto_return = Some(remaining);
            return;
        }
        self.auto_return = None;
        self.issue_return(store);
    }

    /// Manual "return now". Only meaningful once a winner is known.
    pub fn request_return_to_lobby(&mut self, store: &dyn RemoteStore) -> bool {
        if self.state.winner.is_none() {
            return false;
        }
        self.auto_return = None;
        self.issue_return(store);
        true
    }

    /// Rolls back optimistic state for a rejected request.
    pub fn on_request_failed(&mut self, request: &StoreRequest, entities: &mut EntityReconciler) {
        match request {
            StoreRequest::StartMatch { .. } => {
                self.state.is_starting = false;
            }
            StoreRequest::Tag { victim_id } => {
                self.pending_tags.remove(victim_id);
                if let Some(victim) = entities.get_mut(victim_id) {
                    if victim.status == Status::Eliminated {
                        victim.status = Status::Alive;
                        info!(victim_id = %victim_id, "tag rejected; elimination rolled back");
                    }
                }
            }
            StoreRequest::UpdateOwnEntity(patch) if patch.lobby == Some(Lobby::Commons) => {
                self.exit_requested = false;
            }
            _ => {}
        }
    }

    /// Hunter is frozen during the opening headstart.
    pub fn hunter_movement_locked(&self, now_ms: u64, local: &SimEntity) -> bool {
        self.state.is_active
            && local.lobby == Lobby::Dungeon
            && local.is_hunter()
            && self.state.in_headstart(now_ms, self.tuning.headstart())
    }

    pub fn summary(&self, now_ms: u64, local: Option<&SimEntity>) -> MatchSummary {
        let countdown_ms = self.state.countdown_remaining.as_millis() as u64;
        MatchSummary {
            portal_population: self.state.portal_population,
            countdown_seconds: countdown_ms.div_ceil(1000),
            time_left: if self.state.is_active {
                self.state.time_left(now_ms)
            } else {
                None
            },
            is_active: self.state.is_active,
            in_headstart: self.state.is_active
                && self.state.in_headstart(now_ms, self.tuning.headstart()),
            winner: self.state.winner,
            local_eliminated: local.is_some_and(|e| e.lobby == Lobby::Dungeon && !e.is_alive()),
        }
    }

    fn adjudicate_tags(
        &mut self,
        hunter_position: Vec2,
        entities: &mut EntityReconciler,
        store: &dyn RemoteStore,
    ) {
        let radius = self.tuning.tag_radius;
        let victims: Vec<String> = entities
            .iter()
            .filter(|e| {
                !e.is_local
                    && e.lobby == Lobby::Dungeon
                    && e.role != Role::Hunter
                    && e.is_alive()
                    && e.position.distance(hunter_position) < radius
                    && !self.pending_tags.contains(&e.id)
            })
            .map(|e| e.id.clone())
            .collect();

        for victim_id in victims {
            if let Some(victim) = entities.get_mut(&victim_id) {
                victim.status = Status::Eliminated;
            }
            info!(victim_id = %victim_id, "tagged");
            self.pending_tags.insert(victim_id.clone());
            store.submit(StoreRequest::Tag { victim_id });
        }
    }

    fn exit_region_entered(&self, position: Vec2) -> bool {
        !self.exit_requested && self.world.exit.contains(position)
    }

    fn leave_dungeon(&mut self, store: &dyn RemoteStore) {
        self.exit_requested = true;
        info!("exit reached; leaving dungeon");
        store.submit(StoreRequest::UpdateOwnEntity(EntityPatch {
            position: Some(self.world.exit_destination.into()),
            role: Some(Role::Normal),
            status: Some(Status::Alive),
            lobby: Some(Lobby::Commons),
            ..EntityPatch::default()
        }));
    }

    fn request_win(&mut self, winner: Winner, store: &dyn RemoteStore) {
        if self.win_requested {
            return;
        }
        self.win_requested = true;
        info!(?winner, "requesting win");
        store.submit(StoreRequest::TriggerWin { winner });
    }

    fn issue_return(&mut self, store: &dyn RemoteStore) {
        if self.return_requested {
            warn!("return to lobby already requested for this result");
            return;
        }
        self.return_requested = true;
        info!("returning to lobby");
        store.submit(StoreRequest::ReturnToLobby);
    }
}

// Living hunters vs living survivors among dungeon entities.
fn evaluate_win(entities: &EntityReconciler) -> Option<Winner> {
    let (hunters, survivors) = entities
        .iter()
        .filter(|e| e.lobby == Lobby::Dungeon && e.is_alive())
        .fold((0usize, 0usize), |(h, s), e| {
            if e.is_hunter() { (h + 1, s) } else { (h, s + 1) }
        });

    match (hunters, survivors) {
        (0, s) if s > 0 => Some(Winner::Survivors),
        (h, 0) if h > 0 => Some(Winner::Hunter),
        _ => None,
    }
}
