// Snapshot ingestion: one place decides which fields the store may overwrite.

use crate::domain::animation::AnimationCatalog;
use crate::domain::tuning::PlayerTuning;
use crate::domain::snapshot::UNKNOWN_DISPLAY_NAME;
use crate::domain::{CoreError, EntitySnapshot, Lobby, SimEntity};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Position,
    TargetPosition,
    Facing,
    CommandAnimation,
    Typing,
    LastSeen,
    Role,
    Status,
    Lobby,
    DisplayName,
}

/// Who is allowed to write a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Only this process writes it (prediction or local presentation state).
    Local,
    /// Overwritten by every snapshot.
    Snapshot,
    /// Derived each tick by smoothing toward the snapshot value.
    Interpolated,
}

/// Field ownership rules for local vs remote entities.
pub fn authority(field: Field, is_local: bool) -> Authority {
    use Field::*;
    match (field, is_local) {
        (Position, true) => Authority::Local,
        (Position, false) => Authority::Interpolated,
        (TargetPosition | Facing | CommandAnimation | Typing | LastSeen, true) => Authority::Local,
        (TargetPosition | Facing | CommandAnimation | Typing | LastSeen, false) => {
            Authority::Snapshot
        }
        (Role | Status | Lobby | DisplayName, _) => Authority::Snapshot,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// The local entity moved between lobbies; transition side effects are due.
    LocalLobbyChanged { from: Lobby, to: Lobby },
}

pub struct EntityReconciler {
    session_id: String,
    catalog: AnimationCatalog,
    tuning: PlayerTuning,
    // Ordered by id so region scans come out sorted for host election.
    entities: BTreeMap<String, SimEntity>,
}

impl EntityReconciler {
    pub fn new(session_id: impl Into<String>, catalog: AnimationCatalog, tuning: PlayerTuning) -> Self {
        Self {
            session_id: session_id.into(),
            catalog,
            tuning,
            entities: BTreeMap::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn upsert(
        &mut self,
        snapshot: EntitySnapshot,
        now_ms: u64,
    ) -> Result<UpsertOutcome, CoreError> {
        let Some(entity) = self.entities.get_mut(&snapshot.id) else {
            let is_local = snapshot.id == self.session_id;
            let mut entity = SimEntity::new(
                snapshot.id.clone(),
                snapshot
                    .display_name
                    .clone()
                    .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string()),
                snapshot.position,
                is_local,
                self.catalog.clone(),
            )?;
            entity.facing = snapshot.facing;
            entity.role = snapshot.role;
            entity.status = snapshot.status;
            entity.lobby = snapshot.lobby;
            entity.last_seen = now_ms;
            if !is_local {
                entity.command_animation = snapshot.command_animation.clone();
                entity.chat.set_remote_composing(snapshot.is_typing);
            }
            debug!(entity_id = %snapshot.id, is_local, "entity created");
            self.entities.insert(snapshot.id, entity);
            return Ok(UpsertOutcome::Created);
        };

        let is_local = entity.is_local;
        let from_snapshot = |field: Field| authority(field, is_local) == Authority::Snapshot;

        if from_snapshot(Field::TargetPosition) {
            entity.target_position = snapshot.position;
        }
        if from_snapshot(Field::Facing) {
            entity.facing = snapshot.facing;
        }
        if from_snapshot(Field::CommandAnimation) {
            entity.command_animation = snapshot.command_animation;
        }
        if from_snapshot(Field::Typing) {
            entity.chat.set_remote_composing(snapshot.is_typing);
        }
        if from_snapshot(Field::LastSeen) {
            entity.last_seen = now_ms;
        }
        if from_snapshot(Field::Role) {
            entity.role = snapshot.role;
        }
        if from_snapshot(Field::Status) {
            entity.status = snapshot.status;
        }
        if from_snapshot(Field::DisplayName) {
            if let Some(name) = snapshot.display_name {
                entity.display_name = name;
            }
        }

        let previous_lobby = entity.lobby;
        if from_snapshot(Field::Lobby) {
            entity.lobby = snapshot.lobby;
        }

        if is_local && previous_lobby != entity.lobby {
            if entity.lobby == Lobby::Commons {
                // The store relocates players it sends back; adopt that spot.
                entity.position = snapshot.position;
                entity.target_position = snapshot.position;
            }
            info!(from = ?previous_lobby, to = ?entity.lobby, "local lobby changed");
            return Ok(UpsertOutcome::LocalLobbyChanged {
                from: previous_lobby,
                to: entity.lobby,
            });
        }

        Ok(UpsertOutcome::Updated)
    }

    /// Creates the local entity from `snapshot` if the initial read did not include it.
    pub fn ensure_local(&mut self, snapshot: EntitySnapshot, now_ms: u64) -> Result<(), CoreError> {
        if self.entities.contains_key(&self.session_id) {
            return Ok(());
        }
        let snapshot = EntitySnapshot {
            id: self.session_id.clone(),
            ..snapshot
        };
        self.upsert(snapshot, now_ms).map(|_| ())
    }

    /// Deletes an entity. The local entity is owned by this process and is kept.
    pub fn remove(&mut self, id: &str) -> Option<SimEntity> {
        if id == self.session_id {
            warn!(entity_id = %id, "ignoring removal of the local entity");
            return None;
        }
        let removed = self.entities.remove(id);
        if removed.is_some() {
            info!(entity_id = %id, "entity removed");
        }
        removed
    }

    pub fn interpolate_remotes(&mut self) {
        let factor = self.tuning.interpolation_factor;
        for entity in self.entities.values_mut().filter(|e| !e.is_local) {
            entity.interpolate(factor);
        }
    }

    /// Evicts remote entities whose last update is older than the stale timeout.
    pub fn sweep_stale(&mut self, now_ms: u64) -> Vec<SimEntity> {
        let timeout = self.tuning.stale_timeout_ms;
        let stale: Vec<String> = self
            .entities
            .values()
            .filter(|e| !e.is_local && now_ms.saturating_sub(e.last_seen) > timeout)
            .map(|e| e.id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|id| {
                let entity = self.entities.remove(&id)?;
                info!(entity_id = %id, last_seen = entity.last_seen, "evicted stale entity");
                Some(entity)
            })
            .collect()
    }

    pub fn local(&self) -> Option<&SimEntity> {
        self.entities.get(&self.session_id)
    }

    pub fn local_mut(&mut self) -> Option<&mut SimEntity> {
        self.entities.get_mut(&self.session_id)
    }

    pub fn get(&self, id: &str) -> Option<&SimEntity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SimEntity> {
        self.entities.get_mut(id)
    }

    /// Entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SimEntity> {
        self.entities.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SimEntity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::character::character_animations;
    use crate::domain::{Facing, Role, Status, Vec2};

    fn reconciler() -> EntityReconciler {
        EntityReconciler::new("me", character_animations(), PlayerTuning::default())
    }

    fn snapshot(id: &str, x: f32, y: f32) -> EntitySnapshot {
        EntitySnapshot::new(id, Vec2::new(x, y))
    }

    #[test]
    fn when_new_id_arrives_then_entity_starts_on_its_target() {
        let mut r = reconciler();
        let outcome = r.upsert(snapshot("bob", 10.0, 20.0), 100).expect("created");

        assert_eq!(outcome, UpsertOutcome::Created);
        let bob = r.get("bob").expect("bob exists");
        assert_eq!(bob.position, Vec2::new(10.0, 20.0));
        assert_eq!(bob.target_position, Vec2::new(10.0, 20.0));
        assert!(!bob.is_local);
        assert_eq!(bob.last_seen, 100);
    }

    #[test]
    fn when_session_id_arrives_then_entity_is_local() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 1.0, 1.0), 0).expect("created");

        assert!(r.local().expect("local exists").is_local);
    }

    #[test]
    fn when_local_snapshot_updates_then_predicted_position_is_kept() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 1.0, 1.0), 0).expect("created");
        r.local_mut().expect("local").position = Vec2::new(50.0, 60.0);

        let mut update = snapshot("me", 900.0, 900.0);
        update.role = Role::Hunter;
        update.facing = Facing::Left;
        r.upsert(update, 10).expect("updated");

        let me = r.local().expect("local");
        assert_eq!(me.position, Vec2::new(50.0, 60.0));
        assert_eq!(me.role, Role::Hunter);
        // Facing is a locally-owned presentation field.
        assert_eq!(me.facing, Facing::Right);
    }

    #[test]
    fn when_remote_snapshot_updates_then_target_and_fields_are_overwritten() {
        let mut r = reconciler();
        r.upsert(snapshot("bob", 0.0, 0.0), 0).expect("created");

        let mut update = snapshot("bob", 100.0, 0.0);
        update.facing = Facing::Left;
        update.status = Status::Eliminated;
        update.lobby = Lobby::Dungeon;
        update.command_animation = Some("dance".to_string());
        update.display_name = Some("Bob".to_string());
        assert_eq!(r.upsert(update, 42).expect("updated"), UpsertOutcome::Updated);

        let bob = r.get("bob").expect("bob");
        assert_eq!(bob.position, Vec2::new(0.0, 0.0));
        assert_eq!(bob.target_position, Vec2::new(100.0, 0.0));
        assert_eq!(bob.facing, Facing::Left);
        assert_eq!(bob.status, Status::Eliminated);
        assert_eq!(bob.lobby, Lobby::Dungeon);
        assert_eq!(bob.command_animation.as_deref(), Some("dance"));
        assert_eq!(bob.display_name, "Bob");
        assert_eq!(bob.last_seen, 42);
    }

    #[test]
    fn when_update_carries_no_name_then_the_known_name_is_kept() {
        let mut r = reconciler();
        r.upsert(snapshot("ghost", 0.0, 0.0), 0).expect("created");
        assert_eq!(r.get("ghost").expect("ghost").display_name, "Unknown");

        let mut named = snapshot("bob", 0.0, 0.0);
        named.display_name = Some("Bob".to_string());
        r.upsert(named, 0).expect("created");
        r.upsert(snapshot("bob", 30.0, 0.0), 5).expect("updated");

        let bob = r.get("bob").expect("bob");
        assert_eq!(bob.display_name, "Bob");
        assert_eq!(bob.target_position, Vec2::new(30.0, 0.0));
    }

    #[test]
    fn when_local_lobby_changes_then_the_transition_is_reported() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 1.0, 1.0), 0).expect("created");

        let mut update = snapshot("me", 1.0, 1.0);
        update.lobby = Lobby::Dungeon;
        assert_eq!(
            r.upsert(update, 1).expect("updated"),
            UpsertOutcome::LocalLobbyChanged {
                from: Lobby::Commons,
                to: Lobby::Dungeon
            }
        );

        // Returning to the commons adopts the store's placement.
        r.local_mut().expect("local").position = Vec2::new(5.0, 5.0);
        let back = snapshot("me", 1400.0, 1500.0);
        r.upsert(back, 2).expect("updated");
        assert_eq!(r.local().expect("local").position, Vec2::new(1400.0, 1500.0));
    }

    #[test]
    fn when_remote_lobby_changes_then_no_transition_is_reported() {
        let mut r = reconciler();
        r.upsert(snapshot("bob", 0.0, 0.0), 0).expect("created");

        let mut update = snapshot("bob", 0.0, 0.0);
        update.lobby = Lobby::Dungeon;
        assert_eq!(r.upsert(update, 1).expect("updated"), UpsertOutcome::Updated);
    }

    #[test]
    fn when_remote_is_silent_past_the_timeout_then_it_is_evicted() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 0.0, 0.0), 0).expect("created");
        r.upsert(snapshot("bob", 0.0, 0.0), 0).expect("created");
        r.upsert(snapshot("cat", 0.0, 0.0), 4000).expect("created");

        assert!(r.sweep_stale(5000).is_empty());

        let evicted = r.sweep_stale(5001);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "bob");
        assert!(r.local().is_some());
        assert!(r.get("cat").is_some());

        // The local entity never goes stale.
        let evicted = r.sweep_stale(1_000_000);
        assert_eq!(evicted.len(), 1);
        assert_eq!(evicted[0].id, "cat");
        assert!(r.local().is_some());
    }

    #[test]
    fn when_local_removal_arrives_then_the_local_entity_is_kept() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 0.0, 0.0), 0).expect("created");

        assert!(r.remove("me").is_none());
        assert!(r.local().is_some());
    }

    #[test]
    fn when_ensure_local_runs_twice_then_one_local_entity_exists() {
        let mut r = reconciler();
        r.ensure_local(snapshot("ignored", 400.0, 300.0), 0)
            .expect("created");
        r.ensure_local(snapshot("ignored", 1.0, 1.0), 0)
            .expect("noop");

        assert_eq!(r.len(), 1);
        assert_eq!(r.local().expect("local").position, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn interpolation_only_moves_remote_entities() {
        let mut r = reconciler();
        r.upsert(snapshot("me", 0.0, 0.0), 0).expect("created");
        r.upsert(snapshot("bob", 0.0, 0.0), 0).expect("created");
        r.upsert(snapshot("bob", 100.0, 0.0), 0).expect("updated");
        r.local_mut().expect("local").target_position = Vec2::new(100.0, 0.0);

        r.interpolate_remotes();
        assert_eq!(r.get("bob").expect("bob").position, Vec2::new(10.0, 0.0));
        assert_eq!(r.local().expect("local").position, Vec2::new(0.0, 0.0));
    }

    #[test]
    fn rule_table_keeps_position_local_and_role_authoritative() {
        assert_eq!(authority(Field::Position, true), Authority::Local);
        assert_eq!(authority(Field::Position, false), Authority::Interpolated);
        assert_eq!(authority(Field::Role, true), Authority::Snapshot);
        assert_eq!(authority(Field::Facing, false), Authority::Snapshot);
    }
}
