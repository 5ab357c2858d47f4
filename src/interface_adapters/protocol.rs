// Row and change-feed DTOs for the external store, with their domain conversions.
// Decoding is lenient: missing or unknown values fall back to domain defaults.

use crate::domain::ports::EntityPatch;
use crate::domain::{
    ChangeEvent, EntitySnapshot, Facing, Lobby, MatchSnapshot, MessageSnapshot, Role, Status, Vec2, Winner,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

pub const PLAYERS_TABLE: &str = "players";
pub const GAME_STATE_TABLE: &str = "game_state";
pub const MESSAGES_TABLE: &str = "messages";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind:?} on `{table}` carried no row")]
    MissingRow { table: String, kind: ChangeKind },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileRow {
    #[serde(default)]
    pub username: Option<String>,
}

/// One row of the players collection.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerRow {
    pub id: String,
    #[serde(default)]
    pub x: Option<f32>,
    #[serde(default)]
    pub y: Option<f32>,
    #[serde(default)]
    pub is_it: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub lobby_id: Option<String>,
    #[serde(default)]
    pub facing: Option<String>,
    #[serde(default)]
    pub command_animation: Option<String>,
    #[serde(default)]
    pub is_typing: Option<bool>,
    // Flat name column or the joined profile, whichever the query produced.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub profiles: Option<ProfileRow>,
}

impl From<PlayerRow> for EntitySnapshot {
    fn from(row: PlayerRow) -> Self {
        let display_name = row
            .username
            .or(row.profiles.and_then(|p| p.username))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Self {
            id: row.id,
            display_name,
            position: Vec2::new(row.x.unwrap_or_default(), row.y.unwrap_or_default()),
            facing: row.facing.as_deref().map(parse_facing).unwrap_or_default(),
            role: if row.is_it.unwrap_or(false) {
                Role::Hunter
            } else {
                Role::Normal
            },
            status: row.status.as_deref().map(parse_status).unwrap_or_default(),
            lobby: row.lobby_id.as_deref().map(parse_lobby).unwrap_or_default(),
            command_animation: row.command_animation.filter(|name| !name.is_empty()),
            is_typing: row.is_typing.unwrap_or(false),
        }
    }
}

/// Match start as either epoch millis or an RFC 3339 timestamp.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(u64),
    Text(String),
}

impl Timestamp {
    pub fn epoch_millis(&self) -> Option<u64> {
        match self {
            Timestamp::Millis(ms) => Some(*ms),
            Timestamp::Text(text) => {
                let parsed = OffsetDateTime::parse(text, &Rfc3339).ok()?;
                u64::try_from(parsed.unix_timestamp_nanos() / 1_000_000).ok()
            }
        }
    }
}

/// The single global match record.
#[derive(Debug, Clone, Deserialize)]
pub struct GameStateRow {
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub match_start_time: Option<Timestamp>,
    #[serde(default)]
    pub winner: Option<String>,
}

impl From<GameStateRow> for MatchSnapshot {
    fn from(row: GameStateRow) -> Self {
        let match_start_time = row.match_start_time.and_then(|ts| {
            let parsed = ts.epoch_millis();
            if parsed.is_none() {
                warn!(value = ?ts, "unreadable match start time");
            }
            parsed
        });
        Self {
            is_active: row.is_active.unwrap_or(false),
            match_start_time,
            winner: row.winner.as_deref().and_then(parse_winner),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRow {
    #[serde(alias = "player_id")]
    pub sender_id: String,
    #[serde(alias = "content", default)]
    pub text: String,
}

impl From<MessageRow> for MessageSnapshot {
    fn from(row: MessageRow) -> Self {
        Self {
            sender_id: row.sender_id,
            text: row.text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One notification from the realtime feed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeEventDto {
    pub table: String,
    #[serde(rename = "eventType", alias = "type")]
    pub kind: ChangeKind,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: String,
}

impl ChangeEventDto {
    /// Converts to a domain event; `None` for notifications the core does not consume.
    pub fn into_event(self) -> Result<Option<ChangeEvent>, ProtocolError> {
        let ChangeEventDto {
            table,
            kind,
            new,
            old,
        } = self;
        let row = match kind {
            ChangeKind::Delete => old,
            ChangeKind::Insert | ChangeKind::Update => new,
        };
        let Some(row) = row.filter(|value| !value.is_null()) else {
            return Err(ProtocolError::MissingRow { table, kind });
        };

        let event = match (table.as_str(), kind) {
            (PLAYERS_TABLE, ChangeKind::Delete) => {
                let IdRow { id } = serde_json::from_value(row)?;
                Some(ChangeEvent::EntityRemoved { id })
            }
            (PLAYERS_TABLE, _) => {
                let row: PlayerRow = serde_json::from_value(row)?;
                Some(ChangeEvent::EntityUpserted(row.into()))
            }
            (GAME_STATE_TABLE, ChangeKind::Delete) => None,
            (GAME_STATE_TABLE, _) => {
                let row: GameStateRow = serde_json::from_value(row)?;
                Some(ChangeEvent::MatchChanged(row.into()))
            }
            (MESSAGES_TABLE, ChangeKind::Insert) => {
                let row: MessageRow = serde_json::from_value(row)?;
                Some(ChangeEvent::MessageInserted(row.into()))
            }
            _ => None,
        };
        Ok(event)
    }
}

pub fn decode_change(text: &str) -> Result<Option<ChangeEvent>, ProtocolError> {
    serde_json::from_str::<ChangeEventDto>(text)?.into_event()
}

/// First frame sent on the realtime socket.
#[derive(Debug, Clone, Serialize)]
pub struct SubscribeDto<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub tables: &'a [&'a str],
}

impl SubscribeDto<'static> {
    pub fn all_tables() -> Self {
        Self {
            kind: "subscribe",
            tables: &[PLAYERS_TABLE, GAME_STATE_TABLE, MESSAGES_TABLE],
        }
    }
}

/// PATCH body for the own player row. Absent fields are left untouched by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityPatchDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facing: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_it: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lobby_id: Option<&'static str>,
    // Serialized as null when the emote is cleared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_animation: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_typing: Option<bool>,
}

impl From<&EntityPatch> for EntityPatchDto {
    fn from(patch: &EntityPatch) -> Self {
        Self {
            x: patch.position.map(|p| p.x),
            y: patch.position.map(|p| p.y),
            facing: patch.facing.map(facing_wire),
            is_it: patch.role.map(|role| role == Role::Hunter),
            status: patch.status.map(status_wire),
            lobby_id: patch.lobby.map(lobby_wire),
            command_animation: patch.command_animation.clone(),
            is_typing: patch.is_typing,
        }
    }
}

fn parse_facing(value: &str) -> Facing {
    match value {
        "left" => Facing::Left,
        _ => Facing::Right,
    }
}

fn parse_status(value: &str) -> Status {
    match value {
        "dead" | "eliminated" => Status::Eliminated,
        _ => Status::Alive,
    }
}

fn parse_lobby(value: &str) -> Lobby {
    match value {
        "dungeon" => Lobby::Dungeon,
        _ => Lobby::Commons,
    }
}

fn parse_winner(value: &str) -> Option<Winner> {
    match value {
        "it" | "hunter" => Some(Winner::Hunter),
        "survivors" => Some(Winner::Survivors),
        "" => None,
        other => {
            warn!(winner = other, "unknown winner value");
            None
        }
    }
}

pub fn facing_wire(facing: Facing) -> &'static str {
    match facing {
        Facing::Left => "left",
        Facing::Right => "right",
    }
}

pub fn status_wire(status: Status) -> &'static str {
    match status {
        Status::Alive => "alive",
        Status::Eliminated => "dead",
    }
}

pub fn lobby_wire(lobby: Lobby) -> &'static str {
    match lobby {
        Lobby::Commons => "main",
        Lobby::Dungeon => "dungeon",
    }
}

pub fn winner_wire(winner: Winner) -> &'static str {
    match winner {
        Winner::Hunter => "it",
        Winner::Survivors => "survivors",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn when_player_row_is_sparse_then_defaults_fill_the_gaps() {
        let event = decode_change(
            r#"{"table":"players","eventType":"INSERT","new":{"id":"p1","x":12.5,"y":null}}"#,
        )
        .expect("decodes");

        let Some(ChangeEvent::EntityUpserted(snapshot)) = event else {
            panic!("expected an upsert, got {event:?}");
        };
        assert_eq!(snapshot, EntitySnapshot::new("p1", Vec2::new(12.5, 0.0)));
        assert_eq!(snapshot.display_name, None);
    }

    #[test]
    fn when_player_row_is_complete_then_every_field_maps() {
        let row: PlayerRow = serde_json::from_value(json!({
            "id": "p2",
            "x": 1.0,
            "y": 2.0,
            "is_it": true,
            "status": "dead",
            "lobby_id": "dungeon",
            "facing": "left",
            "command_animation": "dance",
            "is_typing": true,
            "profiles": { "username": "  Usagi " }
        }))
        .expect("valid row");

        let snapshot = EntitySnapshot::from(row);
        assert_eq!(snapshot.display_name.as_deref(), Some("Usagi"));
        assert_eq!(snapshot.role, Role::Hunter);
        assert_eq!(snapshot.status, Status::Eliminated);
        assert_eq!(snapshot.lobby, Lobby::Dungeon);
        assert_eq!(snapshot.facing, Facing::Left);
        assert_eq!(snapshot.command_animation.as_deref(), Some("dance"));
        assert!(snapshot.is_typing);
    }

    #[test]
    fn when_player_is_deleted_then_removal_uses_the_old_id() {
        let event = decode_change(r#"{"table":"players","type":"DELETE","old":{"id":"gone"}}"#)
            .expect("decodes");
        assert_eq!(event, Some(ChangeEvent::EntityRemoved { id: "gone".into() }));
    }

    #[test]
    fn when_match_record_uses_a_timestamp_then_it_becomes_epoch_millis() {
        let event = decode_change(
            r#"{"table":"game_state","eventType":"UPDATE","new":{"id":1,"is_active":true,"match_start_time":"2024-01-01T00:00:10Z","winner":"it"}}"#,
        )
        .expect("decodes");

        assert_eq!(
            event,
            Some(ChangeEvent::MatchChanged(MatchSnapshot {
                is_active: true,
                match_start_time: Some(1_704_067_210_000),
                winner: Some(Winner::Hunter),
            }))
        );
    }

    #[test]
    fn when_match_record_is_reset_then_snapshot_is_empty() {
        let row: GameStateRow = serde_json::from_value(json!({
            "is_active": false,
            "match_start_time": null,
            "winner": null
        }))
        .expect("valid row");
        assert_eq!(MatchSnapshot::from(row), MatchSnapshot::default());
    }

    #[test]
    fn when_message_is_inserted_then_sender_and_text_map() {
        let event = decode_change(
            r#"{"table":"messages","eventType":"INSERT","new":{"player_id":"p1","content":"hello"}}"#,
        )
        .expect("decodes");
        assert_eq!(
            event,
            Some(ChangeEvent::MessageInserted(MessageSnapshot {
                sender_id: "p1".into(),
                text: "hello".into()
            }))
        );
    }

    #[test]
    fn when_table_is_unrelated_then_nothing_is_produced() {
        let event =
            decode_change(r#"{"table":"profiles","eventType":"UPDATE","new":{"id":"p1"}}"#)
                .expect("decodes");
        assert_eq!(event, None);
    }

    #[test]
    fn when_row_is_missing_then_decoding_fails() {
        let err = decode_change(r#"{"table":"players","eventType":"UPDATE"}"#)
            .expect_err("no row");
        assert!(matches!(err, ProtocolError::MissingRow { .. }));
        assert!(decode_change("not json").is_err());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = EntityPatch {
            position: Some(Vec2::new(3.0, 4.0)),
            lobby: Some(Lobby::Commons),
            command_animation: Some(None),
            ..EntityPatch::default()
        };

        let body = serde_json::to_value(EntityPatchDto::from(&patch)).expect("serializes");
        assert_eq!(
            body,
            json!({ "x": 3.0, "y": 4.0, "lobby_id": "main", "command_animation": null })
        );
    }
}
