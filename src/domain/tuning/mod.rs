// Gameplay tuning, overridable per deployment from a TOML file.

pub mod match_rules;
pub mod player;
pub mod world;

pub use match_rules::MatchTuning;
pub use player::PlayerTuning;
pub use world::{Region, WorldTuning};

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub player: PlayerTuning,
    pub world: WorldTuning,
    #[serde(rename = "match")]
    pub match_rules: MatchTuning,
}

impl Tuning {
    /// Parses a tuning file; omitted tables and keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_file_is_empty_then_defaults_apply() {
        let tuning = Tuning::from_toml_str("").expect("empty file parses");
        assert_eq!(tuning, Tuning::default());
    }

    #[test]
    fn when_file_overrides_some_keys_then_the_rest_keep_defaults() {
        let tuning = Tuning::from_toml_str(
            r#"
            [match]
            quorum = 1
            tag_radius = 80.0

            [world.portal]
            x = 10.0
            y = 20.0
            w = 30.0
            h = 40.0
            "#,
        )
        .expect("valid tuning");

        assert_eq!(tuning.match_rules.quorum, 1);
        assert_eq!(tuning.match_rules.tag_radius, 80.0);
        assert_eq!(tuning.match_rules.countdown_ms, 10_000);
        assert_eq!(
            tuning.world.portal,
            Region {
                x: 10.0,
                y: 20.0,
                w: 30.0,
                h: 40.0
            }
        );
        assert_eq!(tuning.world.world_size, 3000.0);
        assert_eq!(tuning.player, PlayerTuning::default());
    }

    #[test]
    fn when_value_has_the_wrong_type_then_parsing_fails() {
        assert!(Tuning::from_toml_str("[match]\nquorum = \"three\"").is_err());
    }
}
