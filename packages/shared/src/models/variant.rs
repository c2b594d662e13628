use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Time control a player queues for and a match is played under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameVariant {
    /// No clock.
    #[default]
    Standard,
    /// 3 minutes, +1 second per move.
    Blitz,
    /// 10 minutes, no increment.
    Rapid,
}

impl GameVariant {
    pub const ALL: [GameVariant; 3] = [
        GameVariant::Standard,
        GameVariant::Blitz,
        GameVariant::Rapid,
    ];

    /// Starting time for each side, `None` for untimed games.
    pub fn base_seconds(&self) -> Option<i64> {
        match self {
            GameVariant::Standard => None,
            GameVariant::Blitz => Some(180),
            GameVariant::Rapid => Some(600),
        }
    }

    pub fn increment_seconds(&self) -> i64 {
        match self {
            GameVariant::Blitz => 1,
            GameVariant::Standard | GameVariant::Rapid => 0,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.base_seconds().is_some()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameVariant::Standard => "STANDARD",
            GameVariant::Blitz => "BLITZ",
            GameVariant::Rapid => "RAPID",
        }
    }
}

impl fmt::Display for GameVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown game variant: {0}")]
pub struct UnknownVariant(pub String);

impl FromStr for GameVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(GameVariant::Standard),
            "BLITZ" => Ok(GameVariant::Blitz),
            "RAPID" => Ok(GameVariant::Rapid),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(GameVariant::Standard, None, 0 ; "standard is untimed")]
    #[test_case(GameVariant::Blitz, Some(180), 1 ; "blitz three plus one")]
    #[test_case(GameVariant::Rapid, Some(600), 0 ; "rapid ten minutes flat")]
    fn test_variant_time_control(variant: GameVariant, base: Option<i64>, increment: i64) {
        assert_eq!(variant.base_seconds(), base);
        assert_eq!(variant.increment_seconds(), increment);
        assert_eq!(variant.is_timed(), base.is_some());
    }

    #[test]
    fn test_variant_parses_case_insensitively() {
        assert_eq!("blitz".parse::<GameVariant>(), Ok(GameVariant::Blitz));
        assert_eq!(" Rapid ".parse::<GameVariant>(), Ok(GameVariant::Rapid));
        assert!("bullet".parse::<GameVariant>().is_err());
    }

    #[test]
    fn test_variant_serializes_screaming_case() {
        let json = serde_json::to_string(&GameVariant::Blitz).unwrap();
        assert_eq!(json, "\"BLITZ\"");
        assert_eq!(GameVariant::default(), GameVariant::Standard);
    }
}
