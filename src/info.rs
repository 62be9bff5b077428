use serde::{Deserialize, Serialize};
use std::fmt;

/// Map-level classification that can change a tile's name, texture or
/// whether it may be placed at all. Stored on disk as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Environment {
    #[default]
    Forest,
    SnowMountain,
    Inside,
    Desert,
    Cave,
}

impl Environment {
    pub const ALL: [Environment; 5] = [
        Environment::Forest,
        Environment::SnowMountain,
        Environment::Inside,
        Environment::Desert,
        Environment::Cave,
    ];
}

impl From<Environment> for u8 {
    fn from(env: Environment) -> u8 {
        env as u8
    }
}

impl TryFrom<u8> for Environment {
    type Error = UnknownVariant;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Environment::ALL
            .get(v as usize)
            .copied()
            .ok_or(UnknownVariant { kind: "environment", value: v })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weather {
    #[default]
    Sunny,
    Rainy,
    Snowy,
    Foggy,
    Thunderstorm,
}

impl Weather {
    pub const ALL: [Weather; 5] = [
        Weather::Sunny,
        Weather::Rainy,
        Weather::Snowy,
        Weather::Foggy,
        Weather::Thunderstorm,
    ];
}

impl From<Weather> for u8 {
    fn from(w: Weather) -> u8 {
        w as u8
    }
}

impl TryFrom<u8> for Weather {
    type Error = UnknownVariant;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Weather::ALL
            .get(v as usize)
            .copied()
            .ok_or(UnknownVariant { kind: "weather", value: v })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: u8,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} value {}", self.kind, self.value)
    }
}

/// Descriptive, non-grid part of a map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapInfo {
    pub name: String,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub weather: Weather,
}

impl MapInfo {
    pub fn new(name: impl Into<String>, environment: Environment) -> Self {
        MapInfo {
            name: name.into(),
            environment,
            weather: Weather::default(),
        }
    }
}
