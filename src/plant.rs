//! Plant types and identifiers.
//!
//! A [`Plant`] is the only entity Verdant manages. Plants are partitioned by
//! [`OwnerId`]; a [`PlantId`] is only meaningful together with its owner.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Identifier of the user a plant collection belongs to.
///
/// Owner ids are strictly positive.
///
/// # Examples
///
/// ```
/// use verdant::OwnerId;
///
/// assert!(OwnerId::new(1).is_ok());
/// assert!(OwnerId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OwnerId(u64);

impl OwnerId {
    /// Creates an owner id, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidOwnerId` if `raw` is zero.
    pub fn new(raw: u64) -> Result<Self, ValidationError> {
        if raw == 0 {
            return Err(ValidationError::InvalidOwnerId { value: raw });
        }
        Ok(Self(raw))
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for OwnerId {
    type Error = ValidationError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<OwnerId> for u64 {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a plant within its owner's collection.
///
/// Assigned sequentially per owner starting at 1 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PlantId(u64);

impl PlantId {
    /// The id given to an owner's first plant.
    pub const FIRST: Self = Self(1);

    /// Creates a plant id, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidPlantId` if `raw` is zero.
    pub fn new(raw: u64) -> Result<Self, ValidationError> {
        if raw == 0 {
            return Err(ValidationError::InvalidPlantId { value: raw });
        }
        Ok(Self(raw))
    }

    /// Returns the raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl TryFrom<u64> for PlantId {
    type Error = ValidationError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<PlantId> for u64 {
    fn from(id: PlantId) -> Self {
        id.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive plant kind. Does not influence decay or growth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlantKind {
    /// A plant that flowers.
    Flowering,
    /// A foliage-only plant.
    #[default]
    NonFlowering,
}

/// Growth stage of a plant.
///
/// The healthy stages form an ordered, non-cyclic progression from `Seed` to
/// `Blooming`. `Decayed` freezes growth until the plant is cared for again;
/// `Dead` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthStage {
    /// Freshly planted.
    Seed,
    /// First stage after sprouting.
    Seedling,
    /// Young plant.
    Young,
    /// Nearly grown.
    Youngling,
    /// Starting to bloom.
    Bloom,
    /// Fully grown; growth stops here.
    Blooming,
    /// Neglected; growth is frozen until the next care action.
    Decayed,
    /// Health reached zero. Terminal.
    Dead,
}

impl GrowthStage {
    /// The healthy progression, in order.
    pub const PROGRESSION: [Self; 6] = [
        Self::Seed,
        Self::Seedling,
        Self::Young,
        Self::Youngling,
        Self::Bloom,
        Self::Blooming,
    ];

    /// Returns the next stage along the progression.
    ///
    /// `Blooming` saturates; `Decayed` and `Dead` return themselves.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Seed => Self::Seedling,
            Self::Seedling => Self::Young,
            Self::Young => Self::Youngling,
            Self::Youngling => Self::Bloom,
            Self::Bloom | Self::Blooming => Self::Blooming,
            Self::Decayed => Self::Decayed,
            Self::Dead => Self::Dead,
        }
    }

    /// Returns true for stages on the healthy progression.
    #[must_use]
    pub const fn is_growing(self) -> bool {
        !matches!(self, Self::Decayed | Self::Dead)
    }

    /// Returns true for the absorbing `Dead` stage.
    #[must_use]
    pub const fn is_dead(self) -> bool {
        matches!(self, Self::Dead)
    }

    /// Position along the progression (`None` for `Decayed`/`Dead`).
    #[must_use]
    pub const fn rank(self) -> Option<usize> {
        match self {
            Self::Seed => Some(0),
            Self::Seedling => Some(1),
            Self::Young => Some(2),
            Self::Youngling => Some(3),
            Self::Bloom => Some(4),
            Self::Blooming => Some(5),
            Self::Decayed | Self::Dead => None,
        }
    }

    /// Lowercase name, as used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Seedling => "seedling",
            Self::Young => "young",
            Self::Youngling => "youngling",
            Self::Bloom => "bloom",
            Self::Blooming => "blooming",
            Self::Decayed => "decayed",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for GrowthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A care action a user can apply to a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Refreshes `last_watered`.
    Water,
    /// Refreshes `last_fed`.
    Feed,
}

impl Action {
    /// Lowercase token for this action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Water => "water",
            Self::Feed => "feed",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.eq_ignore_ascii_case("water") {
            Ok(Self::Water)
        } else if token.eq_ignore_ascii_case("feed") {
            Ok(Self::Feed)
        } else {
            Err(ValidationError::InvalidAction {
                token: s.to_string(),
            })
        }
    }
}

/// A virtual plant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Per-owner sequential id.
    pub id: PlantId,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Descriptive kind.
    pub kind: PlantKind,
    /// Current growth stage.
    pub growth_stage: GrowthStage,
    /// Health in `[0, 100]`.
    pub health_level: u8,
    /// Last time the plant was watered.
    pub last_watered: Option<DateTime<Utc>>,
    /// Last time the plant was fed.
    pub last_fed: Option<DateTime<Utc>>,
    /// Creation time; the neglect anchor until the first action.
    pub created_at: DateTime<Utc>,
    /// Last time a decay step was charged against this plant.
    #[serde(default)]
    pub last_decayed: Option<DateTime<Utc>>,
    /// Write counter stamped by the store on every change.
    ///
    /// Persistence sinks use it to drop snapshots that arrive out of order.
    #[serde(default)]
    pub revision: u64,
}

impl Plant {
    /// Health of a freshly created plant.
    pub const INITIAL_HEALTH: u8 = 100;

    /// Creates a new plant at `Seed` with full health.
    #[must_use]
    pub fn new(owner_id: OwnerId, id: PlantId, kind: PlantKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            owner_id,
            kind,
            growth_stage: GrowthStage::Seed,
            health_level: Self::INITIAL_HEALTH,
            last_watered: None,
            last_fed: None,
            created_at,
            last_decayed: None,
            revision: 0,
        }
    }

    /// Returns true if the plant is dead.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.growth_stage.is_dead()
    }
}
