//! # BIO Labels for Traffic-Incident NER
//!
//! Defines the closed entity tag set used by the annotation prompt and the
//! BIO (Begin-Inside-Outside) label type attached to every token.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{LantasError, Result};

/// Entity categories the annotation instruction allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityTag {
    /// Named street, road or area.
    PreciseLocation,
    /// Landmark or generic place without a proper name.
    LandmarkLocation,
    /// Physical state of traffic or road.
    Condition,
    /// Cultural, religious or organized event.
    Event,
    Vehicle,
    Object,
    /// Official responders needed at the scene.
    RequiredParty,
    /// People involved in or affected by the incident.
    ReportedParty,
    PreciseTime,
    Cardinal,
    Date,
    Facility,
    /// Durations.
    Quantity,
    /// Non-traffic products.
    Product,
}

impl EntityTag {
    /// Total number of entity categories.
    pub const NUM_TAGS: usize = 14;

    /// Get all entity tags in prompt order.
    pub fn all_tags() -> &'static [EntityTag] {
        &[
            EntityTag::PreciseLocation,
            EntityTag::LandmarkLocation,
            EntityTag::Condition,
            EntityTag::Event,
            EntityTag::Vehicle,
            EntityTag::Object,
            EntityTag::RequiredParty,
            EntityTag::ReportedParty,
            EntityTag::PreciseTime,
            EntityTag::Cardinal,
            EntityTag::Date,
            EntityTag::Facility,
            EntityTag::Quantity,
            EntityTag::Product,
        ]
    }

    /// The markup code, e.g. `PLOC`.
    pub fn code(&self) -> &'static str {
        match self {
            EntityTag::PreciseLocation => "PLOC",
            EntityTag::LandmarkLocation => "LLOC",
            EntityTag::Condition => "COND",
            EntityTag::Event => "EVT",
            EntityTag::Vehicle => "VEH",
            EntityTag::Object => "OBJ",
            EntityTag::RequiredParty => "PWN",
            EntityTag::ReportedParty => "PWR",
            EntityTag::PreciseTime => "PTI",
            EntityTag::Cardinal => "CRD",
            EntityTag::Date => "DAT",
            EntityTag::Facility => "FAC",
            EntityTag::Quantity => "QTY",
            EntityTag::Product => "PRD",
        }
    }

    /// Look up a tag by its markup code, ignoring case.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all_tags()
            .iter()
            .copied()
            .find(|tag| tag.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// BIO label attached to a single token.
///
/// Entity names are kept as uppercase strings rather than [`EntityTag`]
/// values; the converter emits whatever tag the model produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BioLabel {
    /// First token of an entity.
    Begin(String),
    /// Continuation token of an entity.
    Inside(String),
    /// Token outside any entity.
    Outside,
}

impl BioLabel {
    /// Begin label for an entity name; the name is uppercased.
    pub fn begin(entity: &str) -> Self {
        BioLabel::Begin(entity.to_uppercase())
    }

    /// Inside label for an entity name; the name is uppercased.
    pub fn inside(entity: &str) -> Self {
        BioLabel::Inside(entity.to_uppercase())
    }

    /// Entity name carried by this label, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            BioLabel::Begin(name) | BioLabel::Inside(name) => Some(name),
            BioLabel::Outside => None,
        }
    }

    /// Entity tag from the closed set, if the label names one.
    pub fn entity_tag(&self) -> Option<EntityTag> {
        self.entity().and_then(EntityTag::from_code)
    }

    /// Check if transitioning from `from` label to `to` label is valid.
    ///
    /// An `I-X` label may only follow `B-X` or `I-X`.
    pub fn is_valid_transition(from: &BioLabel, to: &BioLabel) -> bool {
        match to {
            BioLabel::Inside(name) => from.entity() == Some(name.as_str()),
            _ => true,
        }
    }
}

impl fmt::Display for BioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BioLabel::Begin(name) => write!(f, "B-{name}"),
            BioLabel::Inside(name) => write!(f, "I-{name}"),
            BioLabel::Outside => write!(f, "O"),
        }
    }
}

impl FromStr for BioLabel {
    type Err = LantasError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "O" {
            return Ok(BioLabel::Outside);
        }
        match s.split_once('-') {
            Some(("B", name)) if !name.is_empty() => Ok(BioLabel::begin(name)),
            Some(("I", name)) if !name.is_empty() => Ok(BioLabel::inside(name)),
            _ => Err(LantasError::InvalidLabel(s.to_string())),
        }
    }
}

impl Serialize for BioLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BioLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
