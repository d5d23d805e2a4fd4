//! Domain taxonomy.
//!
//! Every registry collection belongs to exactly one [`Domain`], every domain
//! belongs to one storage [`DomainGroup`], and every domain decomposes over
//! one [`OriginDomain`] table of the compiled-in catalog.
//!
//! ```text
//!  static     color, sound
//!  dynamic    motion, lighting, composition, graphics, temporal, technical,
//!             audio_role, camera, transition, depth
//!  narrative  genre, mood, plot, setting, theme, style, scene_type
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A registry domain: one persisted collection of discovered values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Color,
    Sound,
    Motion,
    Lighting,
    Composition,
    Graphics,
    Temporal,
    Technical,
    AudioRole,
    Camera,
    Transition,
    Depth,
    Genre,
    Mood,
    Plot,
    Setting,
    Theme,
    Style,
    SceneType,
}

impl Domain {
    pub const ALL: [Domain; 19] = [
        Domain::Color,
        Domain::Sound,
        Domain::Motion,
        Domain::Lighting,
        Domain::Composition,
        Domain::Graphics,
        Domain::Temporal,
        Domain::Technical,
        Domain::AudioRole,
        Domain::Camera,
        Domain::Transition,
        Domain::Depth,
        Domain::Genre,
        Domain::Mood,
        Domain::Plot,
        Domain::Setting,
        Domain::Theme,
        Domain::Style,
        Domain::SceneType,
    ];

    /// The seven narrative facets, in extraction order.
    pub const NARRATIVE: [Domain; 7] = [
        Domain::Genre,
        Domain::Mood,
        Domain::Plot,
        Domain::Setting,
        Domain::Theme,
        Domain::Style,
        Domain::SceneType,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Color => "color",
            Domain::Sound => "sound",
            Domain::Motion => "motion",
            Domain::Lighting => "lighting",
            Domain::Composition => "composition",
            Domain::Graphics => "graphics",
            Domain::Temporal => "temporal",
            Domain::Technical => "technical",
            Domain::AudioRole => "audio_role",
            Domain::Camera => "camera",
            Domain::Transition => "transition",
            Domain::Depth => "depth",
            Domain::Genre => "genre",
            Domain::Mood => "mood",
            Domain::Plot => "plot",
            Domain::Setting => "setting",
            Domain::Theme => "theme",
            Domain::Style => "style",
            Domain::SceneType => "scene_type",
        }
    }

    pub fn group(self) -> DomainGroup {
        match self {
            Domain::Color | Domain::Sound => DomainGroup::Static,
            Domain::Genre
            | Domain::Mood
            | Domain::Plot
            | Domain::Setting
            | Domain::Theme
            | Domain::Style
            | Domain::SceneType => DomainGroup::Narrative,
            _ => DomainGroup::Dynamic,
        }
    }

    /// The origin table this domain decomposes over.
    pub fn origin_domain(self) -> OriginDomain {
        match self {
            Domain::Color => OriginDomain::Color,
            Domain::Sound | Domain::AudioRole => OriginDomain::Audio,
            Domain::Motion => OriginDomain::Motion,
            Domain::Lighting => OriginDomain::Lighting,
            Domain::Composition => OriginDomain::Composition,
            Domain::Graphics => OriginDomain::Graphics,
            Domain::Temporal => OriginDomain::Temporal,
            Domain::Technical => OriginDomain::Technical,
            Domain::Camera => OriginDomain::Camera,
            Domain::Transition => OriginDomain::Transition,
            Domain::Depth => OriginDomain::Depth,
            _ => OriginDomain::Narrative,
        }
    }

    pub fn is_narrative(self) -> bool {
        self.group() == DomainGroup::Narrative
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CoreError::UnknownDomain(s.to_string()))
    }
}

/// Storage grouping of domains; also the top-level key of a sync body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainGroup {
    /// Per-instant values.
    Static,
    /// Per-time-window values.
    Dynamic,
    Narrative,
}

impl DomainGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainGroup::Static => "static",
            DomainGroup::Dynamic => "dynamic",
            DomainGroup::Narrative => "narrative",
        }
    }

    pub fn domains(self) -> impl Iterator<Item = Domain> {
        Domain::ALL.into_iter().filter(move |d| d.group() == self)
    }
}

impl fmt::Display for DomainGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table of the compiled-in origin catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginDomain {
    Color,
    Lighting,
    Motion,
    Camera,
    Composition,
    Temporal,
    Transition,
    Graphics,
    Audio,
    Narrative,
    Technical,
    Depth,
}

impl OriginDomain {
    pub const ALL: [OriginDomain; 12] = [
        OriginDomain::Color,
        OriginDomain::Lighting,
        OriginDomain::Motion,
        OriginDomain::Camera,
        OriginDomain::Composition,
        OriginDomain::Temporal,
        OriginDomain::Transition,
        OriginDomain::Graphics,
        OriginDomain::Audio,
        OriginDomain::Narrative,
        OriginDomain::Technical,
        OriginDomain::Depth,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OriginDomain::Color => "color",
            OriginDomain::Lighting => "lighting",
            OriginDomain::Motion => "motion",
            OriginDomain::Camera => "camera",
            OriginDomain::Composition => "composition",
            OriginDomain::Temporal => "temporal",
            OriginDomain::Transition => "transition",
            OriginDomain::Graphics => "graphics",
            OriginDomain::Audio => "audio",
            OriginDomain::Narrative => "narrative",
            OriginDomain::Technical => "technical",
            OriginDomain::Depth => "depth",
        }
    }
}

impl fmt::Display for OriginDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for d in Domain::ALL {
            assert_eq!(d.as_str().parse::<Domain>().unwrap(), d);
        }
        assert!("nonsense".parse::<Domain>().is_err());
    }

    #[test]
    fn groups_partition_all_domains() {
        let total: usize = [DomainGroup::Static, DomainGroup::Dynamic, DomainGroup::Narrative]
            .into_iter()
            .map(|g| g.domains().count())
            .sum();
        assert_eq!(total, Domain::ALL.len());
        assert_eq!(DomainGroup::Static.domains().count(), 2);
        assert_eq!(DomainGroup::Narrative.domains().count(), 7);
    }

    #[test]
    fn serde_names_match_as_str() {
        let json = serde_json::to_string(&Domain::SceneType).unwrap();
        assert_eq!(json, "\"scene_type\"");
        assert_eq!(Domain::AudioRole.origin_domain(), OriginDomain::Audio);
        assert!(Domain::Mood.is_narrative());
    }
}
