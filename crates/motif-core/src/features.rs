//! Tagged per-domain feature structs.
//!
//! An [`Extraction`] is what the (external) feature extractor reports for one
//! generated artifact: one optional struct per extraction domain. Every field
//! inside those structs is optional as well, so a partial extraction always
//! deserializes; [`Extraction::features`] then validates each populated
//! domain on its own and yields a [`FeatureValue`] or a [`CoreError`] per
//! domain, so one malformed axis never hides the others.

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::error::CoreError;

// ─────────────────────────────────────────────
// Per-domain structs
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorFeatures {
    /// Dominant colour as sRGB, 0..255 per channel.
    pub dominant_rgb: Option<[f64; 3]>,
    pub saturation:   Option<f64>,
    pub brightness:   Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundFeatures {
    pub pitch_hz:    Option<f64>,
    pub loudness_db: Option<f64>,
    pub timbre:      Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionFeatures {
    /// Normalised speed, 0 (still) .. 1 (frantic).
    pub speed:      Option<f64>,
    pub direction:  Option<String>,
    pub steadiness: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingFeatures {
    pub brightness:    Option<f64>,
    pub contrast:      Option<f64>,
    pub temperature_k: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionFeatures {
    /// Subject position in normalised frame coordinates.
    pub subject_x: Option<f64>,
    pub subject_y: Option<f64>,
    /// Left/right symmetry, 0..1.
    pub balance:   Option<f64>,
    pub rule:      Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsFeatures {
    pub style:      Option<String>,
    pub complexity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalFeatures {
    /// Cuts per minute.
    pub pace:          Option<f64>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechnicalFeatures {
    pub sharpness:         Option<f64>,
    pub noise:             Option<f64>,
    pub resolution_height: Option<u32>,
    pub fps:               Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioRoleFeatures {
    pub role:       Option<String>,
    pub prominence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraFeatures {
    pub shot:     Option<String>,
    pub movement: Option<String>,
    pub angle:    Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionFeatures {
    pub kind:          Option<String>,
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthFeatures {
    /// 0 = razor-thin focal plane, 1 = everything in focus.
    pub depth_of_field: Option<f64>,
    pub layers:         Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeFeatures {
    pub genre:      Option<String>,
    pub mood:       Option<String>,
    pub plot:       Option<String>,
    pub setting:    Option<String>,
    pub theme:      Option<String>,
    pub style:      Option<String>,
    pub scene_type: Option<String>,
}

impl NarrativeFeatures {
    fn facet(&self, domain: Domain) -> Option<&String> {
        match domain {
            Domain::Genre => self.genre.as_ref(),
            Domain::Mood => self.mood.as_ref(),
            Domain::Plot => self.plot.as_ref(),
            Domain::Setting => self.setting.as_ref(),
            Domain::Theme => self.theme.as_ref(),
            Domain::Style => self.style.as_ref(),
            Domain::SceneType => self.scene_type.as_ref(),
            _ => None,
        }
    }
}

/// A single narrative facet value (`genre = "noir thriller"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeLabel {
    pub facet: Domain,
    pub label: String,
}

// ─────────────────────────────────────────────
// Extraction
// ─────────────────────────────────────────────

/// Everything extracted from one artifact, keyed by domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Extraction {
    pub color:       Option<ColorFeatures>,
    pub sound:       Option<SoundFeatures>,
    pub motion:      Option<MotionFeatures>,
    pub lighting:    Option<LightingFeatures>,
    pub composition: Option<CompositionFeatures>,
    pub graphics:    Option<GraphicsFeatures>,
    pub temporal:    Option<TemporalFeatures>,
    pub technical:   Option<TechnicalFeatures>,
    pub audio_role:  Option<AudioRoleFeatures>,
    pub camera:      Option<CameraFeatures>,
    pub transition:  Option<TransitionFeatures>,
    pub depth:       Option<DepthFeatures>,
    pub narrative:   Option<NarrativeFeatures>,
}

impl Extraction {
    /// Validated feature values, one per populated domain, in [`Domain::ALL`]
    /// order. Narrative facets expand into their own domains.
    pub fn features(&self) -> Vec<(Domain, Result<FeatureValue, CoreError>)> {
        let mut out = Vec::new();

        macro_rules! push {
            ($field:ident, $domain:expr, $variant:ident) => {
                if let Some(f) = &self.$field {
                    out.push(($domain, FeatureValue::$variant(f.clone()).validated()));
                }
            };
        }

        push!(color, Domain::Color, Color);
        push!(sound, Domain::Sound, Sound);
        push!(motion, Domain::Motion, Motion);
        push!(lighting, Domain::Lighting, Lighting);
        push!(composition, Domain::Composition, Composition);
        push!(graphics, Domain::Graphics, Graphics);
        push!(temporal, Domain::Temporal, Temporal);
        push!(technical, Domain::Technical, Technical);
        push!(audio_role, Domain::AudioRole, AudioRole);
        push!(camera, Domain::Camera, Camera);
        push!(transition, Domain::Transition, Transition);
        push!(depth, Domain::Depth, Depth);

        if let Some(n) = &self.narrative {
            for facet in Domain::NARRATIVE {
                if let Some(label) = n.facet(facet) {
                    let value = FeatureValue::Narrative(NarrativeLabel { facet, label: label.clone() });
                    out.push((facet, value.validated()));
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.features().is_empty()
    }
}

// ─────────────────────────────────────────────
// FeatureValue
// ─────────────────────────────────────────────

/// A single domain's raw value, tagged by domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum FeatureValue {
    Color(ColorFeatures),
    Sound(SoundFeatures),
    Motion(MotionFeatures),
    Lighting(LightingFeatures),
    Composition(CompositionFeatures),
    Graphics(GraphicsFeatures),
    Temporal(TemporalFeatures),
    Technical(TechnicalFeatures),
    AudioRole(AudioRoleFeatures),
    Camera(CameraFeatures),
    Transition(TransitionFeatures),
    Depth(DepthFeatures),
    Narrative(NarrativeLabel),
}

impl FeatureValue {
    pub fn domain(&self) -> Domain {
        match self {
            FeatureValue::Color(_) => Domain::Color,
            FeatureValue::Sound(_) => Domain::Sound,
            FeatureValue::Motion(_) => Domain::Motion,
            FeatureValue::Lighting(_) => Domain::Lighting,
            FeatureValue::Composition(_) => Domain::Composition,
            FeatureValue::Graphics(_) => Domain::Graphics,
            FeatureValue::Temporal(_) => Domain::Temporal,
            FeatureValue::Technical(_) => Domain::Technical,
            FeatureValue::AudioRole(_) => Domain::AudioRole,
            FeatureValue::Camera(_) => Domain::Camera,
            FeatureValue::Transition(_) => Domain::Transition,
            FeatureValue::Depth(_) => Domain::Depth,
            FeatureValue::Narrative(n) => n.facet,
        }
    }

    /// The untagged raw fields, as persisted in `RegistryEntry::raw_value`.
    pub fn raw_value(&self) -> serde_json::Value {
        let v = match self {
            FeatureValue::Color(f) => serde_json::to_value(f),
            FeatureValue::Sound(f) => serde_json::to_value(f),
            FeatureValue::Motion(f) => serde_json::to_value(f),
            FeatureValue::Lighting(f) => serde_json::to_value(f),
            FeatureValue::Composition(f) => serde_json::to_value(f),
            FeatureValue::Graphics(f) => serde_json::to_value(f),
            FeatureValue::Temporal(f) => serde_json::to_value(f),
            FeatureValue::Technical(f) => serde_json::to_value(f),
            FeatureValue::AudioRole(f) => serde_json::to_value(f),
            FeatureValue::Camera(f) => serde_json::to_value(f),
            FeatureValue::Transition(f) => serde_json::to_value(f),
            FeatureValue::Depth(f) => serde_json::to_value(f),
            FeatureValue::Narrative(n) => Ok(serde_json::json!({ "label": n.label })),
        };
        // Plain structs of numbers and strings always serialize.
        v.unwrap_or(serde_json::Value::Null)
    }

    /// Check that the primary field of the domain is present and every
    /// number is finite.
    pub fn validate(&self) -> Result<(), CoreError> {
        let domain = self.domain();
        let fail = |reason: &str| Err(CoreError::InvalidFeature { domain, reason: reason.to_string() });

        let (primary_present, numbers): (bool, Vec<Option<f64>>) = match self {
            FeatureValue::Color(f) => (
                f.dominant_rgb.is_some(),
                f.dominant_rgb
                    .map(|c| c.iter().map(|v| Some(*v)).collect::<Vec<_>>())
                    .unwrap_or_default()
                    .into_iter()
                    .chain([f.saturation, f.brightness])
                    .collect(),
            ),
            FeatureValue::Sound(f) => (f.pitch_hz.is_some(), vec![f.pitch_hz, f.loudness_db]),
            FeatureValue::Motion(f) => (f.speed.is_some(), vec![f.speed, f.steadiness]),
            FeatureValue::Lighting(f) => (
                f.contrast.is_some() || f.brightness.is_some(),
                vec![f.brightness, f.contrast, f.temperature_k],
            ),
            FeatureValue::Composition(f) => (
                f.subject_x.is_some() || f.balance.is_some() || f.rule.is_some(),
                vec![f.subject_x, f.subject_y, f.balance],
            ),
            FeatureValue::Graphics(f) => (f.style.is_some(), vec![f.complexity]),
            FeatureValue::Temporal(f) => (f.pace.is_some(), vec![f.pace, f.duration_secs]),
            FeatureValue::Technical(f) => (
                f.sharpness.is_some() || f.noise.is_some(),
                vec![f.sharpness, f.noise, f.fps],
            ),
            FeatureValue::AudioRole(f) => (f.role.is_some(), vec![f.prominence]),
            FeatureValue::Camera(f) => (f.shot.is_some() || f.movement.is_some(), vec![]),
            FeatureValue::Transition(f) => (f.kind.is_some(), vec![f.duration_secs]),
            FeatureValue::Depth(f) => (f.depth_of_field.is_some(), vec![f.depth_of_field]),
            FeatureValue::Narrative(n) => {
                if !n.facet.is_narrative() {
                    return fail("narrative label on a non-narrative domain");
                }
                (!normalize_label(&n.label).is_empty(), vec![])
            }
        };

        if !primary_present {
            return fail("missing primary field");
        }
        if numbers.iter().flatten().any(|v| !v.is_finite()) {
            return fail("non-finite number");
        }
        Ok(())
    }

    fn validated(self) -> Result<FeatureValue, CoreError> {
        self.validate()?;
        Ok(self)
    }
}

/// Lower-case, trimmed, whitespace and hyphens folded to `_`.
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut pending_sep = false;
    for ch in label.trim().chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_sep = !out.is_empty();
            continue;
        }
        if pending_sep {
            out.push('_');
            pending_sep = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_extraction_deserializes() {
        let ex: Extraction = serde_json::from_str(
            r#"{ "color": { "dominant_rgb": [12, 200, 40] }, "narrative": { "mood": "Tense" } }"#,
        )
        .unwrap();
        let features = ex.features();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].0, Domain::Color);
        assert_eq!(features[1].0, Domain::Mood);
        assert!(features.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn invalid_domain_does_not_hide_others() {
        let ex = Extraction {
            color: Some(ColorFeatures::default()),
            motion: Some(MotionFeatures { speed: Some(0.4), ..Default::default() }),
            ..Default::default()
        };
        let features = ex.features();
        assert!(features[0].1.is_err());
        assert!(features[1].1.is_ok());
    }

    #[test]
    fn non_finite_rejected() {
        let v = FeatureValue::Lighting(LightingFeatures {
            contrast: Some(f64::NAN),
            ..Default::default()
        });
        assert!(matches!(v.validate(), Err(CoreError::InvalidFeature { domain: Domain::Lighting, .. })));
    }

    #[test]
    fn narrative_label_must_be_non_blank() {
        let v = FeatureValue::Narrative(NarrativeLabel { facet: Domain::Genre, label: "  ".into() });
        assert!(v.validate().is_err());
        let v = FeatureValue::Narrative(NarrativeLabel { facet: Domain::Color, label: "x".into() });
        assert!(v.validate().is_err());
    }

    #[test]
    fn labels_normalize() {
        assert_eq!(normalize_label("  Science-Fiction "), "science_fiction");
        assert_eq!(normalize_label("Close Up"), "close_up");
        assert_eq!(normalize_label("___"), "");
    }

    #[test]
    fn tagged_value_round_trips() {
        let v = FeatureValue::Camera(CameraFeatures { shot: Some("wide".into()), ..Default::default() });
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["domain"], "camera");
        let back: FeatureValue = serde_json::from_value(json).unwrap();
        assert_eq!(back, v);
        assert_eq!(v.raw_value()["shot"], "wide");
    }
}
