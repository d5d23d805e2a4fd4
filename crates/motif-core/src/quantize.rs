//! Quantizer: maps a raw feature value to a stable, lossy dedup key.
//!
//! Every numeric field is clamped into its valid range and floored onto a
//! per-domain step, so values that differ by less than the tolerance share a
//! key. Labels are normalised with [`normalize_label`]. Missing optional
//! fields fall back to a fixed default, which keeps `key` total.
//!
//! | Domain      | Key shape                              |
//! |-------------|----------------------------------------|
//! | color       | `r_g_b`                                |
//! | sound       | `o<octave>\|l<loudness>\|<timbre>`     |
//! | motion      | `s<speed>\|st<steadiness>\|<direction>`|
//! | narrative   | `<label>`                              |
//! | others      | fields joined with `\|`                |

use serde::{Deserialize, Serialize};

use crate::features::{normalize_label, FeatureValue};

/// Absorbs representation error such as `0.3 / 0.1 = 2.9999999999999996`.
const JITTER_EPSILON: f64 = 1e-9;

const MISSING: &str = "-";

/// Per-domain quantization steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Step per RGB channel.
    pub color_step:               u32,
    /// Step on the log2(Hz) axis.
    pub sound_octave_step:        f64,
    pub sound_loudness_step:      f64,
    pub motion_speed_step:        f64,
    pub motion_steadiness_step:   f64,
    pub lighting_step:            f64,
    pub lighting_temperature_step: f64,
    pub composition_step:         f64,
    pub composition_balance_step: f64,
    pub graphics_complexity_step: f64,
    pub temporal_pace_step:       f64,
    pub temporal_duration_step:   f64,
    pub technical_step:           f64,
    pub audio_prominence_step:    f64,
    pub transition_duration_step: f64,
    pub depth_of_field_step:      f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            color_step:                25,
            sound_octave_step:         0.5,
            sound_loudness_step:       6.0,
            motion_speed_step:         0.1,
            motion_steadiness_step:    0.25,
            lighting_step:             0.1,
            lighting_temperature_step: 500.0,
            composition_step:          0.1,
            composition_balance_step:  0.2,
            graphics_complexity_step:  0.2,
            temporal_pace_step:        2.0,
            temporal_duration_step:    5.0,
            technical_step:            0.1,
            audio_prominence_step:     0.25,
            transition_duration_step:  0.25,
            depth_of_field_step:       0.1,
        }
    }
}

impl Tolerances {
    /// Defaults, overridden by `MOTIF_<FIELD>` environment variables
    /// (e.g. `MOTIF_COLOR_STEP=32`).
    pub fn from_env() -> Self {
        fn env_f64(key: &str, default: f64) -> f64 {
            std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
        }
        let d = Self::default();
        Self {
            color_step: std::env::var("MOTIF_COLOR_STEP")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(d.color_step),
            sound_octave_step:         env_f64("MOTIF_SOUND_OCTAVE_STEP", d.sound_octave_step),
            sound_loudness_step:       env_f64("MOTIF_SOUND_LOUDNESS_STEP", d.sound_loudness_step),
            motion_speed_step:         env_f64("MOTIF_MOTION_SPEED_STEP", d.motion_speed_step),
            motion_steadiness_step:    env_f64("MOTIF_MOTION_STEADINESS_STEP", d.motion_steadiness_step),
            lighting_step:             env_f64("MOTIF_LIGHTING_STEP", d.lighting_step),
            lighting_temperature_step: env_f64("MOTIF_LIGHTING_TEMPERATURE_STEP", d.lighting_temperature_step),
            composition_step:          env_f64("MOTIF_COMPOSITION_STEP", d.composition_step),
            composition_balance_step:  env_f64("MOTIF_COMPOSITION_BALANCE_STEP", d.composition_balance_step),
            graphics_complexity_step:  env_f64("MOTIF_GRAPHICS_COMPLEXITY_STEP", d.graphics_complexity_step),
            temporal_pace_step:        env_f64("MOTIF_TEMPORAL_PACE_STEP", d.temporal_pace_step),
            temporal_duration_step:    env_f64("MOTIF_TEMPORAL_DURATION_STEP", d.temporal_duration_step),
            technical_step:            env_f64("MOTIF_TECHNICAL_STEP", d.technical_step),
            audio_prominence_step:     env_f64("MOTIF_AUDIO_PROMINENCE_STEP", d.audio_prominence_step),
            transition_duration_step:  env_f64("MOTIF_TRANSITION_DURATION_STEP", d.transition_duration_step),
            depth_of_field_step:       env_f64("MOTIF_DEPTH_OF_FIELD_STEP", d.depth_of_field_step),
        }
    }
}

/// Deterministic key function over all domains.
#[derive(Debug, Clone, Default)]
pub struct Quantizer {
    tolerances: Tolerances,
}

impl Quantizer {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    pub fn key(&self, value: &FeatureValue) -> String {
        let t = &self.tolerances;
        match value {
            FeatureValue::Color(f) => {
                let step = t.color_step.max(1) as f64;
                let [r, g, b] = f.dominant_rgb.unwrap_or([0.0; 3]);
                [r, g, b]
                    .iter()
                    .map(|c| fmt(bucket(*c, step, 0.0, 255.0), 0))
                    .collect::<Vec<_>>()
                    .join("_")
            }
            FeatureValue::Sound(f) => {
                let octave = f.pitch_hz.unwrap_or(440.0).clamp(20.0, 20_000.0).log2();
                join(&[
                    format!("o{}", fmt(bucket(octave, t.sound_octave_step, 4.0, 15.0), 2)),
                    format!("l{}", fmt(bucket(f.loudness_db.unwrap_or(-20.0), t.sound_loudness_step, -80.0, 0.0), 0)),
                    label(f.timbre.as_deref()),
                ])
            }
            FeatureValue::Motion(f) => join(&[
                format!("s{}", fmt(unit(f.speed, 0.0, t.motion_speed_step), 2)),
                format!("st{}", fmt(unit(f.steadiness, 1.0, t.motion_steadiness_step), 2)),
                label(f.direction.as_deref()),
            ]),
            FeatureValue::Lighting(f) => join(&[
                format!("b{}", fmt(unit(f.brightness, 0.5, t.lighting_step), 2)),
                format!("c{}", fmt(unit(f.contrast, 0.4, t.lighting_step), 2)),
                match f.temperature_k {
                    Some(k) => format!("t{}", fmt(bucket(k, t.lighting_temperature_step, 1_000.0, 12_000.0), 0)),
                    None => MISSING.to_string(),
                },
            ]),
            FeatureValue::Composition(f) => join(&[
                format!("x{}", fmt(unit(f.subject_x, 0.5, t.composition_step), 2)),
                format!("y{}", fmt(unit(f.subject_y, 0.5, t.composition_step), 2)),
                format!("bal{}", fmt(unit(f.balance, 0.5, t.composition_balance_step), 2)),
                label(f.rule.as_deref()),
            ]),
            FeatureValue::Graphics(f) => join(&[
                label(f.style.as_deref()),
                format!("cx{}", fmt(unit(f.complexity, 0.5, t.graphics_complexity_step), 2)),
            ]),
            FeatureValue::Temporal(f) => join(&[
                format!("p{}", fmt(bucket(f.pace.unwrap_or(0.0), t.temporal_pace_step, 0.0, 120.0), 0)),
                match f.duration_secs {
                    Some(d) => format!("d{}", fmt(bucket(d, t.temporal_duration_step, 0.0, 3_600.0), 0)),
                    None => MISSING.to_string(),
                },
            ]),
            FeatureValue::Technical(f) => join(&[
                format!("sh{}", fmt(unit(f.sharpness, 0.5, t.technical_step), 2)),
                format!("n{}", fmt(unit(f.noise, 0.0, t.technical_step), 2)),
                f.resolution_height
                    .map(|h| format!("r{}", h.clamp(1, 8_640)))
                    .unwrap_or_else(|| MISSING.to_string()),
                f.fps
                    .map(|v| format!("f{}", fmt(v.clamp(1.0, 240.0).round(), 0)))
                    .unwrap_or_else(|| MISSING.to_string()),
            ]),
            FeatureValue::AudioRole(f) => join(&[
                label(f.role.as_deref()),
                format!("pr{}", fmt(unit(f.prominence, 0.5, t.audio_prominence_step), 2)),
            ]),
            FeatureValue::Camera(f) => join(&[
                label(f.shot.as_deref()),
                label(f.movement.as_deref()),
                label(f.angle.as_deref()),
            ]),
            FeatureValue::Transition(f) => join(&[
                label(f.kind.as_deref()),
                match f.duration_secs {
                    Some(d) => format!("d{}", fmt(bucket(d, t.transition_duration_step, 0.0, 10.0), 2)),
                    None => MISSING.to_string(),
                },
            ]),
            FeatureValue::Depth(f) => join(&[
                format!("dof{}", fmt(unit(f.depth_of_field, 0.5, t.depth_of_field_step), 2)),
                f.layers
                    .map(|l| format!("l{}", l.clamp(1, 16)))
                    .unwrap_or_else(|| MISSING.to_string()),
            ]),
            FeatureValue::Narrative(n) => normalize_label(&n.label),
        }
    }
}

/// Clamp into `[lo, hi]` and floor onto `step`. Non-finite input clamps to `lo`.
pub fn bucket(value: f64, step: f64, lo: f64, hi: f64) -> f64 {
    let v = if value.is_finite() { value.clamp(lo, hi) } else { lo };
    if !(step > 0.0 && step.is_finite()) {
        return v;
    }
    // `+ 0.0` folds -0.0 into 0.0 so keys never print a sign on zero.
    (v / step + JITTER_EPSILON).floor() * step + 0.0
}

fn unit(value: Option<f64>, default: f64, step: f64) -> f64 {
    bucket(value.unwrap_or(default), step, 0.0, 1.0)
}

fn fmt(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value + 0.0)
}

fn label(value: Option<&str>) -> String {
    value
        .map(normalize_label)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| MISSING.to_string())
}

fn join(parts: &[String]) -> String {
    parts.join("|")
}
