//! Depth Decomposer: expresses a raw value as weights over nearby origins.
//!
//! Three strategies, chosen per domain:
//!
//! - **Two-nearest blend** (color, sound bands, motion, composition,
//!   temporal, technical, depth). With the two nearest origins at distances
//!   `d1 <= d2`, the second gets `d1 / (d1 + d2)` and the first the rest.
//! - **Bucket scores** (lighting). One unnormalised score per bucket from a
//!   piecewise-linear function of contrast, negatives clipped, normalised by
//!   the sum; a non-positive sum forces the default bucket to 1.
//! - **One-hot** (camera, transition, graphics, audio role, narrative).
//!   Unknown labels go entirely to the table's default origin.
//!
//! Every output is rounded to [`WEIGHT_DECIMALS`] and sums to 1.

use std::collections::BTreeMap;

use crate::domain::{Domain, OriginDomain};
use crate::features::{normalize_label, FeatureValue};
use crate::origins::{self, Origin};

/// Origin name → weight. Ordered so persisted JSON is stable.
pub type DepthBreakdown = BTreeMap<String, f64>;

pub const WEIGHT_DECIMALS: i32 = 4;

const DISTANCE_EPSILON: f64 = 1e-12;

/// Decompose a validated feature value.
pub fn decompose(value: &FeatureValue) -> DepthBreakdown {
    let domain = value.domain();
    let table = domain.origin_domain();

    let weights = match value {
        FeatureValue::Color(f) => {
            let rgb = f.dominant_rgb.unwrap_or([0.0; 3]).map(|c| clamp_finite(c, 0.0, 255.0));
            nearest_blend(table, &rgb)
        }
        FeatureValue::Sound(f) => {
            let octave = clamp_finite(f.pitch_hz.unwrap_or(440.0), 20.0, 20_000.0).log2();
            nearest_blend(table, &[octave])
        }
        FeatureValue::Motion(f) => nearest_blend(table, &[unit(f.speed, 0.0)]),
        FeatureValue::Lighting(f) => lighting_buckets(unit(f.contrast, 0.4)),
        FeatureValue::Composition(f) => nearest_blend(table, &[centredness(f.subject_x, f.subject_y)]),
        FeatureValue::Temporal(f) => {
            let pace = clamp_finite(f.pace.unwrap_or(0.0), 0.0, 60.0) / 60.0;
            nearest_blend(table, &[pace])
        }
        FeatureValue::Technical(f) => {
            let quality = (unit(f.sharpness, 0.5) + (1.0 - unit(f.noise, 0.0))) / 2.0;
            nearest_blend(table, &[quality])
        }
        FeatureValue::Depth(f) => nearest_blend(table, &[unit(f.depth_of_field, 0.5)]),
        FeatureValue::Graphics(f) => one_hot(table, None, f.style.as_deref()),
        FeatureValue::AudioRole(f) => one_hot(table, None, f.role.as_deref()),
        FeatureValue::Camera(f) => one_hot(table, None, f.shot.as_deref()),
        FeatureValue::Transition(f) => one_hot(table, None, f.kind.as_deref()),
        FeatureValue::Narrative(n) => one_hot(table, Some(n.facet), Some(&n.label)),
    };

    finalize(weights)
}

// ─────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────

/// Two-nearest blend over the continuous rows of `table` whose reference
/// dimension matches `point`.
pub fn nearest_blend(table: OriginDomain, point: &[f64]) -> Vec<(String, f64)> {
    let candidates: Vec<(&'static str, f64)> = origins::origins(table)
        .filter(|o| o.reference.len() == point.len() && !point.is_empty())
        .map(|o| (o.name, euclidean(o.reference, point)))
        .collect();

    if candidates.is_empty() {
        return vec![(origins::default_origin(table).name.to_string(), 1.0)];
    }
    two_nearest(&candidates)
}

/// Core blend rule over `(name, distance)` candidates.
///
/// Ties keep candidate order, so the outcome is deterministic.
pub fn two_nearest(candidates: &[(&str, f64)]) -> Vec<(String, f64)> {
    let mut sorted: Vec<(&str, f64)> = candidates.to_vec();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    match sorted.as_slice() {
        [] => Vec::new(),
        [(only, _)] => vec![(only.to_string(), 1.0)],
        [(first, d1), (second, d2), ..] => {
            let total = d1 + d2;
            if total <= DISTANCE_EPSILON {
                return vec![(first.to_string(), 0.5), (second.to_string(), 0.5)];
            }
            let w2 = d1 / total;
            vec![(first.to_string(), 1.0 - w2), (second.to_string(), w2)]
        }
    }
}

/// Normalised bucket scores with a forced default when nothing scores.
pub fn bucket_blend(scores: &[(&str, f64)], default: &str) -> Vec<(String, f64)> {
    let clipped: Vec<(&str, f64)> = scores
        .iter()
        .map(|&(name, s)| (name, if s.is_finite() { s.max(0.0) } else { 0.0 }))
        .collect();
    let sum: f64 = clipped.iter().map(|(_, s)| s).sum();
    if sum <= 0.0 {
        return vec![(default.to_string(), 1.0)];
    }
    clipped
        .into_iter()
        .map(|(name, s)| (name.to_string(), s / sum))
        .collect()
}

fn lighting_buckets(contrast: f64) -> Vec<(String, f64)> {
    let scores = [
        ("flat", 0.35 - contrast),
        ("normal", 0.25 - (contrast - 0.4).abs()),
        ("high", 0.25 - (contrast - 0.7).abs()),
        ("chiaroscuro", contrast - 0.75),
    ];
    bucket_blend(&scores, origins::default_origin(OriginDomain::Lighting).name)
}

/// All weight on the origin matching `label`, or on the default row.
fn one_hot(table: OriginDomain, facet: Option<Domain>, label: Option<&str>) -> Vec<(String, f64)> {
    let label = label.map(normalize_label).unwrap_or_default();

    let hit: Option<Origin> = match facet {
        Some(f) => origins::find(table, &format!("{}.{}", f.as_str(), label)),
        None => origins::origins(table)
            .filter(|o| o.is_categorical())
            .find(|o| o.name == label),
    };

    let name = match (hit, facet) {
        (Some(o), _) => o.name,
        (None, Some(f)) => origins::narrative_facet(f.as_str())
            .next()
            .map(|o| o.name)
            .unwrap_or(origins::default_origin(table).name),
        (None, None) => origins::origins(table)
            .find(|o| o.is_categorical())
            .map(|o| o.name)
            .unwrap_or(origins::default_origin(table).name),
    };
    vec![(name.to_string(), 1.0)]
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Round, drop zero weights and push any rounding residue onto the largest
/// weight so the total is exactly representable as 1 at `WEIGHT_DECIMALS`.
fn finalize(weights: Vec<(String, f64)>) -> DepthBreakdown {
    let scale = 10f64.powi(WEIGHT_DECIMALS);
    let mut out = DepthBreakdown::new();
    for (name, w) in weights {
        let w = (w.max(0.0) * scale).round() / scale;
        if w > 0.0 {
            *out.entry(name).or_insert(0.0) += w;
        }
    }
    if out.is_empty() {
        return out;
    }
    let residue = 1.0 - out.values().sum::<f64>();
    if residue.abs() > f64::EPSILON {
        if let Some(max) = out
            .values_mut()
            .max_by(|a, b| a.total_cmp(b))
        {
            *max = ((*max + residue) * scale).round() / scale;
        }
    }
    out
}

pub fn weight_sum(breakdown: &DepthBreakdown) -> f64 {
    breakdown.values().sum()
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

fn clamp_finite(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_finite() { v.clamp(lo, hi) } else { lo }
}

fn unit(v: Option<f64>, default: f64) -> f64 {
    clamp_finite(v.unwrap_or(default), 0.0, 1.0)
}

/// 1 at dead centre, 0 on the frame edge (Chebyshev distance from centre).
fn centredness(x: Option<f64>, y: Option<f64>) -> f64 {
    let dx = (unit(x, 0.5) - 0.5).abs();
    let dy = (unit(y, 0.5) - 0.5).abs();
    1.0 - 2.0 * dx.max(dy)
}
