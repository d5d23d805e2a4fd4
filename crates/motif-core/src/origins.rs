//! Origin Catalog: the fixed, compiled-in primitive vocabulary.
//!
//! Each [`OriginDomain`] owns one table. The first row of every table is the
//! domain's canonical default, used when a value cannot be attributed to
//! anything else.
//!
//! Continuous tables carry a reference vector:
//!
//! | Table        | Reference                                   |
//! |--------------|---------------------------------------------|
//! | color        | sRGB triple, 0..255                         |
//! | lighting     | contrast bucket centre, 0..1                |
//! | motion       | speed, 0..1                                 |
//! | composition  | centredness, 0 (edge) .. 1 (dead centre)    |
//! | temporal     | normalised pace (cuts/min ÷ 60), 0..1       |
//! | technical    | quality score, 0..1                         |
//! | depth        | depth of field, 0 (shallow) .. 1 (deep)     |
//! | audio        | log2 frequency (bands only)                 |
//!
//! Categorical rows (camera shots, transitions, graphics styles, audio roles,
//! narrative labels) carry an empty vector; the name is the category.
//! Narrative rows are namespaced `facet.label`.

use serde::Serialize;

use crate::domain::OriginDomain;

/// One primitive reference value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Origin {
    pub domain:    OriginDomain,
    pub name:      &'static str,
    pub reference: &'static [f64],
}

impl Origin {
    pub fn is_categorical(&self) -> bool {
        self.reference.is_empty()
    }
}

type Table = &'static [(&'static str, &'static [f64])];

const COLOR: Table = &[
    ("gray", &[128.0, 128.0, 128.0]),
    ("red", &[255.0, 0.0, 0.0]),
    ("orange", &[255.0, 165.0, 0.0]),
    ("yellow", &[255.0, 255.0, 0.0]),
    ("green", &[0.0, 255.0, 0.0]),
    ("cyan", &[0.0, 255.0, 255.0]),
    ("blue", &[0.0, 0.0, 255.0]),
    ("purple", &[128.0, 0.0, 128.0]),
    ("magenta", &[255.0, 0.0, 255.0]),
    ("pink", &[255.0, 192.0, 203.0]),
    ("brown", &[139.0, 69.0, 19.0]),
    ("white", &[255.0, 255.0, 255.0]),
    ("black", &[0.0, 0.0, 0.0]),
];

const LIGHTING: Table = &[
    ("normal", &[0.4]),
    ("flat", &[0.1]),
    ("high", &[0.7]),
    ("chiaroscuro", &[0.95]),
];

const MOTION: Table = &[
    ("steady", &[0.45]),
    ("still", &[0.0]),
    ("drift", &[0.2]),
    ("brisk", &[0.7]),
    ("frantic", &[1.0]),
];

const CAMERA: Table = &[
    ("medium", &[]),
    ("extreme_wide", &[]),
    ("wide", &[]),
    ("medium_close", &[]),
    ("close_up", &[]),
    ("extreme_close_up", &[]),
    ("overhead", &[]),
    ("pov", &[]),
];

const COMPOSITION: Table = &[
    ("rule_of_thirds", &[0.667]),
    ("edge_weighted", &[0.0]),
    ("dynamic", &[0.333]),
    ("centered", &[1.0]),
];

const TEMPORAL: Table = &[
    ("measured", &[0.25]),
    ("languid", &[0.0]),
    ("lively", &[0.5]),
    ("rapid", &[0.75]),
    ("frenetic", &[1.0]),
];

const TRANSITION: Table = &[
    ("cut", &[]),
    ("fade", &[]),
    ("dissolve", &[]),
    ("wipe", &[]),
    ("match_cut", &[]),
    ("whip_pan", &[]),
    ("iris", &[]),
];

const GRAPHICS: Table = &[
    ("photoreal", &[]),
    ("flat", &[]),
    ("line_art", &[]),
    ("painterly", &[]),
    ("pixel", &[]),
    ("cel_shaded", &[]),
    ("low_poly", &[]),
    ("collage", &[]),
];

// Frequency bands are log2(Hz).
const AUDIO: Table = &[
    ("mid", &[9.9658]),
    ("sub_bass", &[5.3219]),
    ("bass", &[6.9069]),
    ("low_mid", &[8.6439]),
    ("high_mid", &[11.5507]),
    ("treble", &[12.9658]),
    ("music", &[]),
    ("dialogue", &[]),
    ("ambience", &[]),
    ("sfx", &[]),
    ("silence", &[]),
];

const NARRATIVE: Table = &[
    ("genre.drama", &[]),
    ("genre.comedy", &[]),
    ("genre.thriller", &[]),
    ("genre.horror", &[]),
    ("genre.romance", &[]),
    ("genre.documentary", &[]),
    ("genre.fantasy", &[]),
    ("genre.science_fiction", &[]),
    ("mood.neutral", &[]),
    ("mood.joyful", &[]),
    ("mood.melancholic", &[]),
    ("mood.tense", &[]),
    ("mood.serene", &[]),
    ("mood.eerie", &[]),
    ("mood.triumphant", &[]),
    ("plot.exposition", &[]),
    ("plot.rising_action", &[]),
    ("plot.climax", &[]),
    ("plot.falling_action", &[]),
    ("plot.resolution", &[]),
    ("setting.interior", &[]),
    ("setting.urban", &[]),
    ("setting.rural", &[]),
    ("setting.wilderness", &[]),
    ("setting.space", &[]),
    ("setting.underwater", &[]),
    ("theme.identity", &[]),
    ("theme.love", &[]),
    ("theme.loss", &[]),
    ("theme.power", &[]),
    ("theme.freedom", &[]),
    ("theme.nature", &[]),
    ("style.naturalistic", &[]),
    ("style.stylized", &[]),
    ("style.surreal", &[]),
    ("style.noir", &[]),
    ("style.minimalist", &[]),
    ("scene_type.dialogue", &[]),
    ("scene_type.action", &[]),
    ("scene_type.montage", &[]),
    ("scene_type.establishing", &[]),
    ("scene_type.transition", &[]),
];

const TECHNICAL: Table = &[
    ("clean", &[0.667]),
    ("raw", &[0.0]),
    ("rough", &[0.333]),
    ("pristine", &[1.0]),
];

const DEPTH: Table = &[
    ("moderate", &[0.5]),
    ("shallow", &[0.15]),
    ("deep", &[0.85]),
];

fn table(domain: OriginDomain) -> Table {
    match domain {
        OriginDomain::Color => COLOR,
        OriginDomain::Lighting => LIGHTING,
        OriginDomain::Motion => MOTION,
        OriginDomain::Camera => CAMERA,
        OriginDomain::Composition => COMPOSITION,
        OriginDomain::Temporal => TEMPORAL,
        OriginDomain::Transition => TRANSITION,
        OriginDomain::Graphics => GRAPHICS,
        OriginDomain::Audio => AUDIO,
        OriginDomain::Narrative => NARRATIVE,
        OriginDomain::Technical => TECHNICAL,
        OriginDomain::Depth => DEPTH,
    }
}

/// `(name, reference_vector)` rows of one table, in catalog order.
pub fn list(domain: OriginDomain) -> Vec<(&'static str, &'static [f64])> {
    table(domain).to_vec()
}

/// Typed rows of one table.
pub fn origins(domain: OriginDomain) -> impl Iterator<Item = Origin> {
    table(domain).iter().map(move |&(name, reference)| Origin { domain, name, reference })
}

pub fn find(domain: OriginDomain, name: &str) -> Option<Origin> {
    origins(domain).find(|o| o.name == name)
}

/// The canonical default row of a table.
pub fn default_origin(domain: OriginDomain) -> Origin {
    let (name, reference) = table(domain)[0];
    Origin { domain, name, reference }
}

/// Narrative rows belonging to one facet (`"genre"`, `"mood"`, ...).
pub fn narrative_facet(facet: &str) -> impl Iterator<Item = Origin> + '_ {
    origins(OriginDomain::Narrative).filter(move |o| {
        o.name
            .split_once('.')
            .map(|(f, _)| f == facet)
            .unwrap_or(false)
    })
}

/// Total number of compiled-in origins across all tables.
pub fn len() -> usize {
    OriginDomain::ALL.iter().map(|d| table(*d).len()).sum()
}
