//! # motif-core
//!
//! Pure, I/O-free building blocks of the discovery registry:
//!
//! - [`domain`]  : registry domains, storage groups and origin tables
//! - [`features`]: tagged per-domain feature structs and [`Extraction`]
//! - [`origins`] : the compiled-in Origin Catalog
//! - [`quantize`]: the lossy dedup key ([`Quantizer`])
//! - [`depth`]   : the Depth Decomposer ([`decompose`])
//!
//! ```rust
//! use motif_core::{decompose, ColorFeatures, FeatureValue, Quantizer};
//!
//! let v = FeatureValue::Color(ColorFeatures {
//!     dominant_rgb: Some([12.0, 200.0, 40.0]),
//!     ..Default::default()
//! });
//! assert_eq!(Quantizer::default().key(&v), "0_200_25");
//! let depth = decompose(&v);
//! assert!((depth.values().sum::<f64>() - 1.0).abs() < 1e-3);
//! ```

pub mod depth;
pub mod domain;
pub mod env;
pub mod error;
pub mod features;
pub mod origins;
pub mod quantize;

pub use depth::{decompose, DepthBreakdown};
pub use domain::{Domain, DomainGroup, OriginDomain};
pub use env::{env_flag, parse_flag};
pub use error::CoreError;
pub use features::{
    normalize_label, AudioRoleFeatures, CameraFeatures, ColorFeatures, CompositionFeatures,
    DepthFeatures, Extraction, FeatureValue, GraphicsFeatures, LightingFeatures, MotionFeatures,
    NarrativeFeatures, NarrativeLabel, SoundFeatures, TechnicalFeatures, TemporalFeatures,
    TransitionFeatures,
};
pub use origins::Origin;
pub use quantize::{Quantizer, Tolerances};
