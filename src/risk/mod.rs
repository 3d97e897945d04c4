//! Risk module
//!
//! Pure, stateless risk logic:
//! - Heuristic scoring of weather, traffic, time-of-day and situational inputs
//! - Hour-by-hour prediction with an injected random source
//! - The seeded catalog of accident hotspots

pub mod prediction;
pub mod scoring;
pub mod zones;

pub use prediction::{base_risk_for_hour, predict_risk_window, summarize};
pub use scoring::{RiskInputs, assess_risk};
pub use zones::ZoneCatalog;
