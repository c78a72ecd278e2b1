//! Core types and pure domain rules shared by every cancoat crate.

pub mod coating;
pub mod era;
pub mod filters;
pub mod record;

pub use coating::{COATING_CHOICES, is_known_coating};
pub use era::{Era, determine_era};
pub use filters::{CoreError, YearRange};
pub use record::{Classification, ClassifiedPatent, PatentRecord};
