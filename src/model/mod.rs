//! Data model: documents, pages, primitives, candidates, and the attempt
//! trail. Everything here is plain data — created per request, read by the
//! extraction components, discarded with the response.

mod candidate;
mod document;
mod geometry;
mod trail;

pub use candidate::{FigureCandidate, TableCandidate, TableKind};
pub use document::{Document, Page, PageSelection, PlacedImage, Word};
pub use geometry::Rect;
pub use trail::{AttemptOutcome, ExtractionAttempt, ExtractionTrail};
