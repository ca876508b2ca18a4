//! Media Artifact Store: interview recordings keyed by (application, candidate),
//! served with HTTP byte-range semantics.

pub mod handlers;
pub mod range;
pub mod store;

pub use store::MediaStore;
