//! Domain models for Corporatica.

mod artifact;
mod user;

pub use artifact::{ArtifactKind, StoredArtifact};
pub use user::User;
