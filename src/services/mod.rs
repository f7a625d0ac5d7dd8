//! Service layer for Corporatica business logic.
//!
//! Services are used by both the HTTP server and the CLI.

pub mod accounts;
pub mod artifacts;
pub mod imaging;
pub mod render;
pub mod search_index;
pub mod tabular;
pub mod text;

pub use accounts::AccountService;
pub use artifacts::{ArtifactService, Upload};
pub use search_index::SearchIndex;
