pub mod bootstrap;
pub mod detector;
pub mod error;
pub mod registry;
pub mod search;
pub mod source;
pub mod text;
pub mod types;

pub use bootstrap::{BootstrapReport, STATUS_CLOSED};
pub use detector::{DEFAULT_EMBED_TIMEOUT, Detector, DetectorConfig};
pub use error::{DedupError, SourceError};
pub use registry::{ApplicationIndex, IndexRegistry};
pub use search::SearchSettings;
pub use source::{BugSource, HttpBugSource, HttpSourceConfig};
pub use text::normalize;
pub use types::{BugRecord, BugText, IndexKind, SearchResult, UserSteps};
