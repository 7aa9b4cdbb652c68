mod metrics;
mod models;
mod position;
mod store;
mod wallet;

// Publicly expose the Metrics abstraction
pub use metrics::{Metrics, MetricsPtr};

// Check-in data model
pub use models::{subject_label, AttendanceRecord, GeoPoint, Subject, SUBJECTS};

// Collaborator abstractions: storage backend, position source, wallet provider
pub use position::{FixErrorKind, PositionOptions, PositionSource, PositionSourcePtr, ReportedFix};
pub use store::{KeyValueStore, StorePtr};
pub use wallet::{ProviderEvent, WalletProvider, WalletProviderPtr};
