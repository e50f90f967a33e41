//! `leadbase-recon` — Record reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded datasets and records, returns
//! classified and merged results. No file, network or CLI dependencies.

pub mod channel;
pub mod classify;
pub mod config;
pub mod error;
pub mod merge;
pub mod model;
pub mod normalize;

pub use channel::{ChannelClassifier, ChannelKind, PrefixClassifier};
pub use classify::classify;
pub use config::{ColumnMap, MergeConfig};
pub use error::ReconError;
pub use merge::reconcile;
pub use model::{BusinessRecord, CellType, Classification, Dataset, DuplicateReport, Field, MergeStats};
pub use normalize::{normalize_key, Key};
