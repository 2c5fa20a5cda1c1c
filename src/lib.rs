// Fleet Status - Core Library
// Vehicle name matching + batch condition updates, shared by the CLI and tests

pub mod batch;
pub mod config;
pub mod db;
pub mod duplicates;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod status;
pub mod validation;

// Re-export commonly used types
pub use batch::{
    BatchProcessor, BatchReport, FailedItem, ItemOutcome, StatusUpdateRequest, UnchangedItem,
    UpdatedItem,
};
pub use config::{FleetConfig, MaintenanceConfig, MatchingConfig};
pub use db::{
    get_events_for_entity, insert_event, insert_vehicle, load_requests_csv, load_vehicles_csv,
    setup_database, verify_count, Event, EventAuditLog, NewVehicle, SqliteRegistry,
};
pub use duplicates::{resolve_duplicates, DuplicateGroup, DuplicateResolver, ResolutionCriteria};
pub use error::{FailureKind, InputError, UpdateError};
pub use matching::{Candidate, MatchResult, MatchType, VehicleResolver};
pub use normalize::{distance, normalize_name, similarity};
pub use registry::{
    AuditLog, InMemoryRegistry, NullAudit, StatusStatistics, VehicleRecord, VehicleRegistry,
};
pub use report::render_text;
pub use status::{CanonicalStatus, StatusNormalizer};
pub use validation::{
    MaintenanceCheck, TransitionCheck, TransitionKind, TransitionValidator, ValidationOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
