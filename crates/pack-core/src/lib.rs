//! State tracking and convergence for packs
//!
//! This crate owns everything the engine persists for a scope:
//!
//! - [`ScopeState`]: configured packs and what each installation created
//! - [`Manifest`]: content hashes of copied files
//! - [`ProjectIndex`]: which scopes use which packs
//!
//! On top of those it provides cross-scope reference counting for shared
//! resources ([`ResourceReferenceCounter`]), removal planning, and the
//! [`SyncEngine`] that converges a scope toward its selected packs.

pub mod config;
pub mod error;
pub mod index;
pub mod lock;
pub mod manifest;
pub mod refcount;
pub mod removal;
pub mod scope;
pub mod state;
pub mod sync;

pub use config::{EngineConfig, TOOL_VERSION};
pub use error::{Error, Result};
pub use index::ProjectIndex;
pub use lock::EngineLock;
pub use manifest::{FileStatus, Manifest};
pub use refcount::{Holder, Resource, ResourceReferenceCounter, Verdict};
pub use removal::{RemovalPlan, RemovalPlanner};
pub use scope::{GLOBAL_SENTINEL, Scope};
pub use state::{ArtifactRecord, ScopeState, ServiceEntryRef};
pub use sync::{
    ComponentInstaller, ConvergeReport, Diagnosis, DoctorReport, DoctorStatus, InstallContext,
    RemovalReport, RepairOutcome, RepairReport, SyncEngine,
};
