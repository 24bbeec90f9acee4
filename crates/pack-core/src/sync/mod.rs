//! Scope convergence: install, compose, diagnose, repair and remove

mod checks;
mod engine;
mod installer;
mod report;

pub use checks::evaluate_check;
pub use engine::{DEFAULT_CORE_TEMPLATE, SyncEngine};
pub use installer::{ComponentInstaller, InstallContext};
pub use report::{
    ConvergeReport, Diagnosis, DoctorReport, DoctorStatus, RemovalReport, RepairItem,
    RepairOutcome, RepairReport,
};
