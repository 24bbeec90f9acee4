//! Report types for convergence, diagnosis, repair and removal

use serde::{Deserialize, Serialize};

use crate::refcount::Resource;
use crate::removal::RemovalPlan;

/// Outcome vocabulary of diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoctorStatus {
    UpToDate,
    /// Repair would fix it.
    Outdated,
    /// A human has to look at it.
    NeedsAttention,
    /// Does not apply to this scope.
    NotApplicable,
}

impl DoctorStatus {
    fn severity(self) -> u8 {
        match self {
            Self::NotApplicable => 0,
            Self::UpToDate => 1,
            Self::Outdated => 2,
            Self::NeedsAttention => 3,
        }
    }
}

/// One diagnosed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// What was checked, e.g. `section core` or `file skills/a.md`.
    pub subject: String,
    pub status: DoctorStatus,
    pub reason: String,
}

impl Diagnosis {
    pub fn new(subject: impl Into<String>, status: DoctorStatus, reason: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            status,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorReport {
    pub items: Vec<Diagnosis>,
}

impl DoctorReport {
    /// The most severe status reported, or `NotApplicable` for an empty report.
    pub fn overall(&self) -> DoctorStatus {
        self.items
            .iter()
            .map(|d| d.status)
            .max_by_key(|s| s.severity())
            .unwrap_or(DoctorStatus::NotApplicable)
    }

    pub fn find(&self, subject: &str) -> Option<&Diagnosis> {
        self.items.iter().find(|d| d.subject == subject)
    }
}

/// Outcome vocabulary of repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepairOutcome {
    Repaired,
    NotRepairable,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairItem {
    pub subject: String,
    pub outcome: RepairOutcome,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairReport {
    pub items: Vec<RepairItem>,
    /// Whether anything on disk changed.
    pub changed: bool,
}

impl RepairReport {
    pub fn push(&mut self, subject: impl Into<String>, outcome: RepairOutcome, reason: impl Into<String>) {
        self.items.push(RepairItem {
            subject: subject.into(),
            outcome,
            reason: reason.into(),
        });
    }

    pub fn with_outcome(&self, outcome: RepairOutcome) -> Vec<&RepairItem> {
        self.items.iter().filter(|i| i.outcome == outcome).collect()
    }
}

/// Result of a convergence run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeReport {
    /// Component ids in installation order.
    pub installed: Vec<String>,
    /// Dependencies pulled in that were not selected.
    pub added_dependencies: Vec<String>,
    /// Sections written or refreshed in the generated file.
    pub sections_written: Vec<String>,
    /// Sections left alone because their markers are malformed.
    pub sections_skipped: Vec<String>,
    /// Copied files whose hash was recorded.
    pub files_recorded: Vec<String>,
    /// Whether the generated file changed.
    pub file_changed: bool,
}

/// Result of removing a pack from a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalReport {
    pub plan: RemovalPlan,
    pub sections_removed: Vec<String>,
    pub files_deleted: Vec<String>,
    /// Copied files kept because they were edited after install.
    pub files_kept: Vec<String>,
}

impl RemovalReport {
    /// Shared resources the caller should now uninstall.
    pub fn to_uninstall(&self) -> &[Resource] {
        &self.plan.remove
    }
}
