//! Supplementary pack checks run during diagnosis

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use pack_meta::SupplementaryCheck;
use pack_trust::{Error as TrustError, ScriptRunner};

use crate::scope::Scope;

use super::report::{Diagnosis, DoctorStatus};

/// Evaluate `check` for `scope`.
///
/// Exit code 0 is up to date; a non-zero exit or a timeout needs attention;
/// a check declared for the other kind of scope is not applicable.
pub fn evaluate_check(
    pack_id: &str,
    check: &SupplementaryCheck,
    scope: &Scope,
    runner: &dyn ScriptRunner,
    cwd: &Path,
    timeout: Duration,
) -> Diagnosis {
    let subject = format!("check {}/{}", pack_id, check.name);
    if !scope.admits(check.scope) {
        return Diagnosis::new(subject, DoctorStatus::NotApplicable, format!("not run in {}", scope));
    }

    match runner.run(&check.command, cwd, &BTreeMap::new(), timeout) {
        Ok(output) if output.success() => Diagnosis::new(subject, DoctorStatus::UpToDate, "passed"),
        Ok(output) => {
            let mut reason = match output.exit_code {
                Some(code) => format!("exited with code {}", code),
                None => "terminated by a signal".to_string(),
            };
            if let Some(line) = output.stderr.lines().find(|l| !l.trim().is_empty()) {
                reason.push_str(": ");
                reason.push_str(line.trim());
            }
            if let Some(fix) = &check.fix_command {
                reason.push_str(&format!(" (fix: {})", fix));
            }
            Diagnosis::new(subject, DoctorStatus::NeedsAttention, reason)
        }
        Err(TrustError::ScriptTimeout { timeout, .. }) => Diagnosis::new(
            subject,
            DoctorStatus::NeedsAttention,
            format!("timed out after {}s", timeout.as_secs_f64()),
        ),
        Err(e) => Diagnosis::new(subject, DoctorStatus::NeedsAttention, e.to_string()),
    }
}
