use serde::{Deserialize, Serialize};

/// Snapshot of a provisioning state at the moment the gateway answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmStatus {
    Provisioning,
    Succeeded,
    Failed,
}

impl VmStatus {
    /// Map the provider's `provisioningState` onto the three states we expose.
    /// Anything still in flight (`Creating`, `Updating`, missing) counts as
    /// provisioning.
    pub fn from_provisioning_state(state: Option<&str>) -> Self {
        match state {
            Some(s) if s.eq_ignore_ascii_case("succeeded") => VmStatus::Succeeded,
            Some(s) if s.eq_ignore_ascii_case("failed") || s.eq_ignore_ascii_case("canceled") => {
                VmStatus::Failed
            }
            _ => VmStatus::Provisioning,
        }
    }
}

/// Identifier/status tuple returned by the gateway. Not a lifecycle tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningHandle {
    pub id: String,
    pub name: String,
    pub size: String,
    pub image: String,
    pub status: VmStatus,
}
