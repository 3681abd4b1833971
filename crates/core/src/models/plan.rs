//! Service and plan catalog models

use serde::{Deserialize, Serialize};

use super::ServiceId;

/// Lookup key for a plan: plans are named per service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey {
    pub service_id: ServiceId,
    pub plan_name: String,
}

impl PlanKey {
    pub fn new(service_id: ServiceId, plan_name: impl Into<String>) -> Self {
        Self {
            service_id,
            plan_name: plan_name.into(),
        }
    }
}

impl std::fmt::Display for PlanKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.service_id, self.plan_name)
    }
}

/// A plan offered by a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    /// Per-period cost in minor units
    pub cost: i64,
    /// Ceiling for `Room::max_count`
    pub max_count: u32,
}

/// A subscription service and its plans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub plans: Vec<Plan>,
}
