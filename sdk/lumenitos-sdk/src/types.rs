use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// TTL state of one tracked ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtlClassification {
    /// Entry was never created
    Missing,
    /// `remaining >= bump_threshold`
    Live,
    /// `0 < remaining < bump_threshold`
    NearExpiry,
    /// `remaining <= 0`; evicted from active state but restorable
    Archived,
}

impl TtlClassification {
    /// Classify an entry from its live-until ledger. Strict `<` at the bump
    /// threshold; zero remaining ledgers is already archived.
    pub fn classify(current_ledger: u32, live_until_ledger: Option<u32>, bump_threshold: u32) -> Self {
        match live_until_ledger {
            None => Self::Missing,
            Some(live_until) => {
                let remaining = live_until as i64 - current_ledger as i64;
                if remaining <= 0 {
                    Self::Archived
                } else if remaining < bump_threshold as i64 {
                    Self::NearExpiry
                } else {
                    Self::Live
                }
            },
        }
    }
}

/// Freshly derived TTL reading; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlRecord {
    pub current_ledger: u32,
    pub live_until_ledger: Option<u32>,
    pub classification: TtlClassification,
}

impl TtlRecord {
    pub fn new(current_ledger: u32, live_until_ledger: Option<u32>, bump_threshold: u32) -> Self {
        Self {
            current_ledger,
            live_until_ledger,
            classification: TtlClassification::classify(
                current_ledger,
                live_until_ledger,
                bump_threshold,
            ),
        }
    }

    pub fn remaining(&self) -> Option<i64> {
        self.live_until_ledger
            .map(|live_until| live_until as i64 - self.current_ledger as i64)
    }
}

/// Per-resource entry of a [`TtlReport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    pub installed: bool,
    pub archived: bool,
    pub ttl_remaining: Option<i64>,
    pub needs_bump: bool,
    pub needs_restore: bool,
}

impl ResourceStatus {
    pub fn from_record(record: &TtlRecord) -> Self {
        let classification = record.classification;
        Self {
            installed: classification != TtlClassification::Missing,
            archived: classification == TtlClassification::Archived,
            ttl_remaining: record.remaining(),
            needs_bump: classification == TtlClassification::NearExpiry,
            needs_restore: matches!(
                classification,
                TtlClassification::Missing | TtlClassification::Archived
            ),
        }
    }

    /// Status reported when the ledger could not be read.
    pub fn unknown() -> Self {
        Self {
            installed: false,
            archived: false,
            ttl_remaining: None,
            needs_bump: false,
            needs_restore: true,
        }
    }

    pub fn needs_maintenance(&self) -> bool {
        self.needs_bump || self.needs_restore
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Every resource is live
    Healthy,
    /// Some resources need maintenance
    Degraded,
    /// Ledger state could not be read
    Unhealthy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtlReport {
    pub current_ledger: u32,
    pub health: HealthStatus,
    pub resources: BTreeMap<String, ResourceStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceAction {
    Bump,
    Restore,
    Install,
}

/// One line of the maintenance action log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub resource: String,
    pub action: MaintenanceAction,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Which maintenance transitions a caller allows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    /// Extend near-expiry entries and restore archived ones
    pub bump: bool,
    /// Install entries that cannot be restored
    pub install: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceMode {
    Execute,
    /// No maintenance key was supplied; state was read, nothing was changed
    ReportOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub mode: MaintenanceMode,
    pub report: TtlReport,
    pub actions: Vec<ActionLogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        let threshold = 100;
        assert_eq!(
            TtlClassification::classify(1_000, Some(1_100), threshold),
            TtlClassification::Live
        );
        assert_eq!(
            TtlClassification::classify(1_000, Some(1_099), threshold),
            TtlClassification::NearExpiry
        );
        assert_eq!(
            TtlClassification::classify(1_000, Some(1_001), threshold),
            TtlClassification::NearExpiry
        );
        assert_eq!(
            TtlClassification::classify(1_000, Some(1_000), threshold),
            TtlClassification::Archived
        );
        assert_eq!(
            TtlClassification::classify(1_000, Some(10), threshold),
            TtlClassification::Archived
        );
        assert_eq!(
            TtlClassification::classify(1_000, None, threshold),
            TtlClassification::Missing
        );
    }

    #[test]
    fn test_near_expiry_status() {
        let record = TtlRecord::new(1_000, Some(1_010), 50_000);
        assert_eq!(record.classification, TtlClassification::NearExpiry);

        let status = ResourceStatus::from_record(&record);
        assert!(status.installed);
        assert!(status.needs_bump);
        assert!(!status.needs_restore);
        assert_eq!(status.ttl_remaining, Some(10));
    }

    #[test]
    fn test_missing_status_needs_restore() {
        let status = ResourceStatus::from_record(&TtlRecord::new(1_000, None, 50_000));
        assert!(!status.installed);
        assert!(status.needs_restore);
        assert_eq!(status.ttl_remaining, None);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let mut resources = BTreeMap::new();
        resources.insert(
            "factory_wasm".to_string(),
            ResourceStatus::from_record(&TtlRecord::new(10, Some(5), 100)),
        );
        let report = TtlReport {
            current_ledger: 10,
            health: HealthStatus::Degraded,
            resources,
            error: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        let entry = &json["resources"]["factory_wasm"];
        assert_eq!(entry["archived"], true);
        assert_eq!(entry["ttlRemaining"], -5);
        assert_eq!(entry["needsRestore"], true);
        assert_eq!(json["health"], "degraded");
        assert!(json.get("error").is_none());
    }
}
