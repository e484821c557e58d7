//! Well-known status and type values stored in the text columns of each entity.
//!
//! These must match the values written by the workflows that drive each
//! entity through its lifecycle.

use std::collections::BTreeMap;

use crate::error::CoreError;

/// Key under which [`status_counts`] reports the sum over all statuses.
pub const TOTAL_KEY: &str = "total";

/// Fail with `CoreError::UnknownValue` unless `value` is one of `allowed`.
pub fn ensure_valid(kind: &'static str, allowed: &[&str], value: &str) -> Result<(), CoreError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::UnknownValue {
            kind,
            value: value.to_string(),
        })
    }
}

/// Build a status histogram from grouped `(status, count)` rows.
///
/// Every status in `all` is present (zero if absent from `rows`), plus
/// [`TOTAL_KEY`] holding the sum of every row, including statuses not in `all`.
pub fn status_counts(all: &[&str], rows: &[(String, i64)]) -> BTreeMap<String, i64> {
    let mut counts: BTreeMap<String, i64> = all.iter().map(|s| (s.to_string(), 0)).collect();
    let mut total = 0;
    for (status, count) in rows {
        *counts.entry(status.clone()).or_insert(0) += count;
        total += count;
    }
    counts.insert(TOTAL_KEY.to_string(), total);
    counts
}

pub mod site {
    pub const PENDING: &str = "Pending";
    pub const REGISTERED: &str = "Registered";
    pub const ERROR: &str = "Error";

    pub const ALL: &[&str] = &[PENDING, REGISTERED, ERROR];
}

pub mod vpc {
    pub const PENDING: &str = "Pending";
    pub const PROVISIONING: &str = "Provisioning";
    pub const READY: &str = "Ready";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";

    pub const ALL: &[&str] = &[PENDING, PROVISIONING, READY, ERROR, DELETING];

    pub const ETHERNET_VIRTUALIZER: &str = "ETHERNET_VIRTUALIZER";
    pub const FNN: &str = "FNN";

    /// Network virtualization types a VPC may be created with.
    pub const NETWORK_VIRTUALIZATION_TYPES: &[&str] = &[ETHERNET_VIRTUALIZER, FNN];
}

pub mod ip_block {
    pub const PENDING: &str = "Pending";
    pub const PROVISIONING: &str = "Provisioning";
    pub const READY: &str = "Ready";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";

    pub const ALL: &[&str] = &[PENDING, PROVISIONING, READY, ERROR, DELETING];

    pub const ROUTING_PUBLIC: &str = "Public";
    pub const ROUTING_DATACENTER_ONLY: &str = "DatacenterOnly";
    pub const ROUTING_TYPES: &[&str] = &[ROUTING_PUBLIC, ROUTING_DATACENTER_ONLY];

    pub const IPV4: &str = "IPv4";
    pub const IPV6: &str = "IPv6";
    pub const PROTOCOL_VERSIONS: &[&str] = &[IPV4, IPV6];
}

pub mod instance_type {
    pub const PENDING: &str = "Pending";
    pub const READY: &str = "Ready";
    pub const ERROR: &str = "Error";

    pub const ALL: &[&str] = &[PENDING, READY, ERROR];
}

pub mod allocation {
    pub const PENDING: &str = "Pending";
    pub const REGISTERED: &str = "Registered";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";

    pub const ALL: &[&str] = &[PENDING, REGISTERED, ERROR, DELETING];
}

pub mod allocation_constraint {
    pub const RESOURCE_INSTANCE_TYPE: &str = "InstanceType";
    pub const RESOURCE_IP_BLOCK: &str = "IPBlock";
    pub const RESOURCE_TYPES: &[&str] = &[RESOURCE_INSTANCE_TYPE, RESOURCE_IP_BLOCK];

    pub const RESERVED: &str = "Reserved";
    pub const ON_DEMAND: &str = "OnDemand";
    pub const PREEMPTIBLE: &str = "Preemptible";
    pub const CONSTRAINT_TYPES: &[&str] = &[RESERVED, ON_DEMAND, PREEMPTIBLE];
}

pub mod infiniband_partition {
    pub const PENDING: &str = "Pending";
    pub const PROVISIONING: &str = "Provisioning";
    pub const READY: &str = "Ready";
    pub const CONFIGURING: &str = "Configuring";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";

    pub const ALL: &[&str] = &[PENDING, PROVISIONING, READY, CONFIGURING, ERROR, DELETING];
}

pub mod operating_system {
    pub const PENDING: &str = "Pending";
    pub const PROVISIONING: &str = "Provisioning";
    pub const READY: &str = "Ready";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";
    pub const SYNCING: &str = "Syncing";
    pub const DEACTIVATED: &str = "Deactivated";

    pub const ALL: &[&str] = &[
        PENDING,
        PROVISIONING,
        READY,
        ERROR,
        DELETING,
        SYNCING,
        DEACTIVATED,
    ];

    pub const TYPE_IPXE: &str = "iPXE";
    pub const TYPE_IMAGE: &str = "Image";
    pub const TYPES: &[&str] = &[TYPE_IPXE, TYPE_IMAGE];

    pub const AUTH_BASIC: &str = "Basic";
    pub const AUTH_BEARER: &str = "Bearer";
    pub const AUTH_TYPES: &[&str] = &[AUTH_BASIC, AUTH_BEARER];
}

pub mod operating_system_site {
    pub const PENDING: &str = "Pending";
    pub const SYNCING: &str = "Syncing";
    pub const SYNCED: &str = "Synced";
    pub const ERROR: &str = "Error";
    pub const DELETING: &str = "Deleting";

    pub const ALL: &[&str] = &[PENDING, SYNCING, SYNCED, ERROR, DELETING];
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_include_every_known_status() {
        let counts = status_counts(vpc::ALL, &[]);
        assert_eq!(counts.len(), vpc::ALL.len() + 1);
        assert!(counts.values().all(|c| *c == 0));
    }

    #[test]
    fn counts_sum_into_total() {
        let rows = vec![(vpc::READY.to_string(), 3), (vpc::ERROR.to_string(), 2)];
        let counts = status_counts(vpc::ALL, &rows);
        assert_eq!(counts[vpc::READY], 3);
        assert_eq!(counts[vpc::ERROR], 2);
        assert_eq!(counts[vpc::PENDING], 0);
        assert_eq!(counts[TOTAL_KEY], 5);
    }

    #[test]
    fn ensure_valid_accepts_known_value() {
        assert!(ensure_valid("routing type", ip_block::ROUTING_TYPES, "Public").is_ok());
    }

    #[test]
    fn ensure_valid_rejects_wrong_case() {
        let err = ensure_valid("routing type", ip_block::ROUTING_TYPES, "public").unwrap_err();
        assert_eq!(err.to_string(), "Unknown routing type: public");
    }
}
