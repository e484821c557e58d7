//! Entity models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//! - Where the entity supports it, a clear DTO of boolean flags and a list filter

use serde::Deserialize;

pub mod allocation;
pub mod allocation_constraint;
pub mod expected_machine;
pub mod infiniband_partition;
pub mod infrastructure_provider;
pub mod instance_type;
pub mod ip_block;
pub mod operating_system;
pub mod operating_system_site;
pub mod site;
pub mod tenant;
pub mod tenant_site;
pub mod vpc;

/// Parent entities that getters and listers can load alongside the rows.
///
/// A relation that does not apply to the entity being read is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum Relation {
    InfrastructureProvider,
    Site,
    Tenant,
    Allocation,
    OperatingSystem,
}

/// True when `relations` asks for `relation`.
pub(crate) fn wants(relations: &[Relation], relation: Relation) -> bool {
    relations.contains(&relation)
}
