//! Allocation constraint entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::allocation::Allocation;

/// A row from the `allocation_constraint` table.
///
/// `resource_type_id` references an instance type or an IP block depending on
/// `resource_type`. For IP blocks, `derived_resource_id` is the tenant block
/// carved out of the provider block.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AllocationConstraint {
    pub id: DbId,
    pub allocation_id: DbId,
    pub resource_type: String,
    pub resource_type_id: DbId,
    pub constraint_type: String,
    pub constraint_value: i32,
    pub derived_resource_id: Option<DbId>,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Box<Allocation>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAllocationConstraint {
    pub allocation_id: DbId,
    #[validate(length(min = 1))]
    pub resource_type: String,
    pub resource_type_id: DbId,
    #[validate(length(min = 1))]
    pub constraint_type: String,
    pub constraint_value: i32,
    pub derived_resource_id: Option<DbId>,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAllocationConstraint {
    pub allocation_id: Option<DbId>,
    pub resource_type: Option<String>,
    pub resource_type_id: Option<DbId>,
    pub constraint_type: Option<String>,
    pub constraint_value: Option<i32>,
    pub derived_resource_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearAllocationConstraint {
    pub derived_resource_id: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllocationConstraintFilter {
    pub allocation_ids: Option<Vec<DbId>>,
    pub resource_type: Option<String>,
    pub resource_type_ids: Option<Vec<DbId>>,
    pub constraint_type: Option<String>,
    pub derived_resource_id: Option<DbId>,
}
