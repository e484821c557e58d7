//! Allocation entity model and DTOs.
//!
//! An allocation grants a tenant capacity at a site. The capacity itself is
//! described by its [`AllocationConstraint`](super::allocation_constraint::AllocationConstraint)s.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;
use crate::models::tenant::Tenant;

/// A row from the `allocation` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Allocation {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: DbId,
    pub site_id: DbId,
    pub status: String,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider: Option<Box<InfrastructureProvider>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Box<Tenant>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<Site>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAllocation {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: DbId,
    pub site_id: DbId,
    pub status: String,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAllocation {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearAllocation {
    pub description: bool,
}

/// Allocation list filter.
///
/// The `constraint_*` and `resource_*` fields match allocations having at
/// least one live constraint that satisfies all of them together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AllocationFilter {
    pub name: Option<String>,
    pub infrastructure_provider_id: Option<DbId>,
    pub tenant_ids: Option<Vec<DbId>>,
    pub site_ids: Option<Vec<DbId>>,
    pub statuses: Option<Vec<String>>,
    /// `Some(vec![])` matches nothing.
    pub allocation_ids: Option<Vec<DbId>>,
    pub resource_types: Option<Vec<String>>,
    pub resource_type_ids: Option<Vec<DbId>>,
    pub constraint_types: Option<Vec<String>>,
    pub constraint_values: Option<Vec<i32>>,
    pub search_query: Option<String>,
}

impl AllocationFilter {
    pub(crate) fn has_constraint_filter(&self) -> bool {
        self.resource_types.is_some()
            || self.resource_type_ids.is_some()
            || self.constraint_types.is_some()
            || self.constraint_values.is_some()
    }
}
