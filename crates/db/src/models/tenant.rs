//! Tenant entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

/// A row from the `tenant` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: DbId,
    pub name: String,
    pub display_name: Option<String>,
    pub org: String,
    pub org_display_name: Option<String>,
    pub config: Json<TenantConfig>,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,
}

/// Per-tenant feature switches, stored in the `config` JSONB column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TenantConfig {
    pub enable_ssh_access: bool,
    pub targeted_instance_creation: bool,
}

/// DTO for creating a new tenant.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTenant {
    #[validate(length(min = 1))]
    pub name: String,
    pub display_name: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub org_display_name: Option<String>,
    /// Defaults to every switch off.
    pub config: Option<TenantConfig>,
    pub created_by: DbId,
}

/// DTO for updating a tenant. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub org_display_name: Option<String>,
    pub config: Option<TenantConfig>,
}
