//! Tenant-site association model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::site::Site;
use crate::models::tenant::Tenant;

/// A row from the `tenant_site` table: a tenant's access to one site.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TenantSite {
    pub id: DbId,
    pub tenant_id: DbId,
    pub tenant_org: String,
    pub site_id: DbId,
    pub enable_serial_console: bool,
    pub config: serde_json::Value,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Box<Tenant>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<Site>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTenantSite {
    pub tenant_id: DbId,
    pub tenant_org: String,
    pub site_id: DbId,
    #[serde(default)]
    pub enable_serial_console: bool,
    /// Defaults to `{}`.
    pub config: Option<serde_json::Value>,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTenantSite {
    pub enable_serial_console: Option<bool>,
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TenantSiteFilter {
    pub tenant_ids: Option<Vec<DbId>>,
    pub tenant_orgs: Option<Vec<String>>,
    pub site_ids: Option<Vec<DbId>>,
    /// Matched together with `config_value` as `config->>key = value`.
    pub config_key: Option<String>,
    pub config_value: Option<String>,
}
