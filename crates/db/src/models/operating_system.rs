//! Operating system entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::tenant::Tenant;

/// A row from the `operating_system` table.
///
/// Owned by either an infrastructure provider or a tenant. `iPXE` systems
/// carry an `ipxe_script`; `Image` systems carry the `image_*` fields.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperatingSystem {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub org: String,
    pub infrastructure_provider_id: Option<DbId>,
    pub tenant_id: Option<DbId>,
    pub controller_operating_system_id: Option<DbId>,
    pub version: Option<String>,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub os_type: String,
    pub image_url: Option<String>,
    pub image_sha: Option<String>,
    pub image_auth_type: Option<String>,
    pub image_auth_token: Option<String>,
    pub image_disk: Option<String>,
    pub root_fs_id: Option<String>,
    pub root_fs_label: Option<String>,
    pub ipxe_script: Option<String>,
    pub user_data: Option<String>,
    pub is_cloud_init: bool,
    pub allow_override: bool,
    pub enable_block_storage: bool,
    pub phone_home_enabled: bool,
    pub is_active: bool,
    pub deactivation_note: Option<String>,
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
}

/// DTO for creating a new operating system. New systems start active.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOperatingSystem {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub infrastructure_provider_id: Option<DbId>,
    pub tenant_id: Option<DbId>,
    pub controller_operating_system_id: Option<DbId>,
    pub version: Option<String>,
    #[serde(rename = "type")]
    pub os_type: String,
    pub image_url: Option<String>,
    pub image_sha: Option<String>,
    pub image_auth_type: Option<String>,
    pub image_auth_token: Option<String>,
    pub image_disk: Option<String>,
    pub root_fs_id: Option<String>,
    pub root_fs_label: Option<String>,
    pub ipxe_script: Option<String>,
    pub user_data: Option<String>,
    #[serde(default)]
    pub is_cloud_init: bool,
    #[serde(default)]
    pub allow_override: bool,
    #[serde(default)]
    pub enable_block_storage: bool,
    #[serde(default)]
    pub phone_home_enabled: bool,
    pub status: String,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOperatingSystem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub controller_operating_system_id: Option<DbId>,
    pub version: Option<String>,
    pub image_url: Option<String>,
    pub image_sha: Option<String>,
    pub image_auth_type: Option<String>,
    pub image_auth_token: Option<String>,
    pub image_disk: Option<String>,
    pub root_fs_id: Option<String>,
    pub root_fs_label: Option<String>,
    pub ipxe_script: Option<String>,
    pub user_data: Option<String>,
    pub is_cloud_init: Option<bool>,
    pub allow_override: Option<bool>,
    pub enable_block_storage: Option<bool>,
    pub phone_home_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub deactivation_note: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearOperatingSystem {
    pub description: bool,
    pub infrastructure_provider_id: bool,
    pub tenant_id: bool,
    pub controller_operating_system_id: bool,
    pub version: bool,
    pub image_url: bool,
    pub image_sha: bool,
    pub image_auth_type: bool,
    pub image_auth_token: bool,
    pub image_disk: bool,
    pub root_fs_id: bool,
    pub root_fs_label: bool,
    pub ipxe_script: bool,
    pub user_data: bool,
    pub deactivation_note: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperatingSystemFilter {
    pub infrastructure_provider_id: Option<DbId>,
    pub tenant_ids: Option<Vec<DbId>>,
    /// Systems with no live site association, or associated with one of these sites.
    pub site_ids: Option<Vec<DbId>>,
    pub names: Option<Vec<String>>,
    pub orgs: Option<Vec<String>>,
    pub os_types: Option<Vec<String>>,
    pub statuses: Option<Vec<String>>,
    /// `Some(vec![])` matches nothing.
    pub operating_system_ids: Option<Vec<DbId>>,
    pub is_active: Option<bool>,
    pub search_query: Option<String>,
}
