//! Site entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;

/// A row from the `site` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Site {
    pub id: DbId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub org: String,
    pub infrastructure_provider_id: DbId,
    pub site_controller_version: Option<String>,
    pub site_agent_version: Option<String>,
    pub registration_token: Option<String>,
    pub registration_token_expiration: Option<Timestamp>,
    pub is_infinity_enabled: bool,
    pub serial_console_hostname: Option<String>,
    pub is_serial_console_enabled: bool,
    /// Minutes.
    pub serial_console_idle_timeout: Option<i32>,
    /// Minutes.
    pub serial_console_max_session_length: Option<i32>,
    pub config: Option<Json<SiteConfig>>,
    pub location: Option<Json<SiteLocation>>,
    pub contact: Option<Json<SiteContact>>,
    pub status: String,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider: Option<Box<InfrastructureProvider>>,
}

/// Networking capabilities reported by the site controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SiteConfig {
    pub native_networking: bool,
    pub network_security_group: bool,
    pub max_network_security_group_rule_count: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteLocation {
    pub city: String,
    pub state: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteContact {
    pub email: String,
}

/// DTO for creating a new site.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSite {
    #[validate(length(min = 1))]
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub infrastructure_provider_id: DbId,
    pub site_controller_version: Option<String>,
    pub site_agent_version: Option<String>,
    pub registration_token: Option<String>,
    pub registration_token_expiration: Option<Timestamp>,
    #[serde(default)]
    pub is_infinity_enabled: bool,
    pub serial_console_hostname: Option<String>,
    #[serde(default)]
    pub is_serial_console_enabled: bool,
    pub serial_console_idle_timeout: Option<i32>,
    pub serial_console_max_session_length: Option<i32>,
    pub config: Option<SiteConfig>,
    pub location: Option<SiteLocation>,
    pub contact: Option<SiteContact>,
    pub status: String,
    pub created_by: DbId,
}

/// DTO for updating a site. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSite {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub org: Option<String>,
    pub infrastructure_provider_id: Option<DbId>,
    pub site_controller_version: Option<String>,
    pub site_agent_version: Option<String>,
    pub registration_token: Option<String>,
    pub registration_token_expiration: Option<Timestamp>,
    pub is_infinity_enabled: Option<bool>,
    pub serial_console_hostname: Option<String>,
    pub is_serial_console_enabled: Option<bool>,
    pub serial_console_idle_timeout: Option<i32>,
    pub serial_console_max_session_length: Option<i32>,
    pub config: Option<SiteConfig>,
    pub location: Option<SiteLocation>,
    pub contact: Option<SiteContact>,
    pub status: Option<String>,
}

/// Nullable columns to reset. `true` sets the column to NULL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearSite {
    pub display_name: bool,
    pub description: bool,
    pub site_controller_version: bool,
    pub site_agent_version: bool,
    pub registration_token: bool,
    pub registration_token_expiration: bool,
    pub serial_console_hostname: bool,
    pub serial_console_idle_timeout: bool,
    pub serial_console_max_session_length: bool,
    pub config: bool,
    pub location: bool,
    pub contact: bool,
}

/// Filter for [`SiteRepo::get_all`](crate::repositories::SiteRepo::get_all).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteFilter {
    pub name: Option<String>,
    pub org: Option<String>,
    pub infrastructure_provider_id: Option<DbId>,
    pub site_ids: Option<Vec<DbId>>,
    pub statuses: Option<Vec<String>>,
    /// Sites with a live association to any of these tenants.
    pub tenant_ids: Option<Vec<DbId>>,
    pub is_serial_console_enabled: Option<bool>,
    pub search_query: Option<String>,
}
