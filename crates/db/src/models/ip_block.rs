//! IP block entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;
use crate::models::tenant::Tenant;

/// A row from the `ip_block` table.
///
/// Blocks with a `tenant_id` are derived from a provider block when part of
/// it is allocated to that tenant.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IpBlock {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub site_id: DbId,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: Option<DbId>,
    pub routing_type: String,
    pub prefix: String,
    pub prefix_length: i32,
    pub protocol_version: String,
    pub full_grant: bool,
    pub status: String,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: Option<DbId>,

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

/// DTO for creating a new IP block.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateIpBlock {
    /// Generated when omitted.
    pub id: Option<DbId>,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    pub site_id: DbId,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: Option<DbId>,
    pub routing_type: String,
    #[validate(length(min = 1))]
    pub prefix: String,
    #[validate(range(min = 0, max = 128))]
    pub prefix_length: i32,
    pub protocol_version: String,
    #[serde(default)]
    pub full_grant: bool,
    pub status: String,
    pub created_by: Option<DbId>,
}

/// DTO for updating an IP block. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateIpBlock {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tenant_id: Option<DbId>,
    pub routing_type: Option<String>,
    pub prefix: Option<String>,
    pub prefix_length: Option<i32>,
    pub protocol_version: Option<String>,
    pub full_grant: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearIpBlock {
    pub description: bool,
    pub tenant_id: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IpBlockFilter {
    /// `Some(vec![])` matches nothing.
    pub ids: Option<Vec<DbId>>,
    pub names: Option<Vec<String>>,
    pub site_ids: Option<Vec<DbId>>,
    pub infrastructure_provider_ids: Option<Vec<DbId>>,
    pub tenant_ids: Option<Vec<DbId>>,
    pub routing_types: Option<Vec<String>>,
    pub prefixes: Option<Vec<String>>,
    pub prefix_lengths: Option<Vec<i32>>,
    pub protocol_versions: Option<Vec<String>>,
    pub full_grant: Option<bool>,
    pub statuses: Option<Vec<String>>,
    /// Only provider blocks (`tenant_id IS NULL`). Cannot be combined with `tenant_ids`.
    pub exclude_derived: bool,
    pub search_query: Option<String>,
}
