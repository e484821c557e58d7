//! VPC entity model and DTOs.

use carbide_core::types::{DbId, Labels, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;
use crate::models::tenant::Tenant;

/// A row from the `vpc` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Vpc {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub org: String,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: DbId,
    pub site_id: DbId,
    pub nvlink_logical_partition_id: Option<DbId>,
    pub network_virtualization_type: Option<String>,
    /// ID assigned by the site controller once the VPC exists on site.
    pub controller_vpc_id: Option<DbId>,
    pub network_security_group_id: Option<String>,
    pub nsg_propagation_details: Option<serde_json::Value>,
    pub labels: Option<Json<Labels>>,
    pub status: String,
    pub is_missing_on_site: bool,
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

/// DTO for creating a new VPC.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVpc {
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub infrastructure_provider_id: DbId,
    pub tenant_id: DbId,
    pub site_id: DbId,
    pub nvlink_logical_partition_id: Option<DbId>,
    pub network_virtualization_type: Option<String>,
    pub controller_vpc_id: Option<DbId>,
    pub network_security_group_id: Option<String>,
    pub nsg_propagation_details: Option<serde_json::Value>,
    pub labels: Option<Labels>,
    pub status: String,
    pub created_by: DbId,
}

/// DTO for updating a VPC. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVpc {
    pub name: Option<String>,
    pub description: Option<String>,
    pub nvlink_logical_partition_id: Option<DbId>,
    pub network_virtualization_type: Option<String>,
    pub controller_vpc_id: Option<DbId>,
    pub network_security_group_id: Option<String>,
    pub nsg_propagation_details: Option<serde_json::Value>,
    pub labels: Option<Labels>,
    pub status: Option<String>,
    pub is_missing_on_site: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearVpc {
    pub description: bool,
    pub controller_vpc_id: bool,
    pub nvlink_logical_partition_id: bool,
    pub network_security_group_id: bool,
    pub nsg_propagation_details: bool,
    pub labels: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VpcFilter {
    pub name: Option<String>,
    /// `Some(vec![])` matches nothing.
    pub vpc_ids: Option<Vec<DbId>>,
    pub infrastructure_provider_id: Option<DbId>,
    pub tenant_ids: Option<Vec<DbId>>,
    pub site_ids: Option<Vec<DbId>>,
    pub nvlink_logical_partition_ids: Option<Vec<DbId>>,
    pub network_security_group_ids: Option<Vec<String>>,
    pub org: Option<String>,
    pub network_virtualization_type: Option<String>,
    pub statuses: Option<Vec<String>>,
    pub search_query: Option<String>,
}
