//! InfiniBand partition entity model and DTOs.

use carbide_core::types::{DbId, Labels, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::site::Site;
use crate::models::tenant::Tenant;

/// A row from the `infiniband_partition` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InfiniBandPartition {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    /// Tenant org owning the partition.
    pub org: String,
    pub site_id: DbId,
    pub tenant_id: DbId,
    pub controller_ib_partition_id: Option<DbId>,
    pub partition_key: Option<String>,
    pub partition_name: Option<String>,
    pub service_level: Option<i32>,
    pub rate_limit: Option<f32>,
    pub mtu: Option<i32>,
    pub enable_sharp: Option<bool>,
    pub labels: Option<Json<Labels>>,
    pub status: String,
    pub is_missing_on_site: bool,
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

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInfiniBandPartition {
    /// Generated when omitted.
    pub id: Option<DbId>,
    #[validate(length(min = 1))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub site_id: DbId,
    pub tenant_id: DbId,
    pub controller_ib_partition_id: Option<DbId>,
    pub partition_key: Option<String>,
    pub partition_name: Option<String>,
    pub service_level: Option<i32>,
    pub rate_limit: Option<f32>,
    pub mtu: Option<i32>,
    pub enable_sharp: Option<bool>,
    pub labels: Option<Labels>,
    pub status: String,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInfiniBandPartition {
    pub name: Option<String>,
    pub description: Option<String>,
    pub controller_ib_partition_id: Option<DbId>,
    pub partition_key: Option<String>,
    pub partition_name: Option<String>,
    pub service_level: Option<i32>,
    pub rate_limit: Option<f32>,
    pub mtu: Option<i32>,
    pub enable_sharp: Option<bool>,
    pub labels: Option<Labels>,
    pub status: Option<String>,
    pub is_missing_on_site: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearInfiniBandPartition {
    pub description: bool,
    pub controller_ib_partition_id: bool,
    pub partition_key: bool,
    pub partition_name: bool,
    pub service_level: bool,
    pub rate_limit: bool,
    pub mtu: bool,
    pub enable_sharp: bool,
    pub labels: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InfiniBandPartitionFilter {
    /// `Some(vec![])` matches nothing.
    pub ids: Option<Vec<DbId>>,
    pub names: Option<Vec<String>>,
    pub site_ids: Option<Vec<DbId>>,
    /// Matched against `org`.
    pub tenant_orgs: Option<Vec<String>>,
    pub tenant_ids: Option<Vec<DbId>>,
    pub statuses: Option<Vec<String>>,
    pub partition_names: Option<Vec<String>>,
    pub partition_keys: Option<Vec<String>>,
    pub sharp_enabled: Option<bool>,
    pub search_query: Option<String>,
}
