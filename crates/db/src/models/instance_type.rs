//! Instance type entity model and DTOs.

use carbide_core::types::{DbId, Labels, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::infrastructure_provider::InfrastructureProvider;
use crate::models::site::Site;

/// A row from the `instance_type` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InstanceType {
    pub id: DbId,
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub controller_machine_type: Option<String>,
    pub infrastructure_provider_id: DbId,
    pub site_id: Option<DbId>,
    pub labels: Option<Json<Labels>>,
    pub status: String,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_provider: Option<Box<InfrastructureProvider>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<Site>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInstanceType {
    #[validate(length(min = 1))]
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub controller_machine_type: Option<String>,
    pub infrastructure_provider_id: DbId,
    pub site_id: Option<DbId>,
    pub labels: Option<Labels>,
    pub status: String,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInstanceType {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub controller_machine_type: Option<String>,
    pub site_id: Option<DbId>,
    pub labels: Option<Labels>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearInstanceType {
    pub display_name: bool,
    pub description: bool,
    pub controller_machine_type: bool,
    pub site_id: bool,
    pub labels: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InstanceTypeFilter {
    pub name: Option<String>,
    pub names: Option<Vec<String>>,
    pub instance_type_ids: Option<Vec<DbId>>,
    pub infrastructure_provider_id: Option<DbId>,
    pub site_ids: Option<Vec<DbId>>,
    pub statuses: Option<Vec<String>>,
    pub search_query: Option<String>,
}
