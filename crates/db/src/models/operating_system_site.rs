//! Operating system to site association model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::operating_system::OperatingSystem;
use crate::models::site::Site;

/// A row from the `operating_system_site_association` table: the sync state
/// of one operating system on one site.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OperatingSystemSiteAssociation {
    pub id: DbId,
    pub operating_system_id: DbId,
    pub site_id: DbId,
    pub version: Option<String>,
    pub status: String,
    pub is_missing_on_site: bool,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<Box<OperatingSystem>>,
    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<Site>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOperatingSystemSiteAssociation {
    pub operating_system_id: DbId,
    pub site_id: DbId,
    pub version: Option<String>,
    pub status: String,
    pub created_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOperatingSystemSiteAssociation {
    pub version: Option<String>,
    pub status: Option<String>,
    pub is_missing_on_site: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperatingSystemSiteAssociationFilter {
    pub operating_system_ids: Option<Vec<DbId>>,
    pub site_ids: Option<Vec<DbId>>,
    pub versions: Option<Vec<String>>,
    pub statuses: Option<Vec<String>>,
}
