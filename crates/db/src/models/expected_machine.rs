//! Expected machine entity model and DTOs.

use carbide_core::types::{DbId, Labels, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use validator::Validate;

use crate::models::site::Site;

/// A row from the `expected_machine` table: hardware a site expects to
/// discover, identified by its BMC MAC address and chassis serial number.
///
/// Rows are hard-deleted and there is no `deleted` column.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExpectedMachine {
    pub id: DbId,
    pub site_id: DbId,
    pub bmc_mac_address: String,
    pub chassis_serial_number: String,
    pub sku_id: Option<String>,
    pub machine_id: Option<String>,
    pub fallback_dpu_serial_numbers: Vec<String>,
    pub labels: Option<Json<Labels>>,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,

    #[sqlx(skip)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<Box<Site>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExpectedMachine {
    pub id: DbId,
    pub site_id: DbId,
    #[validate(length(min = 1))]
    pub bmc_mac_address: String,
    #[validate(length(min = 1))]
    pub chassis_serial_number: String,
    pub sku_id: Option<String>,
    pub machine_id: Option<String>,
    #[serde(default)]
    pub fallback_dpu_serial_numbers: Vec<String>,
    pub labels: Option<Labels>,
    pub created_by: DbId,
}

/// Partial update. `id` selects the row and is never changed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateExpectedMachine {
    pub id: DbId,
    pub site_id: Option<DbId>,
    pub bmc_mac_address: Option<String>,
    pub chassis_serial_number: Option<String>,
    pub sku_id: Option<String>,
    pub machine_id: Option<String>,
    pub fallback_dpu_serial_numbers: Option<Vec<String>>,
    pub labels: Option<Labels>,
}

/// Columns to reset. Fallback serials reset to an empty list, the rest to NULL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClearExpectedMachine {
    pub sku_id: bool,
    pub machine_id: bool,
    pub fallback_dpu_serial_numbers: bool,
    pub labels: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExpectedMachineFilter {
    /// `Some(vec![])` matches nothing.
    pub ids: Option<Vec<DbId>>,
    pub site_ids: Option<Vec<DbId>>,
    pub bmc_mac_addresses: Option<Vec<String>>,
    pub chassis_serial_numbers: Option<Vec<String>>,
    pub sku_ids: Option<Vec<String>>,
    pub machine_ids: Option<Vec<String>>,
    pub search_query: Option<String>,
}
