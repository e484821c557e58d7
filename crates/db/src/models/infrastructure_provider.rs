//! Infrastructure provider entity model and DTOs.

use carbide_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `infrastructure_provider` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct InfrastructureProvider {
    pub id: DbId,
    pub name: String,
    pub display_name: Option<String>,
    pub org: String,
    pub org_display_name: Option<String>,
    pub created: Timestamp,
    pub updated: Timestamp,
    pub created_by: DbId,
}

/// DTO for creating a new infrastructure provider.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInfrastructureProvider {
    #[validate(length(min = 1))]
    pub name: String,
    pub display_name: Option<String>,
    #[validate(length(min = 1))]
    pub org: String,
    pub org_display_name: Option<String>,
    pub created_by: DbId,
}

/// DTO for updating an infrastructure provider. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateInfrastructureProvider {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub org_display_name: Option<String>,
}
