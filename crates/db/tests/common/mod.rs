//! Fixture builders shared by the repository integration tests.
//!
//! Each `new_*` function returns a create input with sensible defaults; each
//! `seed_*` function persists one and returns the stored row.

#![allow(dead_code)]

use carbide_core::status;
use carbide_core::types::DbId;
use carbide_db::models::infrastructure_provider::{
    CreateInfrastructureProvider, InfrastructureProvider,
};
use carbide_db::models::site::{CreateSite, Site};
use carbide_db::models::tenant::{CreateTenant, Tenant};
use carbide_db::repositories::{InfrastructureProviderRepo, SiteRepo, TenantRepo};
use sqlx::PgPool;

/// A stable user id for `created_by` columns.
pub fn user() -> DbId {
    DbId::from_u128(0x5eed)
}

// ---------------------------------------------------------------------------
// Providers and tenants
// ---------------------------------------------------------------------------

pub fn new_provider(name: &str, org: &str) -> CreateInfrastructureProvider {
    CreateInfrastructureProvider {
        name: name.to_string(),
        display_name: Some(format!("{name} display")),
        org: org.to_string(),
        org_display_name: None,
        created_by: user(),
    }
}

pub async fn seed_provider(pool: &PgPool) -> InfrastructureProvider {
    InfrastructureProviderRepo::create(pool, &new_provider("provider", "provider-org"))
        .await
        .unwrap()
}

pub fn new_tenant(name: &str, org: &str) -> CreateTenant {
    CreateTenant {
        name: name.to_string(),
        display_name: None,
        org: org.to_string(),
        org_display_name: Some(format!("{org} display")),
        config: None,
        created_by: user(),
    }
}

pub async fn seed_tenant(pool: &PgPool, org: &str) -> Tenant {
    TenantRepo::create(pool, &new_tenant(&format!("tenant-{org}"), org))
        .await
        .unwrap()
}

// ---------------------------------------------------------------------------
// Sites
// ---------------------------------------------------------------------------

pub fn new_site(name: &str, provider_id: DbId) -> CreateSite {
    CreateSite {
        name: name.to_string(),
        display_name: None,
        description: Some(format!("{name} description")),
        org: "provider-org".to_string(),
        infrastructure_provider_id: provider_id,
        site_controller_version: None,
        site_agent_version: None,
        registration_token: None,
        registration_token_expiration: None,
        is_infinity_enabled: false,
        serial_console_hostname: None,
        is_serial_console_enabled: false,
        serial_console_idle_timeout: None,
        serial_console_max_session_length: None,
        config: None,
        location: None,
        contact: None,
        status: status::site::PENDING.to_string(),
        created_by: user(),
    }
}

pub async fn seed_site(pool: &PgPool, provider_id: DbId, name: &str) -> Site {
    SiteRepo::create(pool, &new_site(name, provider_id))
        .await
        .unwrap()
}

/// A provider, a tenant, and a site owned by the provider.
pub struct Fixture {
    pub provider: InfrastructureProvider,
    pub tenant: Tenant,
    pub site: Site,
}

pub async fn fixture(pool: &PgPool) -> Fixture {
    let provider = seed_provider(pool).await;
    let tenant = seed_tenant(pool, "tenant-org").await;
    let site = seed_site(pool, provider.id, "site-1").await;
    Fixture {
        provider,
        tenant,
        site,
    }
}
