//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods.
//! Every method takes any [`sqlx::Acquire`] implementor as its first
//! argument, so `&PgPool`, `&mut PgConnection` and `&mut *tx` all work and
//! several calls can share one transaction.

mod filter;
mod relations;

pub mod allocation_constraint_repo;
pub mod allocation_repo;
pub mod expected_machine_repo;
pub mod infiniband_partition_repo;
pub mod infrastructure_provider_repo;
pub mod instance_type_repo;
pub mod ip_block_repo;
pub mod operating_system_repo;
pub mod operating_system_site_repo;
pub mod site_repo;
pub mod tenant_repo;
pub mod tenant_site_repo;
pub mod vpc_repo;

pub use allocation_constraint_repo::AllocationConstraintRepo;
pub use allocation_repo::AllocationRepo;
pub use expected_machine_repo::ExpectedMachineRepo;
pub use infiniband_partition_repo::InfiniBandPartitionRepo;
pub use infrastructure_provider_repo::InfrastructureProviderRepo;
pub use instance_type_repo::InstanceTypeRepo;
pub use ip_block_repo::IpBlockRepo;
pub use operating_system_repo::OperatingSystemRepo;
pub use operating_system_site_repo::OperatingSystemSiteRepo;
pub use site_repo::SiteRepo;
pub use tenant_repo::TenantRepo;
pub use tenant_site_repo::TenantSiteRepo;
pub use vpc_repo::VpcRepo;
