//! One capability trait per resource group.
//!
//! Every method has a default body written against [`Api`](crate::Api), so
//! an implementation opts into a group with an empty `impl` block.

mod admin;
mod consumer;
mod distribution;
mod entitlement;
mod environment;
mod owner;
mod product;
mod user;

pub use admin::{CrlApi, EventApi, JobApi, RuleApi, SerialApi, StatisticsApi, StatusApi};
pub use consumer::{ConsumerApi, ConsumerTypeApi, HypervisorApi};
pub use distribution::{CdnApi, DistributorVersionApi};
pub use entitlement::{EntitlementApi, PoolApi, SubscriptionApi};
pub use environment::{ActivationKeyApi, EnvironmentApi};
pub use owner::{ContentApi, OwnerApi, OwnerContentApi};
pub use product::{OwnerProductApi, ProductApi};
pub use user::{
    ACCESS_ALL, ACCESS_READ_ONLY, RoleApi, UserApi, all_owner_permission, ro_owner_permission,
};
