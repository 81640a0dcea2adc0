#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Typed client for the Candlepin subscription and entitlement service
//!
//! Operations are grouped into one capability trait per resource (owners,
//! consumers, pools, products, ...). [`CandlepinClient`] implements all of
//! them; bring the traits you need into scope, usually through the
//! [`prelude`].
//!
//! Each operation takes an [`OptionSet`] of snake_case parameters, checks
//! it against the operation's declared defaults before any I/O, shapes the
//! wire request and returns an [`ApiResponse`] for whatever status the
//! server answered with.
//!
//! # Example
//!
//! ```ignore
//! use candlepin_client::prelude::*;
//! use candlepin_client::{CandlepinClient, options};
//! use candlepin_http::ConnectionSettings;
//!
//! let admin = CandlepinClient::basic_auth(ConnectionSettings::default(), "admin", "admin")?;
//! admin.create_owner(options! { "key" => "acme", "display_name" => "ACME" }).await?;
//!
//! let consumer = admin
//!     .register_and_get_client(options! { "name" => "box1", "owner" => "acme" })
//!     .await?;
//! consumer.bind(options! { "pool" => "ff8080814ab6f1a1" }).await?;
//! ```

mod api;
mod client;
mod error;
mod field_map;
mod identity;
mod options;
mod resources;
mod shape;

pub use api::{APPLICATION_ZIP, Api, ApiResponse, Content, TEXT_PLAIN, WireRequest, raw_content};
pub use client::{CandlepinClient, X509Options};
pub use error::{ClientError, ClientResult};
pub use field_map::{from_wire_case, keys_from_wire, map_fields, select_subset, to_wire_case};
pub use identity::{IdentityCertificate, RegistrationIdentity};
pub use options::{
    DefaultSet, OptionSet, merge, page_options, validate_required, validate_required_with,
};
pub use resources::{
    ACCESS_ALL, ACCESS_READ_ONLY, ActivationKeyApi, CdnApi, ConsumerApi, ConsumerTypeApi,
    ContentApi, CrlApi, DistributorVersionApi, EntitlementApi, EnvironmentApi, EventApi,
    HypervisorApi, JobApi, OwnerApi, OwnerContentApi, OwnerProductApi, PoolApi, ProductApi,
    RoleApi, RuleApi, SerialApi, StatisticsApi, StatusApi, SubscriptionApi, UserApi,
    all_owner_permission, ro_owner_permission,
};
pub use shape::{
    Body, as_list, compact, days_from_today, flatten_named, id_references, name_value_pairs,
    push_query_value, query_from, reference, render_scalar, today,
};

/// Every capability trait, for glob import
pub mod prelude {
    pub use crate::api::Api;
    pub use crate::resources::{
        ActivationKeyApi, CdnApi, ConsumerApi, ConsumerTypeApi, ContentApi, CrlApi,
        DistributorVersionApi, EntitlementApi, EnvironmentApi, EventApi, HypervisorApi, JobApi,
        OwnerApi, OwnerContentApi, OwnerProductApi, PoolApi, ProductApi, RoleApi, RuleApi,
        SerialApi, StatisticsApi, StatusApi, SubscriptionApi, UserApi,
    };
}

#[doc(hidden)]
pub mod __private {
    pub use serde_json::json;
}
