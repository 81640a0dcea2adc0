//! Distributor versions and content delivery networks.

use async_trait::async_trait;
use candlepin_http::QueryParams;
use serde_json::{Value, json};

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge};
use crate::shape::{Body, flatten_named, push_query_value};

fn distributor_body(opts: &OptionSet, fields: &[&str]) -> Value {
    let mut body = Body::from_options(opts, Some(fields));
    body.insert("capabilities", flatten_named(opts.value("capabilities"), "name"))
        .compact();
    body.into_value()
}

fn cdn_defaults() -> DefaultSet {
    DefaultSet::new()
        .param("label", Value::Null)
        .param("name", Value::Null)
        .param("url", Value::Null)
        .param("certificate", Value::Null)
}

#[async_trait]
pub trait DistributorVersionApi: Api {
    /// Options: `name`, `display_name`, `capabilities` (capability names)
    async fn create_distributor_version(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("name", Value::Null)
            .param("display_name", Value::Null)
            .param("capabilities", json!([]));
        let opts = merge(opts, &defaults)?;
        let body = distributor_body(&opts, &["name", "display_name"]);
        self.execute(WireRequest::post("/distributor_versions").with_body(body))
            .await
    }

    /// Options: `id` (required), `name`, `display_name`, `capabilities`
    async fn update_distributor_version(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("id", Value::Null)
            .param("name", Value::Null)
            .param("display_name", Value::Null)
            .param("capabilities", json!([]));
        let opts = merge(opts, &defaults)?;
        let path = format!("/distributor_versions/{}", opts.segment("id")?);
        let body = distributor_body(&opts, &["id", "name", "display_name"]);
        self.execute(WireRequest::put(path).with_body(body)).await
    }

    /// Search by `name` (sent as `name_search`) and `capability`
    async fn get_distributor_version(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("name", Value::Null)
            .param("capability", Value::Null);
        let opts = merge(opts, &defaults)?;
        let mut query = QueryParams::new();
        push_query_value(&mut query, "capability", opts.value("capability"));
        push_query_value(&mut query, "name_search", opts.value("name"));
        self.execute(WireRequest::get("/distributor_versions").with_query(query))
            .await
    }

    /// Options: `id` (required)
    async fn delete_distributor_version(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/distributor_versions", "id", opts)
            .await
    }
}

#[async_trait]
pub trait CdnApi: Api {
    /// Options: `label`, `name`, `url`, `certificate`
    async fn create_cdn(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &cdn_defaults())?;
        let mut body = Body::from_options(&opts, None);
        body.compact();
        self.execute(WireRequest::post("/cdn").with_body(body.into_value()))
            .await
    }

    /// Options: `label` (required), `name`, `url`, `certificate`
    async fn update_cdn(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &cdn_defaults())?;
        let path = format!("/cdn/{}", opts.segment("label")?);
        let mut body = Body::from_options(&opts, Some(&["name", "url", "certificate"]));
        body.compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    async fn get_all_cdns(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/cdn")).await
    }

    /// Options: `label` (required)
    async fn delete_cdn(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/cdn", "label", opts).await
    }
}
