//! Products, globally and per owner.

use async_trait::async_trait;
use candlepin_http::QueryParams;
use serde_json::{Value, json};

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, validate_required, validate_required_with};
use crate::resources::entitlement::statistics_path;
use crate::shape::{Body, as_list, name_value_pairs, push_query_value, query_from};

/// Merge `opts` against `key` and `product_id`, both required, and return
/// `/owners/{key}/products/{product_id}{suffix}`
fn owner_product_path(opts: OptionSet, suffix: &str) -> ClientResult<String> {
    let defaults = DefaultSet::new()
        .param("key", Value::Null)
        .param("product_id", Value::Null);
    let opts = merge(opts, &defaults)?;
    validate_required(&opts, &[])?;
    Ok(format!(
        "/owners/{}/products/{}{suffix}",
        opts.segment("key")?,
        opts.segment("product_id")?
    ))
}

fn product_content_defaults() -> DefaultSet {
    DefaultSet::new()
        .param("product_id", Value::Null)
        .param("content_id", Value::Null)
}

#[async_trait]
pub trait OwnerProductApi: Api {
    /// Options: `key`, `product_id` (both required)
    async fn get_owner_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_product_path(opts, "")?))
            .await
    }

    /// Options: `key` (required)
    async fn get_all_owner_products(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("key", Value::Null))?;
        validate_required(&opts, &[])?;
        let path = format!("/owners/{}/products", opts.segment("key")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Create a product under an owner.
    ///
    /// Options: `product_id` (sent as `id`), `type` (default `"SVC"`, sent
    /// as the `type` attribute), `name`, `multiplier` (default 1),
    /// `attributes` (a map), `dependent_product_ids`, `product_content`,
    /// `relies_on`, `key` (required).
    async fn create_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("product_id", Value::Null)
            .param("type", "SVC")
            .param("name", Value::Null)
            .param("multiplier", 1)
            .param("attributes", json!({}))
            .param("dependent_product_ids", json!([]))
            .param("product_content", json!([]))
            .param("relies_on", json!([]))
            .param("key", Value::Null);
        let mut opts = merge(opts, &defaults)?;
        validate_required(&opts, &["key"])?;
        validate_required_with(&opts, &["attributes"], Value::is_object)?;

        let mut attributes = opts.remove("attributes").unwrap_or_else(|| json!({}));
        if let Some(map) = attributes.as_object_mut() {
            map.insert("type".to_owned(), opts.value("type").clone());
        }

        let path = format!("/owners/{}/products", opts.segment("key")?);
        let mut body = Body::from_options(
            &opts,
            Some(&[
                "name",
                "multiplier",
                "dependent_product_ids",
                "relies_on",
                "product_content",
            ]),
        );
        body.insert("id", opts.value("product_id").clone())
            .insert("attributes", name_value_pairs(&attributes))
            .compact();
        self.execute(WireRequest::post(path).with_body(body.into_value()))
            .await
    }

    /// Options: `product_id`, `key` (both required), `name`, `multiplier`,
    /// `attributes`, `dependent_product_ids`, `relies_on`
    async fn update_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("product_id", Value::Null)
            .param("name", Value::Null)
            .param("multiplier", Value::Null)
            .param("attributes", json!([]))
            .param("dependent_product_ids", json!([]))
            .param("relies_on", json!([]))
            .param("key", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["key"])?;
        let path = format!(
            "/owners/{}/products/{}",
            opts.segment("key")?,
            opts.segment("product_id")?
        );

        let mut body = Body::from_options(
            &opts,
            Some(&["name", "multiplier", "dependent_product_ids", "relies_on"]),
        );
        body.insert("id", opts.value("product_id").clone())
            .insert("attributes", name_value_pairs(opts.value("attributes")))
            .compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `key`, `product_id` (both required)
    async fn delete_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::delete(owner_product_path(opts, "")?))
            .await
    }

    /// Options: `key`, `product_id` (both required)
    async fn get_product_cert(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_product_path(opts, "/certificate")?))
            .await
    }

    /// Attach content to a product.
    ///
    /// Options: `product_id`, `content_id`, `key` (all required), `enabled`
    /// (default `true`)
    async fn update_product_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = product_content_defaults()
            .param("enabled", true)
            .param("key", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/owners/{}/products/{}/content/{}",
            opts.segment("key")?,
            opts.segment("product_id")?,
            opts.segment("content_id")?
        );
        let query = query_from(&opts, &["enabled"])?;
        self.execute(WireRequest::post(path).with_query(query)).await
    }

    /// Options: `product_id`, `content_id`, `key` (all required)
    async fn delete_product_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = product_content_defaults().param("key", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/owners/{}/products/{}/content/{}",
            opts.segment("key")?,
            opts.segment("product_id")?,
            opts.segment("content_id")?
        );
        self.execute(WireRequest::delete(path)).await
    }
}

#[async_trait]
pub trait ProductApi: Api {
    /// Options: `product_id` (required)
    async fn get_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/products", "product_id", opts).await
    }

    /// Owners holding any of `product_ids`, which must not be empty.
    async fn get_owners_with_product(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("product_ids", json!([])))?;
        validate_required_with(&opts, &["product_ids"], |value| !as_list(value).is_empty())?;
        let mut query = QueryParams::new();
        push_query_value(&mut query, "product", &Value::Array(as_list(opts.value("product_ids"))));
        self.execute(WireRequest::get("/products/owners").with_query(query))
            .await
    }

    /// Options: `product_id` (required)
    async fn get_product_certificate(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("product_id", Value::Null))?;
        let path = format!("/products/{}/certificate", opts.segment("product_id")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `product_id` (required), `val_type`
    async fn get_per_product_statistics(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("product_id", Value::Null)
            .param("val_type", Value::Null);
        let opts = merge(opts, &defaults)?;
        let base = format!("/products/{}", opts.segment("product_id")?);
        let path = statistics_path(&base, &opts)?;
        self.execute(WireRequest::get(path)).await
    }
}
