//! Owners and the content they define.

use async_trait::async_trait;
use candlepin_http::QueryParams;
use serde_json::{Value, json};

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, page_options, validate_required};
use crate::shape::{
    Body, as_list, days_from_today, id_references, push_query_value, query_from, reference,
    render_scalar, today,
};

/// `/owners/{key}{suffix}` for an operation whose only option is `key`
fn owner_path(opts: OptionSet, suffix: &str) -> ClientResult<String> {
    let opts = merge(opts, &DefaultSet::new().param("key", Value::Null))?;
    Ok(format!("/owners/{}{suffix}", opts.segment("key")?))
}

/// Pool attribute filters as `name:value` strings, one per query pair
fn attribute_filters(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(name, value)| render_scalar(value).map(|value| format!("{name}:{value}")))
            .collect(),
        other => as_list(other)
            .iter()
            .filter_map(|item| match item.as_array().map(Vec::as_slice) {
                Some([name, value]) => Some(format!(
                    "{}:{}",
                    render_scalar(name)?,
                    render_scalar(value)?
                )),
                _ => render_scalar(item),
            })
            .collect(),
    }
}

#[async_trait]
pub trait OwnerApi: Api {
    /// Options: `key` (required)
    async fn get_owner(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/owners", "key", opts).await
    }

    /// Options: `key` (required), `hypervisor_ids`, each sent as a
    /// `hypervisor_id` query pair
    async fn get_owner_hypervisors(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("hypervisor_ids", json!([]));
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/hypervisors", opts.segment("key")?);
        let mut query = QueryParams::new();
        push_query_value(&mut query, "hypervisor_id", opts.value("hypervisor_ids"));
        self.execute(WireRequest::get(path).with_query(query)).await
    }

    /// Options: `key` (required)
    async fn get_owner_info(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_path(opts, "/info")?))
            .await
    }

    /// Options: `key` (required)
    async fn get_owner_events(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_path(opts, "/events")?))
            .await
    }

    /// Options: `key` (required)
    async fn get_owner_imports(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_path(opts, "/imports")?))
            .await
    }

    /// Options: `key` (required)
    async fn get_owner_subscriptions(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_path(opts, "/subscriptions")?))
            .await
    }

    /// Options: `key` (required)
    async fn get_owner_activation_keys(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get(owner_path(opts, "/activation_keys")?))
            .await
    }

    /// Options: `key` (required), `exempt` (default `false`)
    async fn get_owner_service_levels(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("exempt", false);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/servicelevels", opts.segment("key")?);
        let query = query_from(&opts, &["exempt"])?;
        self.execute(WireRequest::get(path).with_query(query)).await
    }

    /// Options: `key` (required), `name`
    async fn get_owner_environment(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("name", Value::Null);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/environments", opts.segment("key")?);
        let query = query_from(&opts, &["name"])?;
        self.execute(WireRequest::get(path).with_query(query)).await
    }

    async fn get_all_owners(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/owners")).await
    }

    /// Pools of an owner, optionally filtered and paged.
    ///
    /// Options: `key` (required), `consumer`, `product`, `listall`,
    /// `attributes` (a map or `[name, value]` pairs, each sent as an
    /// `attribute=name:value` pair), `page`, `per_page`, `order`, `sort_by`.
    async fn get_owner_pools(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("consumer", Value::Null)
            .param("product", Value::Null)
            .param("listall", Value::Null)
            .param("attributes", json!([]))
            .extend(page_options());
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["key"])?;
        let path = format!("/owners/{}/pools", opts.segment("key")?);

        let mut query = query_from(&opts, &["consumer", "product", "listall"])?;
        query.push_all("attribute", attribute_filters(opts.value("attributes")));
        for key in ["page", "per_page", "order", "sort_by"] {
            push_query_value(&mut query, key, opts.value(key));
        }
        self.execute(WireRequest::get(path).with_query(query)).await
    }

    /// Trigger an auto-heal of every consumer of the owner. Options: `key`
    async fn autoheal_owner(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::post(owner_path(opts, "/entitlements")?))
            .await
    }

    /// Options: `key`, `display_name`, `parent_owner` (a key or an owner
    /// object)
    async fn create_owner(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("display_name", Value::Null)
            .param("parent_owner", Value::Null);
        let opts = merge(opts, &defaults)?;
        let mut body = Body::from_options(&opts, Some(&["key", "display_name"]));
        body.insert("parentOwner", reference(opts.value("parent_owner"), "id"))
            .compact();
        self.execute(WireRequest::post("/owners").with_body(body.into_value()))
            .await
    }

    /// Options: `key` (required), `id`, `name`, `description`
    async fn create_owner_environment(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("id", Value::Null)
            .param("name", Value::Null)
            .param("description", Value::Null);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/environments", opts.segment("key")?);
        let mut body = Body::from_options(&opts, Some(&["id", "name", "description"]));
        body.compact();
        self.execute(WireRequest::post(path).with_body(body.into_value()))
            .await
    }

    /// Options: `key` (required)
    async fn create_ueber_cert(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::post(owner_path(opts, "/uebercert")?))
            .await
    }

    /// Options: `key` (required), `auto_create_owner`, `lazy_regen` (both
    /// default `false`)
    async fn refresh_pools(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("auto_create_owner", false)
            .param("lazy_regen", false);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["key"])?;
        let path = format!("/owners/{}/subscriptions", opts.segment("key")?);
        let query = query_from(&opts, &["auto_create_owner", "lazy_regen"])?;
        self.execute(WireRequest::put(path).with_query(query)).await
    }

    /// Create a subscription for the owner.
    ///
    /// Options: `key` (required), `start_date` (default today), `end_date`
    /// (default a year from today), `quantity` (default 1),
    /// `account_number`, `order_number`, `contract_number` (default empty),
    /// `product_id`, `provided_products`, `derived_products`,
    /// `derived_provided_products`. Product lists are sent as `{id}`
    /// references and left out when empty.
    async fn create_subscription(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("start_date", today())
            .param("end_date", days_from_today(365))
            .param("quantity", 1)
            .param("account_number", "")
            .param("order_number", "")
            .param("contract_number", "")
            .param("product_id", Value::Null)
            .param("provided_products", json!([]))
            .param("derived_products", json!([]))
            .param("derived_provided_products", json!([]));
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/subscriptions", opts.segment("key")?);

        let mut body = Body::from_options(
            &opts,
            Some(&[
                "start_date",
                "end_date",
                "quantity",
                "account_number",
                "order_number",
                "contract_number",
            ]),
        );
        body.insert("product", json!({ "id": opts.value("product_id") }));
        for (key, field) in [
            ("provided_products", "providedProducts"),
            ("derived_products", "derivedProducts"),
            ("derived_provided_products", "derivedProvidedProducts"),
        ] {
            let products = id_references(opts.value(key));
            if products.as_array().is_some_and(|list| !list.is_empty()) {
                body.insert(field, products);
            }
        }
        body.compact();
        self.execute(WireRequest::post(path).with_body(body.into_value()))
            .await
    }

    /// Options: `key` (required), `display_name`, `parent_owner`,
    /// `default_service_level`, `content_prefix`, `log_level`. Only
    /// non-null fields are sent.
    async fn update_owner(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("display_name", Value::Null)
            .param("parent_owner", Value::Null)
            .param("default_service_level", Value::Null)
            .param("content_prefix", Value::Null)
            .param("log_level", Value::Null);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}", opts.segment("key")?);
        let mut body = Body::from_options(
            &opts,
            Some(&[
                "display_name",
                "parent_owner",
                "default_service_level",
                "content_prefix",
                "log_level",
            ]),
        );
        body.insert("parentOwner", reference(opts.value("parent_owner"), "id"))
            .compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `key` (required), `level`
    async fn set_owner_log_level(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("level", Value::Null);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}/log", opts.segment("key")?);
        let query = query_from(&opts, &["level"])?;
        self.execute(WireRequest::put(path).with_query(query)).await
    }

    /// Options: `key` (required)
    async fn delete_owner_log_level(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::delete(owner_path(opts, "/log")?))
            .await
    }

    /// Options: `key` (required), `revoke` (default `false`)
    async fn delete_owner(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("key", Value::Null)
            .param("revoke", false);
        let opts = merge(opts, &defaults)?;
        let path = format!("/owners/{}", opts.segment("key")?);
        let query = query_from(&opts, &["revoke"])?;
        self.execute(WireRequest::delete(path).with_query(query))
            .await
    }
}

#[async_trait]
pub trait OwnerContentApi: Api {
    /// Define content under an owner.
    ///
    /// Options: `content_id` (sent as `id`), `name`, `label`, `type`
    /// (default `"yum"`), `vendor` (default `"Red Hat"`), `content_url`,
    /// `gpg_url`, `modified_product_ids`, `arches`, `required_tags`,
    /// `metadata_expire`, `key` (required).
    async fn create_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("content_id", Value::Null)
            .param("name", Value::Null)
            .param("label", Value::Null)
            .param("type", "yum")
            .param("vendor", "Red Hat")
            .param("content_url", "")
            .param("gpg_url", "")
            .param("modified_product_ids", json!([]))
            .param("arches", Value::Null)
            .param("required_tags", Value::Null)
            .param("metadata_expire", Value::Null)
            .param("key", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["key"])?;
        let path = format!("/owners/{}/content", opts.segment("key")?);

        let mut body = Body::from_options(
            &opts,
            Some(&[
                "name",
                "label",
                "type",
                "vendor",
                "content_url",
                "gpg_url",
                "modified_product_ids",
                "arches",
                "required_tags",
                "metadata_expire",
            ]),
        );
        body.insert("id", opts.value("content_id").clone())
            .compact();
        self.execute(WireRequest::post(path).with_body(body.into_value()))
            .await
    }

    /// Options: `content_id`, `key` (both required)
    async fn delete_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("content_id", Value::Null)
            .param("key", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/owners/{}/content/{}",
            opts.segment("key")?,
            opts.segment("content_id")?
        );
        self.execute(WireRequest::delete(path)).await
    }
}

#[async_trait]
pub trait ContentApi: Api {
    async fn get_all_content(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/content")).await
    }

    /// Options: `content_id` (required)
    async fn get_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/content", "content_id", opts).await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::api::testing::{RecordingApi, query_pairs};
    use crate::error::ClientError;
    use crate::options;
    use candlepin_http::Method;

    impl OwnerApi for RecordingApi {}
    impl OwnerContentApi for RecordingApi {}
    impl ContentApi for RecordingApi {}

    #[tokio::test]
    async fn test_owner_pools_query() {
        let api = RecordingApi::new();
        api.get_owner_pools(options! {
            "key" => "admin",
            "product" => "awesomeos",
            "attributes" => {"support_level": "Premium Plus"},
            "page" => 2,
            "per_page" => 10,
        })
        .await
        .unwrap();
        let request = api.last();
        assert_eq!(request.path, "/owners/admin/pools");
        assert_eq!(
            query_pairs(&request),
            vec![
                "product=awesomeos",
                "attribute=support_level:Premium Plus",
                "page=2",
                "per_page=10",
            ]
        );
    }

    #[tokio::test]
    async fn test_owner_pools_attribute_pairs() {
        let api = RecordingApi::new();
        api.get_owner_pools(options! {
            "key" => "admin",
            "attributes" => [["arch", "x86_64"], ["virt_only", true]],
        })
        .await
        .unwrap();
        assert_eq!(
            query_pairs(&api.last()),
            vec!["attribute=arch:x86_64", "attribute=virt_only:true"]
        );
    }

    #[tokio::test]
    async fn test_owner_pools_requires_key() {
        let api = RecordingApi::new();
        let err = api
            .get_owner_pools(options! { "consumer" => "c1" })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingRequiredParameter { ref keys } if keys == &["key"]));
    }

    #[tokio::test]
    async fn test_create_owner_wraps_parent() {
        let api = RecordingApi::new();
        api.create_owner(options! { "key" => "child", "display_name" => "Child", "parent_owner" => "p-1" })
            .await
            .unwrap();
        assert_eq!(
            api.last().body,
            Some(json!({"key": "child", "displayName": "Child", "parentOwner": {"id": "p-1"}}))
        );

        api.create_owner(options! { "key" => "solo" }).await.unwrap();
        assert_eq!(api.last().body, Some(json!({"key": "solo"})));
    }

    #[tokio::test]
    async fn test_update_owner_sends_non_null_fields() {
        let api = RecordingApi::new();
        api.update_owner(options! { "key" => "admin", "default_service_level" => "VIP" })
            .await
            .unwrap();
        let request = api.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/owners/admin");
        assert_eq!(request.body, Some(json!({"defaultServiceLevel": "VIP"})));
    }

    #[tokio::test]
    async fn test_create_subscription_defaults() {
        let api = RecordingApi::new();
        api.create_subscription(options! {
            "key" => "admin",
            "product_id" => "prod1",
            "provided_products" => "prov1",
        })
        .await
        .unwrap();
        let request = api.last();
        assert_eq!(request.path, "/owners/admin/subscriptions");
        let body = request.body.unwrap();
        assert_eq!(body["startDate"], json!(today()));
        assert_eq!(body["endDate"], json!(days_from_today(365)));
        assert_eq!(body["quantity"], json!(1));
        assert_eq!(body["accountNumber"], json!(""));
        assert_eq!(body["product"], json!({"id": "prod1"}));
        assert_eq!(body["providedProducts"], json!([{"id": "prov1"}]));
        assert!(body.get("derivedProducts").is_none());
        assert!(body.get("key").is_none());
    }

    #[tokio::test]
    async fn test_refresh_pools_query() {
        let api = RecordingApi::new();
        api.refresh_pools(options! { "key" => "admin", "lazy_regen" => true })
            .await
            .unwrap();
        assert_eq!(api.last().method, Method::PUT);
        assert_eq!(
            query_pairs(&api.last()),
            vec!["auto_create_owner=false", "lazy_regen=true"]
        );
    }

    #[tokio::test]
    async fn test_owner_subresources() {
        let api = RecordingApi::new();
        for (suffix, request) in [
            ("/info", api.get_owner_info(options! { "key" => "o" }).await),
            ("/events", api.get_owner_events(options! { "key" => "o" }).await),
            ("/imports", api.get_owner_imports(options! { "key" => "o" }).await),
            ("/subscriptions", api.get_owner_subscriptions(options! { "key" => "o" }).await),
            ("/activation_keys", api.get_owner_activation_keys(options! { "key" => "o" }).await),
        ] {
            request.unwrap();
            assert!(api.requests().iter().any(|r| r.path == format!("/owners/o{suffix}")));
        }
    }

    #[tokio::test]
    async fn test_owner_hypervisors_repeat_ids() {
        let api = RecordingApi::new();
        api.get_owner_hypervisors(options! { "key" => "admin", "hypervisor_ids" => ["h1", "h2"] })
            .await
            .unwrap();
        assert_eq!(
            query_pairs(&api.last()),
            vec!["hypervisor_id=h1", "hypervisor_id=h2"]
        );
    }

    #[tokio::test]
    async fn test_delete_owner_revoke() {
        let api = RecordingApi::new();
        api.delete_owner(options! { "key" => "admin", "revoke" => true })
            .await
            .unwrap();
        assert_eq!(api.last().method, Method::DELETE);
        assert_eq!(query_pairs(&api.last()), vec!["revoke=true"]);
        api.set_owner_log_level(options! { "key" => "admin", "level" => "DEBUG" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/owners/admin/log");
        assert_eq!(query_pairs(&api.last()), vec!["level=DEBUG"]);
    }

    #[tokio::test]
    async fn test_create_content_body() {
        let api = RecordingApi::new();
        api.create_content(options! {
            "key" => "admin",
            "content_id" => "c1",
            "name" => "Base",
            "label" => "base",
            "modified_product_ids" => ["p1"],
        })
        .await
        .unwrap();
        let request = api.last();
        assert_eq!(request.path, "/owners/admin/content");
        assert_eq!(
            request.body,
            Some(json!({
                "name": "Base",
                "label": "base",
                "type": "yum",
                "vendor": "Red Hat",
                "contentUrl": "",
                "gpgUrl": "",
                "modifiedProductIds": ["p1"],
                "id": "c1",
            }))
        );
    }

    #[tokio::test]
    async fn test_delete_content_requires_both_keys() {
        let api = RecordingApi::new();
        let err = api
            .delete_content(options! { "content_id" => "c1" })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::MissingRequiredParameter { ref keys } if keys == &["key"]));
        api.get_content(options! { "content_id" => "c1" }).await.unwrap();
        assert_eq!(api.last(), WireRequest::get("/content/c1"));
    }
}
