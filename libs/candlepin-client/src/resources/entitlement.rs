//! Entitlements, the pools they are drawn from and upstream subscriptions.

use async_trait::async_trait;
use candlepin_http::QueryParams;
use serde_json::Value;

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, validate_required};
use crate::shape::{Body, push_query_value};

/// `{base}/statistics` or `{base}/statistics/{val_type}` when a value type
/// was given
pub(crate) fn statistics_path(base: &str, opts: &OptionSet) -> ClientResult<String> {
    if opts.is_null("val_type") {
        Ok(format!("{base}/statistics"))
    } else {
        Ok(format!("{base}/statistics/{}", opts.segment("val_type")?))
    }
}

#[async_trait]
pub trait EntitlementApi: Api {
    /// Options: `entitlement_id` (required)
    async fn get_entitlement(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/entitlements", "entitlement_id", opts).await
    }

    /// PEM text of the upstream certificate. Options: `id` (required)
    async fn get_upstream_certificate(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("id", Value::Null))?;
        let path = format!("/entitlements/{}/upstream_cert", opts.segment("id")?);
        self.get_text(&path).await
    }

    /// Options: `id` (required), `quantity` (default 1)
    async fn update_entitlement(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("id", Value::Null)
            .param("quantity", 1);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["id"])?;
        let path = format!("/entitlements/{}", opts.segment("id")?);
        let body = Body::from_options(&opts, Some(&["id", "quantity"]));
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Move an entitlement to another consumer.
    ///
    /// Options: `id` (required), `to_consumer`, `quantity` (default 1)
    async fn update_entitlement_consumer(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("id", Value::Null)
            .param("to_consumer", Value::Null)
            .param("quantity", 1);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["id"])?;
        let path = format!("/entitlements/{}", opts.segment("id")?);
        let mut body = Body::from_options(&opts, Some(&["to_consumer", "quantity"]));
        body.compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }
}

#[async_trait]
pub trait PoolApi: Api {
    /// A pool as seen by a consumer.
    ///
    /// Options: `pool_id` (required), `uuid` sent as the `consumer` query
    /// parameter when set.
    async fn get_pool(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("pool_id", Value::Null)
            .param("uuid", self.uuid_default());
        let opts = merge(opts, &defaults)?;
        let path = format!("/pools/{}", opts.segment("pool_id")?);
        let mut query = QueryParams::new();
        push_query_value(&mut query, "consumer", opts.value("uuid"));
        self.execute(WireRequest::get(path).with_query(query)).await
    }

    /// Options: `pool_id` (required)
    async fn get_pool_entitlements(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("pool_id", Value::Null))?;
        let path = format!("/pools/{}/entitlements", opts.segment("pool_id")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `pool_id` (required), `val_type`
    async fn get_per_pool_statistics(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("pool_id", Value::Null)
            .param("val_type", Value::Null);
        let opts = merge(opts, &defaults)?;
        let base = format!("/pools/{}", opts.segment("pool_id")?);
        let path = statistics_path(&base, &opts)?;
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `pool_id` (required)
    async fn delete_pool(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/pools", "pool_id", opts).await
    }
}

#[async_trait]
pub trait SubscriptionApi: Api {
    /// Options: `subscription_id` (required)
    async fn get_subscription(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/subscriptions", "subscription_id", opts)
            .await
    }

    /// PEM text of the subscription certificate. Options: `subscription_id`
    /// (required)
    async fn get_subscription_certificate(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("subscription_id", Value::Null))?;
        let path = format!("/subscriptions/{}/cert", opts.segment("subscription_id")?);
        self.get_text(&path).await
    }

    /// Options: `subscription_id` (required)
    async fn delete_subscription(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/subscriptions", "subscription_id", opts)
            .await
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
    use serde_json::json;

    impl EntitlementApi for RecordingApi {}
    impl PoolApi for RecordingApi {}
    impl SubscriptionApi for RecordingApi {}

    #[tokio::test]
    async fn test_update_entitlement_default_quantity() {
        let api = RecordingApi::new();
        api.update_entitlement(options! { "id" => "e1" }).await.unwrap();
        let request = api.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/entitlements/e1");
        assert_eq!(request.body, Some(json!({"id": "e1", "quantity": 1})));
    }

    #[tokio::test]
    async fn test_update_entitlement_consumer_body() {
        let api = RecordingApi::new();
        api.update_entitlement_consumer(options! { "id" => "e1", "to_consumer" => "c2", "quantity" => 3 })
            .await
            .unwrap();
        assert_eq!(api.last().body, Some(json!({"toConsumer": "c2", "quantity": 3})));
    }

    #[tokio::test]
    async fn test_upstream_certificate_is_text() {
        let api = RecordingApi::new();
        api.get_upstream_certificate(options! { "id" => "e1" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/entitlements/e1/upstream_cert");
        assert_eq!(api.last().accept, Some("text/plain"));
    }

    #[tokio::test]
    async fn test_get_pool_uses_pool_id_and_consumer() {
        let api = RecordingApi::with_uuid("c1");
        api.get_pool(options! { "pool_id" => "p1" }).await.unwrap();
        assert_eq!(api.last().path, "/pools/p1");
        assert_eq!(query_pairs(&api.last()), vec!["consumer=c1"]);

        let anonymous = RecordingApi::new();
        anonymous.get_pool(options! { "pool_id" => "p1" }).await.unwrap();
        assert!(anonymous.last().query.is_empty());
    }

    #[tokio::test]
    async fn test_get_pool_requires_pool_id() {
        let api = RecordingApi::new();
        let err = api.get_pool(OptionSet::new()).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingRequiredParameter { .. }));
    }

    #[tokio::test]
    async fn test_pool_statistics_path() {
        let api = RecordingApi::new();
        api.get_per_pool_statistics(options! { "pool_id" => "p1", "val_type" => "USED" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/pools/p1/statistics/USED");
        api.get_per_pool_statistics(options! { "pool_id" => "p1" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/pools/p1/statistics");
    }

    #[tokio::test]
    async fn test_subscriptions() {
        let api = RecordingApi::new();
        api.get_subscription_certificate(options! { "subscription_id" => "s1" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/subscriptions/s1/cert");
        api.delete_subscription(options! { "subscription_id" => "s1" })
            .await
            .unwrap();
        assert_eq!(api.last(), WireRequest::delete("/subscriptions/s1"));
    }
}
