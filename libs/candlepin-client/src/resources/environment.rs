//! Environments and activation keys.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, validate_required};
use crate::shape::{as_list, reference};

#[async_trait]
pub trait EnvironmentApi: Api {
    async fn get_environments(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/environments")).await
    }

    /// Options: `id` (required)
    async fn get_environment(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/environments", "id", opts).await
    }

    /// Options: `id` (required)
    async fn delete_environment(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/environments", "id", opts).await
    }

    /// Promote content into an environment.
    ///
    /// Options: `env_id` (required), `content`: content ids or complete
    /// promotion objects. A bare id becomes `{"contentId": id}`.
    async fn promote_content(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("env_id", Value::Null)
            .param("content", json!([]));
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["env_id"])?;

        let promotions: Vec<Value> = as_list(opts.value("content"))
            .iter()
            .map(|item| reference(item, "contentId"))
            .collect();
        let path = format!("/environments/{}/content", opts.segment("env_id")?);
        self.execute(WireRequest::post(path).with_body(promotions))
            .await
    }
}

#[async_trait]
pub trait ActivationKeyApi: Api {
    /// Options: `id` (required)
    async fn get_activation_key(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/activation_keys", "id", opts).await
    }

    async fn get_all_activation_keys(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/activation_keys")).await
    }

    /// Options: `id` (required)
    async fn get_activation_key_pools(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("id", Value::Null))?;
        validate_required(&opts, &["id"])?;
        let path = format!("/activation_keys/{}/pools", opts.segment("id")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `id` (required)
    async fn delete_activation_key(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/activation_keys", "id", opts).await
    }
}
