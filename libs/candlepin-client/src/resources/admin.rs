//! Server-wide administrative resources.

use async_trait::async_trait;
use serde_json::Value;

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, validate_required};
use crate::shape::query_from;

#[async_trait]
pub trait StatusApi: Api {
    /// GET /status
    async fn get_status(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/status")).await
    }
}

#[async_trait]
pub trait CrlApi: Api {
    /// GET /crl as PEM text
    async fn get_crl(&self) -> ClientResult<ApiResponse> {
        self.get_text("/crl").await
    }
}

#[async_trait]
pub trait StatisticsApi: Api {
    async fn put_statistics(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::put("/statistics/generate")).await
    }
}

#[async_trait]
pub trait SerialApi: Api {
    /// Options: `serial_id` (required)
    async fn get_serial(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/serials", "serial_id", opts).await
    }
}

#[async_trait]
pub trait EventApi: Api {
    async fn get_events(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/events")).await
    }
}

#[async_trait]
pub trait JobApi: Api {
    /// Options: `job_id` (required)
    async fn get_job(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/jobs", "job_id", opts).await
    }

    /// Options: `owner`
    async fn get_owner_jobs(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("owner", Value::Null))?;
        let query = query_from(&opts, &["owner"])?;
        self.execute(WireRequest::get("/jobs").with_query(query))
            .await
    }

    async fn get_scheduler_status(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/jobs/scheduler")).await
    }

    /// Options: `status` (default `false`); sent as a bare JSON boolean
    async fn set_scheduler_status(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("status", false))?;
        validate_required(&opts, &["status"])?;
        self.execute(WireRequest::post("/jobs/scheduler").with_body(opts.value("status").clone()))
            .await
    }

    /// Options: `job_id` (required)
    async fn delete_job(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/jobs", "job_id", opts).await
    }
}

#[async_trait]
pub trait RuleApi: Api {
    /// GET /rules as text
    async fn get_rules(&self) -> ClientResult<ApiResponse> {
        self.get_text("/rules").await
    }

    async fn delete_rules(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::delete("/rules")).await
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

    impl StatusApi for RecordingApi {}
    impl CrlApi for RecordingApi {}
    impl StatisticsApi for RecordingApi {}
    impl SerialApi for RecordingApi {}
    impl EventApi for RecordingApi {}
    impl JobApi for RecordingApi {}
    impl RuleApi for RecordingApi {}

    #[tokio::test]
    async fn test_simple_gets() {
        let api = RecordingApi::new();
        api.get_status().await.unwrap();
        assert_eq!(api.last(), WireRequest::get("/status"));
        api.get_events().await.unwrap();
        assert_eq!(api.last().path, "/events");
        api.put_statistics().await.unwrap();
        assert_eq!(api.last().method, Method::PUT);
    }

    #[tokio::test]
    async fn test_text_resources() {
        let api = RecordingApi::new();
        api.get_crl().await.unwrap();
        assert_eq!(api.last().accept, Some("text/plain"));
        api.get_rules().await.unwrap();
        assert_eq!(api.last().path, "/rules");
        assert_eq!(api.last().accept, Some("text/plain"));
    }

    #[tokio::test]
    async fn test_scheduler_status_defaults_to_false() {
        let api = RecordingApi::new();
        api.set_scheduler_status(OptionSet::new()).await.unwrap();
        assert_eq!(api.last().body, Some(json!(false)));

        api.set_scheduler_status(options! { "status" => true })
            .await
            .unwrap();
        assert_eq!(api.last().method, Method::POST);
        assert_eq!(api.last().body, Some(json!(true)));
    }

    #[tokio::test]
    async fn test_owner_jobs_query() {
        let api = RecordingApi::new();
        api.get_owner_jobs(options! { "owner" => "admin" }).await.unwrap();
        assert_eq!(query_pairs(&api.last()), vec!["owner=admin"]);

        api.get_owner_jobs(OptionSet::new()).await.unwrap();
        assert!(api.last().query.is_empty());
    }

    #[tokio::test]
    async fn test_job_by_id() {
        let api = RecordingApi::new();
        api.get_job(options! { "job_id" => "refresh_pools_1" }).await.unwrap();
        assert_eq!(api.last().path, "/jobs/refresh_pools_1");
        api.delete_job(options! { "job_id" => "j2" }).await.unwrap();
        assert_eq!(api.last(), WireRequest::delete("/jobs/j2"));
    }

    #[tokio::test]
    async fn test_serial_unknown_option() {
        let api = RecordingApi::new();
        let err = api
            .get_serial(options! { "serial" => 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnknownParameter { .. }));
    }
}
