//! Consumers, their guests and the hypervisor check-in.
//!
//! Operations taking a `uuid` default it to the client's sticky uuid, so a
//! client built from a registration works on its own consumer without
//! repeating the id.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::ClientResult;
use crate::options::{DefaultSet, OptionSet, merge, validate_required};
use crate::shape::{
    Body, as_list, flatten_named, id_references, query_from, reference, render_scalar, today,
};

/// `/consumers/{uuid}{suffix}` for an operation whose only option is `uuid`
fn consumer_path(opts: OptionSet, sticky: Value, suffix: &str) -> ClientResult<String> {
    let opts = merge(opts, &DefaultSet::new().param("uuid", sticky))?;
    Ok(format!("/consumers/{}{suffix}", opts.segment("uuid")?))
}

#[async_trait]
pub trait ConsumerTypeApi: Api {
    /// Options: `label`, `manifest` (default `false`)
    async fn create_consumer_type(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("label", Value::Null)
            .param("manifest", false);
        let opts = merge(opts, &defaults)?;
        let mut body = Body::from_options(&opts, None);
        body.compact();
        self.execute(WireRequest::post("/consumertypes").with_body(body.into_value()))
            .await
    }

    async fn get_all_consumer_types(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/consumertypes")).await
    }

    /// Options: `type_id` (required)
    async fn get_consumer_type(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/consumertypes", "type_id", opts).await
    }

    /// Options: `type_id` (required)
    async fn delete_consumer_type(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/consumertypes", "type_id", opts).await
    }
}

#[async_trait]
pub trait ConsumerApi: Api {
    /// Register a consumer.
    ///
    /// Options: `name`, `type` (default `"system"`), `uuid`, `facts`,
    /// `username`, `owner`, `activation_keys`, `installed_products`,
    /// `environment`, `capabilities`, `hypervisor_id`.
    ///
    /// With an `environment` the consumer is registered through
    /// `/environments/{environment}/consumers`. Activation keys travel as a
    /// single comma separated query value.
    async fn register(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("name", Value::Null)
            .param("type", "system")
            .param("uuid", self.uuid_default())
            .param("facts", json!({}))
            .param("username", Value::Null)
            .param("owner", Value::Null)
            .param("activation_keys", json!([]))
            .param("installed_products", json!([]))
            .param("environment", Value::Null)
            .param("capabilities", json!([]))
            .param("hypervisor_id", Value::Null);
        let opts = merge(opts, &defaults)?;

        let mut body = Body::new();
        body.insert("type", json!({ "label": opts.value("type") }))
            .extend_wire(&opts, &["name", "facts", "uuid"])
            .insert_non_null("hypervisorId", reference(opts.value("hypervisor_id"), "hypervisorId"));
        let capabilities = as_list(opts.value("capabilities"));
        if !capabilities.is_empty() {
            body.insert("capabilities", flatten_named(&Value::Array(capabilities), "name"));
        }
        body.insert("installedProducts", id_references(opts.value("installed_products")))
            .compact();

        let path = if opts.is_null("environment") {
            "/consumers".to_owned()
        } else {
            format!("/environments/{}/consumers", opts.segment("environment")?)
        };

        let mut query = query_from(&opts, &["username", "owner"])?;
        let keys: Vec<String> = as_list(opts.value("activation_keys"))
            .iter()
            .filter_map(render_scalar)
            .collect();
        if !keys.is_empty() {
            query.push("activation_keys", keys.join(","));
        }

        self.execute(
            WireRequest::post(path)
                .with_query(query)
                .with_body(body.into_value()),
        )
        .await
    }

    /// Bind entitlements to a consumer.
    ///
    /// Options: `uuid`, `product`, `quantity`, `async` (default `false`),
    /// `entitle_date`, `pool`. `quantity` defaults to 1 unless binding by
    /// `product`; `entitle_date` defaults to today unless binding a `pool`.
    async fn bind(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let quantity = if opts.contains_key("product") {
            Value::Null
        } else {
            json!(1)
        };
        let entitle_date = if opts.contains_key("pool") {
            Value::Null
        } else {
            Value::String(today())
        };
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("product", Value::Null)
            .param("quantity", quantity)
            .param("async", false)
            .param("entitle_date", entitle_date)
            .param("pool", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["uuid"])?;

        let query = query_from(&opts, &["product", "quantity", "async", "entitle_date", "pool"])?;
        let path = format!("/consumers/{}/entitlements", opts.segment("uuid")?);
        self.execute(WireRequest::post(path).with_query(query)).await
    }

    /// Options: `deleted_uuid` (required)
    async fn delete_deletion_record(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("deleted_uuid", Value::Null))?;
        let path = format!("/consumers/{}/deletionrecord", opts.segment("deleted_uuid")?);
        self.execute(WireRequest::delete(path)).await
    }

    /// Options: `uuid`
    async fn delete_all_entitlements(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/entitlements")?;
        self.execute(WireRequest::delete(path)).await
    }

    /// Options: `uuid`, `entitlement_id` (required)
    async fn delete_entitlement(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("entitlement_id", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/consumers/{}/entitlements/{}",
            opts.segment("uuid")?,
            opts.segment("entitlement_id")?
        );
        self.execute(WireRequest::delete(path)).await
    }

    /// Options: `uuid`
    async fn delete_consumer(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "")?;
        self.execute(WireRequest::delete(path)).await
    }

    /// Replace a consumer's mutable fields.
    ///
    /// Options: `uuid`, `facts`, `installed_products`, `hypervisor_id`,
    /// `guest_ids`, `autoheal` (default `true`), `service_level`,
    /// `capabilities`. Null fields are left out of the body.
    async fn update_consumer(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("facts", json!({}))
            .param("installed_products", json!([]))
            .param("hypervisor_id", Value::Null)
            .param("guest_ids", json!([]))
            .param("autoheal", true)
            .param("service_level", Value::Null)
            .param("capabilities", json!([]));
        let opts = merge(opts, &defaults)?;
        let path = format!("/consumers/{}", opts.segment("uuid")?);

        let mut body = Body::from_options(&opts, None);
        body.insert("installedProducts", Value::Array(as_list(opts.value("installed_products"))))
            .insert("hypervisorId", reference(opts.value("hypervisor_id"), "hypervisorId"))
            .insert("guestIds", flatten_named(opts.value("guest_ids"), "guestId"))
            .insert("capabilities", flatten_named(opts.value("capabilities"), "name"))
            .compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `uuid`
    async fn get_consumer(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "")?;
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `uuid`
    async fn get_consumer_events(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/events")?;
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `uuid`
    async fn get_consumer_host(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/host")?;
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `uuid`
    async fn get_consumer_guests(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/guests")?;
        self.execute(WireRequest::get(path)).await
    }

    /// The consumer's event feed as Atom text. Options: `uuid`
    async fn get_consumer_events_atom(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/atom")?;
        self.get_text(&path).await
    }

    /// Options: `uuid`
    async fn get_consumer_cert_serials(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/certificates/serials")?;
        self.execute(WireRequest::get(path)).await
    }

    /// Replace the full guest id list. Options: `uuid`, `guest_ids`
    async fn update_all_guest_ids(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("guest_ids", json!([]));
        let opts = merge(opts, &defaults)?;
        let path = format!("/consumers/{}/guestids", opts.segment("uuid")?);
        let body = flatten_named(opts.value("guest_ids"), "guestId");
        self.execute(WireRequest::put(path).with_body(body)).await
    }

    /// Options: `uuid`, `guest_id` (both required)
    async fn update_guest_id(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("guest_id", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["uuid", "guest_id"])?;
        let path = format!(
            "/consumers/{}/guestids/{}",
            opts.segment("uuid")?,
            opts.segment("guest_id")?
        );
        let body = Body::from_options(&opts, Some(&["guest_id"]));
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `uuid`
    async fn get_all_guest_ids(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = consumer_path(opts, self.uuid_default(), "/guestids")?;
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `uuid`, `guest_id` (required)
    async fn get_guest_id(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("guest_id", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/consumers/{}/guestids/{}",
            opts.segment("uuid")?,
            opts.segment("guest_id")?
        );
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `uuid`, `guest_id` (both required), `unregister` (default
    /// `false`) which also unregisters the guest's consumer.
    async fn delete_guest_id(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("uuid", self.uuid_default())
            .param("guest_id", Value::Null)
            .param("unregister", false);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &["uuid", "guest_id"])?;
        let path = format!(
            "/consumers/{}/guestids/{}",
            opts.segment("uuid")?,
            opts.segment("guest_id")?
        );
        let query = query_from(&opts, &["unregister"])?;
        self.execute(WireRequest::delete(path).with_query(query))
            .await
    }

    /// Consumers deleted since `date`. Options: `date`
    async fn get_deleted_consumers(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("date", Value::Null))?;
        let query = query_from(&opts, &["date"])?;
        self.execute(WireRequest::get("/deleted_consumers").with_query(query))
            .await
    }
}

#[async_trait]
pub trait HypervisorApi: Api {
    /// Report the guests running on each hypervisor.
    ///
    /// Options: `owner`, `host_guest_mapping` (hypervisor id to guest id
    /// list, sent as the body unchanged), `create_missing`.
    async fn post_hypervisor_check_in(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("owner", Value::Null)
            .param("host_guest_mapping", json!({}))
            .param("create_missing", Value::Null);
        let opts = merge(opts, &defaults)?;
        let query = query_from(&opts, &["owner", "create_missing"])?;
        let body = opts.value("host_guest_mapping").clone();
        self.execute(
            WireRequest::post("/hypervisors")
                .with_query(query)
                .with_body(body),
        )
        .await
    }
}
