//! Users, roles and role permissions.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::api::{Api, ApiResponse, WireRequest};
use crate::error::{ClientError, ClientResult};
use crate::options::{DefaultSet, OptionSet, merge, validate_required};
use crate::shape::{Body, as_list, reference};

/// Access level granted by [`all_owner_permission`]
pub const ACCESS_ALL: &str = "ALL";
/// Access level granted by [`ro_owner_permission`]
pub const ACCESS_READ_ONLY: &str = "READ_ONLY";

fn owner_permission(key: &str, access: &str) -> Value {
    json!({
        "access": access,
        "type": "OWNER",
        "owner": { "key": key },
    })
}

/// Full access to the owner `key`
#[must_use]
pub fn all_owner_permission(key: &str) -> Value {
    owner_permission(key, ACCESS_ALL)
}

/// Read-only access to the owner `key`
#[must_use]
pub fn ro_owner_permission(key: &str) -> Value {
    owner_permission(key, ACCESS_READ_ONLY)
}

fn user_defaults() -> DefaultSet {
    DefaultSet::new()
        .param("username", Value::Null)
        .param("password", Value::Null)
        .param("super_admin", false)
}

#[async_trait]
pub trait UserApi: RoleApi {
    /// Options: `username`, `password`, `super_admin` (default `false`)
    async fn create_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &user_defaults())?;
        let mut body = Body::from_options(&opts, None);
        body.compact();
        self.execute(WireRequest::post("/users").with_body(body.into_value()))
            .await
    }

    /// Create a user with access to the owner `key`.
    ///
    /// Reuses the role `{key}-ALL` when it exists, otherwise creates it with
    /// full access for a super admin and read-only access for anyone else.
    /// The returned user carries the supplied `password` so it can be handed
    /// straight to a basic-auth client.
    ///
    /// Options: `username`, `password`, `super_admin` (default `false`),
    /// `key` (required).
    ///
    /// # Errors
    /// Any non-2xx response along the way is an `UnexpectedStatus`.
    async fn create_user_under_owner(&self, opts: OptionSet) -> ClientResult<Value> {
        let opts = merge(opts, &user_defaults().param("key", Value::Null))?;
        validate_required(&opts, &["key"])?;
        let key = opts
            .str("key")
            .map_or_else(|| opts.value("key").to_string(), str::to_owned);
        let role_name = format!("{key}-ALL");

        let roles = self.get_all_roles().await?.ok_json()?;
        let existing = roles
            .as_array()
            .and_then(|roles| {
                roles
                    .iter()
                    .find(|role| role.get("name").and_then(Value::as_str) == Some(role_name.as_str()))
            })
            .cloned();
        let role = if let Some(role) = existing {
            role
        } else {
            let permission = if opts.value("super_admin").as_bool().unwrap_or(false) {
                all_owner_permission(&key)
            } else {
                ro_owner_permission(&key)
            };
            debug!(role = %role_name, "creating owner role");
            let created = OptionSet::new()
                .with("name", role_name.as_str())
                .with("permissions", permission);
            self.create_role(created).await?.ok_json()?
        };
        let role_id = role
            .get("id")
            .cloned()
            .ok_or_else(|| ClientError::Decode(format!("role {role_name} has no id")))?;

        let user_opts = OptionSet::new()
            .with("username", opts.value("username").clone())
            .with("password", opts.value("password").clone())
            .with("super_admin", opts.value("super_admin").clone());
        let mut user = self.create_user(user_opts).await?.ok_json()?;

        let membership = OptionSet::new()
            .with("role_id", role_id)
            .with("username", opts.value("username").clone());
        self.add_role_user(membership).await?.ok_content()?;

        if let Some(fields) = user.as_object_mut() {
            fields.insert("password".to_owned(), opts.value("password").clone());
        }
        Ok(user)
    }

    /// Options: `username` (required), `password`, `super_admin` (default
    /// `false`)
    async fn update_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &user_defaults())?;
        let path = format!("/users/{}", opts.segment("username")?);
        let mut body = Body::from_options(&opts, None);
        body.compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `username` (required)
    async fn get_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/users", "username", opts).await
    }

    /// Options: `username` (required)
    async fn get_user_roles(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("username", Value::Null))?;
        let path = format!("/users/{}/roles", opts.segment("username")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `username` (required)
    async fn get_user_owners(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let opts = merge(opts, &DefaultSet::new().param("username", Value::Null))?;
        let path = format!("/users/{}/owners", opts.segment("username")?);
        self.execute(WireRequest::get(path)).await
    }

    /// Options: `username` (required)
    async fn delete_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/users", "username", opts).await
    }

    async fn get_all_users(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/users")).await
    }
}

#[async_trait]
pub trait RoleApi: Api {
    /// Options: `name`, `permissions` (one permission or a list)
    async fn create_role(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("name", Value::Null)
            .param("permissions", json!([]));
        let opts = merge(opts, &defaults)?;
        let mut body = Body::new();
        body.insert("name", opts.value("name").clone())
            .insert("permissions", Value::Array(as_list(opts.value("permissions"))));
        self.execute(WireRequest::post("/roles").with_body(body.into_value()))
            .await
    }

    /// Options: `role_id` (required), `users`, `permissions`, `name`
    async fn update_role(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("role_id", Value::Null)
            .param("users", json!([]))
            .param("permissions", json!([]))
            .param("name", Value::Null);
        let opts = merge(opts, &defaults)?;
        let path = format!("/roles/{}", opts.segment("role_id")?);
        let mut body = Body::new();
        body.insert("id", opts.value("role_id").clone())
            .insert("name", opts.value("name").clone())
            .insert("users", Value::Array(as_list(opts.value("users"))))
            .insert("permissions", Value::Array(as_list(opts.value("permissions"))))
            .compact();
        self.execute(WireRequest::put(path).with_body(body.into_value()))
            .await
    }

    /// Options: `role_id` (required)
    async fn get_role(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.get_by_id("/roles", "role_id", opts).await
    }

    async fn get_all_roles(&self) -> ClientResult<ApiResponse> {
        self.execute(WireRequest::get("/roles")).await
    }

    /// Options: `role_id` (required)
    async fn delete_role(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        self.delete_by_id("/roles", "role_id", opts).await
    }

    /// Options: `role_id`, `username` (both required)
    async fn add_role_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = role_user_path(opts)?;
        self.execute(WireRequest::post(path)).await
    }

    /// Options: `role_id`, `username` (both required)
    async fn delete_role_user(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let path = role_user_path(opts)?;
        self.execute(WireRequest::delete(path)).await
    }

    /// Grant a permission to a role.
    ///
    /// Options: `role_id` (required), `type`, `owner` (an owner key or an
    /// owner object), `access` (default `READ_ONLY`)
    async fn add_role_permission(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("role_id", Value::Null)
            .param("type", Value::Null)
            .param("owner", Value::Null)
            .param("access", ACCESS_READ_ONLY);
        let opts = merge(opts, &defaults)?;
        let path = format!("/roles/{}/permissions/", opts.segment("role_id")?);
        let mut body = Body::new();
        body.insert("owner", reference(opts.value("owner"), "key"))
            .insert("access", opts.value("access").clone())
            .insert("type", opts.value("type").clone())
            .compact();
        self.execute(WireRequest::post(path).with_body(body.into_value()))
            .await
    }

    /// Options: `role_id`, `permission_id` (both required)
    async fn delete_role_permission(&self, opts: OptionSet) -> ClientResult<ApiResponse> {
        let defaults = DefaultSet::new()
            .param("role_id", Value::Null)
            .param("permission_id", Value::Null);
        let opts = merge(opts, &defaults)?;
        validate_required(&opts, &[])?;
        let path = format!(
            "/roles/{}/permissions/{}",
            opts.segment("role_id")?,
            opts.segment("permission_id")?
        );
        self.execute(WireRequest::delete(path)).await
    }
}

fn role_user_path(opts: OptionSet) -> ClientResult<String> {
    let defaults = DefaultSet::new()
        .param("role_id", Value::Null)
        .param("username", Value::Null);
    let opts = merge(opts, &defaults)?;
    validate_required(&opts, &[])?;
    Ok(format!(
        "/roles/{}/users/{}",
        opts.segment("role_id")?,
        opts.segment("username")?
    ))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::api::Content;
    use crate::api::testing::RecordingApi;
    use crate::options;
    use candlepin_http::{Method, StatusCode};

    impl RoleApi for RecordingApi {}
    impl UserApi for RecordingApi {}

    #[test]
    fn test_owner_permissions() {
        assert_eq!(
            all_owner_permission("admin"),
            json!({"access": "ALL", "type": "OWNER", "owner": {"key": "admin"}})
        );
        assert_eq!(ro_owner_permission("admin")["access"], json!("READ_ONLY"));
    }

    #[tokio::test]
    async fn test_create_user_body() {
        let api = RecordingApi::new();
        api.create_user(options! { "username" => "bob", "password" => "secret" })
            .await
            .unwrap();
        assert_eq!(
            api.last().body,
            Some(json!({"username": "bob", "password": "secret", "superAdmin": false}))
        );
    }

    #[tokio::test]
    async fn test_create_user_under_owner_creates_role() {
        let api = RecordingApi::new();
        api.reply(StatusCode::OK, Content::Json(json!([{"id": "r0", "name": "other-ALL"}])));
        api.reply(StatusCode::OK, Content::Json(json!({"id": "r1", "name": "admin-ALL"})));
        api.reply(StatusCode::OK, Content::Json(json!({"username": "bob"})));

        let user = api
            .create_user_under_owner(options! { "username" => "bob", "password" => "pw", "key" => "admin" })
            .await
            .unwrap();
        assert_eq!(user, json!({"username": "bob", "password": "pw"}));

        let requests = api.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0], WireRequest::get("/roles"));
        assert_eq!(
            requests[1].body,
            Some(json!({"name": "admin-ALL", "permissions": [ro_owner_permission("admin")]}))
        );
        assert_eq!(requests[2].path, "/users");
        assert_eq!(requests[3], WireRequest::post("/roles/r1/users/bob"));
    }

    #[tokio::test]
    async fn test_create_user_under_owner_reuses_role() {
        let api = RecordingApi::new();
        api.reply(StatusCode::OK, Content::Json(json!([{"id": "r9", "name": "admin-ALL"}])));
        api.create_user_under_owner(options! {
            "username" => "root",
            "password" => "pw",
            "super_admin" => true,
            "key" => "admin",
        })
        .await
        .unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[1].body.as_ref().unwrap()["superAdmin"], json!(true));
        assert_eq!(requests[2].path, "/roles/r9/users/root");
    }

    #[tokio::test]
    async fn test_create_user_under_owner_stops_on_error_status() {
        let api = RecordingApi::new();
        api.reply(StatusCode::FORBIDDEN, Content::Empty);
        let err = api
            .create_user_under_owner(options! { "username" => "bob", "key" => "admin" })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnexpectedStatus { status, .. } if status == StatusCode::FORBIDDEN));
        assert_eq!(api.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_update_role_body() {
        let api = RecordingApi::new();
        api.update_role(options! { "role_id" => "r1", "name" => "renamed" })
            .await
            .unwrap();
        let request = api.last();
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/roles/r1");
        assert_eq!(
            request.body,
            Some(json!({"id": "r1", "name": "renamed", "users": [], "permissions": []}))
        );
    }

    #[tokio::test]
    async fn test_add_role_permission_wraps_owner_key() {
        let api = RecordingApi::new();
        api.add_role_permission(options! { "role_id" => "r1", "type" => "OWNER", "owner" => "admin" })
            .await
            .unwrap();
        assert_eq!(api.last().path, "/roles/r1/permissions/");
        assert_eq!(
            api.last().body,
            Some(json!({"owner": {"key": "admin"}, "access": "READ_ONLY", "type": "OWNER"}))
        );
    }

    #[tokio::test]
    async fn test_role_user_requires_both_keys() {
        let api = RecordingApi::new();
        let err = api.delete_role_user(OptionSet::new()).await.unwrap_err();
        assert!(
            matches!(err, ClientError::MissingRequiredParameter { ref keys } if keys == &["role_id", "username"])
        );
    }

    #[tokio::test]
    async fn test_user_paths() {
        let api = RecordingApi::new();
        api.get_user_owners(options! { "username" => "bob" }).await.unwrap();
        assert_eq!(api.last().path, "/users/bob/owners");
        api.update_user(options! { "username" => "bob", "password" => "new" })
            .await
            .unwrap();
        assert_eq!(api.last().method, Method::PUT);
        assert_eq!(api.last().path, "/users/bob");
        api.delete_role_permission(options! { "role_id" => "r1", "permission_id" => "p1" })
            .await
            .unwrap();
        assert_eq!(api.last(), WireRequest::delete("/roles/r1/permissions/p1"));
    }
}
