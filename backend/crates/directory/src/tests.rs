//! Integration tests for the directory crate
//!
//! HTTP-level tests drive the router with `oneshot` against the in-memory
//! store.

#[cfg(test)]
mod support {
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderMap, Method, Request, StatusCode, header};
    use kernel::id::{CityId, UserId};
    use platform::password::HashCost;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::application::config::DirectoryConfig;
    use crate::application::session::SessionCodec;
    use crate::domain::entity::user::{NewUser, User};
    use crate::domain::repository::UserRepository;
    use crate::domain::value_object::{
        email::Email,
        user_password::{RawPassword, UserPassword},
    };
    use crate::infra::memory::MemoryDirectoryRepository;
    use crate::presentation::router::directory_router_generic;

    pub const PASSWORD: &str = "correct horse";

    pub struct TestApp {
        pub router: Router,
        pub repo: MemoryDirectoryRepository,
        pub config: DirectoryConfig,
    }

    pub struct TestResponse {
        pub status: StatusCode,
        pub headers: HeaderMap,
        pub body: Value,
    }

    impl TestResponse {
        pub fn set_cookie(&self) -> &str {
            self.headers
                .get(header::SET_COOKIE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
        }
    }

    pub fn test_config() -> DirectoryConfig {
        DirectoryConfig {
            hash_cost: HashCost::minimal(),
            ..DirectoryConfig::development()
        }
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_config(test_config())
        }

        pub fn with_config(config: DirectoryConfig) -> Self {
            let repo = MemoryDirectoryRepository::new();
            let router = directory_router_generic(repo.clone(), config.clone());
            Self {
                router,
                repo,
                config,
            }
        }

        pub async fn seed_user(&self, email: &str, is_admin: bool) -> User {
            self.seed_user_in_city(email, is_admin, None).await
        }

        pub async fn seed_user_in_city(
            &self,
            email: &str,
            is_admin: bool,
            city: Option<CityId>,
        ) -> User {
            let raw = RawPassword::new(PASSWORD.to_string()).unwrap();
            let password =
                UserPassword::from_raw(&raw, self.config.pepper(), self.config.hash_cost).unwrap();

            self.repo
                .create(NewUser {
                    first_name: "Ivan".to_string(),
                    last_name: "Petrov".to_string(),
                    other_name: String::new(),
                    email: Email::new(email).unwrap(),
                    password,
                    phone: String::new(),
                    birthday: None,
                    is_admin,
                    city,
                    additional_info: String::new(),
                })
                .await
                .unwrap()
        }

        pub fn token_for(&self, id: UserId) -> String {
            SessionCodec::from_config(&self.config).issue(id)
        }

        pub async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> TestResponse {
            let raw = body.map(|b| b.to_string());
            self.send_raw(method, uri, token, raw).await
        }

        pub async fn send_raw(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<String>,
        ) -> TestResponse {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(
                    header::COOKIE,
                    format!("{}={}", self.config.session_cookie_name, token),
                );
            }

            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };

            TestResponse {
                status,
                headers,
                body,
            }
        }
    }
}

#[cfg(test)]
mod guard_tests {
    use std::sync::Arc;

    use kernel::id::UserId;

    use super::support::TestApp;
    use crate::application::guard::{AuthorizationGuard, require_owner};
    use crate::error::DirectoryError;

    #[tokio::test]
    async fn test_require_session_resolves_user() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;
        let guard = AuthorizationGuard::new(Arc::new(app.repo.clone()), &app.config);

        let token = app.token_for(user.id);
        let resolved = guard.require_session(Some(&token)).await.unwrap();
        assert_eq!(resolved.id, user.id);

        // Resolution has no side effects
        let again = guard.require_session(Some(&token)).await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_require_session_failures() {
        let app = TestApp::new();
        let guard = AuthorizationGuard::new(Arc::new(app.repo.clone()), &app.config);

        assert!(matches!(
            guard.require_session(None).await,
            Err(DirectoryError::NoToken)
        ));
        assert!(matches!(
            guard.require_session(Some("garbage")).await,
            Err(DirectoryError::UnknownSession)
        ));

        let token = app.token_for(UserId::new(42));
        assert!(matches!(
            guard.require_session(Some(&token)).await,
            Err(DirectoryError::UnknownSession)
        ));
    }

    #[tokio::test]
    async fn test_require_admin_checks_role_after_session() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;
        let user = app.seed_user("user@mail.ru", false).await;
        let guard = AuthorizationGuard::new(Arc::new(app.repo.clone()), &app.config);

        assert!(matches!(
            guard.require_admin(None).await,
            Err(DirectoryError::NoToken)
        ));
        assert!(matches!(
            guard.require_admin(Some(&app.token_for(user.id))).await,
            Err(DirectoryError::Forbidden)
        ));
        assert!(guard.require_admin(Some(&app.token_for(admin.id))).await.is_ok());
    }

    #[tokio::test]
    async fn test_require_owner_has_no_admin_bypass() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;

        assert!(require_owner(&admin, admin.id).is_ok());
        match require_owner(&admin, UserId::new(99)) {
            Err(DirectoryError::NotOwner(id)) => assert_eq!(id, UserId::new(99)),
            other => panic!("expected NotOwner, got {:?}", other),
        }
    }
}

#[cfg(test)]
mod login_tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::support::{PASSWORD, TestApp};
    use crate::application::config::TokenMode;

    #[tokio::test]
    async fn test_login_sets_cookie_and_returns_current_user() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "a@mail.ru", "password": PASSWORD})),
            )
            .await;

        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            json!({
                "first_name": "Ivan",
                "last_name": "Petrov",
                "other_name": "",
                "email": "a@mail.ru",
                "phone": "",
                "birthday": null,
                "is_admin": false,
            })
        );

        let cookie = res.set_cookie();
        let expected_prefix = format!("userid={}", app.token_for(user.id));
        assert!(cookie.starts_with(&expected_prefix));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=300"));
    }

    #[tokio::test]
    async fn test_login_cookie_authenticates_followup_request() {
        let app = TestApp::new();
        app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": " a@mail.ru ", "password": PASSWORD})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let token = res
            .set_cookie()
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
            .unwrap();

        let current = app.send(Method::GET, "/current", Some(&token), None).await;
        assert_eq!(current.status, StatusCode::OK);
        assert_eq!(current.body["email"], "a@mail.ru");
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let app = TestApp::new();

        let res = app.send(Method::POST, "/login", None, Some(json!({}))).await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body,
            json!({
                "detail": [{
                    "loc": ["LoginView.post"],
                    "msg": {
                        "login": "This field is required",
                        "password": "This field is required",
                    },
                    "type": "UserValidationError",
                }]
            })
        );

        let res = app
            .send(Method::POST, "/login", None, Some(json!({"login": "a@mail.ru"})))
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body["detail"][0]["msg"],
            json!({"password": "This field is required"})
        );
    }

    #[tokio::test]
    async fn test_login_malformed_body() {
        let app = TestApp::new();

        for body in ["not json", "{\"login\": ", ""] {
            let res = app
                .send_raw(Method::POST, "/login", None, Some(body.to_string()))
                .await;
            assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(
                res.body,
                json!({
                    "detail": [{
                        "loc": ["LoginView.post"],
                        "msg": "incorrect data format. application/json expected",
                        "type": "ParamsParseError",
                    }]
                })
            );
        }
    }

    #[tokio::test]
    async fn test_login_non_object_body() {
        let app = TestApp::new();

        let cases = [
            ("[1, 2]", "Invalid data. Expected a dictionary, but got list."),
            ("\"text\"", "Invalid data. Expected a dictionary, but got str."),
            ("null", "No data provided"),
        ];

        for (body, message) in cases {
            let res = app
                .send_raw(Method::POST, "/login", None, Some(body.to_string()))
                .await;
            assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
            assert_eq!(
                res.body,
                json!({
                    "detail": [{
                        "loc": ["LoginView.post"],
                        "msg": {"non_field_errors": [message]},
                        "type": "UserValidationError",
                    }]
                })
            );
        }
    }

    #[tokio::test]
    async fn test_login_unknown_email_and_wrong_password() {
        let app = TestApp::new();
        app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "nobody@mail.ru", "password": PASSWORD})),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({"code": 1, "message": "User with such login doesn't exist"})
        );

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "a@mail.ru", "password": "wrong"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            res.body,
            json!({"code": 2, "message": "Incorrect password for such user"})
        );
        assert!(res.set_cookie().is_empty());
    }

    #[tokio::test]
    async fn test_login_non_string_values() {
        let app = TestApp::new();
        app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": 5, "password": PASSWORD})),
            )
            .await;
        assert_eq!(res.body["code"], 1);

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "a@mail.ru", "password": null})),
            )
            .await;
        assert_eq!(res.body["code"], 2);
    }

    #[tokio::test]
    async fn test_logout_expires_cookie() {
        let app = TestApp::new();

        let res = app.send(Method::GET, "/logout", None, None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!({}));

        let cookie = res.set_cookie();
        assert!(cookie.starts_with("userid=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[tokio::test]
    async fn test_plain_token_mode_uses_literal_id() {
        let app = TestApp::with_config(crate::DirectoryConfig {
            token_mode: TokenMode::Plain,
            ..super::support::test_config()
        });
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "a@mail.ru", "password": PASSWORD})),
            )
            .await;
        assert!(res.set_cookie().starts_with(&format!("userid={};", user.id)));

        let current = app
            .send(Method::GET, "/current", Some(&user.id.to_string()), None)
            .await;
        assert_eq!(current.status, StatusCode::OK);
    }
}

#[cfg(test)]
mod session_tests {
    use axum::http::{Method, StatusCode};
    use kernel::id::UserId;
    use serde_json::json;

    use super::support::TestApp;

    #[tokio::test]
    async fn test_current_without_cookie() {
        let app = TestApp::new();

        let res = app.send(Method::GET, "/current", None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            res.body,
            json!({"code": 4, "msg": "no cookie to recognise session was specified"})
        );
    }

    #[tokio::test]
    async fn test_current_with_unknown_session() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let expected = json!({"code": 5, "msg": "user with such cookie bounding doesn't exist"});

        // Unsigned literal id is rejected in signed mode
        let res = app
            .send(Method::GET, "/current", Some(&user.id.to_string()), None)
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body, expected);

        let res = app
            .send(
                Method::GET,
                "/current",
                Some(&app.token_for(UserId::new(77))),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body, expected);
    }

    #[tokio::test]
    async fn test_current_returns_profile() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;

        let res = app
            .send(Method::GET, "/current", Some(&app.token_for(admin.id)), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["is_admin"], true);
        assert_eq!(res.body["email"], "admin@mail.ru");
        assert!(res.body.get("id").is_none());
        assert!(res.body.get("password").is_none());
    }

    #[tokio::test]
    async fn test_session_of_deleted_user_stops_working() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;
        let user = app.seed_user("user@mail.ru", false).await;
        let token = app.token_for(user.id);

        let res = app
            .send(
                Method::DELETE,
                &format!("/private/users/{}", user.id),
                Some(&app.token_for(admin.id)),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);

        let res = app.send(Method::GET, "/current", Some(&token), None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], 5);
    }
}

#[cfg(test)]
mod listing_tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::support::TestApp;
    use crate::domain::repository::CityRepository;

    async fn three_users(app: &TestApp) -> String {
        let a = app.seed_user("a@mail.ru", false).await;
        app.seed_user("b@mail.ru", false).await;
        app.seed_user("c@mail.ru", false).await;
        app.token_for(a.id)
    }

    #[tokio::test]
    async fn test_second_page_reports_slice_length() {
        let app = TestApp::new();
        let token = three_users(&app).await;

        let res = app
            .send(Method::GET, "/users?page=2&size=2", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            json!({
                "data": [{
                    "id": 3,
                    "first_name": "Ivan",
                    "last_name": "Petrov",
                    "email": "c@mail.ru",
                }],
                "meta": {"pagination": {"total": 1, "page": 2, "size": 2}},
            })
        );
    }

    #[tokio::test]
    async fn test_first_page_in_id_order() {
        let app = TestApp::new();
        let token = three_users(&app).await;

        let res = app
            .send(Method::GET, "/users?page=1&size=2", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let ids: Vec<i64> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(res.body["meta"]["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn test_page_past_end() {
        let app = TestApp::new();
        let token = three_users(&app).await;

        for uri in ["/users?page=3&size=2", "/users?page=2&size=3", "/users?page=100&size=1"] {
            let res = app.send(Method::GET, uri, Some(&token), None).await;
            assert_eq!(res.status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(res.body, json!({"code": 3, "message": "no such page"}));
        }
    }

    #[tokio::test]
    async fn test_page_params_missing() {
        let app = TestApp::new();
        let token = three_users(&app).await;

        for uri in ["/users", "/users?page=1", "/users?size=1"] {
            let res = app.send(Method::GET, uri, Some(&token), None).await;
            assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(
                res.body,
                json!({
                    "detail": [{
                        "loc": ["UsersList.get"],
                        "msg": "no page or size parameter in request",
                        "type": "PageParamsValidation",
                    }]
                })
            );
        }
    }

    #[tokio::test]
    async fn test_page_params_invalid() {
        let app = TestApp::new();
        let token = three_users(&app).await;

        for uri in ["/users?page=0&size=1", "/users?page=1&size=-2", "/users?page=x&size=1"] {
            let res = app.send(Method::GET, uri, Some(&token), None).await;
            assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(
                res.body["detail"][0]["msg"],
                "page and size must be positive integers"
            );
        }
    }

    #[tokio::test]
    async fn test_listing_requires_session_before_params() {
        let app = TestApp::new();

        let res = app.send(Method::GET, "/users", None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], 4);
    }

    #[tokio::test]
    async fn test_admin_listing_carries_city_hint() {
        let app = TestApp::new();
        let moscow = app.repo.create_city("Moscow").await.unwrap();
        app.repo.create_city("Kazan").await.unwrap();
        let admin = app.seed_user_in_city("admin@mail.ru", true, Some(moscow.id)).await;
        app.seed_user("b@mail.ru", false).await;

        let res = app
            .send(
                Method::GET,
                "/private/users?page=2&size=1",
                Some(&app.token_for(admin.id)),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 1);
        assert_eq!(res.body["data"][0]["email"], "b@mail.ru");
        assert_eq!(
            res.body["meta"]["hint"],
            json!({"city": [{"id": 1, "name": "Moscow"}, {"id": 2, "name": "Kazan"}]})
        );
    }

    #[tokio::test]
    async fn test_admin_listing_on_empty_window() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;

        let res = app
            .send(
                Method::GET,
                "/private/users?page=2&size=1",
                Some(&app.token_for(admin.id)),
                None,
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["code"], 3);

        let res = app
            .send(
                Method::GET,
                "/private/users",
                Some(&app.token_for(admin.id)),
                None,
            )
            .await;
        assert_eq!(res.body["detail"][0]["loc"], json!(["PrivateUserList.get"]));
    }
}

#[cfg(test)]
mod self_update_tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::support::TestApp;
    use crate::domain::repository::UserRepository;

    #[tokio::test]
    async fn test_update_own_record() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some(json!({"first_name": "Anna", "phone": "+79990001122"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(
            res.body,
            json!({
                "id": 1,
                "first_name": "Anna",
                "last_name": "Petrov",
                "other_name": "",
                "email": "a@mail.ru",
                "phone": "+79990001122",
                "birthday": null,
            })
        );
    }

    #[tokio::test]
    async fn test_update_ignores_privileged_fields() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some(json!({"is_admin": true, "additional_info": "x", "last_name": "Ivanova"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);

        let stored = app.repo.find_by_id(user.id).await.unwrap().unwrap();
        assert!(!stored.is_admin);
        assert_eq!(stored.additional_info, "");
        assert_eq!(stored.last_name, "Ivanova");
    }

    #[tokio::test]
    async fn test_update_other_existing_user() {
        let app = TestApp::new();
        let caller = app.seed_user("a@mail.ru", false).await;
        let other = app.seed_user("b@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", other.id),
                Some(&app.token_for(caller.id)),
                Some(json!({"first_name": "Hacked"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["code"], 7);
        assert_eq!(
            res.body["message"],
            "This user cannot modify user with id 2 if this user admin, he must use private mode"
        );

        let stored = app.repo.find_by_id(other.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Ivan");
    }

    #[tokio::test]
    async fn test_admin_gets_no_bypass_on_self_tier() {
        let app = TestApp::new();
        let admin = app.seed_user("admin@mail.ru", true).await;
        let other = app.seed_user("b@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", other.id),
                Some(&app.token_for(admin.id)),
                Some(json!({"first_name": "X"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.body["code"], 7);
    }

    #[tokio::test]
    async fn test_update_nonexistent_user_is_not_found() {
        let app = TestApp::new();
        let caller = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                "/users/2",
                Some(&app.token_for(caller.id)),
                Some(json!({"first_name": "X"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(
            res.body,
            json!({"code": 8, "message": "User with such id doesn't exist"})
        );
    }

    #[tokio::test]
    async fn test_update_requires_session_first() {
        let app = TestApp::new();

        let res = app
            .send(Method::PATCH, "/users/2", None, Some(json!({"first_name": "X"})))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], 4);
    }

    #[tokio::test]
    async fn test_update_validation_errors() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;
        let token = app.token_for(user.id);
        let uri = format!("/users/{}", user.id);

        let res = app
            .send(
                Method::PATCH,
                &uri,
                Some(&token),
                Some(json!({"first_name": "", "email": "not-an-email"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body,
            json!({
                "detail": [{
                    "loc": ["User.patch"],
                    "msg": {
                        "email": ["Enter a valid email address."],
                        "first_name": ["This field may not be blank."],
                    },
                    "type": "UserValidationError",
                }]
            })
        );

        let res = app
            .send_raw(Method::PATCH, &uri, Some(&token), Some("{".to_string()))
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(res.body["detail"][0]["type"], "ParamsParseError");
        assert_eq!(res.body["detail"][0]["loc"], json!(["User.patch"]));
    }

    #[tokio::test]
    async fn test_update_rejects_blank_optional_fields() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some(json!({"phone": "", "other_name": ""})),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body,
            json!({
                "detail": [{
                    "loc": ["User.patch"],
                    "msg": {
                        "other_name": ["This field may not be blank."],
                        "phone": ["This field may not be blank."],
                    },
                    "type": "UserValidationError",
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_update_non_object_body() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send_raw(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some("[1]".to_string()),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(res.body["detail"][0]["type"], "UserValidationError");
        assert_eq!(
            res.body["detail"][0]["msg"],
            json!({"non_field_errors": ["Invalid data. Expected a dictionary, but got list."]})
        );
    }

    #[tokio::test]
    async fn test_update_non_integer_id() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(Method::PATCH, "/users/abc", None, Some(json!({"first_name": "X"})))
            .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], 4);

        let token = app.token_for(user.id);
        for uri in ["/users/abc", "/users/-1", "/users/+1"] {
            let res = app
                .send(Method::PATCH, uri, Some(&token), Some(json!({"first_name": "X"})))
                .await;
            assert_eq!(res.status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(
                res.body,
                json!({"code": 8, "message": "User with such id doesn't exist"})
            );
        }
    }

    #[tokio::test]
    async fn test_update_to_taken_email() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;
        app.seed_user("b@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some(json!({"email": "b@mail.ru", "first_name": "Changed"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body["detail"][0]["msg"],
            json!({"email": ["my user with this email already exists."]})
        );

        // Rejected update leaves the record untouched
        let stored = app.repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(stored.first_name, "Ivan");
        assert_eq!(stored.email.as_str(), "a@mail.ru");
    }

    #[tokio::test]
    async fn test_update_keeps_own_email() {
        let app = TestApp::new();
        let user = app.seed_user("a@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/users/{}", user.id),
                Some(&app.token_for(user.id)),
                Some(json!({"email": "a@mail.ru"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }
}

#[cfg(test)]
mod admin_tests {
    use axum::http::{Method, StatusCode};
    use serde_json::{Value, json};

    use crate::domain::repository::{CityRepository, UserRepository};
    use super::support::{PASSWORD, TestApp};

    async fn admin_token(app: &TestApp) -> String {
        let admin = app.seed_user("admin@mail.ru", true).await;
        app.token_for(admin.id)
    }

    fn full_payload() -> Value {
        json!({
            "first_name": "Olga",
            "last_name": "Sidorova",
            "other_name": "Ivanovna",
            "email": "olga@mail.ru",
            "password": "s3cret",
            "phone": "+79991234567",
            "birthday": "1990-05-17",
            "is_admin": false,
            "city": 1,
            "additional_info": "likes tea",
        })
    }

    #[tokio::test]
    async fn test_non_admin_is_forbidden_everywhere() {
        let app = TestApp::new();
        let user = app.seed_user("user@mail.ru", false).await;
        let token = app.token_for(user.id);

        let requests = [
            (Method::GET, "/private/users?page=1&size=1"),
            (Method::POST, "/private/users"),
            (Method::GET, "/private/users/1"),
            (Method::PATCH, "/private/users/1"),
            (Method::DELETE, "/private/users/1"),
            // Role is checked before existence
            (Method::GET, "/private/users/999"),
            (Method::DELETE, "/private/users/999"),
        ];

        for (method, uri) in requests {
            let res = app
                .send(method.clone(), uri, Some(&token), Some(json!({})))
                .await;
            assert_eq!(res.status, StatusCode::FORBIDDEN, "{method} {uri}");
            assert_eq!(
                res.body,
                json!({"code": 10, "msg": "only admins can access this info"})
            );
        }
    }

    #[tokio::test]
    async fn test_admin_routes_require_session() {
        let app = TestApp::new();

        let res = app.send(Method::GET, "/private/users/1", None, None).await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["code"], 4);
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let app = TestApp::new();
        app.repo.create_city("Moscow").await.unwrap();
        let token = admin_token(&app).await;

        let res = app
            .send(Method::POST, "/private/users", Some(&token), Some(full_payload()))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);

        let mut expected = full_payload();
        let object = expected.as_object_mut().unwrap();
        object.remove("password");
        object.insert("id".to_string(), json!(2));
        assert_eq!(res.body, expected);

        let res = app
            .send(Method::GET, "/private/users/2", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, expected);

        // The new user can log in with the submitted password
        let res = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "olga@mail.ru", "password": "s3cret"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_defaults_optional_fields() {
        let app = TestApp::new();
        let token = admin_token(&app).await;

        let res = app
            .send(
                Method::POST,
                "/private/users",
                Some(&token),
                Some(json!({
                    "first_name": "Oleg",
                    "last_name": "Orlov",
                    "email": "oleg@mail.ru",
                    "password": "pw",
                    "is_admin": true,
                })),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        assert_eq!(
            res.body,
            json!({
                "id": 2,
                "first_name": "Oleg",
                "last_name": "Orlov",
                "other_name": "",
                "email": "oleg@mail.ru",
                "phone": "",
                "birthday": null,
                "is_admin": true,
                "city": null,
                "additional_info": "",
            })
        );
    }

    #[tokio::test]
    async fn test_create_reports_every_missing_field() {
        let app = TestApp::new();
        let token = admin_token(&app).await;

        let res = app
            .send(Method::POST, "/private/users", Some(&token), Some(json!({})))
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);

        let detail = &res.body["detail"][0];
        assert_eq!(detail["loc"], json!(["PrivateUserList.post"]));
        assert_eq!(detail["type"], "UserValidationError");
        for field in ["first_name", "last_name", "email", "is_admin", "password"] {
            assert_eq!(detail["msg"][field], json!(["This field is required."]), "{field}");
        }
        assert!(detail["msg"].get("phone").is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_conflicts() {
        let app = TestApp::new();
        let token = admin_token(&app).await;

        let mut payload = full_payload();
        payload["email"] = json!("admin@mail.ru");
        payload["city"] = json!(42);

        let res = app
            .send(Method::POST, "/private/users", Some(&token), Some(payload))
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body["detail"][0]["msg"],
            json!({
                "city": ["Invalid pk \"42\" - object does not exist."],
                "email": ["my user with this email already exists."],
            })
        );
        assert_eq!(res.body["detail"][0]["loc"], json!(["PrivateUserList.post"]));
    }

    #[tokio::test]
    async fn test_create_enforces_length_limits() {
        let app = TestApp::new();
        app.repo.create_city("Moscow").await.unwrap();
        let token = admin_token(&app).await;

        let mut payload = full_payload();
        payload["phone"] = json!("+7999123456789012");

        let res = app
            .send(Method::POST, "/private/users", Some(&token), Some(payload))
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body["detail"][0]["msg"],
            json!({"phone": ["Ensure this field has no more than 14 characters."]})
        );
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let app = TestApp::new();
        let city = app.repo.create_city("Kazan").await.unwrap();
        let token = admin_token(&app).await;
        let target = app.seed_user("t@mail.ru", false).await;
        let uri = format!("/private/users/{}", target.id);

        let patch = json!({
            "last_name": "Smirnov",
            "is_admin": true,
            "birthday": "2000-01-31",
            "city": city.id.value(),
            "additional_info": "updated",
        });

        let first = app
            .send(Method::PATCH, &uri, Some(&token), Some(patch.clone()))
            .await;
        let second = app.send(Method::PATCH, &uri, Some(&token), Some(patch)).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(first.body, second.body);
        assert_eq!(first.body["last_name"], "Smirnov");
        assert_eq!(first.body["first_name"], "Ivan");
        assert_eq!(first.body["city"], json!(city.id.value()));
        assert_eq!(first.body["birthday"], "2000-01-31");
    }

    #[tokio::test]
    async fn test_update_rejects_null_and_blank() {
        let app = TestApp::new();
        let city = app.repo.create_city("Kazan").await.unwrap();
        let token = admin_token(&app).await;
        let target = app
            .seed_user_in_city("t@mail.ru", false, Some(city.id))
            .await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/private/users/{}", target.id),
                Some(&token),
                Some(json!({"city": null, "birthday": null, "additional_info": ""})),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body,
            json!({
                "detail": [{
                    "loc": ["PrivateUser.patch"],
                    "msg": {
                        "additional_info": ["This field may not be blank."],
                        "birthday": ["This field may not be null."],
                        "city": ["This field may not be null."],
                    },
                    "type": "UserValidationError",
                }]
            })
        );

        let stored = app.repo.find_by_id(target.id).await.unwrap().unwrap();
        assert_eq!(stored.city, Some(city.id));
    }

    #[tokio::test]
    async fn test_update_resets_password() {
        let app = TestApp::new();
        let token = admin_token(&app).await;
        let target = app.seed_user("t@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/private/users/{}", target.id),
                Some(&token),
                Some(json!({"password": "new-password"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.get("password").is_none());

        let old = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "t@mail.ru", "password": PASSWORD})),
            )
            .await;
        assert_eq!(old.body["code"], 2);

        let new = app
            .send(
                Method::POST,
                "/login",
                None,
                Some(json!({"login": "t@mail.ru", "password": "new-password"})),
            )
            .await;
        assert_eq!(new.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_checks_existence_before_body() {
        let app = TestApp::new();
        let token = admin_token(&app).await;

        let res = app
            .send_raw(
                Method::PATCH,
                "/private/users/999",
                Some(&token),
                Some("not json".to_string()),
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body["code"], 8);
    }

    #[tokio::test]
    async fn test_non_integer_id_checks_role_first() {
        let app = TestApp::new();
        let member = app.seed_user("m@mail.ru", false).await;
        let member_token = app.token_for(member.id);
        let token = admin_token(&app).await;

        for method in [Method::GET, Method::PATCH, Method::DELETE] {
            let res = app
                .send(method.clone(), "/private/users/abc", Some(&member_token), Some(json!({})))
                .await;
            assert_eq!(res.status, StatusCode::FORBIDDEN, "{method}");

            let res = app
                .send(method.clone(), "/private/users/abc", Some(&token), Some(json!({})))
                .await;
            assert_eq!(res.status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(res.body["code"], 8);
        }
    }

    #[tokio::test]
    async fn test_update_validation_location() {
        let app = TestApp::new();
        let token = admin_token(&app).await;
        let target = app.seed_user("t@mail.ru", false).await;

        let res = app
            .send(
                Method::PATCH,
                &format!("/private/users/{}", target.id),
                Some(&token),
                Some(json!({"is_admin": "maybe", "birthday": "17.05.1990"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            res.body,
            json!({
                "detail": [{
                    "loc": ["PrivateUser.patch"],
                    "msg": {
                        "birthday": ["Date has wrong format. Use one of these formats instead: YYYY-MM-DD."],
                        "is_admin": ["Must be a valid boolean."],
                    },
                    "type": "UserValidationError",
                }]
            })
        );
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let app = TestApp::new();
        let token = admin_token(&app).await;

        let res = app
            .send(Method::DELETE, "/private/users/1", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::NO_CONTENT);
        assert_eq!(res.body, Value::Null);

        // The admin deleted itself, so use a fresh admin to look
        let token = app.token_for(app.seed_user("root@mail.ru", true).await.id);
        let res = app
            .send(Method::GET, "/private/users/1", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(
            res.body,
            json!({"code": 8, "message": "User with such id doesn't exist"})
        );

        let res = app
            .send(Method::DELETE, "/private/users/1", Some(&token), None)
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}

#[cfg(test)]
mod routing_tests {
    use axum::http::{Method, StatusCode};

    use super::support::TestApp;

    #[tokio::test]
    async fn test_unsupported_methods() {
        let app = TestApp::new();

        let requests = [
            (Method::GET, "/login"),
            (Method::POST, "/logout"),
            (Method::DELETE, "/users"),
            (Method::GET, "/users/1"),
            (Method::PUT, "/private/users"),
        ];

        for (method, uri) in requests {
            let res = app.send_raw(method.clone(), uri, None, None).await;
            assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_path() {
        let app = TestApp::new();

        let res = app.send_raw(Method::GET, "/nowhere", None, None).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
