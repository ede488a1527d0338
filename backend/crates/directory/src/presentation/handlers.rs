//! HTTP Handlers
//!
//! Each handler runs its guard first, then parses and validates the body,
//! then acts. Bodies are taken as raw bytes so that malformed JSON reaches
//! the directory's own error envelope instead of the extractor rejection.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use kernel::id::UserId;
use platform::cookie::{extract_cookie, set_cookie_header};
use serde_json::{Map, Value, json};

use crate::application::config::DirectoryConfig;
use crate::application::validator::{
    BodyError, parse_object, validate_admin_update, validate_create, validate_login,
    validate_self_update,
};
use crate::application::{
    AuthorizationGuard, ListUsersUseCase, LoginUseCase, ManageUsersUseCase, PageRequest,
    require_owner,
};
use crate::domain::repository::{CityRepository, UserRepository};
use crate::error::{DirectoryError, DirectoryResult};
use crate::presentation::dto::{
    CurrentUserResponse, PrivateDetailUserResponse, UpdateUserResponse, UsersListResponse,
};

const LOC_LOGIN: &str = "LoginView.post";
const LOC_USERS_LIST: &str = "UsersList.get";
const LOC_SELF_UPDATE: &str = "User.patch";
const LOC_PRIVATE_LIST: &str = "PrivateUserList.get";
const LOC_PRIVATE_CREATE: &str = "PrivateUserList.post";
const LOC_PRIVATE_UPDATE: &str = "PrivateUser.patch";

/// Shared state for directory handlers
#[derive(Clone)]
pub struct DirectoryAppState<R>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<DirectoryConfig>,
}

impl<R> DirectoryAppState<R>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    fn guard(&self) -> AuthorizationGuard<R> {
        AuthorizationGuard::new(self.repo.clone(), &self.config)
    }

    fn manage(&self) -> ManageUsersUseCase<R, R> {
        ManageUsersUseCase::new(self.repo.clone(), self.repo.clone(), self.config.clone())
    }
}

// ============================================================================
// Login / Logout
// ============================================================================

/// POST /login
pub async fn login<R>(
    State(state): State<DirectoryAppState<R>>,
    body: Bytes,
) -> DirectoryResult<impl IntoResponse>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let payload = body_object(&body, LOC_LOGIN)?;
    let credentials = validate_login(&payload).map_err(|msg| DirectoryError::UserValidation {
        loc: LOC_LOGIN,
        msg,
    })?;

    let use_case = LoginUseCase::new(state.repo.clone(), state.config.clone());
    let output = use_case.execute(credentials).await?;

    let cookie = state
        .config
        .session_cookie()
        .build_set_cookie(&output.session_token);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
        Json(CurrentUserResponse::from(&output.user)),
    ))
}

/// GET /logout
///
/// Always succeeds; the cookie is expired whether or not one was sent.
pub async fn logout<R>(State(state): State<DirectoryAppState<R>>) -> impl IntoResponse
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let cookie = state.config.session_cookie().build_expired_cookie();

    (
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
        Json(json!({})),
    )
}

// ============================================================================
// Self-service tier
// ============================================================================

/// GET /users
pub async fn list_users<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> DirectoryResult<Json<UsersListResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_session(session_token(&headers, &state.config).as_deref())
        .await?;

    let request = PageRequest::from_query(&query, LOC_USERS_LIST)?;
    let slice = ListUsersUseCase::new(state.repo.clone(), state.repo.clone())
        .execute(request)
        .await?;

    Ok(Json(UsersListResponse::new(&slice, None)))
}

/// GET /current
pub async fn current_user<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
) -> DirectoryResult<Json<CurrentUserResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let user = state
        .guard()
        .require_session(session_token(&headers, &state.config).as_deref())
        .await?;

    Ok(Json(CurrentUserResponse::from(&user)))
}

/// PATCH /users/{id}
///
/// Existence is checked before ownership, so a missing target is a 404 even
/// when it is not the caller.
pub async fn update_self<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> DirectoryResult<Json<UpdateUserResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    let caller = state
        .guard()
        .require_session(session_token(&headers, &state.config).as_deref())
        .await?;

    let manage = state.manage();
    let target = manage.get(user_id(&id)?).await?;
    require_owner(&caller, target.id)?;

    let payload = body_object(&body, LOC_SELF_UPDATE)?;
    let changes = validate_self_update(&payload)
        .map_err(|errors| DirectoryError::FieldConflict(errors).at(LOC_SELF_UPDATE))?;

    let updated = manage
        .update(target, changes)
        .await
        .map_err(|e| e.at(LOC_SELF_UPDATE))?;

    Ok(Json(UpdateUserResponse::from(&updated)))
}

// ============================================================================
// Administrator tier
// ============================================================================

/// GET /private/users
pub async fn admin_list_users<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> DirectoryResult<Json<UsersListResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_admin(session_token(&headers, &state.config).as_deref())
        .await?;

    let request = PageRequest::from_query(&query, LOC_PRIVATE_LIST)?;
    let (slice, cities) = ListUsersUseCase::new(state.repo.clone(), state.repo.clone())
        .execute_with_hint(request)
        .await?;

    Ok(Json(UsersListResponse::new(&slice, Some(cities.as_slice()))))
}

/// POST /private/users
pub async fn admin_create_user<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    body: Bytes,
) -> DirectoryResult<impl IntoResponse>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_admin(session_token(&headers, &state.config).as_deref())
        .await?;

    let payload = body_object(&body, LOC_PRIVATE_CREATE)?;
    let input = validate_create(&payload)
        .map_err(|errors| DirectoryError::FieldConflict(errors).at(LOC_PRIVATE_CREATE))?;

    let user = state
        .manage()
        .create(input)
        .await
        .map_err(|e| e.at(LOC_PRIVATE_CREATE))?;

    Ok((
        StatusCode::CREATED,
        Json(PrivateDetailUserResponse::from(&user)),
    ))
}

/// GET /private/users/{id}
pub async fn admin_get_user<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> DirectoryResult<Json<PrivateDetailUserResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_admin(session_token(&headers, &state.config).as_deref())
        .await?;

    let user = state.manage().get(user_id(&id)?).await?;

    Ok(Json(PrivateDetailUserResponse::from(&user)))
}

/// PATCH /private/users/{id}
pub async fn admin_update_user<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Bytes,
) -> DirectoryResult<Json<PrivateDetailUserResponse>>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_admin(session_token(&headers, &state.config).as_deref())
        .await?;

    let manage = state.manage();
    let target = manage.get(user_id(&id)?).await?;

    let payload = body_object(&body, LOC_PRIVATE_UPDATE)?;
    let changes = validate_admin_update(&payload)
        .map_err(|errors| DirectoryError::FieldConflict(errors).at(LOC_PRIVATE_UPDATE))?;

    let updated = manage
        .update(target, changes)
        .await
        .map_err(|e| e.at(LOC_PRIVATE_UPDATE))?;

    Ok(Json(PrivateDetailUserResponse::from(&updated)))
}

/// DELETE /private/users/{id}
pub async fn admin_delete_user<R>(
    State(state): State<DirectoryAppState<R>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> DirectoryResult<StatusCode>
where
    R: UserRepository + CityRepository + Clone + Send + Sync + 'static,
{
    state
        .guard()
        .require_admin(session_token(&headers, &state.config).as_deref())
        .await?;

    state.manage().delete(user_id(&id)?).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Helpers
// ============================================================================

fn session_token(headers: &HeaderMap, config: &DirectoryConfig) -> Option<String> {
    extract_cookie(headers, &config.session_cookie_name)
}

/// Ids are parsed after the guard; an id that is not an integer names no user
fn user_id(raw: &str) -> DirectoryResult<UserId> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DirectoryError::UserNotFound);
    }
    raw.parse()
        .map(UserId::new)
        .map_err(|_| DirectoryError::UserNotFound)
}

fn body_object(body: &[u8], loc: &'static str) -> DirectoryResult<Map<String, Value>> {
    parse_object(body).map_err(|err| match err {
        BodyError::Malformed => DirectoryError::ParamsParse { loc },
        BodyError::NotObject(errors) => DirectoryError::FieldConflict(errors).at(loc),
    })
}
