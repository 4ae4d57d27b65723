use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::domain::{Caller, Role, UserId};
use super::error::MarketplaceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// Caller identity is asserted by the gateway in front of this service.
#[derive(Debug, thiserror::Error)]
pub enum CallerRejection {
    #[error("missing {USER_ID_HEADER} header")]
    MissingUser,
    #[error("missing {USER_ROLE_HEADER} header")]
    MissingRole,
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

impl IntoResponse for CallerRejection {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": "unauthorized",
        }));
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = CallerRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header(parts, USER_ID_HEADER).ok_or(CallerRejection::MissingUser)?;
        let raw_role = header(parts, USER_ROLE_HEADER).ok_or(CallerRejection::MissingRole)?;
        let role = Role::parse(raw_role)
            .ok_or_else(|| CallerRejection::UnknownRole(raw_role.to_string()))?;

        Ok(Caller {
            user_id: UserId(user_id.to_string()),
            role,
        })
    }
}

/// JSON body whose decode failures surface as [`MarketplaceError::Validation`].
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = MarketplaceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string counterpart of [`ValidJson`].
#[derive(Debug)]
pub struct ValidQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = MarketplaceError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}
