//! HTTP Basic authentication and capability checks.
//!
//! [`Caller`] resolves the authenticated user and their permissions.
//! [`Authorized<C>`] additionally requires the capability `C`, so the
//! requirement is visible in the handler signature:
//!
//! ```rust,ignore
//! async fn create(auth: Authorized<capability::CreateKnowledgeBase>, ...) { ... }
//! ```

use std::marker::PhantomData;

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use knowspace_core::{
  model::User,
  permission::{Capability, CommandCode, FunctionCode, PermissionSet},
  store::KnowledgeStore,
};

use crate::{AppState, error::ApiError};

/// The authenticated user behind a request.
#[derive(Debug, Clone)]
pub struct Caller {
  pub user:        User,
  pub permissions: PermissionSet,
}

impl Caller {
  pub fn id(&self) -> &str { &self.user.id }

  pub fn can(&self, function: FunctionCode, command: CommandCode) -> bool {
    self.permissions.allows(function, command)
  }
}

/// Split an `Authorization: Basic ...` header into user name and password.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let value = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = value.strip_prefix("Basic ").ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;

  let (user_name, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((user_name.to_owned(), password.to_owned()))
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(phc).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

impl<S> FromRequestParts<AppState<S>> for Caller
where
  S: KnowledgeStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (user_name, password) = basic_credentials(&parts.headers)?;

    let Some(creds) = state
      .store
      .find_credentials(user_name.clone())
      .await
      .map_err(ApiError::store)?
    else {
      tracing::warn!(%user_name, "unknown user");
      return Err(ApiError::Unauthorized);
    };

    if let Err(e) = verify_password(&password, &creds.password_hash) {
      tracing::warn!(%user_name, "bad password");
      return Err(e);
    }

    let permissions = state
      .store
      .permissions_for(creds.user.id.clone())
      .await
      .map_err(ApiError::store)?;

    Ok(Caller { user: creds.user, permissions })
  }
}

/// A [`Caller`] holding the capability `C`.
pub struct Authorized<C: Capability> {
  pub caller:  Caller,
  _capability: PhantomData<C>,
}

impl<S, C> FromRequestParts<AppState<S>> for Authorized<C>
where
  S: KnowledgeStore + 'static,
  C: Capability,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let caller = Caller::from_request_parts(parts, state).await?;
    let (function, command) = (C::FUNCTION, C::COMMAND);
    if !caller.can(function, command) {
      tracing::warn!(user = %caller.user.user_name, %function, %command, "permission denied");
      return Err(ApiError::Forbidden(format!("requires {function}:{command}")));
    }
    Ok(Authorized { caller, _capability: PhantomData })
  }
}

macro_rules! capabilities {
  ($($name:ident => $function:ident : $command:ident;)*) => {
    $(
      pub struct $name;

      impl Capability for $name {
        const FUNCTION: FunctionCode = FunctionCode::$function;
        const COMMAND: CommandCode = CommandCode::$command;
      }
    )*
  };
}

/// Marker types naming the capability each protected route needs.
pub mod capability {
  use knowspace_core::permission::{Capability, CommandCode, FunctionCode};

  capabilities! {
    ViewKnowledgeBases   => ContentKnowledgebase : View;
    CreateKnowledgeBase  => ContentKnowledgebase : Create;
    UpdateKnowledgeBase  => ContentKnowledgebase : Update;
    DeleteKnowledgeBase  => ContentKnowledgebase : Delete;
    ViewComments         => ContentComment       : View;
    ViewReports          => ContentReport        : View;
    CreateReport         => ContentReport        : Create;
    DeleteReport         => ContentReport        : Delete;
    CreateCategory       => ContentCategory      : Create;
    ViewFunctions        => SystemFunction       : View;
    CreateFunction       => SystemFunction       : Create;
    UpdateFunction       => SystemFunction       : Update;
    DeleteFunction       => SystemFunction       : Delete;
  }
}
