use crate::{
    AppState,
    api::models::users::CurrentUser,
    db::{errors::DbError, handlers::Users, models::users::UserCreateDBRequest},
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use tracing::{debug, instrument, trace};

/// Extract user from proxy header if present and valid
/// Returns:
/// - None: No proxy header present
/// - Some(Ok(user)): Valid proxy header found and user authenticated
/// - Some(Err(error)): Proxy header present but user lookup/creation failed
#[instrument(skip(parts, config, db))]
async fn try_proxy_header_auth(
    parts: &Parts,
    config: &crate::config::Config,
    db: &PgPool,
) -> Option<Result<CurrentUser>> {
    let user_email = match parts
        .headers
        .get(&config.auth.proxy_header.header_name)
        .and_then(|h| h.to_str().ok())
    {
        Some(email) => email,
        None => return None,
    };

    let mut tx = match db.begin().await {
        Ok(tx) => tx,
        Err(e) => return Some(Err(DbError::from(e).into())),
    };
    let mut user_repo = Users::new(&mut tx);

    let user_result = match user_repo.get_by_email(user_email).await {
        Ok(Some(user)) => Some(CurrentUser::from(user)),
        Ok(None) => {
            if config.auth.proxy_header.auto_create_users {
                let create_request = UserCreateDBRequest {
                    username: user_email.to_string(),
                    email: user_email.to_string(),
                    display_name: None,
                    is_admin: false,
                };

                match user_repo.create(&create_request).await {
                    Ok(new_user) => Some(CurrentUser::from(new_user)),
                    Err(e) => return Some(Err(Error::Database(e))),
                }
            } else {
                None
            }
        }
        Err(e) => return Some(Err(Error::Database(e))),
    };

    if let Err(e) = tx.commit().await {
        return Some(Err(Error::Database(DbError::from(e))));
    }

    user_result.map(Ok)
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    #[instrument(skip(parts, state))]
    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        match try_proxy_header_auth(parts, &state.config, &state.db).await {
            Some(Ok(user)) => {
                debug!("Found proxy header authenticated user: {}", abbrev_uuid(&user.id));
                Ok(user)
            }
            Some(Err(e)) => {
                trace!("Proxy header authentication failed: {:?}", e);
                Err(e)
            }
            None => Err(Error::Unauthenticated { message: None }),
        }
    }
}
