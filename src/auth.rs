use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::Utc;
use futures_util::future::LocalBoxFuture;
use log::info;
use sqlx::{FromRow, MySqlPool};

use crate::error::AppError;
use crate::models::user::Role;

pub const SESSION_COOKIE: &str = "session_id";

/// The caller behind a valid session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: Role,
    pub full_name: String,
    pub user_email: String,
    pub session_id: String,
}

#[derive(FromRow)]
struct SessionUser {
    user_id: i64,
    role: String,
    full_name: String,
    user_email: String,
    is_active: bool,
}

impl AuthUser {
    pub fn require(&self, role: Role) -> Result<(), AppError> {
        if self.role == role {
            Ok(())
        } else {
            info!(
                "User {} ({}) tried to reach a {} endpoint",
                self.user_id, self.role, role
            );
            Err(AppError::forbidden(format!("Only {} accounts can do this", role)))
        }
    }

    /// Employee profile id of the caller; 403 for other roles.
    pub async fn employee_id(&self, pool: &MySqlPool) -> Result<i64, AppError> {
        self.require(Role::Employee)?;
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT employee_id FROM Employees_ WHERE user_id = ? AND is_active = true",
        )
        .bind(self.user_id)
        .fetch_optional(pool)
        .await?;
        row.map(|(id,)| id)
            .ok_or_else(|| AppError::forbidden("No active employee profile for this account"))
    }

    /// Client profile id of the caller; 403 for other roles.
    pub async fn client_id(&self, pool: &MySqlPool) -> Result<i64, AppError> {
        self.require(Role::Client)?;
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT client_id FROM Clients_ WHERE user_id = ? AND is_active = true",
        )
        .bind(self.user_id)
        .fetch_optional(pool)
        .await?;
        row.map(|(id,)| id)
            .ok_or_else(|| AppError::forbidden("No active client profile for this account"))
    }
}

/// `Authorization: Bearer <token>` first, then the `session_id` cookie.
pub fn session_token(req: &HttpRequest) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_string())
        })
        .filter(|token| !token.is_empty());

    from_header.or_else(|| {
        req.cookie(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|token| !token.is_empty())
    })
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = session_token(req);
        let pool = req.app_data::<web::Data<MySqlPool>>().cloned();

        Box::pin(async move {
            let token = token.ok_or_else(|| AppError::unauthorized("Authentication required"))?;
            let pool = pool.ok_or_else(|| AppError::Internal("Database pool is not configured".into()))?;

            let user: Option<SessionUser> = sqlx::query_as(
                "SELECT u.user_id, u.role, u.full_name, u.user_email, u.is_active
                 FROM Sessions_ s
                 JOIN Users_ u ON s.user_id = u.user_id
                 WHERE s.session_id = ? AND s.expires_at > ?",
            )
            .bind(&token)
            .bind(Utc::now().naive_utc())
            .fetch_optional(pool.get_ref())
            .await?;

            let user = user.ok_or_else(|| AppError::unauthorized("Invalid or expired session"))?;
            if !user.is_active {
                return Err(AppError::unauthorized("Account is deactivated"));
            }
            let role = user
                .role
                .parse::<Role>()
                .map_err(|e| AppError::Internal(format!("User {} has {}", user.user_id, e)))?;

            Ok(AuthUser {
                user_id: user.user_id,
                role,
                full_name: user.full_name,
                user_email: user.user_email,
                session_id: token,
            })
        })
    }
}
