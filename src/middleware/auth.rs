use axum::{
    extract::Request,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: String,
    pub college: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SuperAdmin,
    Student,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "super_admin" | "superadmin" => Some(Role::SuperAdmin),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// Identity taken from a verified bearer token, inserted into request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
    pub college: Option<String>,
    pub branch: Option<String>,
}

impl AuthUser {
    pub fn from_token(token: &str, secret: &str) -> Result<Self> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map_err(|_| Error::Unauthorized("Invalid or expired token".to_string()))?;

        let claims = data.claims;
        let role = Role::parse(&claims.role)
            .ok_or_else(|| Error::Forbidden(format!("Unknown role '{}'", claims.role)))?;

        Ok(Self {
            id: claims.sub,
            role,
            college: claims.college.filter(|c| !c.is_empty()),
            branch: claims.branch.filter(|b| !b.is_empty()),
        })
    }

    /// Admins manage only what they created; super admins manage everything.
    pub fn ensure_can_manage(&self, created_by: &str) -> Result<()> {
        match self.role {
            Role::SuperAdmin => Ok(()),
            Role::Admin if self.id == created_by => Ok(()),
            _ => Err(Error::Forbidden(
                "You do not have access to this assessment".to_string(),
            )),
        }
    }

    pub fn scope_filter(&self) -> Option<&str> {
        match self.role {
            Role::SuperAdmin => None,
            _ => Some(self.id.as_str()),
        }
    }
}

fn bearer_token(req: &Request) -> Result<&str> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::Unauthorized("Missing authorization header".to_string()))?;
    let value = header
        .to_str()
        .map_err(|_| Error::Unauthorized("Malformed authorization header".to_string()))?;
    value
        .strip_prefix("Bearer ")
        .ok_or_else(|| Error::Unauthorized("Unsupported authorization scheme".to_string()))
}

fn authenticate(req: &Request, allowed: fn(Role) -> bool) -> Result<AuthUser> {
    let token = bearer_token(req)?;
    let config = crate::config::get_config();
    let user = AuthUser::from_token(token, &config.jwt_secret)?;
    if !allowed(user.role) {
        return Err(Error::Forbidden("Insufficient role for this resource".to_string()));
    }
    Ok(user)
}

async fn run_authenticated(mut req: Request, next: Next, allowed: fn(Role) -> bool) -> Response {
    match authenticate(&req, allowed) {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    run_authenticated(req, next, |role| role.is_admin()).await
}

pub async fn require_student(req: Request, next: Next) -> Response {
    run_authenticated(req, next, |role| role == Role::Student).await
}
