use crate::auth::cookie::token_from_headers;
use crate::auth::jwt::AuthService;
use crate::types::{AppError, Claims, Result, Role};
use crate::AppState;
use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// Validates the session token and stores its claims in request extensions.
pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    mut req: Request,
    next: Next,
) -> Result<Response> {
    let token = token_from_headers(req.headers())
        .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))?;

    let claims = auth_service.verify_access_token(&token)?;
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

/// Claims of the authenticated caller.
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn email(&self) -> &str {
        &self.0.sub
    }

    /// Fails with 403 unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<()> {
        require_role(&self.0, allowed)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| AppError::Auth("Unauthorized".to_string()))
    }
}

pub fn require_role(claims: &Claims, allowed: &[Role]) -> Result<()> {
    match claims.role {
        Some(role) if allowed.contains(&role) => Ok(()),
        _ => Err(AppError::Forbidden(
            "Your role does not permit this action.".to_string(),
        )),
    }
}

/// Address of the caller, recorded in the upload log.
///
/// `X-Forwarded-For` is only honored when `server.trust_forwarded_for` is
/// set; otherwise any client could write an arbitrary address into `LOGS`.
pub struct ClientIp(pub Option<String>);

impl FromRequestParts<AppState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let trust_forwarded = state.config_manager.config().server.trust_forwarded_for;
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIp(client_ip(&parts.headers, peer, trust_forwarded)))
    }
}

fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded: bool) -> Option<String> {
    let forwarded = trust_forwarded
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    forwarded.or_else(|| peer.map(|ip| ip.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TokenKind;

    fn claims(role: Option<Role>) -> Claims {
        Claims {
            sub: "a@b.c".to_string(),
            role,
            kind: TokenKind::Access,
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&claims(Some(Role::Admin)), &[Role::Admin]).is_ok());
        assert!(matches!(
            require_role(&claims(Some(Role::View)), &[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
        assert!(require_role(&claims(None), &[Role::View]).is_err());
    }

    #[test]
    fn test_forwarded_for_needs_trust() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let peer = Some(IpAddr::from([10, 0, 0, 1]));

        assert_eq!(client_ip(&headers, peer, false).as_deref(), Some("10.0.0.1"));
        assert_eq!(client_ip(&headers, peer, true).as_deref(), Some("203.0.113.9"));
        assert_eq!(client_ip(&HeaderMap::new(), peer, true).as_deref(), Some("10.0.0.1"));
        assert_eq!(client_ip(&headers, None, false), None);
    }
}
