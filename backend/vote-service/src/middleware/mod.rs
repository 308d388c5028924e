/// HTTP middleware for vote-service
///
/// `IdentityMiddleware` resolves the caller from a Bearer token but never
/// rejects a request; handlers decide whether identity is required through the
/// `UserEmail` extractor, and admin routes through `AdminUser`.
pub mod jwt;

pub use jwt::{Claims, JwtVerifier};

use crate::error::AppError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::collections::HashSet;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Caller email taken from a validated token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEmail(pub String);

impl UserEmail {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Emails allowed on admin routes, compared case-insensitively.
/// Registered as app data on the admin scope.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowList {
    emails: HashSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_ascii_lowercase())
    }
}

/// Signed-in caller that is on the admin allow-list
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserEmail);

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let user = match req.extensions().get::<UserEmail>().cloned() {
            Some(user) => user,
            None => {
                return ready(Err(AppError::Unauthorized(
                    "sign in to use admin routes".to_string(),
                )))
            }
        };

        let allowed = req
            .app_data::<web::Data<AdminAllowList>>()
            .map(|list| list.contains(user.as_str()))
            .unwrap_or(false);

        if allowed {
            ready(Ok(AdminUser(user)))
        } else {
            ready(Err(AppError::Forbidden("admin access required".to_string())))
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header; the scheme is
/// matched case-insensitively.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Without a verifier every request is anonymous.
#[derive(Clone, Default)]
pub struct IdentityMiddleware {
    verifier: Option<Arc<JwtVerifier>>,
}

impl IdentityMiddleware {
    pub fn new(verifier: Option<Arc<JwtVerifier>>) -> Self {
        Self { verifier }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            verifier: self.verifier.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    verifier: Option<Arc<JwtVerifier>>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if let Some(verifier) = &self.verifier {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .and_then(bearer_token);

            if let Some(token) = token {
                match verifier.verify(token) {
                    Ok(claims) if !claims.email.trim().is_empty() => {
                        req.extensions_mut().insert(UserEmail(claims.email));
                    }
                    Ok(_) => tracing::debug!("token carries no email claim"),
                    Err(e) => tracing::debug!(error = %e, "ignoring invalid bearer token"),
                }
            }
        }

        Box::pin(async move { service.call(req).await })
    }
}

impl FromRequest for UserEmail {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserEmail>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("sign in to vote on posts".to_string())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("BEARER  abc.def "), Some("abc.def"));
        assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
    }

    #[test]
    fn test_allow_list_ignores_case_and_blanks() {
        let list = AdminAllowList::new(["Ops@Example.com", " ", "audit@example.com"]);
        assert!(list.contains("ops@example.com"));
        assert!(list.contains(" AUDIT@example.com"));
        assert!(!list.contains("alice@example.com"));
        assert!(!list.contains(""));
    }
}
