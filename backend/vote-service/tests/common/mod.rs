#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use vote_service::db::{InMemoryVoteStore, VoteStore};
use vote_service::handlers::{self, HealthState};
use vote_service::middleware::{AdminAllowList, Claims, IdentityMiddleware, JwtVerifier};
use vote_service::services::VoteService;

pub const PRIVATE_KEY: &str = include_str!("../fixtures/jwt_private.pem");
pub const PUBLIC_KEY: &str = include_str!("../fixtures/jwt_public.pem");

pub const ALICE: &str = "alice@example.com";
pub const BOB: &str = "bob@example.com";
pub const ADMIN: &str = "ops@example.com";

pub fn token_for(email: &str) -> String {
    let claims = Claims {
        sub: None,
        email: email.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        iss: None,
    };
    let key = EncodingKey::from_rsa_pem(PRIVATE_KEY.as_bytes()).expect("test private key");
    encode(&Header::new(Algorithm::RS256), &claims, &key).expect("sign test token")
}

pub fn bearer(email: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token_for(email)))
}

pub fn verifier() -> Arc<JwtVerifier> {
    Arc::new(JwtVerifier::from_rsa_pem(PUBLIC_KEY, None).expect("test public key"))
}

pub fn memory_service(post_ids: impl IntoIterator<Item = i64>) -> (VoteService, Arc<InMemoryVoteStore>) {
    let store = Arc::new(InMemoryVoteStore::with_posts(post_ids));
    let service = VoteService::new(store.clone() as Arc<dyn VoteStore>);
    (service, store)
}

/// With `admin_enabled` the admin routes are mounted and only `ADMIN` may use them.
pub async fn init_app(
    store: Arc<InMemoryVoteStore>,
    admin_enabled: bool,
) -> impl Service<actix_http::Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>
{
    let store = store as Arc<dyn VoteStore>;
    let service = web::Data::new(VoteService::new(store.clone()));
    let health = web::Data::new(HealthState::new(store, "memory"));
    let admins = admin_enabled.then(|| AdminAllowList::new([ADMIN]));

    test::init_service(
        App::new()
            .app_data(service)
            .app_data(health)
            .wrap(IdentityMiddleware::new(Some(verifier())))
            .configure(|cfg| handlers::configure_routes(cfg, admins))
            .default_service(web::route().to(handlers::not_found)),
    )
    .await
}
