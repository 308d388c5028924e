/// HTTP handlers for vote-service
///
/// - Votes: like, dislike, cancel, status, score
/// - Admin: counter audit
/// - Health: summary, readiness, liveness
pub mod health;
pub mod votes;

pub use health::{health_summary, liveness_check, readiness_summary, HealthState};
pub use votes::{
    batch_vote_status, cancel_vote, dislike_post, get_score, get_vote_status, like_post,
    verify_counters,
};

use crate::error::AppError;
use crate::middleware::AdminAllowList;
use actix_web::middleware::DefaultHeaders;
use actix_web::{web, ResponseError};

/// Register every vote-service route. Shared by the binary and HTTP tests.
///
/// Admin routes exist only when an allow-list is given.
pub fn configure_routes(cfg: &mut web::ServiceConfig, admins: Option<AdminAllowList>) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .route("/metrics", web::get().to(crate::metrics::serve_metrics))
    .route("/api/v1/health", web::get().to(health_summary))
    .route("/api/v1/health/ready", web::get().to(readiness_summary))
    .route("/api/v1/health/live", web::get().to(liveness_check))
    .service(
        web::scope("/api/v1/posts")
            .wrap(
                DefaultHeaders::new()
                    .add(("Cache-Control", "no-store"))
                    .add(("Pragma", "no-cache")),
            )
            .route("/vote-status/batch", web::post().to(batch_vote_status))
            .route("/{post_id}/like", web::post().to(like_post))
            .route("/{post_id}/dislike", web::post().to(dislike_post))
            .route("/{post_id}/vote-cancel", web::post().to(cancel_vote))
            .route("/{post_id}/vote-status", web::get().to(get_vote_status))
            .route("/{post_id}/score", web::get().to(get_score)),
    );

    if let Some(admins) = admins {
        cfg.service(
            web::scope("/admin/posts")
                .app_data(web::Data::new(admins))
                .route("/{post_id}/counters/verify", web::get().to(verify_counters)),
        );
    }
}

/// Fallback for unmatched routes, rendered like every other error
pub async fn not_found() -> actix_web::HttpResponse {
    AppError::NotFound("route not found".to_string()).error_response()
}
