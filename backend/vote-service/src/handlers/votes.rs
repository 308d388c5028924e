/// Vote handlers - like, dislike, cancel and status endpoints
use crate::domain::VoteType;
use crate::error::Result;
use crate::middleware::{AdminUser, UserEmail};
use crate::models::BatchVoteStatusRequest;
use crate::services::VoteService;
use actix_web::{web, HttpResponse};
use validator::Validate;

fn identity(user: &Option<UserEmail>) -> Option<&str> {
    user.as_ref().map(UserEmail::as_str)
}

/// POST /api/v1/posts/{post_id}/like
pub async fn like_post(
    service: web::Data<VoteService>,
    user: Option<UserEmail>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let response = service
        .apply_vote(identity(&user), post_id.into_inner(), VoteType::Like)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/posts/{post_id}/dislike
pub async fn dislike_post(
    service: web::Data<VoteService>,
    user: Option<UserEmail>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let response = service
        .apply_vote(identity(&user), post_id.into_inner(), VoteType::Dislike)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/posts/{post_id}/vote-cancel
pub async fn cancel_vote(
    service: web::Data<VoteService>,
    user: Option<UserEmail>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let response = service
        .cancel_vote(identity(&user), post_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/posts/{post_id}/vote-status
pub async fn get_vote_status(
    service: web::Data<VoteService>,
    user: Option<UserEmail>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let response = service
        .get_vote_status(identity(&user), post_id.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// POST /api/v1/posts/vote-status/batch
pub async fn batch_vote_status(
    service: web::Data<VoteService>,
    user: Option<UserEmail>,
    req: web::Json<BatchVoteStatusRequest>,
) -> Result<HttpResponse> {
    req.validate()?;
    let response = service
        .get_vote_statuses(identity(&user), &req.post_ids)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/posts/{post_id}/score
pub async fn get_score(
    service: web::Data<VoteService>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let response = service.get_score(post_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /admin/posts/{post_id}/counters/verify
pub async fn verify_counters(
    service: web::Data<VoteService>,
    admin: AdminUser,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    tracing::info!(
        post_id,
        admin = %crate::services::mask_email(admin.0.as_str()),
        "counter audit requested"
    );
    let audit = service.verify_counters(post_id).await?;
    Ok(HttpResponse::Ok().json(audit))
}
