use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

use crate::config::MatchingSettings;
use crate::core::{
    load_profile, MatchRepository, MatchResult, Matcher, SkillRepository, Store, StoreError,
    UserRepository,
};
use crate::models::{
    AddSkillRequest, AddSkillResponse, CreateUserRequest, DeleteSkillQuery, ErrorResponse,
    HealthResponse, ListMatchesQuery, MatchRecord, MatchesResponse, NewSkillListing, NewUser,
    RecomputeRequest, RecomputeResponse, SkillDirection, SkillsResponse, UserId,
};
use crate::services::{CacheKey, CacheManager};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub cache: Arc<CacheManager>,
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

/// Configure all user, skill and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/users", web::post().to(create_user))
        .route("/users/{user_id}/skills", web::get().to(list_skills))
        .route("/users/{user_id}/matches", web::get().to(list_matches))
        .route("/skills", web::post().to(add_skill))
        .route("/skills/{skill_id}", web::delete().to(delete_skill))
        .route("/matches/recompute", web::post().to(recompute_matches));
}

fn error_response(status: StatusCode, error: &str, message: impl ToString) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: message.to_string(),
        status_code: status.as_u16(),
    })
}

fn store_error_response(err: &StoreError, error: &str) -> HttpResponse {
    let status = match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) => StatusCode::CONFLICT,
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StoreError::SqlxError(_) | StoreError::MigrateError(_) => {
            tracing::error!("{}: {}", error, err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error, err)
}

/// Run the matcher for a user and drop stale cached listings
async fn run_matcher(state: &AppState, user_id: UserId) -> Result<MatchResult, StoreError> {
    let store = state.store.as_ref();
    let result = state
        .matcher
        .find_matches_for_user(store, store, user_id)
        .await?;

    if !result.created.is_empty() {
        let mut affected: Vec<UserId> = result
            .created
            .iter()
            .flat_map(|m| [m.user1_id, m.user2_id])
            .collect();
        affected.sort_unstable();
        affected.dedup();

        if let Err(e) = state.cache.invalidate_matches(&affected).await {
            tracing::warn!("Failed to invalidate cached matches: {}", e);
        }
    }

    Ok(result)
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Register a user
///
/// POST /api/v1/users
async fn create_user(
    state: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    let req = req.into_inner();
    match state
        .store
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            bio: req.bio,
        })
        .await
    {
        Ok(user) => {
            tracing::info!("Registered user {} ({})", user.id, user.username);
            HttpResponse::Created().json(user)
        }
        Err(e) => store_error_response(&e, "Failed to register user"),
    }
}

/// List a user's offered and wanted skills
///
/// GET /api/v1/users/{user_id}/skills
async fn list_skills(state: web::Data<AppState>, path: web::Path<UserId>) -> impl Responder {
    let user_id = path.into_inner();

    match state.store.user_exists(user_id).await {
        Ok(true) => {}
        Ok(false) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "User not found",
                format!("No user with id {}", user_id),
            )
        }
        Err(e) => return store_error_response(&e, "Failed to fetch user"),
    }

    match load_profile(state.store.as_ref(), user_id).await {
        Ok(profile) => HttpResponse::Ok().json(SkillsResponse {
            user_id,
            offers: profile.offers,
            wants: profile.wants,
        }),
        Err(e) => store_error_response(&e, "Failed to fetch skills"),
    }
}

/// Add a skill listing
///
/// POST /api/v1/skills
///
/// Request body:
/// ```json
/// {
///   "userId": 1,
///   "skillName": "Guitar",
///   "skillType": "offer|want",
///   "proficiency": "intermediate",
///   "description": "string"
/// }
/// ```
///
/// Adding an `offer` runs the matcher for the user before responding.
async fn add_skill(
    state: web::Data<AppState>,
    req: web::Json<AddSkillRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    let direction = match req.skill_type.parse::<SkillDirection>() {
        Ok(direction) => direction,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, "Invalid skill type", e),
    };

    let req = req.into_inner();
    let user_id = req.user_id;
    let skill = match state
        .store
        .insert_skill(NewSkillListing {
            user_id,
            skill_name: req.skill_name,
            direction,
            proficiency: req.proficiency,
            description: req.description,
        })
        .await
    {
        Ok(skill) => skill,
        Err(e) => return store_error_response(&e, "Failed to add skill"),
    };

    tracing::info!(
        "User {} added {} skill {:?}",
        user_id,
        skill.direction,
        skill.skill_name
    );

    let matches_created = if direction == SkillDirection::Offer {
        match run_matcher(&state, user_id).await {
            Ok(result) => result.created.len(),
            Err(e) => return store_error_response(&e, "Failed to compute matches"),
        }
    } else {
        0
    };

    HttpResponse::Created().json(AddSkillResponse {
        skill,
        matches_created,
    })
}

/// Delete a skill listing owned by the caller
///
/// DELETE /api/v1/skills/{skill_id}?userId={userId}
///
/// Existing matches keep the percentage and snapshot they were created with.
async fn delete_skill(
    state: web::Data<AppState>,
    path: web::Path<i64>,
    query: web::Query<DeleteSkillQuery>,
) -> impl Responder {
    let skill_id = path.into_inner();

    match state.store.delete_skill(skill_id, query.user_id).await {
        Ok(true) => {
            tracing::info!("User {} deleted skill {}", query.user_id, skill_id);
            HttpResponse::NoContent().finish()
        }
        Ok(false) => error_response(
            StatusCode::NOT_FOUND,
            "Skill not found",
            format!("No skill with id {}", skill_id),
        ),
        Err(StoreError::Conflict(message)) => {
            error_response(StatusCode::FORBIDDEN, "Unauthorized action", message)
        }
        Err(e) => store_error_response(&e, "Failed to delete skill"),
    }
}

/// Matches involving a user, best first
///
/// GET /api/v1/users/{user_id}/matches?limit={limit}
async fn list_matches(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    query: web::Query<ListMatchesQuery>,
) -> impl Responder {
    let user_id = path.into_inner();
    let max_limit = state.matching.max_limit as usize;
    let limit = query
        .limit
        .unwrap_or(state.matching.default_limit)
        .min(state.matching.max_limit) as usize;

    let cache_key = CacheKey::matches(user_id);
    let mut records = match state.cache.get::<Vec<MatchRecord>>(&cache_key).await {
        Ok(records) => records,
        Err(_) => {
            let generation = state.cache.generation();
            let records = match state.store.list_for_user(user_id, max_limit).await {
                Ok(records) => records,
                Err(e) => return store_error_response(&e, "Failed to fetch matches"),
            };
            if let Err(e) = state
                .cache
                .set_if_current(&cache_key, &records, generation)
                .await
            {
                tracing::warn!("Failed to cache matches for {}: {}", user_id, e);
            }
            records
        }
    };
    records.truncate(limit);

    HttpResponse::Ok().json(MatchesResponse {
        user_id,
        total_results: records.len(),
        matches: records,
    })
}

/// Re-run matching for a user
///
/// POST /api/v1/matches/recompute
async fn recompute_matches(
    state: web::Data<AppState>,
    req: web::Json<RecomputeRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return error_response(StatusCode::BAD_REQUEST, "Validation failed", errors);
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!("recompute", run_id = %run_id, user_id = req.user_id);

    match run_matcher(&state, req.user_id).instrument(span).await {
        Ok(result) => HttpResponse::Ok().json(RecomputeResponse {
            run_id,
            user_id: req.user_id,
            candidates_scanned: result.candidates_scanned,
            matches_created: result.created.len(),
            existing_pairs: result.existing_pairs,
        }),
        Err(e) => store_error_response(&e, "Failed to compute matches"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_status_mapping() {
        let not_found = store_error_response(&StoreError::NotFound("user 1".into()), "x");
        let conflict = store_error_response(&StoreError::Conflict("taken".into()), "x");
        let invalid = store_error_response(&StoreError::InvalidInput("bad".into()), "x");

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
    }
}
