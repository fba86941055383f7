//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};

use crate::http::error::ApiError;
use crate::http::request::{request_id, VaryRequest};
use crate::http::response::{
    epoch_millis, HealthDump, Liveness, RateLimitSettings, RateLimitStatus, RateLimitingStatus,
    VaryResponse,
};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::provider::ProviderError;
use crate::resilience::{ceil_secs, execute_with_retry, BreakerError, TransientError};

/// `POST /api/{route}`: rate limit, circuit check, retried provider call.
pub async fn vary_handler(
    State(state): State<AppState>,
    Path(route): Path<String>,
    headers: HeaderMap,
    body: Result<Json<VaryRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let response = match vary(&state, &route, &headers, body).await {
        Ok(json) => json.into_response(),
        Err(err) => {
            if err.status().is_server_error() {
                tracing::error!(route = %route, error = %err, "Generation failed");
            } else {
                tracing::warn!(route = %route, error = %err, "Generation rejected");
            }
            err.into_response()
        }
    };

    let label = if state.route(&route).is_some() { route.as_str() } else { "unknown" };
    metrics::record_request(label, response.status().as_u16(), start);
    response
}

async fn vary(
    state: &AppState,
    route_name: &str,
    headers: &HeaderMap,
    body: Result<Json<VaryRequest>, JsonRejection>,
) -> Result<Json<VaryResponse>, ApiError> {
    let route = state
        .route(route_name)
        .ok_or_else(|| ApiError::UnknownRoute(route_name.to_string()))?;

    let Json(body) = body.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;
    let user_id = body.user_id(headers).ok_or(ApiError::MissingUser)?;

    let decision = route.rate_limiter.check(&user_id);
    if !decision.allowed {
        metrics::record_rate_limited(&route.name);
        return Err(ApiError::RateLimited {
            retry_after_secs: decision.retry_after_secs.unwrap_or(1),
        });
    }

    body.validate()?;
    let request = body.into_generation(&route.model);
    let request_id = request_id(headers);

    tracing::info!(
        route = %route.name,
        user = %user_id,
        model = %request.model,
        request_id = request_id.as_deref().unwrap_or("unknown"),
        provider = state.provider.name(),
        "Starting generation"
    );

    let provider = &state.provider;
    let guarded = route
        .breaker
        .execute(|| execute_with_retry(|| provider.generate(&request), &route.retry_policy));

    // Dropping the guarded call on expiry counts it as a breaker failure.
    let output = tokio::time::timeout(state.request_timeout, guarded)
        .await
        .unwrap_or_else(|_| {
            Err(BreakerError::Inner(ProviderError::timed_out(state.request_timeout)))
        })
        .map_err(|err| match err {
            BreakerError::Open { route, retry_after } => ApiError::CircuitOpen {
                route,
                retry_after_secs: ceil_secs(retry_after),
            },
            BreakerError::Inner(err) => ApiError::Provider(err),
        })?;

    tracing::info!(
        route = %route.name,
        user = %user_id,
        outputs = output.outputs.len(),
        "Generation completed"
    );

    Ok(Json(VaryResponse {
        success: true,
        route: route.name.clone(),
        model: request.model,
        outputs: output.outputs,
        request_id,
        rate_limit: RateLimitStatus {
            remaining: decision.remaining,
            reset_time: epoch_millis(decision.reset_after),
        },
    }))
}

/// `GET /api/{route}`: the route's breaker and rate-limit state.
pub async fn route_health(
    State(state): State<AppState>,
    Path(route_name): Path<String>,
) -> Result<Json<HealthDump>, ApiError> {
    let route = state
        .route(&route_name)
        .ok_or_else(|| ApiError::UnknownRoute(route_name.clone()))?;

    Ok(Json(HealthDump {
        route: route.name.clone(),
        circuit_breaker: route.breaker.snapshot(),
        rate_limiting: RateLimitingStatus {
            active_users: route.rate_limiter.active_users(),
            config: RateLimitSettings::from(route.rate_limiter.config()),
        },
        timestamp: epoch_millis(std::time::Duration::ZERO),
    }))
}

/// `GET /health`: liveness plus every route's breaker.
pub async fn liveness(State(state): State<AppState>) -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        circuits: state.breakers.snapshots(),
    })
}
