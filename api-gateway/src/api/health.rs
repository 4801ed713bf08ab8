//! Liveness endpoint

/// Liveness probe
#[utoipa::path(
    get,
    path = "/ping",
    responses(
        (status = 200, description = "Server is up", body = String)
    ),
    tag = "health"
)]
pub async fn ping() -> &'static str {
    "PONG"
}
