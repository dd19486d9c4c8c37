use axum::{extract::Request, middleware::Next, response::Response};

use crate::error::AppError;
use crate::models::Owner;

/// Header set by the upstream authentication layer
pub const OWNER_HEADER: &str = "X-Owner-Id";

/// Owner middleware
/// Resolves the caller identity forwarded by upstream authentication
pub async fn owner_middleware(mut request: Request, next: Next) -> Result<Response, AppError> {
    let owner_id = request
        .headers()
        .get(OWNER_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", OWNER_HEADER)))?;

    let owner = Owner::new(owner_id);
    request.extensions_mut().insert(owner);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(|Extension(owner): Extension<Owner>| async move { owner.id }))
            .layer(middleware::from_fn(owner_middleware))
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let resp = app()
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_header_becomes_owner() {
        let resp = app()
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(OWNER_HEADER, "user-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"user-7");
    }
}
