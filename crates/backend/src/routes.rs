use axum::{
    handler::Handler,
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::{handlers, system};
use system::auth::middleware::{require_admin, require_auth};

/// Application route table
pub fn configure_routes() -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // ========================================
        // SYSTEM AUTH ROUTES (PUBLIC)
        // ========================================
        .route(
            "/api/system/auth/login",
            post(system::handlers::auth::login),
        )
        .route(
            "/api/system/auth/refresh",
            post(system::handlers::auth::refresh),
        )
        .route(
            "/api/system/auth/logout",
            post(system::handlers::auth::logout),
        )
        // System auth routes (protected)
        .route(
            "/api/system/auth/me",
            get(system::handlers::auth::current_user).layer(middleware::from_fn(require_auth)),
        )
        // System users management (admin only)
        .route(
            "/api/system/users",
            get(system::handlers::users::list)
                .post(system::handlers::users::create)
                .layer(middleware::from_fn(require_admin)),
        )
        // ========================================
        // A001 CUSTOMERS
        // ========================================
        .route(
            "/api/customers",
            get(handlers::a001_customer::list_all)
                .post(handlers::a001_customer::create)
                .layer(middleware::from_fn(require_auth)),
        )
        .route(
            "/api/customers/:id",
            get(handlers::a001_customer::get_by_id)
                .put(handlers::a001_customer::update)
                .layer(middleware::from_fn(require_auth))
                .delete(
                    handlers::a001_customer::delete.layer(middleware::from_fn(require_admin)),
                ),
        )
        .route(
            "/api/customers/:id/stage",
            post(handlers::a001_customer::change_stage).layer(middleware::from_fn(require_auth)),
        )
        .route(
            "/api/customers/:id/revenue",
            put(handlers::a001_customer::edit_revenue).layer(middleware::from_fn(require_auth)),
        )
        // A002 NOTES
        .route(
            "/api/customers/:id/notes",
            get(handlers::a002_note::list)
                .post(handlers::a002_note::add)
                .layer(middleware::from_fn(require_auth)),
        )
        .route(
            "/api/customers/:id/notes/:note_id",
            patch(handlers::a002_note::set_flags)
                .delete(handlers::a002_note::delete)
                .layer(middleware::from_fn(require_auth)),
        )
        // A003 ORDERS
        .route(
            "/api/customers/:id/orders",
            get(handlers::a003_order::list)
                .post(handlers::a003_order::add)
                .layer(middleware::from_fn(require_auth)),
        )
        .route(
            "/api/customers/:id/orders/:order_id",
            axum::routing::delete(handlers::a003_order::delete)
                .layer(middleware::from_fn(require_auth)),
        )
        // ========================================
        // D001 CUSTOMER KPI & SETTINGS
        // ========================================
        .route(
            "/api/kpis",
            get(handlers::d001_customer_kpi::get_kpis).layer(middleware::from_fn(require_auth)),
        )
        .route(
            "/api/settings/fields",
            get(handlers::field_settings::get_settings).layer(middleware::from_fn(require_auth)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    async fn status_of(method: &str, uri: &str, auth: Option<&str>) -> StatusCode {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(value) = auth {
            req = req.header(header::AUTHORIZATION, value);
        }
        let resp = configure_routes()
            .oneshot(req.body(Body::empty()).unwrap())
            .await
            .unwrap();
        resp.status()
    }

    #[tokio::test]
    async fn health_is_public() {
        assert_eq!(status_of("GET", "/health", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn crm_routes_require_bearer_token() {
        let id = uuid::Uuid::new_v4();
        for (method, uri) in [
            ("GET", "/api/customers".to_string()),
            ("GET", format!("/api/customers/{}", id)),
            ("DELETE", format!("/api/customers/{}", id)),
            ("POST", format!("/api/customers/{}/notes", id)),
            ("GET", "/api/kpis".to_string()),
            ("GET", "/api/settings/fields".to_string()),
            ("GET", "/api/system/users".to_string()),
        ] {
            assert_eq!(
                status_of(method, &uri, None).await,
                StatusCode::UNAUTHORIZED,
                "{} {}",
                method,
                uri
            );
        }
    }

    #[tokio::test]
    async fn non_bearer_authorization_is_rejected() {
        assert_eq!(
            status_of("GET", "/api/customers", Some("Basic YWRtaW46YWRtaW4=")).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
