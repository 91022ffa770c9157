//! Route configuration
//!
//! Centralized route setup extracted from main.rs.
//! Each domain (auth, users, channels) manages its own routes.

use crate::handlers;
use crate::middleware::JwtAuthMiddleware;
use actix_web::{web, HttpResponse};

/// Configure all routes for the application
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Static/public endpoints
        .route("/api/v1/openapi.json", web::get().to(openapi_handler))
        .route("/swagger-ui", web::get().to(swagger_ui_handler))
        // API routes
        .service(
            web::scope("/api/v1")
                .route("/health", web::get().to(handlers::health_check))
                .configure(routes::auth::configure)
                .configure(routes::users::configure)
                .configure(routes::channels::configure),
        );
}

/// OpenAPI JSON endpoint
async fn openapi_handler() -> HttpResponse {
    use utoipa::OpenApi;
    HttpResponse::Ok()
        .content_type("application/json")
        .json(crate::openapi::ApiDoc::openapi())
}

/// Swagger UI handler (CDN-hosted assets)
async fn swagger_ui_handler() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Vidra Identity Service API</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/api/v1/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
            });
        };
    </script>
</body>
</html>"#,
        )
}

// Sub-modules for each domain
mod routes {
    use super::*;

    pub mod auth {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/auth")
                    .route("/register", web::post().to(handlers::register))
                    .route("/login", web::post().to(handlers::login))
                    .route("/refresh", web::post().to(handlers::refresh_token))
                    .service(
                        web::scope("")
                            .wrap(JwtAuthMiddleware)
                            .route("/logout", web::post().to(handlers::logout))
                            .route(
                                "/change-password",
                                web::post().to(handlers::change_password),
                            ),
                    ),
            );
        }
    }

    pub mod users {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                web::scope("/users/me")
                    .wrap(JwtAuthMiddleware)
                    .route("", web::get().to(handlers::get_current_user))
                    .route("", web::patch().to(handlers::update_account))
                    .route("/avatar", web::patch().to(handlers::update_avatar))
                    .route("/cover", web::patch().to(handlers::update_cover))
                    .route("/history", web::get().to(handlers::get_watch_history)),
            );
        }
    }

    pub mod channels {
        use super::*;
        pub fn configure(cfg: &mut web::ServiceConfig) {
            cfg.service(
                // Public: viewer identity is extracted opportunistically in
                // the handler, so no auth middleware here.
                web::scope("/channels")
                    .route("/{username}", web::get().to(handlers::get_channel_profile)),
            );
        }
    }
}
