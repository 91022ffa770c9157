pub mod jwt_auth;

// Middleware modules:
// - jwt_auth: JWT Bearer token validation and user_id extraction
// - Request logging: handled by actix_web::middleware::Logger
// - CORS: handled by actix_cors::Cors

pub use jwt_auth::{viewer_from_request, JwtAuthMiddleware, UserId};
