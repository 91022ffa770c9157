/// OpenAPI documentation for the Vidra Identity Service
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Vidra Identity Service API",
        version = "2.0.0",
        description = "Authentication, session credentials, channel profiles and watch history",
        contact(
            name = "Vidra Team",
            email = "support@vidra.app"
        ),
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development server"),
        (url = "https://api.vidra.app", description = "Production server"),
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::auth::logout,
        handlers::auth::change_password,
        handlers::users::get_current_user,
        handlers::users::update_account,
        handlers::users::update_avatar,
        handlers::users::update_cover,
        handlers::history::get_watch_history,
        handlers::channels::get_channel_profile,
    ),
    components(schemas(
        models::UserProfile,
        models::ChannelProfile,
        models::WatchedVideo,
        models::VideoOwner,
        models::TokenPair,
        handlers::auth::RegisterRequest,
        handlers::auth::LoginRequest,
        handlers::auth::LoginResponse,
        handlers::auth::RefreshTokenRequest,
        handlers::auth::ChangePasswordRequest,
        handlers::auth::MessageResponse,
        handlers::users::UpdateAccountRequest,
        handlers::users::UpdateAvatarRequest,
        handlers::users::UpdateCoverRequest,
    )),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Auth", description = "Session lifecycle: registration, login, rotation, logout"),
        (name = "Users", description = "Current-user profile, media references and watch history"),
        (name = "Channels", description = "Channel profile aggregation over the subscription graph"),
    )
)]
pub struct ApiDoc;
