use http::Method;
use http::header::CONTENT_TYPE;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Any-origin policy; the player pages are served from hosts we do not
/// control. Preflight requests are answered by the layer itself.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_origin(AllowOrigin::any())
        .allow_headers([CONTENT_TYPE])
}
