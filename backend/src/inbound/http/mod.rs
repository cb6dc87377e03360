//! HTTP inbound adapter exposing the tracking endpoints.

pub mod client_ip;
pub mod error;
pub mod health;
pub mod state;
pub mod tracks;
pub mod users;

use actix_web::web;

pub use error::ApiResult;

/// Register every tracking route on `cfg`.
///
/// Shared by the server and integration tests so both serve the same surface.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use tracker::inbound::http::configure;
///
/// let _app = App::new().configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health_check)
        .service(health::store_health)
        .service(users::visited)
        .service(users::profile)
        .service(tracks::record_track);
}
