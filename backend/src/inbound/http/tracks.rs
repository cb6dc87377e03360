//! Track ingestion endpoint.
//!
//! ```text
//! POST /tracks {"uid":"12345","action":"objectVisited","data":{"id":"item"}}
//! ```

use actix_web::{HttpRequest, HttpResponse, post, web};
use tracing::error;

use crate::domain::RequestMetadata;
use crate::inbound::http::ApiResult;
use crate::inbound::http::client_ip::client_ip;
use crate::inbound::http::state::HttpState;
use crate::middleware::trace::referrer;

/// Confirmation text returned for an accepted event.
pub const TRACK_STORED: &str = "Track stored";

/// Record one tracked event.
///
/// The raw body is handed to the domain unparsed so malformed JSON is
/// reported with the same error envelope as rule violations.
#[post("/tracks")]
pub async fn record_track(
    state: web::Data<HttpState>,
    req: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let metadata = RequestMetadata {
        referer_header: referrer(req.headers()).map(str::to_owned),
    };
    state
        .tracks
        .record_event(body.to_vec(), metadata)
        .await
        .inspect_err(|err| {
            error!(client_ip = %client_ip(&req), reason = err.message(), "track rejected");
        })?;
    Ok(HttpResponse::Created()
        .content_type("text/plain; charset=utf-8")
        .body(TRACK_STORED))
}
