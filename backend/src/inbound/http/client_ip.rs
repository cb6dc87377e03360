//! Client address resolution for logs.

use actix_web::HttpRequest;

const FORWARDED_FOR: &str = "x-forwarded-for";
const IPV4_MAPPED_PREFIX: &str = "::ffff:";
const UNKNOWN: &str = "unknown";

/// Best-effort client address of `req`.
///
/// Prefers the `X-Forwarded-For` header, then the peer address, then
/// `unknown`. IPv4-mapped IPv6 prefixes (`::ffff:`) are stripped.
///
/// # Examples
/// ```
/// use actix_web::test::TestRequest;
/// use tracker::inbound::http::client_ip::client_ip;
///
/// let req = TestRequest::default()
///     .insert_header(("x-forwarded-for", "::ffff:10.0.0.1"))
///     .to_http_request();
/// assert_eq!(client_ip(&req), "10.0.0.1");
/// ```
pub fn client_ip(req: &HttpRequest) -> String {
    let forwarded = req
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_owned);
    let raw = forwarded
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN.to_owned());
    raw.replace(IPV4_MAPPED_PREFIX, "")
}
