//! Health endpoints: process liveness and store diagnostics.
//!
//! ```text
//! GET /healthcheck
//! GET /healthcheck/redis
//! ```

use actix_web::{HttpResponse, get, http::header, web};

use crate::domain::Error;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Liveness probe; answers 200 whenever the process can serve requests.
#[get("/healthcheck")]
pub async fn health_check(state: web::Data<HttpState>) -> HttpResponse {
    state.health.health_check();
    HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

/// Store diagnostics over a dedicated connection.
///
/// Answers `Redis server info: {json}`; failures are 400 with the reason.
#[get("/healthcheck/redis")]
pub async fn store_health(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let info = state.health.store_diagnostics().await?;
    let rendered = serde_json::to_string(&info)
        .map_err(|err| Error::internal(format!("diagnostics serialisation failed: {err}")))?;
    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .content_type("text/plain; charset=utf-8")
        .body(format!("Redis server info: {rendered}")))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};

    use super::*;
    use crate::domain::ports::{
        MockHealthQuery, MockSubjectHistoryQuery, MockTrackCommand, StoreInfo,
    };

    fn state(health: MockHealthQuery) -> HttpState {
        HttpState::new(
            Arc::new(MockTrackCommand::new()),
            Arc::new(MockSubjectHistoryQuery::new()),
            Arc::new(health),
        )
    }

    #[actix_web::test]
    async fn liveness_is_ok_and_uncached() {
        let mut health = MockHealthQuery::new();
        health.expect_health_check().times(1).return_const(());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(health)))
                .service(health_check),
        )
        .await;

        let res = test::call_service(&app, test::TestRequest::get().uri("/healthcheck").to_request()).await;

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[actix_web::test]
    async fn diagnostics_render_server_info() {
        let mut health = MockHealthQuery::new();
        health.expect_store_diagnostics().returning(|| {
            Ok(StoreInfo(BTreeMap::from([(
                "redis_version".to_owned(),
                "7.2.4".to_owned(),
            )])))
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(health)))
                .service(store_health),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/healthcheck/redis").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let body = test::read_body(res).await;
        assert_eq!(
            std::str::from_utf8(&body).expect("utf8"),
            r#"Redis server info: {"redis_version":"7.2.4"}"#
        );
    }

    #[actix_web::test]
    async fn diagnostics_failure_is_bad_request() {
        let mut health = MockHealthQuery::new();
        health.expect_store_diagnostics().returning(|| {
            Err(Error::store_failure(
                "Redis connection failure - connection refused",
            ))
        });
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state(health)))
                .service(store_health),
        )
        .await;

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/healthcheck/redis").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(
            body["message"].as_str(),
            Some("Redis connection failure - connection refused")
        );
    }
}
