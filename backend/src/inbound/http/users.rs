//! Per-subject read endpoints.
//!
//! ```text
//! GET /users/{uid}/visited
//! GET /users/{uid}
//! ```

use actix_web::{HttpResponse, get, web};
use serde::Deserialize;

use crate::domain::ReadParams;
use crate::inbound::http::ApiResult;
use crate::inbound::http::state::HttpState;

/// Path segment naming the subject.
#[derive(Debug, Deserialize)]
pub struct SubjectPath {
    uid: String,
}

impl From<SubjectPath> for ReadParams {
    fn from(path: SubjectPath) -> Self {
        Self::from([("uid".to_owned(), path.uid)])
    }
}

/// Item ids the subject visited, newest first; empty when nothing is stored.
#[get("/users/{uid}/visited")]
pub async fn visited(
    state: web::Data<HttpState>,
    path: web::Path<SubjectPath>,
) -> ApiResult<HttpResponse> {
    let visits = state.history.visit_history(path.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(visits))
}

/// Raw stored events of the subject, newest first.
#[get("/users/{uid}")]
pub async fn profile(
    state: web::Data<HttpState>,
    path: web::Path<SubjectPath>,
) -> ApiResult<HttpResponse> {
    let entries = state.history.profile(path.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(entries))
}
