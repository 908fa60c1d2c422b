use actix_web::{get, web, HttpResponse};

use crate::{app_state::AppState, errors::AppError, models::dto::request::HistoryQuery};

#[get("/api/attempts/{id}/result")]
pub async fn get_result(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let result = state.result_service.get_result(&id).await?;
    Ok(HttpResponse::Ok().json(result))
}

#[get("/api/students/{student_id}/attempts")]
pub async fn get_attempt_history(
    state: web::Data<AppState>,
    student_id: web::Path<String>,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse, AppError> {
    let summaries = state
        .result_service
        .attempt_history(&student_id, query.completed)
        .await?;
    Ok(HttpResponse::Ok().json(summaries))
}
