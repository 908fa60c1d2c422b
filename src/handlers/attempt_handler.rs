use actix_web::{get, post, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    errors::AppError,
    models::domain::StudentContext,
    models::dto::request::{StartAttemptRequest, SubmitAnswerRequest},
    models::dto::response::{FinishTestResponse, StartAttemptResponse, SubmitAnswerResponse},
};

#[post("/api/tests/{test_id}/attempts")]
pub async fn start_attempt(
    state: web::Data<AppState>,
    test_id: web::Path<String>,
    request: web::Json<StartAttemptRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let student = StudentContext::new(&request.student_id, &request.group);
    let outcome = state
        .admission_service
        .start_attempt(&student, &test_id)
        .await?;

    let response = StartAttemptResponse {
        attempt_id: outcome.attempt_id,
        resumed: outcome.resumed,
    };

    if response.resumed {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

#[get("/api/attempts/{id}/question")]
pub async fn get_current_question(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let response = state.attempt_service.current_question(&id).await?;
    Ok(HttpResponse::Ok().json(response))
}

#[post("/api/attempts/{id}/answers")]
pub async fn submit_answer(
    state: web::Data<AppState>,
    id: web::Path<String>,
    request: web::Json<SubmitAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let outcome = state
        .attempt_service
        .submit_answer(
            &id,
            &request.question_id,
            request.selected_answer_id.as_deref(),
            request.time_spent_seconds,
        )
        .await?;

    Ok(HttpResponse::Ok().json(SubmitAnswerResponse {
        all_questions_answered: outcome.all_answered,
    }))
}

#[post("/api/attempts/{id}/finish")]
pub async fn finish_test(
    state: web::Data<AppState>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    state.attempt_service.finish_test(&id).await?;
    Ok(HttpResponse::Ok().json(FinishTestResponse { ok: true }))
}
