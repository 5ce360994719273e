use rocket::{Request, catch, serde::json::Json};
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorMessage {
    error: String,
    status: u16,
}

fn message(error: &str, status: u16) -> Json<ErrorMessage> {
    Json(ErrorMessage { error: error.into(), status })
}

#[catch(401)]
pub fn unauthorized(req: &Request) -> Json<ErrorMessage> {
    let error_msg = match req.uri().path().segments().next() {
        Some("api") if req.uri().path().segments().nth(1) == Some("admin") =>
            "Administrator login required.",
        _ => "Voter login required.",
    };
    message(error_msg, 401)
}

#[catch(403)]
pub fn forbidden(_req: &Request) -> Json<ErrorMessage> {
    message("Access forbidden. Your ballot may already be final.", 403)
}

#[catch(400)]
pub fn bad_request(_req: &Request) -> Json<ErrorMessage> {
    message("Invalid request parameters.", 400)
}

#[catch(422)]
pub fn unprocessable(_req: &Request) -> Json<ErrorMessage> {
    message("Malformed request body.", 422)
}

#[catch(404)]
pub fn not_found(_req: &Request) -> Json<ErrorMessage> {
    message("The requested resource was not found.", 404)
}

#[catch(500)]
pub fn internal_error(_req: &Request) -> Json<ErrorMessage> {
    message("An internal server error occurred.", 500)
}
