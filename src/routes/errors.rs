use pet_blog_models::Error;
use rocket::{
    http::Status,
    response::{self, status, Responder},
    serde::json::Json,
    Request,
};
use serde_json::Value;
use tracing::error;

#[derive(Debug)]
pub struct ErrorPage(pub Error);

impl From<Error> for ErrorPage {
    fn from(err: Error) -> ErrorPage {
        ErrorPage(err)
    }
}

fn error_page(status: Status, message: &str) -> status::Custom<Json<Value>> {
    status::Custom(
        status,
        Json(json!({
            "error": status.code,
            "error_message": message,
        })),
    )
}

impl<'r> Responder<'r, 'static> for ErrorPage {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match self.0 {
            Error::NotFound => {
                error_page(Status::NotFound, "Couldn't find this page.").respond_to(req)
            }
            Error::Unauthorized => error_page(
                Status::Forbidden,
                "You are not authorized to access this page.",
            )
            .respond_to(req),
            err => {
                error!("{} {}: {}", req.method(), req.uri(), err);
                error_page(Status::InternalServerError, "Something broke on our side.")
                    .respond_to(req)
            }
        }
    }
}

#[catch(404)]
pub fn not_found() -> status::Custom<Json<Value>> {
    error_page(Status::NotFound, "Couldn't find this page.")
}

#[catch(422)]
pub fn unprocessable_entity() -> status::Custom<Json<Value>> {
    error_page(
        Status::UnprocessableEntity,
        "The form you sent couldn't be understood.",
    )
}

#[catch(500)]
pub fn server_error() -> status::Custom<Json<Value>> {
    error_page(Status::InternalServerError, "Something broke on our side.")
}
