use pet_blog_models::{posts::Post, Connection, Result};
use rocket::{
    form::Contextual,
    http::Status,
    response::{status, Flash, Redirect},
    serde::json::Json,
};
use serde_json::Value;
use std::borrow::Cow;
use validator::{ValidationError, ValidationErrors};

pub mod blogs;
pub mod errors;
pub mod feed;
pub mod posts;
pub mod session;
pub mod subscriptions;

pub type Page = Json<Value>;

/// Either a page, the same page refused with its validation errors, or a redirection.
#[derive(Responder)]
pub enum RespondOrRedirect {
    Response(Page),
    Invalid(status::Custom<Page>),
    Redirect(Redirect),
    FlashRedirect(Flash<Redirect>),
}

impl From<Page> for RespondOrRedirect {
    fn from(page: Page) -> Self {
        RespondOrRedirect::Response(page)
    }
}

impl From<Redirect> for RespondOrRedirect {
    fn from(redirect: Redirect) -> Self {
        RespondOrRedirect::Redirect(redirect)
    }
}

impl From<Flash<Redirect>> for RespondOrRedirect {
    fn from(redirect: Flash<Redirect>) -> Self {
        RespondOrRedirect::FlashRedirect(redirect)
    }
}

/// Answers a form submission that didn't pass validation.
pub fn invalid(page: Value) -> RespondOrRedirect {
    RespondOrRedirect::Invalid(status::Custom(Status::UnprocessableEntity, Json(page)))
}

/// Checks that every selected id was among the offered choices.
pub fn check_choices(
    field: &'static str,
    selected: &[i32],
    choices: &[i32],
) -> std::result::Result<(), ValidationErrors> {
    match selected.iter().find(|id| !choices.contains(*id)) {
        None => Ok(()),
        Some(id) => {
            let mut error = ValidationError::new("invalid_choice");
            error.message = Some(Cow::Owned(format!(
                "Select a valid choice. {} is not one of the available choices.",
                id
            )));
            error.add_param(Cow::Borrowed("value"), id);
            let mut errors = ValidationErrors::new();
            errors.add(field, error);
            Err(errors)
        }
    }
}

/// Takes the value out of a parsed form, or reports why `field` couldn't be
/// parsed. An empty form stands in for one that couldn't be parsed.
pub fn form_value<T: Default>(
    form: Contextual<'_, T>,
    field: &'static str,
) -> (T, std::result::Result<(), ValidationErrors>) {
    match form.value {
        Some(value) => (value, Ok(())),
        None => {
            let mut errors = ValidationErrors::new();
            for err in form.context.errors() {
                let mut error = ValidationError::new("invalid");
                error.message = Some(Cow::Owned(err.kind.to_string()));
                if let Some(value) = &err.value {
                    error.add_param(Cow::Borrowed("value"), value);
                }
                errors.add(field, error);
            }
            (T::default(), Err(errors))
        }
    }
}

pub fn post_json(conn: &Connection, post: &Post) -> Result<Value> {
    Ok(json!({
        "id": post.id,
        "title": post.title,
        "content": post.content,
        "posted": post.posted,
        "author": post.get_author(conn)?.username,
    }))
}
