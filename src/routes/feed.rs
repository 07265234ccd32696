use crate::routes::{
    check_choices, errors::ErrorPage, form_value, invalid, post_json, Page, RespondOrRedirect,
};
use pet_blog_common::utils;
use pet_blog_models::{db_conn::DbConn, feeds::Feed, users::User, Connection, Error};
use rocket::{
    form::{Contextual, Form},
    response::{Flash, Redirect},
    serde::json::Json,
};
use serde::Serialize;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Serialize, Validate)]
pub struct FeedForm {
    #[field(default = Vec::new())]
    #[validate(length(min = 1, message = "Select at least one post"))]
    pub feeds: Vec<i32>,
}

fn feed_page(
    conn: &Connection,
    user: &User,
    entries: &[Feed],
    form: &FeedForm,
    errors: Option<ValidationErrors>,
) -> Result<Value, Error> {
    let feeds = entries
        .iter()
        .map(|feed| -> Result<Value, Error> {
            Ok(json!({
                "id": feed.id,
                "name": feed.name(conn)?,
                "is_read": feed.is_read,
                "post": post_json(conn, &feed.get_post(conn)?)?,
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "account": user,
        "feeds": feeds,
        "form": form,
        "errors": errors,
    }))
}

#[get("/feed")]
pub async fn unread(user: User, conn: DbConn) -> Result<Page, ErrorPage> {
    let page = conn
        .run(move |conn| -> Result<Value, Error> {
            let entries = Feed::unread_for_user(conn, &user)?;
            feed_page(conn, &user, &entries, &FeedForm::default(), None)
        })
        .await?;
    Ok(Json(page))
}

#[get("/feed", rank = 2)]
pub fn unread_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to see your feed",
        uri!(unread),
    )
}

#[post("/feed", data = "<form>")]
pub async fn mark_read(
    user: User,
    conn: DbConn,
    form: Form<Contextual<'_, FeedForm>>,
) -> Result<RespondOrRedirect, ErrorPage> {
    let (form, parsing) = form_value(form.into_inner(), "feeds");
    let response = conn
        .run(move |conn| -> Result<RespondOrRedirect, Error> {
            let entries = Feed::unread_for_user(conn, &user)?;
            let choices = entries.iter().map(|feed| feed.id).collect::<Vec<_>>();
            if let Err(errors) = parsing
                .and_then(|_| form.validate())
                .and_then(|_| check_choices("feeds", &form.feeds, &choices))
            {
                return Ok(invalid(feed_page(conn, &user, &entries, &form, Some(errors))?));
            }

            Feed::mark_read(conn, &user, &form.feeds)?;
            Ok(Redirect::to(uri!(unread)).into())
        })
        .await?;
    Ok(response)
}

#[post("/feed", rank = 2)]
pub fn mark_read_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to see your feed",
        uri!(unread),
    )
}
