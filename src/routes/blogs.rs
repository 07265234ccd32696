use crate::routes::{
    check_choices, errors::ErrorPage, form_value, invalid, Page, RespondOrRedirect,
};
use pet_blog_common::utils;
use pet_blog_models::{
    blogs::Blog, db_conn::DbConn, subscriptions::Subscription, users::User, Connection, Error,
};
use rocket::{
    form::{Contextual, Form},
    response::{Flash, Redirect},
    serde::json::Json,
};
use serde::Serialize;
use serde_json::Value;
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Serialize, Validate)]
pub struct SubscribeForm {
    #[field(default = Vec::new())]
    #[validate(length(min = 1, message = "Select at least one blog"))]
    pub blogs: Vec<i32>,
}

fn blogs_page(
    conn: &Connection,
    user: &User,
    candidates: &[Blog],
    form: &SubscribeForm,
    errors: Option<ValidationErrors>,
) -> Result<Value, Error> {
    let blogs = candidates
        .iter()
        .map(|blog| -> Result<Value, Error> {
            Ok(json!({
                "id": blog.id,
                "name": blog.name(conn)?,
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "account": user,
        "blogs": blogs,
        "form": form,
        "errors": errors,
    }))
}

#[get("/blogs")]
pub async fn subscribable(user: User, conn: DbConn) -> Result<Page, ErrorPage> {
    let page = conn
        .run(move |conn| -> Result<Value, Error> {
            let candidates = Blog::subscribable_by(conn, &user)?;
            blogs_page(conn, &user, &candidates, &SubscribeForm::default(), None)
        })
        .await?;
    Ok(Json(page))
}

#[get("/blogs", rank = 2)]
pub fn subscribable_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to subscribe to a blog",
        uri!(subscribable),
    )
}

#[post("/blogs", data = "<form>")]
pub async fn subscribe(
    user: User,
    conn: DbConn,
    form: Form<Contextual<'_, SubscribeForm>>,
) -> Result<RespondOrRedirect, ErrorPage> {
    let (form, parsing) = form_value(form.into_inner(), "blogs");
    let response = conn
        .run(move |conn| -> Result<RespondOrRedirect, Error> {
            let candidates = Blog::subscribable_by(conn, &user)?;
            let choices = candidates.iter().map(|blog| blog.id).collect::<Vec<_>>();
            if let Err(errors) = parsing
                .and_then(|_| form.validate())
                .and_then(|_| check_choices("blogs", &form.blogs, &choices))
            {
                return Ok(invalid(blogs_page(conn, &user, &candidates, &form, Some(errors))?));
            }

            let selected = candidates
                .into_iter()
                .filter(|blog| form.blogs.contains(&blog.id))
                .collect::<Vec<_>>();
            Subscription::subscribe(conn, &user, &selected)?;
            Ok(Redirect::to(uri!(subscribable)).into())
        })
        .await?;
    Ok(response)
}

#[post("/blogs", rank = 2)]
pub fn subscribe_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to subscribe to a blog",
        uri!(subscribable),
    )
}
