use crate::routes::{errors::ErrorPage, invalid, post_json, Page, RespondOrRedirect};
use pet_blog_common::utils;
use pet_blog_models::{
    blogs::Blog,
    db_conn::DbConn,
    notifier::Notifier,
    posts::{NewPost, Post},
    users::User,
    Connection, Error,
};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    serde::json::Json,
    State,
};
use serde::Serialize;
use std::sync::Arc;
use validator::{Validate, ValidationErrors};

#[derive(Default, FromForm, Serialize, Validate)]
pub struct NewPostForm {
    #[validate(length(
        min = 1,
        max = 255,
        message = "The title should be between 1 and 255 characters long"
    ))]
    #[field(default = String::new())]
    pub title: String,
    #[validate(length(
        min = 1,
        max = 10000,
        message = "The content should be between 1 and 10000 characters long"
    ))]
    #[field(default = String::new())]
    pub content: String,
}

#[get("/")]
pub async fn index(conn: DbConn) -> Result<Page, ErrorPage> {
    let posts = conn
        .run(|conn| -> Result<Vec<serde_json::Value>, Error> {
            Post::list(conn)?
                .iter()
                .map(|post| post_json(conn, post))
                .collect()
        })
        .await?;
    Ok(Json(json!({ "posts": posts })))
}

#[get("/post/<id>")]
pub async fn details(id: i32, conn: DbConn, account: Option<User>) -> Result<Page, ErrorPage> {
    let post = conn
        .run(move |conn| -> Result<serde_json::Value, Error> {
            post_json(conn, &Post::get(conn, id)?)
        })
        .await?;
    Ok(Json(json!({
        "account": account,
        "post": post,
    })))
}

fn my_posts_page(
    conn: &Connection,
    user: &User,
    form: &NewPostForm,
    errors: Option<ValidationErrors>,
) -> Result<serde_json::Value, Error> {
    let posts = Post::find_for_author(conn, user)?
        .iter()
        .map(|post| post_json(conn, post))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "account": user,
        "blog": Blog::find_for_author(conn, user).ok(),
        "posts": posts,
        "form": form,
        "errors": errors,
    }))
}

#[get("/my-posts")]
pub async fn mine(user: User, conn: DbConn) -> Result<Page, ErrorPage> {
    let page = conn
        .run(move |conn| my_posts_page(conn, &user, &NewPostForm::default(), None))
        .await?;
    Ok(Json(page))
}

#[get("/my-posts", rank = 2)]
pub fn mine_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to write a new post",
        uri!(mine),
    )
}

#[post("/my-posts", data = "<form>")]
pub async fn create(
    user: User,
    conn: DbConn,
    notifier: &State<Arc<dyn Notifier>>,
    form: Form<NewPostForm>,
) -> Result<RespondOrRedirect, ErrorPage> {
    let form = form.into_inner();
    let notifier = Arc::clone(notifier.inner());
    let response = conn
        .run(move |conn| -> Result<RespondOrRedirect, Error> {
            if let Err(errors) = form.validate() {
                return Ok(invalid(my_posts_page(conn, &user, &form, Some(errors))?));
            }

            // Only authors can publish
            let blog = Blog::find_for_author(conn, &user).map_err(|_| Error::Unauthorized)?;
            let post = Post::insert(
                conn,
                NewPost {
                    blog_id: blog.id,
                    title: form.title,
                    content: form.content,
                },
            )?;
            post.fan_out(conn, notifier.as_ref())?;
            Ok(Redirect::to(uri!(mine)).into())
        })
        .await?;
    Ok(response)
}

#[post("/my-posts", rank = 2)]
pub fn create_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to write a new post",
        uri!(mine),
    )
}
