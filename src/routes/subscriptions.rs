use crate::routes::{
    check_choices, errors::ErrorPage, form_value, invalid, Page, RespondOrRedirect,
};
use pet_blog_common::utils;
use pet_blog_models::{
    db_conn::DbConn, subscriptions::Subscription, users::User, Connection, Error,
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
pub struct UnsubscribeForm {
    #[field(default = Vec::new())]
    #[validate(length(min = 1, message = "Select at least one subscription"))]
    pub subscriptions: Vec<i32>,
}

fn subscriptions_page(
    conn: &Connection,
    user: &User,
    subscriptions: &[Subscription],
    form: &UnsubscribeForm,
    errors: Option<ValidationErrors>,
) -> Result<Value, Error> {
    let subscriptions = subscriptions
        .iter()
        .map(|subscription| -> Result<Value, Error> {
            Ok(json!({
                "id": subscription.id,
                "blog_id": subscription.blog_id,
                "name": subscription.name(conn)?,
            }))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({
        "account": user,
        "subscriptions": subscriptions,
        "form": form,
        "errors": errors,
    }))
}

#[get("/subscriptions")]
pub async fn list(user: User, conn: DbConn) -> Result<Page, ErrorPage> {
    let page = conn
        .run(move |conn| -> Result<Value, Error> {
            let subscriptions = Subscription::find_for_user(conn, &user)?;
            subscriptions_page(
                conn,
                &user,
                &subscriptions,
                &UnsubscribeForm::default(),
                None,
            )
        })
        .await?;
    Ok(Json(page))
}

#[get("/subscriptions", rank = 2)]
pub fn list_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to manage your subscriptions",
        uri!(list),
    )
}

#[post("/subscriptions", data = "<form>")]
pub async fn unsubscribe(
    user: User,
    conn: DbConn,
    form: Form<Contextual<'_, UnsubscribeForm>>,
) -> Result<RespondOrRedirect, ErrorPage> {
    let (form, parsing) = form_value(form.into_inner(), "subscriptions");
    let response = conn
        .run(move |conn| -> Result<RespondOrRedirect, Error> {
            let subscriptions = Subscription::find_for_user(conn, &user)?;
            let choices = subscriptions.iter().map(|s| s.id).collect::<Vec<_>>();
            if let Err(errors) = parsing
                .and_then(|_| form.validate())
                .and_then(|_| check_choices("subscriptions", &form.subscriptions, &choices))
            {
                return Ok(invalid(subscriptions_page(
                    conn,
                    &user,
                    &subscriptions,
                    &form,
                    Some(errors),
                )?));
            }

            Subscription::unsubscribe(conn, &user, &form.subscriptions)?;
            Ok(Redirect::to(uri!(list)).into())
        })
        .await?;
    Ok(response)
}

#[post("/subscriptions", rank = 2)]
pub fn unsubscribe_auth() -> Flash<Redirect> {
    utils::requires_login(
        "You need to be logged in order to manage your subscriptions",
        uri!(list),
    )
}
