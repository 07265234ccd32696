use crate::{db_conn::DbConn, schema::users, Connection, Error, Result};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use rocket::{
    http::Status,
    outcome::{try_outcome, Outcome},
    request::{self, FromRequest, Request},
};
use std::fmt;

#[derive(Queryable, Identifiable, Clone, Debug, Serialize)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    pub creation_date: NaiveDateTime,
}

#[derive(Default, Insertable)]
#[table_name = "users"]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: Option<String>,
}

pub const AUTH_COOKIE: &str = "user_id";

impl User {
    insert!(users, NewUser);
    get!(users);
    find_by!(users, find_by_email, email as &str);
    find_by!(users, find_by_name, username as &str);

    pub fn hash_pass(pass: &str) -> Result<String> {
        bcrypt::hash(pass, 10).map_err(Error::from)
    }

    pub fn auth(&self, pass: &str) -> bool {
        self.hashed_password
            .as_ref()
            .map(|hash| bcrypt::verify(pass, hash).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Finds a user by email or username and checks their password.
    ///
    /// Every kind of failure is reported as `NotFound`, so callers can't tell
    /// unknown accounts from wrong passwords.
    pub fn login(conn: &Connection, ident: &str, password: &str) -> Result<User> {
        // Users without an email address have an empty one
        if ident.is_empty() {
            return Err(Error::NotFound);
        }
        let user = match User::find_by_email(conn, ident) {
            Ok(user) => user,
            Err(_) => User::find_by_name(conn, ident)?,
        };
        if user.auth(password) {
            Ok(user)
        } else {
            Err(Error::NotFound)
        }
    }

    pub fn set_password(&self, conn: &Connection, pass: &str) -> Result<()> {
        diesel::update(self)
            .set(users::hashed_password.eq(User::hash_pass(pass)?))
            .execute(conn)
            .map(|_| ())
            .map_err(Error::from)
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<User, ()> {
        let id = match request
            .cookies()
            .get_private(AUTH_COOKIE)
            .and_then(|cookie| cookie.value().parse::<i32>().ok())
        {
            Some(id) => id,
            None => return Outcome::Forward(Status::Unauthorized),
        };
        let conn = try_outcome!(request.guard::<DbConn>().await);
        match conn.run(move |conn| User::get(conn, id)).await {
            Ok(user) => Outcome::Success(user),
            Err(_) => Outcome::Forward(Status::Unauthorized),
        }
    }
}

impl NewUser {
    /// Creates a new local user
    ///
    /// Usernames are unique, and so are emails unless they are left empty.
    pub fn new_local(
        conn: &Connection,
        username: String,
        email: String,
        password: Option<String>,
    ) -> Result<User> {
        if User::find_by_name(conn, &username).is_ok()
            || (!email.is_empty() && User::find_by_email(conn, &email).is_ok())
        {
            return Err(Error::UserAlreadyExists);
        }
        let hashed_password = match password {
            Some(pass) => Some(User::hash_pass(&pass)?),
            None => None,
        };

        User::insert(
            conn,
            NewUser {
                username,
                email,
                hashed_password,
            },
        )
    }
}
