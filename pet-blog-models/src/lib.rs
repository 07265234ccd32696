#![allow(clippy::new_ret_no_self)]

#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("Either feature \"sqlite\" or \"postgres\" must be enabled for this crate.");

#[cfg(feature = "postgres")]
pub type Connection = diesel::PgConnection;

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub type Connection = diesel::SqliteConnection;

/// All the errors that can be encountered in this crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Db(#[source] diesel::result::Error),
    #[error("couldn't get a database connection: {0}")]
    DbPool(#[from] diesel::r2d2::PoolError),
    #[error("a blocking task failed: {0}")]
    Blocking(#[from] rocket::tokio::task::JoinError),
    #[error("migration failed: {0}")]
    Migration(#[from] diesel_migrations::RunMigrationsError),
    #[error("not found")]
    NotFound,
    #[error("password hashing failed: {0}")]
    Password(#[from] bcrypt::BcryptError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("this user already exists")]
    UserAlreadyExists,
    #[error("this user already has a blog")]
    BlogAlreadyExists,
}

impl From<diesel::result::Error> for Error {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Error::NotFound,
            err => Error::Db(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Adds a function to a model, that returns the first
/// matching row for a given list of fields.
///
/// Usage:
///
/// ```rust,ignore
/// impl Model {
///     find_by!(model_table, name_of_the_function, field1 as String, field2 as i32);
/// }
///
/// // Get the Model with field1 == "", and field2 == 0
/// Model::name_of_the_function(connection, String::new(), 0);
/// ```
macro_rules! find_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        /// Try to find a $table with a given $col
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Self> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// List all rows of a model, with field-based filtering.
///
/// Usage:
///
/// ```rust,ignore
/// impl Model {
///     list_by!(model_table, name_of_the_function, field1 as String);
/// }
///
/// // To get all Models with field1 == ""
/// Model::name_of_the_function(connection, String::new());
/// ```
macro_rules! list_by {
    ($table:ident, $fn:ident, $($col:ident as $type:ty),+) => {
        /// Try to find a $table with a given $col
        pub fn $fn(conn: &crate::Connection, $($col: $type),+) -> Result<Vec<Self>> {
            $table::table
                $(.filter($table::$col.eq($col)))+
                .load::<Self>(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to retrieve a row by ID
///
/// # Usage
///
/// ```rust,ignore
/// impl Model {
///     get!(model_table);
/// }
///
/// // Get the Model with ID 1
/// Model::get(connection, 1);
/// ```
macro_rules! get {
    ($table:ident) => {
        pub fn get(conn: &crate::Connection, id: i32) -> Result<Self> {
            $table::table
                .filter($table::id.eq(id))
                .first(conn)
                .map_err(Error::from)
        }
    };
}

/// Adds a function to a model to insert a new row
///
/// # Usage
///
/// ```rust,ignore
/// impl Model {
///     insert!(model_table, NewModelType);
/// }
///
/// // Insert a new row
/// Model::insert(connection, NewModelType::new());
/// ```
macro_rules! insert {
    ($table:ident, $from:ty) => {
        last!($table);

        #[cfg(feature = "postgres")]
        pub fn insert(conn: &crate::Connection, new: $from) -> Result<Self> {
            diesel::insert_into($table::table)
                .values(new)
                .get_result(conn)
                .map_err(Error::from)
        }

        // SQLite has no RETURNING clause. The write lock is held until the
        // transaction ends, so the last row is the one we just wrote.
        #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
        pub fn insert(conn: &crate::Connection, new: $from) -> Result<Self> {
            use diesel::Connection as _;
            conn.transaction::<_, Error, _>(|| {
                diesel::insert_into($table::table)
                    .values(new)
                    .execute(conn)?;
                Self::last(conn)
            })
        }
    };
}

/// Returns the last row of a table.
///
/// # Usage
///
/// ```rust,ignore
/// impl Model {
///     last!(model_table);
/// }
///
/// // Get the last Model
/// Model::last(connection)
/// ```
macro_rules! last {
    ($table:ident) => {
        #[allow(dead_code)]
        pub fn last(conn: &crate::Connection) -> Result<Self> {
            $table::table
                .order_by($table::id.desc())
                .first(conn)
                .map_err(Error::from)
        }
    };
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::{db_conn, migrations, Connection as Conn};
    use diesel::Connection;

    #[cfg(feature = "postgres")]
    fn database_url() -> &'static str {
        crate::CONFIG.database_url.as_str()
    }

    #[cfg(all(feature = "sqlite", not(feature = "postgres")))]
    fn database_url() -> &'static str {
        ":memory:"
    }

    pub fn db() -> Conn {
        let conn = Conn::establish(database_url()).expect("Couldn't connect to the database");
        db_conn::enable_foreign_keys(&conn).expect("Couldn't enable foreign keys");
        migrations::run_pending_migrations(&conn).expect("Couldn't run migrations");
        conn
    }
}

pub mod blogs;
pub mod config;
pub mod db_conn;
pub mod feeds;
pub mod migrations;
pub mod notifier;
pub mod posts;
pub mod schema;
pub mod subscriptions;
pub mod users;

pub use config::CONFIG;
