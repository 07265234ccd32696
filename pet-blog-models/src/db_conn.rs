use crate::{Connection, Result};
use diesel::r2d2::{
    ConnectionManager, CustomizeConnection, Error as ConnError, Pool, PooledConnection,
};
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
use diesel::{connection::SimpleConnection, ConnectionError};
use rocket::{
    http::Status,
    outcome::{try_outcome, Outcome},
    request::{self, FromRequest},
    tokio::{sync::Mutex, task},
    Request, State,
};
use std::sync::Arc;

pub type DbPool = Pool<ConnectionManager<Connection>>;

/// How long an SQLite connection waits for another one to release its write lock.
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Makes SQLite honor the `ON DELETE CASCADE` clauses. It is a per-connection setting.
#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
pub fn enable_foreign_keys(conn: &Connection) -> diesel::QueryResult<()> {
    conn.batch_execute("PRAGMA foreign_keys = ON;")
}

#[cfg(feature = "postgres")]
pub fn enable_foreign_keys(_conn: &Connection) -> diesel::QueryResult<()> {
    Ok(())
}

#[derive(Debug)]
pub struct PragmaForeignKey;
impl CustomizeConnection<Connection, ConnError> for PragmaForeignKey {
    #[cfg(all(feature = "sqlite", not(feature = "postgres")))] // will default to an empty function for postgres
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), ConnError> {
        enable_foreign_keys(conn).map_err(|_| {
            ConnError::ConnectionError(ConnectionError::BadConnection(String::from(
                "PRAGMA foreign_keys = on failed",
            )))
        })?;
        // Writers from other pooled connections queue instead of failing with "database is locked"
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", BUSY_TIMEOUT_MS))
            .map_err(|_| {
                ConnError::ConnectionError(ConnectionError::BadConnection(String::from(
                    "PRAGMA busy_timeout failed",
                )))
            })
    }
}

/// Builds the connection pool shared by all requests.
pub fn init_pool(database_url: &str, max_size: Option<u32>, min_idle: Option<u32>) -> Option<DbPool> {
    let manager = ConnectionManager::<Connection>::new(database_url);
    let mut builder = DbPool::builder()
        .connection_customizer(Box::new(PragmaForeignKey))
        .min_idle(min_idle);
    if let Some(max_size) = max_size {
        builder = builder.max_size(max_size);
    };
    builder.build(manager).ok()
}

// Connection request guard type: a wrapper around an r2d2 pooled connection.
//
// Diesel is blocking, so the connection is only used through `run`, which
// moves the work to a thread where blocking is allowed.
pub struct DbConn(Arc<Mutex<PooledConnection<ConnectionManager<Connection>>>>);

impl DbConn {
    /// Runs `f` with this connection on the blocking thread pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.0).lock_owned().await;
        task::spawn_blocking(move || f(&**conn)).await?
    }
}

/// Attempts to retrieve a single connection from the managed database pool. If
/// no pool is currently managed, fails with an `InternalServerError` status. If
/// no connections are available, fails with a `ServiceUnavailable` status.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for DbConn {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let pool = try_outcome!(request.guard::<&State<DbPool>>().await)
            .inner()
            .clone();
        // r2d2 may wait for a free connection
        match task::spawn_blocking(move || pool.get()).await {
            Ok(Ok(conn)) => Outcome::Success(DbConn(Arc::new(Mutex::new(conn)))),
            _ => Outcome::Error((Status::ServiceUnavailable, ())),
        }
    }
}
