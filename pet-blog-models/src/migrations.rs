use crate::{Connection, Error, Result};
use tracing::info;

#[cfg(feature = "postgres")]
embed_migrations!("migrations/postgres");

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
embed_migrations!("migrations/sqlite");

/// Applies every bundled migration that was not run on this database yet.
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    info!("Running pending migrations");
    embedded_migrations::run(conn).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::db;

    #[test]
    fn migrations_are_idempotent() {
        let conn = db();
        // db() already ran them once
        run_pending_migrations(&conn).expect("Second run should be a no-op");
    }
}
