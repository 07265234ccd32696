#[macro_use]
extern crate rocket;
#[macro_use]
extern crate serde_json;

use pet_blog_models::{
    db_conn::{self, DbPool},
    migrations::run_pending_migrations,
    notifier::Notifier,
    CONFIG,
};
use rocket::{figment::Figment, Build, Rocket};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod mail;
mod routes;

/// Initializes a database pool, and brings its schema up to date.
fn init_pool() -> Option<DbPool> {
    let pool = db_conn::init_pool(&CONFIG.database_url, CONFIG.db_max_size, CONFIG.db_min_idle)?;
    let conn = pool.get().ok()?;
    if let Err(e) = run_pending_migrations(&conn) {
        error!("Couldn't run migrations: {}", e);
        return None;
    }
    Some(pool)
}

pub fn build_rocket(figment: Figment, pool: DbPool, notifier: Box<dyn Notifier>) -> Rocket<Build> {
    rocket::custom(figment)
        .mount(
            "/",
            routes![
                routes::posts::index,
                routes::posts::details,
                routes::posts::mine,
                routes::posts::mine_auth,
                routes::posts::create,
                routes::posts::create_auth,
                routes::feed::unread,
                routes::feed::unread_auth,
                routes::feed::mark_read,
                routes::feed::mark_read_auth,
                routes::blogs::subscribable,
                routes::blogs::subscribable_auth,
                routes::blogs::subscribe,
                routes::blogs::subscribe_auth,
                routes::subscriptions::list,
                routes::subscriptions::list_auth,
                routes::subscriptions::unsubscribe,
                routes::subscriptions::unsubscribe_auth,
                routes::session::new,
                routes::session::create,
                routes::session::delete,
            ],
        )
        .register(
            "/",
            catchers![
                routes::errors::not_found,
                routes::errors::unprocessable_entity,
                routes::errors::server_error,
            ],
        )
        .manage(pool)
        .manage(Arc::<dyn Notifier>::from(notifier))
}

#[rocket::main]
async fn main() {
    let dotenv = dotenv::dotenv();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("main: setting the tracing subscriber failed");
    match dotenv {
        Ok(path) => info!("Configuration read from {}", path.display()),
        Err(ref e) if e.not_found() => info!("no .env was found"),
        e => e.map(|_| ()).expect("Couldn't read the .env file"),
    }

    let pool = init_pool().expect("main: database pool initialization error");
    let notifier: Box<dyn Notifier> = Box::new(mail::init());
    if let Err(e) = build_rocket(CONFIG.rocket.clone(), pool, notifier)
        .launch()
        .await
    {
        error!("Couldn't launch: {}", e);
        std::process::exit(1);
    }
}
