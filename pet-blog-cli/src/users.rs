use clap::{App, Arg, ArgMatches, SubCommand};

use diesel::Connection as _;
use pet_blog_models::{
    blogs::Blog,
    users::{NewUser, User},
    Connection, Error,
};
use std::io::{self, Write};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("users")
        .about("Manage users")
        .subcommand(
            SubCommand::with_name("new")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .alias("username")
                        .takes_value(true)
                        .help("The username of the new user"),
                )
                .arg(
                    Arg::with_name("email")
                        .short("e")
                        .long("email")
                        .takes_value(true)
                        .help("Email address of the new user"),
                )
                .arg(
                    Arg::with_name("password")
                        .short("p")
                        .long("password")
                        .takes_value(true)
                        .help("The password of the new user"),
                )
                .arg(
                    Arg::with_name("no-blog")
                        .long("no-blog")
                        .help("Don't open a blog for the new user"),
                )
                .about("Create a new user"),
        )
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("new", Some(x)) => new(x, conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn new<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let username = args
        .value_of("name")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Username"));
    let email = args
        .value_of("email")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Email address"));
    let password = args
        .value_of("password")
        .map(String::from)
        .unwrap_or_else(|| {
            print!("Password: ");
            io::stdout().flush().expect("Couldn't flush STDOUT");
            rpassword::read_password().expect("Couldn't read your password.")
        });

    let (user, blog) = create(
        conn,
        username,
        email,
        password,
        !args.is_present("no-blog"),
    )
    .expect("Couldn't save new user");
    println!("User {} created", user);
    if let Some(blog) = blog {
        println!("Blog {} opened for {}", blog.id, user);
    }
}

/// Saves a user, and their blog if `with_blog` is set. Neither is kept if one fails.
fn create(
    conn: &Connection,
    username: String,
    email: String,
    password: String,
    with_blog: bool,
) -> Result<(User, Option<Blog>), Error> {
    conn.transaction::<_, Error, _>(|| {
        let user = NewUser::new_local(conn, username, email, Some(password))?;
        let blog = if with_blog {
            Some(Blog::create_for(conn, &user)?)
        } else {
            None
        };
        Ok((user, blog))
    })
}

#[cfg(all(test, feature = "sqlite", not(feature = "postgres")))]
mod tests {
    use super::*;
    use diesel::Connection as _;
    use pet_blog_models::{
        db_conn::enable_foreign_keys, migrations::run_pending_migrations, Connection,
    };

    fn db() -> Connection {
        let conn = Connection::establish(":memory:").unwrap();
        enable_foreign_keys(&conn).unwrap();
        run_pending_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn create_with_blog() {
        let conn = db();
        let (user, blog) = create(
            &conn,
            "Admin".to_owned(),
            "admin@example.com".to_owned(),
            "password".to_owned(),
            true,
        )
        .unwrap();
        assert_eq!(blog.unwrap().author_id, user.id);
        assert_eq!(Blog::find_for_author(&conn, &user).unwrap().author_id, user.id);
    }

    #[test]
    fn create_without_blog() {
        let conn = db();
        let (user, blog) = create(
            &conn,
            "Reader".to_owned(),
            String::new(),
            "password".to_owned(),
            false,
        )
        .unwrap();
        assert!(blog.is_none());
        assert!(Blog::find_for_author(&conn, &user).is_err());
    }

    #[test]
    fn failed_creation_saves_nothing() {
        let conn = db();
        create(
            &conn,
            "Admin".to_owned(),
            "admin@example.com".to_owned(),
            "password".to_owned(),
            true,
        )
        .unwrap();
        assert!(create(
            &conn,
            "Other".to_owned(),
            "admin@example.com".to_owned(),
            "password".to_owned(),
            true,
        )
        .is_err());
        assert!(User::find_by_name(&conn, "Other").is_err());
    }
}
