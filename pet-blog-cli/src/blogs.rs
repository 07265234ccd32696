use clap::{App, Arg, ArgMatches, SubCommand};

use pet_blog_models::{blogs::Blog, users::User, Connection};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("blogs")
        .about("Manage blogs")
        .subcommand(
            SubCommand::with_name("new")
                .arg(
                    Arg::with_name("author")
                        .short("a")
                        .long("author")
                        .takes_value(true)
                        .help("The username of the author of the blog"),
                )
                .about("Open the blog of an existing user"),
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
        .value_of("author")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Author"));
    let author = User::find_by_name(conn, &username).expect("This user doesn't exist");
    let blog = Blog::create_for(conn, &author).expect("Couldn't create the blog");
    println!("Blog {} opened for {}", blog.id, author);
}
