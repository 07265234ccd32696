use diesel::Connection;
use pet_blog_models::{
    blogs::Blog,
    db_conn::enable_foreign_keys,
    feeds::Feed,
    migrations::run_pending_migrations,
    notifier::Outbox,
    posts::{NewPost, Post},
    subscriptions::Subscription,
    users::{NewUser, User},
    Connection as Conn,
};

#[cfg(feature = "postgres")]
fn database_url() -> &'static str {
    pet_blog_models::CONFIG.database_url.as_str()
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
fn database_url() -> &'static str {
    ":memory:"
}

fn db() -> Conn {
    let conn = Conn::establish(database_url()).expect("Couldn't connect to the database");
    enable_foreign_keys(&conn).expect("Couldn't enable foreign keys");
    run_pending_migrations(&conn).expect("Couldn't run migrations");
    conn
}

fn author(conn: &Conn, name: &str) -> (User, Blog) {
    let user = NewUser::new_local(
        conn,
        name.to_owned(),
        format!("{}@example.com", name.to_lowercase()),
        None,
    )
    .unwrap();
    let blog = Blog::create_for(conn, &user).unwrap();
    (user, blog)
}

fn publish(conn: &Conn, blog: &Blog, title: &str, content: &str, outbox: &Outbox) -> Post {
    let post = Post::insert(
        conn,
        NewPost {
            blog_id: blog.id,
            title: title.to_owned(),
            content: content.to_owned(),
        },
    )
    .unwrap();
    post.fan_out(conn, outbox).unwrap();
    post
}

#[test]
fn subscribing_brings_existing_posts() {
    let conn = &db();
    conn.test_transaction::<_, (), _>(|| {
        let outbox = Outbox::new();
        let (user1, _) = author(conn, "User1");
        let (_, blog2) = author(conn, "User2");
        publish(conn, &blog2, "Hello", "World", &outbox);
        let unread_before = Feed::unread_for_user(conn, &user1).unwrap().len();

        let candidates = Blog::subscribable_by(conn, &user1).unwrap();
        assert_eq!(candidates, vec![blog2.clone()]);
        Subscription::subscribe(conn, &user1, &candidates).unwrap();

        assert_eq!(Subscription::find_for_user(conn, &user1).unwrap().len(), 1);
        assert_eq!(Feed::find_for_user(conn, &user1).unwrap().len(), 1);
        assert_eq!(
            Feed::unread_for_user(conn, &user1).unwrap().len(),
            unread_before + 1
        );
        assert!(Blog::subscribable_by(conn, &user1).unwrap().is_empty());
        // Backfilling never sends emails
        assert_eq!(outbox.attempts(), 0);
        Ok(())
    });
}

#[test]
fn publishing_reaches_subscribers() {
    let conn = &db();
    conn.test_transaction::<_, (), _>(|| {
        let outbox = Outbox::new();
        let (user1, blog1) = author(conn, "User1");
        let (user2, _) = author(conn, "User2");
        Subscription::subscribe(conn, &user2, &[blog1.clone()]).unwrap();

        let post = publish(conn, &blog1, "Test post", "Test content", &outbox);

        assert_eq!(Post::get(conn, post.id).unwrap().title, "Test post");
        assert_eq!(Post::find_for_author(conn, &user1).unwrap().len(), 1);
        let feeds = Feed::find_for_user(conn, &user2).unwrap();
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].post_id, post.id);
        assert_eq!(outbox.attempts(), 1);
        assert_eq!(outbox.sent()[0].to, "user2@example.com");
        Ok(())
    });
}

#[test]
fn read_then_unsubscribe() {
    let conn = &db();
    conn.test_transaction::<_, (), _>(|| {
        let outbox = Outbox::new();
        let (user1, _) = author(conn, "User1");
        let (_, blog2) = author(conn, "User2");
        let (_, blog3) = author(conn, "User3");
        let subscriptions =
            Subscription::subscribe(conn, &user1, &[blog2.clone(), blog3.clone()]).unwrap();
        publish(conn, &blog2, "From two", "", &outbox);
        publish(conn, &blog3, "From three", "", &outbox);

        let unread = Feed::unread_for_user(conn, &user1).unwrap();
        assert_eq!(unread.len(), 2);
        let ids = unread.iter().map(|f| f.id).collect::<Vec<_>>();
        Feed::mark_read(conn, &user1, &ids).unwrap();
        Feed::mark_read(conn, &user1, &ids).unwrap();
        assert!(Feed::unread_for_user(conn, &user1).unwrap().is_empty());

        Subscription::unsubscribe(conn, &user1, &[subscriptions[0].id]).unwrap();
        let left = Feed::find_for_user(conn, &user1).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name(conn).unwrap(), "From three");
        assert_eq!(Blog::subscribable_by(conn, &user1).unwrap(), vec![blog2]);
        Ok(())
    });
}

#[cfg(all(feature = "sqlite", not(feature = "postgres")))]
#[test]
fn concurrent_writers() {
    use pet_blog_models::db_conn::init_pool;
    use std::thread;

    let path = std::env::temp_dir().join(format!(
        "pet-blog-concurrent-writers-{}.sqlite",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);
    let pool = init_pool(&path.to_string_lossy(), Some(4), None).expect("Couldn't create the pool");
    run_pending_migrations(&pool.get().unwrap()).unwrap();

    let writers = (0..4)
        .map(|n| {
            let pool = pool.clone();
            thread::spawn(move || {
                let conn = pool.get().unwrap();
                let (_, blog) = author(&conn, &format!("Writer{}", n));
                for i in 0..50 {
                    let title = format!("Post {} by writer {}", i, n);
                    let post = Post::insert(
                        &conn,
                        NewPost {
                            blog_id: blog.id,
                            title: title.clone(),
                            content: String::new(),
                        },
                    )
                    .unwrap();
                    // Each insert returns its own row, not one written meanwhile by another thread
                    assert_eq!(post.blog_id, blog.id);
                    assert_eq!(post.title, title);
                }
            })
        })
        .collect::<Vec<_>>();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(Post::list(&pool.get().unwrap()).unwrap().len(), 200);
    let _ = std::fs::remove_file(&path);
}
