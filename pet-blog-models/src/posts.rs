use crate::{
    blogs::Blog,
    feeds::{Feed, NewFeed},
    notifier::Notifier,
    schema::{blogs, posts},
    subscriptions::Subscription,
    users::User,
    Connection, Error, Result,
};
use chrono::NaiveDateTime;
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::fmt;
use tracing::{error, info_span, warn};

pub const TITLE_MAX_LENGTH: u64 = 255;
pub const CONTENT_MAX_LENGTH: u64 = 10_000;

/// Subject of the email sent to subscribers when a post is published.
pub const NEW_POST_SUBJECT: &str = "New post";
/// Body of the email sent to subscribers when a post is published.
pub const NEW_POST_BODY: &str = "You have a new post in your feed.";

#[derive(Queryable, Identifiable, Clone, Debug, Serialize)]
pub struct Post {
    pub id: i32,
    pub blog_id: i32,
    pub title: String,
    pub content: String,
    pub posted: NaiveDateTime,
}

#[derive(Insertable)]
#[table_name = "posts"]
pub struct NewPost {
    pub blog_id: i32,
    pub title: String,
    pub content: String,
}

impl Post {
    insert!(posts, NewPost);
    get!(posts);

    /// Every post, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<Post>> {
        posts::table
            .order_by((posts::posted.desc(), posts::id.desc()))
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn list_for_blog(conn: &Connection, blog_id: i32) -> Result<Vec<Post>> {
        posts::table
            .filter(posts::blog_id.eq(blog_id))
            .order_by((posts::posted.desc(), posts::id.desc()))
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn find_for_author(conn: &Connection, author: &User) -> Result<Vec<Post>> {
        posts::table
            .inner_join(blogs::table)
            .filter(blogs::author_id.eq(author.id))
            .order_by((posts::posted.desc(), posts::id.desc()))
            .select(posts::all_columns)
            .load::<Post>(conn)
            .map_err(Error::from)
    }

    pub fn get_blog(&self, conn: &Connection) -> Result<Blog> {
        Blog::get(conn, self.blog_id)
    }

    pub fn get_author(&self, conn: &Connection) -> Result<User> {
        self.get_blog(conn)?.get_author(conn)
    }

    /// Delivers this post to everyone subscribed to its blog.
    ///
    /// Each subscriber gets a feed entry, then an email. Feed entries are
    /// written one by one, so an entry stays even if a later step fails.
    /// Emails are best effort: failures are logged and never returned.
    pub fn fan_out(&self, conn: &Connection, notifier: &dyn Notifier) -> Result<Vec<Feed>> {
        let span = info_span!("fan_out", post = self.id);
        let _enter = span.enter();

        let mut feeds = vec![];
        for subscription in Subscription::find_for_blog(conn, self.blog_id)? {
            let subscriber = subscription.get_user(conn)?;
            feeds.push(Feed::insert(
                conn,
                NewFeed {
                    user_id: subscriber.id,
                    post_id: self.id,
                    subscription_id: subscription.id,
                },
            )?);

            if subscriber.email.is_empty() {
                warn!(subscriber = %subscriber, "Subscriber has no email address, not notifying them");
                continue;
            }
            if let Err(e) = notifier.notify(&subscriber.email, NEW_POST_SUBJECT, NEW_POST_BODY) {
                error!(subscriber = %subscriber, error = %e, "Unable to send email to {}: {}", subscriber, e);
            }
        }
        Ok(feeds)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self)
            .execute(conn)
            .map(|_| ())
            .map_err(Error::from)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}
