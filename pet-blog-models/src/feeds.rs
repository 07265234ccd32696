use crate::{
    posts::Post,
    schema::{feeds, posts},
    users::User,
    Connection, Error, Result,
};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

/// A post delivered to one of the subscribers of its blog.
#[derive(Queryable, Identifiable, Clone, Debug, PartialEq, Serialize)]
pub struct Feed {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    pub subscription_id: i32,
    pub is_read: bool,
}

#[derive(Insertable)]
#[table_name = "feeds"]
pub struct NewFeed {
    pub user_id: i32,
    pub post_id: i32,
    pub subscription_id: i32,
}

impl Feed {
    insert!(feeds, NewFeed);
    get!(feeds);

    pub fn insert_many(conn: &Connection, new: &[NewFeed]) -> Result<usize> {
        if new.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(feeds::table)
            .values(new)
            .execute(conn)
            .map_err(Error::from)
    }

    /// All the feed entries of `user`, newest post first.
    pub fn find_for_user(conn: &Connection, user: &User) -> Result<Vec<Feed>> {
        feeds::table
            .inner_join(posts::table)
            .filter(feeds::user_id.eq(user.id))
            .order_by((posts::posted.desc(), posts::id.desc()))
            .select(feeds::all_columns)
            .load::<Feed>(conn)
            .map_err(Error::from)
    }

    pub fn unread_for_user(conn: &Connection, user: &User) -> Result<Vec<Feed>> {
        feeds::table
            .inner_join(posts::table)
            .filter(feeds::user_id.eq(user.id))
            .filter(feeds::is_read.eq(false))
            .order_by((posts::posted.desc(), posts::id.desc()))
            .select(feeds::all_columns)
            .load::<Feed>(conn)
            .map_err(Error::from)
    }

    /// Marks the entries listed in `ids` as read, in a single statement.
    ///
    /// Only entries of `user` are changed. Marking an entry twice is harmless.
    pub fn mark_read(conn: &Connection, user: &User, ids: &[i32]) -> Result<usize> {
        diesel::update(
            feeds::table
                .filter(feeds::user_id.eq(user.id))
                .filter(feeds::id.eq_any(ids)),
        )
        .set(feeds::is_read.eq(true))
        .execute(conn)
        .map_err(Error::from)
    }

    pub fn get_post(&self, conn: &Connection) -> Result<Post> {
        Post::get(conn, self.post_id)
    }

    pub fn name(&self, conn: &Connection) -> Result<String> {
        self.get_post(conn).map(|post| post.title)
    }
}
