use crate::{
    blogs::Blog,
    feeds::{Feed, NewFeed},
    schema::subscriptions,
    users::User,
    Connection, Error, Result,
};
use diesel::{self, Connection as _, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Queryable, Identifiable, Clone, Debug, PartialEq, Serialize)]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub blog_id: i32,
}

#[derive(Insertable)]
#[table_name = "subscriptions"]
pub struct NewSubscription {
    pub user_id: i32,
    pub blog_id: i32,
}

impl Subscription {
    insert!(subscriptions, NewSubscription);
    get!(subscriptions);
    find_by!(subscriptions, find, user_id as i32, blog_id as i32);
    list_by!(subscriptions, find_for_blog, blog_id as i32);

    pub fn find_for_user(conn: &Connection, user: &User) -> Result<Vec<Subscription>> {
        subscriptions::table
            .filter(subscriptions::user_id.eq(user.id))
            .order_by(subscriptions::id.asc())
            .load::<Subscription>(conn)
            .map_err(Error::from)
    }

    /// Subscribes `user` to each of `blogs`, and puts every post they already
    /// have in the user's feed.
    ///
    /// Nothing is saved if any of the subscriptions fails.
    pub fn subscribe(conn: &Connection, user: &User, blogs: &[Blog]) -> Result<Vec<Subscription>> {
        conn.transaction::<_, Error, _>(|| {
            let mut created = Vec::with_capacity(blogs.len());
            for blog in blogs {
                let subscription = Subscription::insert(
                    conn,
                    NewSubscription {
                        user_id: user.id,
                        blog_id: blog.id,
                    },
                )?;
                let backlog = blog
                    .get_posts(conn)?
                    .into_iter()
                    .map(|post| NewFeed {
                        user_id: user.id,
                        post_id: post.id,
                        subscription_id: subscription.id,
                    })
                    .collect::<Vec<_>>();
                Feed::insert_many(conn, &backlog)?;
                created.push(subscription);
            }
            Ok(created)
        })
    }

    /// Deletes the subscriptions of `user` listed in `ids`, along with the
    /// feed entries they produced. Ids belonging to someone else are ignored.
    pub fn unsubscribe(conn: &Connection, user: &User, ids: &[i32]) -> Result<usize> {
        diesel::delete(
            subscriptions::table
                .filter(subscriptions::user_id.eq(user.id))
                .filter(subscriptions::id.eq_any(ids)),
        )
        .execute(conn)
        .map_err(Error::from)
    }

    pub fn get_blog(&self, conn: &Connection) -> Result<Blog> {
        Blog::get(conn, self.blog_id)
    }

    pub fn get_user(&self, conn: &Connection) -> Result<User> {
        User::get(conn, self.user_id)
    }

    /// Subscriptions are shown as the blog they point to.
    pub fn name(&self, conn: &Connection) -> Result<String> {
        self.get_blog(conn)?.name(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{posts::tests as post_tests, tests::db};
    use diesel::Connection;

    #[test]
    fn subscribe_backfills_feed() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, blogs, posts) = post_tests::fill_database(&conn);

            let created =
                Subscription::subscribe(&conn, &users[0], &[blogs[1].clone(), blogs[2].clone()])
                    .unwrap();
            assert_eq!(created.len(), 2);
            assert_eq!(created[0].blog_id, blogs[1].id);
            assert_eq!(created[1].blog_id, blogs[2].id);
            assert_eq!(Subscription::find_for_user(&conn, &users[0]).unwrap(), created);

            let feeds = Feed::find_for_user(&conn, &users[0]).unwrap();
            assert_eq!(feeds.len(), 3);
            assert!(feeds.iter().all(|f| !f.is_read));
            let mut post_ids = feeds.iter().map(|f| f.post_id).collect::<Vec<_>>();
            post_ids.sort_unstable();
            assert_eq!(post_ids, vec![posts[0].id, posts[1].id, posts[2].id]);

            let on_blog3 = feeds.iter().filter(|f| f.subscription_id == created[1].id).count();
            assert_eq!(on_blog3, 2);
            Ok(())
        });
    }

    #[test]
    fn subscribe_to_empty_blog() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, blogs, _) = post_tests::fill_database(&conn);
            let created = Subscription::subscribe(&conn, &users[1], &[blogs[0].clone()]).unwrap();
            assert_eq!(created.len(), 1);
            assert!(Feed::find_for_user(&conn, &users[1]).unwrap().is_empty());
            assert_eq!(created[0].name(&conn).unwrap(), "User1");
            Ok(())
        });
    }

    #[test]
    fn subscribe_is_all_or_nothing() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, blogs, _) = post_tests::fill_database(&conn);
            Subscription::subscribe(&conn, &users[0], &[blogs[1].clone()]).unwrap();

            // Blog 3 would be fine, but the second subscription to blog 2 is refused
            assert!(Subscription::subscribe(
                &conn,
                &users[0],
                &[blogs[2].clone(), blogs[1].clone()]
            )
            .is_err());

            assert_eq!(Subscription::find_for_user(&conn, &users[0]).unwrap().len(), 1);
            assert!(matches!(
                Subscription::find(&conn, users[0].id, blogs[2].id),
                Err(Error::NotFound)
            ));
            assert_eq!(Feed::find_for_user(&conn, &users[0]).unwrap().len(), 1);
            Ok(())
        });
    }

    #[test]
    fn unsubscribe() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, blogs, posts) = post_tests::fill_database(&conn);
            let mine =
                Subscription::subscribe(&conn, &users[0], &[blogs[1].clone(), blogs[2].clone()])
                    .unwrap();
            let theirs = Subscription::subscribe(&conn, &users[1], &[blogs[2].clone()]).unwrap();

            // Someone else's subscription id is not touched
            assert_eq!(
                Subscription::unsubscribe(&conn, &users[0], &[mine[1].id, theirs[0].id]).unwrap(),
                1
            );

            assert_eq!(Subscription::find_for_user(&conn, &users[0]).unwrap(), vec![mine[0].clone()]);
            let feeds = Feed::find_for_user(&conn, &users[0]).unwrap();
            assert_eq!(feeds.len(), 1);
            assert_eq!(feeds[0].post_id, posts[0].id);

            assert_eq!(Subscription::find_for_user(&conn, &users[1]).unwrap(), theirs);
            assert_eq!(Feed::find_for_user(&conn, &users[1]).unwrap().len(), 2);
            Ok(())
        });
    }

    #[test]
    fn relations() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            let (users, blogs, _) = post_tests::fill_database(&conn);
            let sub = Subscription::subscribe(&conn, &users[2], &[blogs[0].clone()]).unwrap();
            assert_eq!(sub[0].get_user(&conn).unwrap(), users[2]);
            assert_eq!(sub[0].get_blog(&conn).unwrap(), blogs[0]);
            assert_eq!(
                Subscription::find_for_blog(&conn, blogs[0].id).unwrap(),
                sub
            );
            Ok(())
        });
    }
}
