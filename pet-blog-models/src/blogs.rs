use crate::{
    posts::Post,
    schema::{blogs, subscriptions},
    users::User,
    Connection, Error, Result,
};
use diesel::{self, ExpressionMethods, QueryDsl, RunQueryDsl};

#[derive(Queryable, Identifiable, Clone, Debug, Serialize)]
pub struct Blog {
    pub id: i32,
    pub author_id: i32,
}

#[derive(Insertable)]
#[table_name = "blogs"]
pub struct NewBlog {
    pub author_id: i32,
}

impl Blog {
    insert!(blogs, NewBlog);
    get!(blogs);
    find_by!(blogs, find_by_author_id, author_id as i32);

    /// Opens the blog of `author`. Each author has at most one blog.
    pub fn create_for(conn: &Connection, author: &User) -> Result<Blog> {
        if Blog::find_by_author_id(conn, author.id).is_ok() {
            return Err(Error::BlogAlreadyExists);
        }
        Blog::insert(
            conn,
            NewBlog {
                author_id: author.id,
            },
        )
    }

    pub fn find_for_author(conn: &Connection, author: &User) -> Result<Blog> {
        Blog::find_by_author_id(conn, author.id)
    }

    /// The blogs `user` may subscribe to: not their own, and not one whose
    /// author they already follow.
    pub fn subscribable_by(conn: &Connection, user: &User) -> Result<Vec<Blog>> {
        let followed_authors = subscriptions::table
            .inner_join(blogs::table)
            .filter(subscriptions::user_id.eq(user.id))
            .select(blogs::author_id)
            .load::<i32>(conn)?;

        blogs::table
            .filter(blogs::author_id.ne(user.id))
            .filter(blogs::author_id.ne_all(followed_authors))
            .order_by(blogs::id.asc())
            .load::<Blog>(conn)
            .map_err(Error::from)
    }

    pub fn get_author(&self, conn: &Connection) -> Result<User> {
        User::get(conn, self.author_id)
    }

    /// How the blog is shown to readers: its author's username.
    pub fn name(&self, conn: &Connection) -> Result<String> {
        self.get_author(conn).map(|author| author.username)
    }

    pub fn get_posts(&self, conn: &Connection) -> Result<Vec<Post>> {
        Post::list_for_blog(conn, self.id)
    }

    pub fn delete(&self, conn: &Connection) -> Result<()> {
        diesel::delete(self)
            .execute(conn)
            .map(|_| ())
            .map_err(Error::from)
    }
}

impl PartialEq for Blog {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
