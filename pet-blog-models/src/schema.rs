table! {
    blogs (id) {
        id -> Int4,
        author_id -> Int4,
    }
}

table! {
    feeds (id) {
        id -> Int4,
        user_id -> Int4,
        post_id -> Int4,
        subscription_id -> Int4,
        is_read -> Bool,
    }
}

table! {
    posts (id) {
        id -> Int4,
        blog_id -> Int4,
        title -> Varchar,
        content -> Text,
        posted -> Timestamp,
    }
}

table! {
    subscriptions (id) {
        id -> Int4,
        user_id -> Int4,
        blog_id -> Int4,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Text,
        hashed_password -> Nullable<Text>,
        creation_date -> Timestamp,
    }
}

joinable!(blogs -> users (author_id));
joinable!(feeds -> posts (post_id));
joinable!(feeds -> subscriptions (subscription_id));
joinable!(feeds -> users (user_id));
joinable!(posts -> blogs (blog_id));
joinable!(subscriptions -> blogs (blog_id));
joinable!(subscriptions -> users (user_id));

allow_tables_to_appear_in_same_query!(blogs, feeds, posts, subscriptions, users,);
