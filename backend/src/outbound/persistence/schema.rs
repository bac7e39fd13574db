//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. Relationship
//! sets are stored as `uuid[]` columns on the owning row so a document keeps
//! its embedded-array shape.

diesel::table! {
    /// User documents.
    ///
    /// `user_name` carries a unique index; the relationship arrays default to
    /// `'{}'` and never contain duplicates.
    users (id) {
        /// Primary key: UUID v4 identifier.
        id -> Uuid,
        /// Unique login handle.
        user_name -> Varchar,
        name -> Varchar,
        bio -> Nullable<Text>,
        profile_pic -> Nullable<Text>,
        cover_pic -> Nullable<Text>,
        is_admin -> Bool,
        /// Argon2id PHC string.
        password_hash -> Varchar,
        password_changed_at -> Nullable<Timestamptz>,
        /// Users following this user.
        followers -> Array<Uuid>,
        /// Users this user follows.
        followings -> Array<Uuid>,
        /// Groups this user has joined.
        my_groups -> Array<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Group documents with their member set.
    groups (id) {
        id -> Uuid,
        name -> Varchar,
        /// Users who joined the group.
        followers -> Array<Uuid>,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(users, groups);
