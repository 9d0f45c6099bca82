// Table declarations for the catalog schema - internal use only.
// Kept in sync with migrations/2026-08-29-000001_create_catalog/up.sql.

diesel::table! {
    games (id) {
        id -> Integer,
        title -> Nullable<Text>,
        genre -> Nullable<Text>,
        platform -> Nullable<Text>,
        price -> Nullable<Integer>,
    }
}

diesel::table! {
    users (id) {
        id -> Integer,
        name -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    reviews (id) {
        id -> Integer,
        score -> Nullable<Integer>,
        comment -> Nullable<Text>,
        game_id -> Nullable<Integer>,
        user_id -> Nullable<Integer>,
    }
}

diesel::table! {
    user_games (user_id, game_id) {
        user_id -> Integer,
        game_id -> Integer,
    }
}

diesel::joinable!(reviews -> games (game_id));
diesel::joinable!(reviews -> users (user_id));
diesel::joinable!(user_games -> games (game_id));
diesel::joinable!(user_games -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(games, users, reviews, user_games);
