//! Catalog models: persisted rows, insertable records, and change sets.

use chrono::NaiveDateTime;
use derive_getters::Getters;
use derive_new::new;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema;

/// Game catalog row.
#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Getters, Serialize, Deserialize,
)]
#[diesel(table_name = schema::games)]
pub struct Game {
    id: i32,
    title: Option<String>,
    genre: Option<String>,
    platform: Option<String>,
    price: Option<i32>,
}

/// Insertable game record. The id is assigned by the store.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::games)]
pub struct NewGame {
    title: Option<String>,
    genre: Option<String>,
    platform: Option<String>,
    price: Option<i32>,
}

/// Partial update for a game. `None` fields are left untouched.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::games)]
pub struct GameChanges {
    /// New title, if changing.
    pub title: Option<String>,
    /// New genre, if changing.
    pub genre: Option<String>,
    /// New platform, if changing.
    pub platform: Option<String>,
    /// New price, if changing.
    pub price: Option<i32>,
}

impl GameChanges {
    /// True when no field is being changed.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.genre.is_none()
            && self.platform.is_none()
            && self.price.is_none()
    }
}

/// User account row.
///
/// `created_at` and `updated_at` are owned by the persistence layer: both
/// are stamped on insert and `updated_at` is reset on every update.
#[derive(
    Debug, Clone, PartialEq, Queryable, Identifiable, Selectable, Getters, Serialize, Deserialize,
)]
#[diesel(table_name = schema::users)]
pub struct User {
    id: i32,
    name: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

/// Insertable user record. Timestamps are supplied by the repository,
/// not the caller.
#[derive(Debug, Clone, Insertable, new)]
#[diesel(table_name = schema::users)]
pub struct NewUser {
    name: Option<String>,
}

/// Partial update for a user. `None` fields are left untouched;
/// `updated_at` is bumped by the repository regardless.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::users)]
pub struct UserChanges {
    /// New display name, if changing.
    pub name: Option<String>,
}

/// Review row linking one user to one game with a score and comment.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Queryable,
    Identifiable,
    Associations,
    Selectable,
    Getters,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = schema::reviews)]
#[diesel(belongs_to(Game))]
#[diesel(belongs_to(User))]
pub struct Review {
    id: i32,
    score: Option<i32>,
    comment: Option<String>,
    game_id: Option<i32>,
    user_id: Option<i32>,
}

/// Insertable review record.
///
/// The foreign keys are nullable at declaration, but when set they must
/// reference existing rows or the insert fails with a constraint violation.
#[derive(Debug, Clone, Insertable, Getters, new)]
#[diesel(table_name = schema::reviews)]
pub struct NewReview {
    score: Option<i32>,
    comment: Option<String>,
    game_id: Option<i32>,
    user_id: Option<i32>,
}

/// Partial update for a review. Only score and comment are editable;
/// the foreign keys are fixed at creation.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = schema::reviews)]
pub struct ReviewChanges {
    /// New score, if changing.
    pub score: Option<i32>,
    /// New comment, if changing.
    pub comment: Option<String>,
}

impl ReviewChanges {
    /// True when no field is being changed.
    pub fn is_empty(&self) -> bool {
        self.score.is_none() && self.comment.is_none()
    }
}

/// User-game association row. Pure link, no payload.
#[derive(
    Debug, Clone, PartialEq, Queryable, Insertable, Selectable, Getters, new, Serialize, Deserialize,
)]
#[diesel(table_name = schema::user_games)]
pub struct UserGame {
    user_id: i32,
    game_id: i32,
}
