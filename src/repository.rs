//! Persistence interface for the game-review catalog.
//!
//! One method per logical operation; each opens its own connection and runs
//! as a single atomic unit against SQLite. Relationship reads are explicit
//! queries backed by the foreign keys, so repeated resolution always
//! reflects the current persisted state.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{debug, info, instrument};

use crate::error::DbError;
use crate::models::{
    Game, GameChanges, NewGame, NewReview, NewUser, Review, ReviewChanges, User, UserChanges,
    UserGame,
};
use crate::naming::fk_constraint_name;
use crate::schema;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Repository exposing entity CRUD, relationship traversal, and the
/// user-game association over a SQLite database.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db_path: String,
}

impl CatalogRepository {
    /// Creates a repository for the database at the given path.
    ///
    /// Use `":memory:"` for an in-memory database (useful for tests, though
    /// note each operation opens a fresh connection, so a file path is
    /// usually what you want).
    #[instrument(skip(db_path), fields(db_path = %db_path))]
    pub fn new(db_path: String) -> Self {
        info!(path = %db_path, "Creating CatalogRepository");
        Self { db_path }
    }

    /// Establishes a connection with foreign-key enforcement on.
    #[instrument(skip(self))]
    fn connection(&self) -> Result<SqliteConnection, DbError> {
        debug!(path = %self.db_path, "Establishing connection");
        let mut conn = SqliteConnection::establish(&self.db_path).map_err(|e| {
            DbError::Connection {
                message: format!("failed to connect to '{}': {}", self.db_path, e),
            }
        })?;
        // SQLite ships with foreign-key enforcement off per connection.
        conn.batch_execute("PRAGMA foreign_keys = ON")?;
        Ok(conn)
    }

    /// Applies any pending embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a migration fails to apply.
    #[instrument(skip(self))]
    pub fn run_migrations(&self) -> Result<(), DbError> {
        let mut conn = self.connection()?;
        let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| DbError::Query {
            message: format!("migration failed: {e}"),
        })?;
        info!(count = applied.len(), "Migrations applied");
        Ok(())
    }

    // --- Games ---

    /// Creates a game from caller-supplied fields; the id is assigned by
    /// the store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, game))]
    pub fn create_game(&self, game: NewGame) -> Result<Game, DbError> {
        debug!("Creating game");
        let mut conn = self.connection()?;

        let game = diesel::insert_into(schema::games::table)
            .values(&game)
            .returning(Game::as_returning())
            .get_result(&mut conn)?;

        info!(game_id = game.id(), "Game created");
        Ok(game)
    }

    /// Fetches a game by id. Returns `None` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_game(&self, game_id: i32) -> Result<Option<Game>, DbError> {
        debug!(game_id = %game_id, "Fetching game");
        let mut conn = self.connection()?;

        let game = schema::games::table
            .find(game_id)
            .first::<Game>(&mut conn)
            .optional()?;
        Ok(game)
    }

    /// Lists all games, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_games(&self) -> Result<Vec<Game>, DbError> {
        debug!("Listing games");
        let mut conn = self.connection()?;

        let games = schema::games::table
            .order(schema::games::id.asc())
            .load::<Game>(&mut conn)?;

        info!(count = games.len(), "Games loaded");
        Ok(games)
    }

    /// Applies a partial update to a game. Fields set to `None` in
    /// `changes` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the game does not exist, or
    /// [`DbError`] on any database error.
    #[instrument(skip(self, changes))]
    pub fn update_game(&self, game_id: i32, changes: GameChanges) -> Result<Game, DbError> {
        debug!(game_id = %game_id, "Updating game");
        let mut conn = self.connection()?;

        if changes.is_empty() {
            // Diesel rejects empty change sets; a no-op update is a read.
            return schema::games::table
                .find(game_id)
                .first::<Game>(&mut conn)
                .optional()?
                .ok_or_else(|| DbError::not_found("games", game_id));
        }

        let game = diesel::update(schema::games::table.find(game_id))
            .set(&changes)
            .returning(Game::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::not_found("games", game_id))?;

        info!(game_id = game.id(), "Game updated");
        Ok(game)
    }

    /// Deletes a game.
    ///
    /// Delete policy is RESTRICT: a game that still has reviews or user
    /// associations cannot be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the game does not exist, or
    /// [`DbError::ConstraintViolation`] naming the blocking foreign key if
    /// dependent rows remain.
    #[instrument(skip(self))]
    pub fn delete_game(&self, game_id: i32) -> Result<(), DbError> {
        debug!(game_id = %game_id, "Deleting game");
        let mut conn = self.connection()?;

        conn.transaction(|conn| {
            match diesel::delete(schema::games::table.find(game_id)).execute(conn) {
                Ok(0) => Err(DbError::not_found("games", game_id)),
                Ok(_) => {
                    info!(game_id = %game_id, "Game deleted");
                    Ok(())
                }
                Err(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    _,
                )) => Err(DbError::constraint(game_delete_blocker(conn, game_id)?)),
                Err(e) => Err(e.into()),
            }
        })
    }

    // --- Users ---

    /// Creates a user. `created_at` and `updated_at` are both stamped with
    /// the current time; the caller never supplies them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self, user))]
    pub fn create_user(&self, user: NewUser) -> Result<User, DbError> {
        debug!("Creating user");
        let mut conn = self.connection()?;
        let now = chrono::Utc::now().naive_utc();

        let user = diesel::insert_into(schema::users::table)
            .values((
                &user,
                schema::users::created_at.eq(now),
                schema::users::updated_at.eq(now),
            ))
            .returning(User::as_returning())
            .get_result(&mut conn)?;

        info!(user_id = user.id(), "User created");
        Ok(user)
    }

    /// Fetches a user by id. Returns `None` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_user(&self, user_id: i32) -> Result<Option<User>, DbError> {
        debug!(user_id = %user_id, "Fetching user");
        let mut conn = self.connection()?;

        let user = schema::users::table
            .find(user_id)
            .first::<User>(&mut conn)
            .optional()?;
        Ok(user)
    }

    /// Lists all users, ordered by creation time.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn list_users(&self) -> Result<Vec<User>, DbError> {
        debug!("Listing users");
        let mut conn = self.connection()?;

        let users = schema::users::table
            .order(schema::users::created_at.asc())
            .load::<User>(&mut conn)?;

        info!(count = users.len(), "Users loaded");
        Ok(users)
    }

    /// Applies a partial update to a user.
    ///
    /// `updated_at` is reset to the current time on every call, whether or
    /// not any field changed; `created_at` is never written after insert.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the user does not exist, or
    /// [`DbError`] on any database error.
    #[instrument(skip(self, changes))]
    pub fn update_user(&self, user_id: i32, changes: UserChanges) -> Result<User, DbError> {
        debug!(user_id = %user_id, "Updating user");
        let mut conn = self.connection()?;
        let now = chrono::Utc::now().naive_utc();

        let user = diesel::update(schema::users::table.find(user_id))
            .set((&changes, schema::users::updated_at.eq(now)))
            .returning(User::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::not_found("users", user_id))?;

        info!(user_id = user.id(), "User updated");
        Ok(user)
    }

    /// Deletes a user.
    ///
    /// Delete policy is RESTRICT: a user that still has reviews or game
    /// associations cannot be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the user does not exist, or
    /// [`DbError::ConstraintViolation`] naming the blocking foreign key if
    /// dependent rows remain.
    #[instrument(skip(self))]
    pub fn delete_user(&self, user_id: i32) -> Result<(), DbError> {
        debug!(user_id = %user_id, "Deleting user");
        let mut conn = self.connection()?;

        conn.transaction(|conn| {
            match diesel::delete(schema::users::table.find(user_id)).execute(conn) {
                Ok(0) => Err(DbError::not_found("users", user_id)),
                Ok(_) => {
                    info!(user_id = %user_id, "User deleted");
                    Ok(())
                }
                Err(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    _,
                )) => Err(DbError::constraint(user_delete_blocker(conn, user_id)?)),
                Err(e) => Err(e.into()),
            }
        })
    }

    // --- Reviews ---

    /// Creates a review. When `game_id` or `user_id` is set it must
    /// reference an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConstraintViolation`] naming the violated foreign
    /// key if a referenced row is missing, or [`DbError`] on any other
    /// database error.
    #[instrument(
        skip(self, review),
        fields(game_id = ?review.game_id(), user_id = ?review.user_id())
    )]
    pub fn create_review(&self, review: NewReview) -> Result<Review, DbError> {
        debug!("Creating review");
        let mut conn = self.connection()?;

        conn.transaction(|conn| {
            match diesel::insert_into(schema::reviews::table)
                .values(&review)
                .returning(Review::as_returning())
                .get_result(conn)
            {
                Ok(row) => {
                    info!(review_id = row.id(), "Review created");
                    Ok(row)
                }
                Err(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    _,
                )) => {
                    // SQLite does not report which foreign key failed;
                    // probe the parents and attribute it ourselves.
                    let constraint =
                        missing_review_parent(conn, *review.game_id(), *review.user_id())?;
                    Err(DbError::constraint(constraint))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Fetches a review by id. Returns `None` if no such row exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn get_review(&self, review_id: i32) -> Result<Option<Review>, DbError> {
        debug!(review_id = %review_id, "Fetching review");
        let mut conn = self.connection()?;

        let review = schema::reviews::table
            .find(review_id)
            .first::<Review>(&mut conn)
            .optional()?;
        Ok(review)
    }

    /// Applies a partial update to a review. Only score and comment are
    /// editable; the foreign keys are fixed at creation.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the review does not exist, or
    /// [`DbError`] on any database error.
    #[instrument(skip(self, changes))]
    pub fn update_review(&self, review_id: i32, changes: ReviewChanges) -> Result<Review, DbError> {
        debug!(review_id = %review_id, "Updating review");
        let mut conn = self.connection()?;

        if changes.is_empty() {
            return schema::reviews::table
                .find(review_id)
                .first::<Review>(&mut conn)
                .optional()?
                .ok_or_else(|| DbError::not_found("reviews", review_id));
        }

        let review = diesel::update(schema::reviews::table.find(review_id))
            .set(&changes)
            .returning(Review::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(|| DbError::not_found("reviews", review_id))?;

        info!(review_id = review.id(), "Review updated");
        Ok(review)
    }

    /// Deletes a review.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the review does not exist.
    #[instrument(skip(self))]
    pub fn delete_review(&self, review_id: i32) -> Result<(), DbError> {
        debug!(review_id = %review_id, "Deleting review");
        let mut conn = self.connection()?;

        let deleted = diesel::delete(schema::reviews::table.find(review_id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DbError::not_found("reviews", review_id));
        }

        info!(review_id = %review_id, "Review deleted");
        Ok(())
    }

    // --- Relationship resolution ---

    /// All reviews of a game, ordered by review id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn reviews_for_game(&self, game_id: i32) -> Result<Vec<Review>, DbError> {
        debug!(game_id = %game_id, "Loading reviews for game");
        let mut conn = self.connection()?;

        let reviews = schema::reviews::table
            .filter(schema::reviews::game_id.eq(game_id))
            .order(schema::reviews::id.asc())
            .load::<Review>(&mut conn)?;

        debug!(game_id = %game_id, count = reviews.len(), "Reviews loaded");
        Ok(reviews)
    }

    /// All reviews written by a user, ordered by review id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn reviews_for_user(&self, user_id: i32) -> Result<Vec<Review>, DbError> {
        debug!(user_id = %user_id, "Loading reviews for user");
        let mut conn = self.connection()?;

        let reviews = schema::reviews::table
            .filter(schema::reviews::user_id.eq(user_id))
            .order(schema::reviews::id.asc())
            .load::<Review>(&mut conn)?;

        debug!(user_id = %user_id, count = reviews.len(), "Reviews loaded");
        Ok(reviews)
    }

    /// The game a review is about. Returns `None` if the review does not
    /// exist or its `game_id` is null.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn game_for_review(&self, review_id: i32) -> Result<Option<Game>, DbError> {
        debug!(review_id = %review_id, "Resolving game for review");
        let mut conn = self.connection()?;

        let game = schema::reviews::table
            .inner_join(schema::games::table)
            .filter(schema::reviews::id.eq(review_id))
            .select(Game::as_select())
            .first::<Game>(&mut conn)
            .optional()?;
        Ok(game)
    }

    /// The user who wrote a review. Returns `None` if the review does not
    /// exist or its `user_id` is null.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn user_for_review(&self, review_id: i32) -> Result<Option<User>, DbError> {
        debug!(review_id = %review_id, "Resolving user for review");
        let mut conn = self.connection()?;

        let user = schema::reviews::table
            .inner_join(schema::users::table)
            .filter(schema::reviews::id.eq(review_id))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .optional()?;
        Ok(user)
    }

    // --- User-game association ---

    /// Associates a user with a game. Both rows must exist.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConstraintViolation`] naming the violated foreign
    /// key if either side is missing, or a constraint violation from the
    /// link table's primary key if the pair is already associated.
    #[instrument(skip(self))]
    pub fn link_user_game(&self, user_id: i32, game_id: i32) -> Result<UserGame, DbError> {
        debug!(user_id = %user_id, game_id = %game_id, "Linking user and game");
        let mut conn = self.connection()?;

        conn.transaction(|conn| {
            match diesel::insert_into(schema::user_games::table)
                .values(&UserGame::new(user_id, game_id))
                .returning(UserGame::as_returning())
                .get_result(conn)
            {
                Ok(link) => {
                    info!(user_id = %user_id, game_id = %game_id, "User linked to game");
                    Ok(link)
                }
                Err(diesel::result::Error::DatabaseError(
                    DatabaseErrorKind::ForeignKeyViolation,
                    _,
                )) => {
                    let constraint = missing_link_parent(conn, user_id, game_id)?;
                    Err(DbError::constraint(constraint))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Dissolves a user-game association.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the pair is not associated.
    #[instrument(skip(self))]
    pub fn unlink_user_game(&self, user_id: i32, game_id: i32) -> Result<(), DbError> {
        debug!(user_id = %user_id, game_id = %game_id, "Unlinking user and game");
        let mut conn = self.connection()?;

        let deleted = diesel::delete(
            schema::user_games::table
                .filter(schema::user_games::user_id.eq(user_id))
                .filter(schema::user_games::game_id.eq(game_id)),
        )
        .execute(&mut conn)?;

        if deleted == 0 {
            return Err(DbError::NotFound {
                table: "user_games",
                key: format!("({user_id}, {game_id})"),
            });
        }

        info!(user_id = %user_id, game_id = %game_id, "User unlinked from game");
        Ok(())
    }

    /// All games associated with a user, ordered by game id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn games_for_user(&self, user_id: i32) -> Result<Vec<Game>, DbError> {
        debug!(user_id = %user_id, "Loading games for user");
        let mut conn = self.connection()?;

        let games = schema::user_games::table
            .inner_join(schema::games::table)
            .filter(schema::user_games::user_id.eq(user_id))
            .select(Game::as_select())
            .order(schema::games::id.asc())
            .load::<Game>(&mut conn)?;

        debug!(user_id = %user_id, count = games.len(), "Games loaded");
        Ok(games)
    }

    /// All users associated with a game, ordered by user id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database error occurs.
    #[instrument(skip(self))]
    pub fn users_for_game(&self, game_id: i32) -> Result<Vec<User>, DbError> {
        debug!(game_id = %game_id, "Loading users for game");
        let mut conn = self.connection()?;

        let users = schema::user_games::table
            .inner_join(schema::users::table)
            .filter(schema::user_games::game_id.eq(game_id))
            .select(User::as_select())
            .order(schema::users::id.asc())
            .load::<User>(&mut conn)?;

        debug!(game_id = %game_id, count = users.len(), "Users loaded");
        Ok(users)
    }
}

fn game_exists(conn: &mut SqliteConnection, game_id: i32) -> Result<bool, DbError> {
    let found = diesel::select(diesel::dsl::exists(schema::games::table.find(game_id)))
        .get_result::<bool>(conn)?;
    Ok(found)
}

fn user_exists(conn: &mut SqliteConnection, user_id: i32) -> Result<bool, DbError> {
    let found = diesel::select(diesel::dsl::exists(schema::users::table.find(user_id)))
        .get_result::<bool>(conn)?;
    Ok(found)
}

/// Names the review foreign key whose parent row is missing.
fn missing_review_parent(
    conn: &mut SqliteConnection,
    game_id: Option<i32>,
    user_id: Option<i32>,
) -> Result<String, DbError> {
    if let Some(id) = game_id {
        if !game_exists(conn, id)? {
            return Ok(fk_constraint_name("reviews", "game_id", "games"));
        }
    }
    if let Some(id) = user_id {
        if !user_exists(conn, id)? {
            return Ok(fk_constraint_name("reviews", "user_id", "users"));
        }
    }
    // Both parents exist; fall back to SQLite's generic wording.
    Ok("FOREIGN KEY constraint failed".to_string())
}

/// Names the association foreign key whose parent row is missing.
fn missing_link_parent(
    conn: &mut SqliteConnection,
    user_id: i32,
    game_id: i32,
) -> Result<String, DbError> {
    if !user_exists(conn, user_id)? {
        return Ok(fk_constraint_name("user_games", "user_id", "users"));
    }
    if !game_exists(conn, game_id)? {
        return Ok(fk_constraint_name("user_games", "game_id", "games"));
    }
    Ok("FOREIGN KEY constraint failed".to_string())
}

/// Names the foreign key blocking a game delete under the RESTRICT policy.
fn game_delete_blocker(conn: &mut SqliteConnection, game_id: i32) -> Result<String, DbError> {
    let reviewed = diesel::select(diesel::dsl::exists(
        schema::reviews::table.filter(schema::reviews::game_id.eq(game_id)),
    ))
    .get_result::<bool>(conn)?;

    Ok(if reviewed {
        fk_constraint_name("reviews", "game_id", "games")
    } else {
        fk_constraint_name("user_games", "game_id", "games")
    })
}

/// Names the foreign key blocking a user delete under the RESTRICT policy.
fn user_delete_blocker(conn: &mut SqliteConnection, user_id: i32) -> Result<String, DbError> {
    let reviewed = diesel::select(diesel::dsl::exists(
        schema::reviews::table.filter(schema::reviews::user_id.eq(user_id)),
    ))
    .get_result::<bool>(conn)?;

    Ok(if reviewed {
        fk_constraint_name("reviews", "user_id", "users")
    } else {
        fk_constraint_name("user_games", "user_id", "users")
    })
}
