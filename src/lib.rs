//! Relational persistence layer for a game-review catalog.
//!
//! Defines the catalog data model — games, users, reviews, and a
//! many-to-many user-game association — and a repository exposing CRUD,
//! relationship traversal, and association management over SQLite.
//!
//! # Architecture
//!
//! - **Schema**: Diesel table declarations plus an embedded migration that
//!   creates the four tables with named foreign-key constraints
//! - **Models**: persisted rows, insertable records, and partial change sets
//! - **Repository**: [`CatalogRepository`], one method per logical operation
//! - **Errors**: [`DbError`] keeps constraint violations, missing rows, and
//!   connection failures distinct
//!
//! # Example
//!
//! ```no_run
//! use review_catalog::{CatalogRepository, NewGame, NewReview, NewUser};
//!
//! # fn example() -> Result<(), review_catalog::DbError> {
//! let repo = CatalogRepository::new("catalog.db".to_string());
//! repo.run_migrations()?;
//!
//! let game = repo.create_game(NewGame::new(
//!     Some("Outer Wilds".to_string()),
//!     Some("Adventure".to_string()),
//!     Some("PC".to_string()),
//!     Some(25),
//! ))?;
//! let user = repo.create_user(NewUser::new(Some("mori".to_string())))?;
//!
//! repo.create_review(NewReview::new(
//!     Some(9),
//!     Some("Wonderful loop.".to_string()),
//!     Some(*game.id()),
//!     Some(*user.id()),
//! ))?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod error;
mod models;
mod naming;
mod repository;
mod schema; // Diesel table declarations - internal use only

// Crate-level exports - Errors
pub use error::DbError;

// Crate-level exports - Models
pub use models::{
    Game, GameChanges, NewGame, NewReview, NewUser, Review, ReviewChanges, User, UserChanges,
    UserGame,
};

// Crate-level exports - Constraint naming policy
pub use naming::fk_constraint_name;

// Crate-level exports - Repository
pub use repository::CatalogRepository;
