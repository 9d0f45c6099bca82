//! Tests for catalog repository operations.

use std::thread;
use std::time::Duration;

use tempfile::NamedTempFile;

use review_catalog::{
    CatalogRepository, DbError, GameChanges, NewGame, NewReview, NewUser, ReviewChanges,
    UserChanges, fk_constraint_name,
};

/// Creates a temporary database file with the schema applied, returns the
/// file handle (must stay in scope to keep the file alive) and a ready
/// repository.
fn setup_test_db() -> (NamedTempFile, CatalogRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = CatalogRepository::new(db_path);
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn sample_game(repo: &CatalogRepository) -> review_catalog::Game {
    repo.create_game(NewGame::new(
        Some("Hollow Knight".to_string()),
        Some("Metroidvania".to_string()),
        Some("Switch".to_string()),
        Some(15),
    ))
    .expect("Create game failed")
}

fn sample_user(repo: &CatalogRepository) -> review_catalog::User {
    repo.create_user(NewUser::new(Some("Alice".to_string())))
        .expect("Create user failed")
}

#[test]
fn test_game_round_trip() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    assert!(*game.id() > 0);

    let fetched = repo
        .get_game(*game.id())
        .expect("Fetch failed")
        .expect("Game missing");
    assert_eq!(fetched, game);
    assert_eq!(fetched.title().as_deref(), Some("Hollow Knight"));
    assert_eq!(*fetched.price(), Some(15));
}

#[test]
fn test_game_all_fields_optional() {
    let (_db, repo) = setup_test_db();
    let game = repo
        .create_game(NewGame::new(None, None, None, None))
        .expect("Create failed");

    let fetched = repo
        .get_game(*game.id())
        .expect("Fetch failed")
        .expect("Game missing");
    assert!(fetched.title().is_none());
    assert!(fetched.genre().is_none());
    assert!(fetched.platform().is_none());
    assert!(fetched.price().is_none());
}

#[test]
fn test_get_game_not_found_is_none() {
    let (_db, repo) = setup_test_db();
    let fetched = repo.get_game(9999).expect("Fetch failed");
    assert!(fetched.is_none());
}

#[test]
fn test_update_game_partial() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);

    let updated = repo
        .update_game(
            *game.id(),
            GameChanges {
                price: Some(10),
                ..Default::default()
            },
        )
        .expect("Update failed");

    assert_eq!(*updated.price(), Some(10));
    // Untouched fields survive a partial update.
    assert_eq!(updated.title().as_deref(), Some("Hollow Knight"));
    assert_eq!(updated.genre().as_deref(), Some("Metroidvania"));
}

#[test]
fn test_update_missing_game_fails() {
    let (_db, repo) = setup_test_db();
    let result = repo.update_game(
        9999,
        GameChanges {
            price: Some(10),
            ..Default::default()
        },
    );
    assert!(matches!(result, Err(DbError::NotFound { table: "games", .. })));
}

#[test]
fn test_list_games_ordered_by_id() {
    let (_db, repo) = setup_test_db();
    let first = sample_game(&repo);
    let second = sample_game(&repo);

    let games = repo.list_games().expect("List failed");
    assert_eq!(games.len(), 2);
    assert_eq!(games[0].id(), first.id());
    assert_eq!(games[1].id(), second.id());
}

#[test]
fn test_user_round_trip_and_timestamps() {
    let (_db, repo) = setup_test_db();
    let user = sample_user(&repo);
    assert!(*user.id() > 0);
    assert!(user.created_at() <= user.updated_at());

    let fetched = repo
        .get_user(*user.id())
        .expect("Fetch failed")
        .expect("User missing");
    assert_eq!(fetched, user);
}

#[test]
fn test_update_user_bumps_updated_at_only() {
    let (_db, repo) = setup_test_db();
    let user = sample_user(&repo);

    // Clock must visibly advance for the strict-increase assertion.
    thread::sleep(Duration::from_millis(10));

    let updated = repo
        .update_user(
            *user.id(),
            UserChanges {
                name: Some("Alicia".to_string()),
            },
        )
        .expect("Update failed");

    assert_eq!(updated.name().as_deref(), Some("Alicia"));
    assert_eq!(updated.created_at(), user.created_at());
    assert!(updated.updated_at() > user.updated_at());
}

#[test]
fn test_update_user_without_field_changes_still_bumps_updated_at() {
    let (_db, repo) = setup_test_db();
    let user = sample_user(&repo);

    thread::sleep(Duration::from_millis(10));

    let updated = repo
        .update_user(*user.id(), UserChanges::default())
        .expect("Update failed");

    assert_eq!(updated.name(), user.name());
    assert_eq!(updated.created_at(), user.created_at());
    assert!(updated.updated_at() > user.updated_at());
}

#[test]
fn test_update_missing_user_fails() {
    let (_db, repo) = setup_test_db();
    let result = repo.update_user(9999, UserChanges::default());
    assert!(matches!(result, Err(DbError::NotFound { table: "users", .. })));
}

#[test]
fn test_list_users_ordered_by_creation() {
    let (_db, repo) = setup_test_db();
    for name in ["Alpha", "Beta", "Gamma"] {
        repo.create_user(NewUser::new(Some(name.to_string())))
            .expect("Create failed");
        thread::sleep(Duration::from_millis(2));
    }

    let users = repo.list_users().expect("List failed");
    assert_eq!(users.len(), 3);
    assert_eq!(users[0].name().as_deref(), Some("Alpha"));
    assert_eq!(users[1].name().as_deref(), Some("Beta"));
    assert_eq!(users[2].name().as_deref(), Some("Gamma"));
}

#[test]
fn test_review_round_trip() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);

    let review = repo
        .create_review(NewReview::new(
            Some(9),
            Some("Masterpiece.".to_string()),
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");

    let fetched = repo
        .get_review(*review.id())
        .expect("Fetch failed")
        .expect("Review missing");
    assert_eq!(fetched, review);
    assert_eq!(*fetched.score(), Some(9));
    assert_eq!(*fetched.game_id(), Some(*game.id()));
    assert_eq!(*fetched.user_id(), Some(*user.id()));
}

#[test]
fn test_review_visible_from_both_sides() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);

    let review = repo
        .create_review(NewReview::new(
            Some(7),
            None,
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");

    let by_game = repo.reviews_for_game(*game.id()).expect("Query failed");
    assert_eq!(by_game, vec![review.clone()]);

    let by_user = repo.reviews_for_user(*user.id()).expect("Query failed");
    assert_eq!(by_user, vec![review.clone()]);

    let owning_game = repo
        .game_for_review(*review.id())
        .expect("Query failed")
        .expect("Game missing");
    assert_eq!(owning_game, game);

    let author = repo
        .user_for_review(*review.id())
        .expect("Query failed")
        .expect("User missing");
    assert_eq!(author, user);
}

#[test]
fn test_review_with_dangling_game_id_fails() {
    let (_db, repo) = setup_test_db();
    let user = sample_user(&repo);

    let result = repo.create_review(NewReview::new(Some(5), None, Some(9999), Some(*user.id())));
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_reviews_game_id_games".to_string()
        })
    );
}

#[test]
fn test_review_with_dangling_user_id_fails() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);

    let result = repo.create_review(NewReview::new(Some(5), None, Some(*game.id()), Some(9999)));
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_reviews_user_id_users".to_string()
        })
    );
}

#[test]
fn test_review_with_null_foreign_keys_is_accepted() {
    // The original schema never hardened the FK columns to NOT NULL;
    // a review with no parents is permitted, just unresolvable.
    let (_db, repo) = setup_test_db();

    let review = repo
        .create_review(NewReview::new(Some(3), None, None, None))
        .expect("Create review failed");

    assert!(
        repo.game_for_review(*review.id())
            .expect("Query failed")
            .is_none()
    );
    assert!(
        repo.user_for_review(*review.id())
            .expect("Query failed")
            .is_none()
    );
}

#[test]
fn test_update_review_edits_score_and_comment() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);
    let review = repo
        .create_review(NewReview::new(
            Some(6),
            Some("Decent.".to_string()),
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");

    let updated = repo
        .update_review(
            *review.id(),
            ReviewChanges {
                score: Some(8),
                comment: Some("Grew on me.".to_string()),
            },
        )
        .expect("Update failed");

    assert_eq!(*updated.score(), Some(8));
    assert_eq!(updated.comment().as_deref(), Some("Grew on me."));
    // Foreign keys are fixed at creation.
    assert_eq!(updated.game_id(), review.game_id());
    assert_eq!(updated.user_id(), review.user_id());
}

#[test]
fn test_idempotent_relationship_read() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);
    for score in [4, 8] {
        repo.create_review(NewReview::new(
            Some(score),
            None,
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");
    }

    let first = repo.reviews_for_game(*game.id()).expect("Query failed");
    let second = repo.reviews_for_game(*game.id()).expect("Query failed");
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_relationship_read_reflects_writes() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);
    let review = repo
        .create_review(NewReview::new(
            Some(2),
            None,
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");

    assert_eq!(repo.reviews_for_game(*game.id()).expect("Query failed").len(), 1);
    repo.delete_review(*review.id()).expect("Delete failed");
    assert!(repo.reviews_for_game(*game.id()).expect("Query failed").is_empty());
}

#[test]
fn test_association_symmetry() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);

    repo.link_user_game(*user.id(), *game.id())
        .expect("Link failed");

    let games = repo.games_for_user(*user.id()).expect("Query failed");
    assert_eq!(games, vec![game.clone()]);

    let users = repo.users_for_game(*game.id()).expect("Query failed");
    assert_eq!(users, vec![user.clone()]);
}

#[test]
fn test_duplicate_link_fails() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);

    repo.link_user_game(*user.id(), *game.id())
        .expect("First link failed");
    let result = repo.link_user_game(*user.id(), *game.id());
    assert!(matches!(result, Err(DbError::ConstraintViolation { .. })));
}

#[test]
fn test_link_with_dangling_user_fails() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);

    let result = repo.link_user_game(9999, *game.id());
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_user_games_user_id_users".to_string()
        })
    );
}

#[test]
fn test_link_with_dangling_game_fails() {
    let (_db, repo) = setup_test_db();
    let user = sample_user(&repo);

    let result = repo.link_user_game(*user.id(), 9999);
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_user_games_game_id_games".to_string()
        })
    );
}

#[test]
fn test_unlink_removes_both_directions() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);

    repo.link_user_game(*user.id(), *game.id())
        .expect("Link failed");
    repo.unlink_user_game(*user.id(), *game.id())
        .expect("Unlink failed");

    assert!(repo.games_for_user(*user.id()).expect("Query failed").is_empty());
    assert!(repo.users_for_game(*game.id()).expect("Query failed").is_empty());
}

#[test]
fn test_unlink_missing_association_fails() {
    let (_db, repo) = setup_test_db();
    let result = repo.unlink_user_game(1, 2);
    assert!(matches!(
        result,
        Err(DbError::NotFound { table: "user_games", .. })
    ));
}

#[test]
fn test_delete_game_restricted_by_review() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);
    let review = repo
        .create_review(NewReview::new(
            Some(10),
            None,
            Some(*game.id()),
            Some(*user.id()),
        ))
        .expect("Create review failed");

    let result = repo.delete_game(*game.id());
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_reviews_game_id_games".to_string()
        })
    );

    // Removing the dependent review unblocks the delete.
    repo.delete_review(*review.id()).expect("Delete failed");
    repo.delete_game(*game.id()).expect("Delete failed");
    assert!(repo.get_game(*game.id()).expect("Fetch failed").is_none());
}

#[test]
fn test_delete_user_restricted_by_association() {
    let (_db, repo) = setup_test_db();
    let game = sample_game(&repo);
    let user = sample_user(&repo);
    repo.link_user_game(*user.id(), *game.id())
        .expect("Link failed");

    let result = repo.delete_user(*user.id());
    assert_eq!(
        result,
        Err(DbError::ConstraintViolation {
            constraint: "fk_user_games_user_id_users".to_string()
        })
    );

    repo.unlink_user_game(*user.id(), *game.id())
        .expect("Unlink failed");
    repo.delete_user(*user.id()).expect("Delete failed");
    assert!(repo.get_user(*user.id()).expect("Fetch failed").is_none());
}

#[test]
fn test_delete_missing_rows_fail_with_not_found() {
    let (_db, repo) = setup_test_db();
    assert!(matches!(
        repo.delete_game(9999),
        Err(DbError::NotFound { table: "games", .. })
    ));
    assert!(matches!(
        repo.delete_user(9999),
        Err(DbError::NotFound { table: "users", .. })
    ));
    assert!(matches!(
        repo.delete_review(9999),
        Err(DbError::NotFound { table: "reviews", .. })
    ));
}

#[test]
fn test_constraint_naming_policy() {
    assert_eq!(
        fk_constraint_name("reviews", "game_id", "games"),
        "fk_reviews_game_id_games"
    );
    assert_eq!(
        fk_constraint_name("reviews", "user_id", "users"),
        "fk_reviews_user_id_users"
    );
    assert_eq!(
        fk_constraint_name("user_games", "user_id", "users"),
        "fk_user_games_user_id_users"
    );
    assert_eq!(
        fk_constraint_name("user_games", "game_id", "games"),
        "fk_user_games_game_id_games"
    );
}

#[test]
fn test_connection_failure_is_distinct() {
    let repo = CatalogRepository::new("/nonexistent-dir/catalog.db".to_string());
    let result = repo.list_games();
    assert!(matches!(result, Err(DbError::Connection { .. })));
}
