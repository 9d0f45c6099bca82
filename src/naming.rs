//! Deterministic constraint-naming policy.
//!
//! Every foreign key in the schema is named as a function of the owning
//! table, the constrained column, and the referenced table. The migration
//! SQL and the violation-attribution code in the repository both follow
//! this policy, so constraint errors stay stable and greppable.

/// Returns the name of the foreign-key constraint on `table.column`
/// referencing `referenced_table`.
///
/// The pattern is `fk_<table>_<column>_<referenced_table>`, e.g.
/// `fk_reviews_game_id_games`.
pub fn fk_constraint_name(table: &str, column: &str, referenced_table: &str) -> String {
    format!("fk_{table}_{column}_{referenced_table}")
}
