/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every DB open (before checking the version),
/// using `IF NOT EXISTS` so it is safe to run multiple times.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the full v1 schema.
///
/// Contains four tables:
/// - `docs`: the replicated document set — current revision per id. Holds
///   note documents and every `team:`-prefixed record in one keyspace.
/// - `doc_history`: every revision ever stored locally, so old revisions
///   remain fetchable for diffs against the last-seen state.
/// - `read_state`: the local user's per-file read ledger. Never replicated.
/// - `setting_overrides`: local ledger of team-default settings the user
///   has intentionally customized. Never replicated.
///
/// All tables use `STRICT` mode for type enforcement.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS docs (
        id          TEXT    PRIMARY KEY,
        rev         TEXT    NOT NULL,
        body        TEXT    NOT NULL,
        modified_by TEXT    NOT NULL DEFAULT '',
        updated_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS doc_history (
        id          TEXT    NOT NULL,
        rev         TEXT    NOT NULL,
        body        TEXT    NOT NULL,
        modified_by TEXT    NOT NULL DEFAULT '',
        saved_at    INTEGER NOT NULL,
        PRIMARY KEY (id, rev)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS read_state (
        file_path     TEXT    PRIMARY KEY,
        last_seen_rev TEXT    NOT NULL,
        last_seen_at  INTEGER NOT NULL
    ) STRICT;

    CREATE TABLE IF NOT EXISTS setting_overrides (
        plugin_id   TEXT NOT NULL,
        setting_key TEXT NOT NULL,
        PRIMARY KEY (plugin_id, setting_key)
    ) STRICT;
";

/// Runs forward-only schema migration to migrate the DB to the latest version.
///
/// This function is idempotent: safe to call on every startup regardless of
/// whether the schema has already been applied.
///
/// # Process
///
/// 1. Creates the `schema_version` table if it does not exist.
/// 2. Reads the current version (`0` if the table is empty).
/// 3. If the version is below 1, applies `SCHEMA_V1_SQL` inside a
///    `BEGIN IMMEDIATE` transaction and records `version = 1`.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
