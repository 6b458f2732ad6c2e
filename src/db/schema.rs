pub const SCHEMA_VERSION: &str = "1";

pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS "_db_metadata" (
    "key" TEXT PRIMARY KEY,
    "value" TEXT NOT NULL
);

-- Append-only. "seq" breaks timestamp ties in insertion order.
CREATE TABLE IF NOT EXISTS "activity_records" (
    "seq" INTEGER PRIMARY KEY AUTOINCREMENT,
    "id" TEXT NOT NULL UNIQUE,
    "userId" TEXT NOT NULL,
    "collection" TEXT NOT NULL,
    "category" TEXT,
    "activityId" TEXT,
    "timestampMs" INTEGER NOT NULL,
    "payload" TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS "idx_activity_user_collection_ts"
    ON "activity_records" ("userId", "collection", "timestampMs");

CREATE INDEX IF NOT EXISTS "idx_activity_user_collection_category"
    ON "activity_records" ("userId", "collection", "category");

CREATE TABLE IF NOT EXISTS "documents" (
    "collection" TEXT NOT NULL,
    "id" TEXT NOT NULL,
    "body" TEXT NOT NULL,
    "updatedAtMs" INTEGER NOT NULL,
    PRIMARY KEY ("collection", "id")
);
"#;

/// Splits a script on `;` outside quoted literals. `--` comment lines are
/// dropped so a statement made only of comments is skipped.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    for ch in sql.chars() {
        match ch {
            '\'' if !in_double_quote => in_single_quote = !in_single_quote,
            '"' if !in_single_quote => in_double_quote = !in_double_quote,
            ';' if !in_single_quote && !in_double_quote => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    push_statement(&mut statements, &current);

    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let stmt = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let stmt = stmt.trim();
    if !stmt.is_empty() {
        statements.push(stmt.to_string());
    }
}
