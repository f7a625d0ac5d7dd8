use cetane::prelude::*;

pub fn migration() -> Migration {
    Migration::new("0002_artifact_indexes")
        .depends_on(&["0001_initial_schema"])
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_artifacts_kind ON artifacts(kind)",
        ))
        .operation(RunSql::portable().for_backend(
            "sqlite",
            "CREATE INDEX IF NOT EXISTS idx_artifacts_content_hash ON artifacts(content_hash)",
        ))
}
