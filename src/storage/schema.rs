//! Database schema definitions

use super::engine::Partition;

/// SQL to create the counter table shared by all partitions
pub const CREATE_SEQUENCES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS partition_sequences (
    partition TEXT PRIMARY KEY,
    value INTEGER NOT NULL
)
"#;

/// SQL to create one partition table.
///
/// BLOB keys compare with memcmp, so `ORDER BY key` is native byte order.
pub fn create_partition_table(partition: Partition) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {} (
    key BLOB PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID
"#,
        partition.table()
    )
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = Partition::all()
        .iter()
        .map(|p| create_partition_table(*p))
        .collect();
    stmts.push(CREATE_SEQUENCES_TABLE.to_string());
    stmts
}
