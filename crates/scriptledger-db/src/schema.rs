/// Name of the tracking table. Kept stable so existing ledgers stay readable.
pub const TRACKING_TABLE: &str = "__BuildMaster_DbSchemaChanges";

/// Name of the sequence object that orders tracking rows.
pub const SEQUENCE_NAME: &str = "__BuildMaster_DbSchema_Seq";

pub const COL_RELEASE: &str = "Numeric_Release_Number";
pub const COL_SCRIPT_ID: &str = "Script_Id";
pub const COL_SEQUENCE: &str = "Script_Sequence";
pub const COL_NAME: &str = "Script_Name";
pub const COL_EXECUTED: &str = "Executed_Date";
pub const COL_INDICATOR: &str = "Success_Indicator";

/// The SQL an engine needs to keep the tracking table.
///
/// `insert_record` takes four positional parameters in this order: release
/// number, script id, script name, outcome indicator. The sequence value and the
/// executed date are produced by the database itself.
#[derive(Debug)]
pub struct LedgerSql {
    pub table_exists: &'static str,
    pub select_records: &'static str,
    pub insert_record: &'static str,
    pub initialize: [&'static str; 3],
}

/// SQLite has no sequence objects, so the sequence is a one-row table advanced by
/// a trigger on every ledger insert.
pub const SQLITE: LedgerSql = LedgerSql {
    table_exists: "SELECT COUNT(*) FROM sqlite_master \
                   WHERE type = 'table' AND name = '__BuildMaster_DbSchemaChanges'",
    select_records: "SELECT * FROM \"__BuildMaster_DbSchemaChanges\" ORDER BY \"Script_Sequence\"",
    insert_record: "INSERT INTO \"__BuildMaster_DbSchemaChanges\" \
                    (\"Numeric_Release_Number\", \"Script_Id\", \"Script_Sequence\", \"Script_Name\", \"Executed_Date\", \"Success_Indicator\") \
                    VALUES (?1, ?2, (SELECT \"Next_Value\" FROM \"__BuildMaster_DbSchema_Seq\"), ?3, CURRENT_TIMESTAMP, ?4)",
    initialize: [
        "CREATE TABLE IF NOT EXISTS \"__BuildMaster_DbSchemaChanges\" (
            \"Numeric_Release_Number\" INTEGER NOT NULL,
            \"Script_Id\" INTEGER NOT NULL,
            \"Script_Sequence\" INTEGER NOT NULL,
            \"Script_Name\" TEXT NOT NULL,
            \"Executed_Date\" TEXT NOT NULL,
            \"Success_Indicator\" TEXT NOT NULL CHECK (\"Success_Indicator\" IN ('Y', 'N')),
            CONSTRAINT \"__BuildMaster_DbSchemaChangesPK\" PRIMARY KEY (\"Script_Id\")
        )",
        "CREATE TABLE IF NOT EXISTS \"__BuildMaster_DbSchema_Seq\" AS SELECT 1 AS \"Next_Value\"",
        "CREATE TRIGGER IF NOT EXISTS \"__BuildMaster_DbSchema_Seq_Advance\"
            AFTER INSERT ON \"__BuildMaster_DbSchemaChanges\"
        BEGIN
            UPDATE \"__BuildMaster_DbSchema_Seq\" SET \"Next_Value\" = \"Next_Value\" + 1;
        END",
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_texts_reference_the_fixed_identifiers() {
        assert!(SQLITE.table_exists.contains(TRACKING_TABLE));
        assert!(SQLITE.select_records.contains(TRACKING_TABLE));
        assert!(SQLITE.insert_record.contains(SEQUENCE_NAME));
        for column in [
            COL_RELEASE,
            COL_SCRIPT_ID,
            COL_SEQUENCE,
            COL_NAME,
            COL_EXECUTED,
            COL_INDICATOR,
        ] {
            assert!(SQLITE.initialize[0].contains(column), "missing {column}");
            assert!(SQLITE.insert_record.contains(column), "missing {column}");
        }
    }

    #[test]
    fn sqlite_initialization_is_rerunnable() {
        for statement in SQLITE.initialize {
            assert!(statement.contains("IF NOT EXISTS"));
        }
    }
}
