//! Splits a script into the statements that get sent to the database.
//!
//! Statements are separated by a `;` line followed by a line holding only `/`,
//! the convention of SQL*Plus-style scripting tools.

use regex::Regex;
use std::sync::LazyLock;

static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\r?\n/\r?\n").expect("delimiter pattern is valid"));

/// A script broken into executable statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitScript {
    statements: Vec<String>,
    delimited: bool,
}

impl SplitScript {
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// True when the script contained at least one delimiter.
    pub fn is_delimited(&self) -> bool {
        self.delimited
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// Splits `script` on the statement delimiter.
///
/// Trailing `/` and whitespace are dropped first; nothing left means no
/// statements. Carriage returns are removed from every statement. When the
/// script was delimited, each statement gets its `;` back since the delimiter
/// consumed it; a single undelimited statement is passed through as written.
pub fn split_script(script: &str) -> SplitScript {
    let trimmed = script.trim_end_matches(|c: char| c == '/' || c.is_whitespace());
    if trimmed.trim().is_empty() {
        return SplitScript {
            statements: Vec::new(),
            delimited: false,
        };
    }

    let pieces: Vec<&str> = DELIMITER.split(trimmed).collect();
    let delimited = pieces.len() > 1;

    let statements = pieces
        .into_iter()
        .filter(|piece| !piece.trim().is_empty())
        .map(|piece| {
            let mut statement = piece.replace('\r', "");
            if delimited {
                statement.push(';');
            }
            statement
        })
        .collect();

    SplitScript {
        statements,
        delimited,
    }
}

#[cfg(test)]
mod tests {
    use super::split_script;

    #[test]
    fn two_statements_get_their_terminators_back() {
        let split = split_script("A;\n/\nB");
        assert!(split.is_delimited());
        assert_eq!(split.statements(), ["A;", "B;"]);
    }

    #[test]
    fn undelimited_script_is_one_statement_without_added_semicolon() {
        let split = split_script("CREATE TABLE t (a INTEGER);\nINSERT INTO t VALUES (1);");
        assert!(!split.is_delimited());
        assert_eq!(
            split.statements(),
            ["CREATE TABLE t (a INTEGER);\nINSERT INTO t VALUES (1);"]
        );
    }

    #[test]
    fn empty_and_slash_only_scripts_have_no_statements() {
        for script in ["", "   ", "/", "\n/\n", "  /\r\n/  \n"] {
            assert!(split_script(script).is_empty(), "{script:?} should be empty");
        }
    }

    #[test]
    fn crlf_delimiters_split_and_carriage_returns_are_stripped() {
        let split = split_script("SELECT 1;\r\n/\r\nSELECT\r\n  2");
        assert_eq!(split.statements(), ["SELECT 1;", "SELECT\n  2;"]);
    }

    #[test]
    fn k_delimiters_yield_k_plus_one_statements() {
        let script = ["a", "b", "c", "d"].join(";\n/\n");
        let split = split_script(&script);

        assert_eq!(split.len(), 4);
        assert!(split.statements().iter().all(|s| s.ends_with(';')));
        assert!(split.statements().iter().all(|s| !s.trim().is_empty()));
    }

    #[test]
    fn slash_inside_a_line_is_not_a_delimiter() {
        let split = split_script("SELECT 4 / 2;\nSELECT 1;\n/ \nSELECT 2");
        assert_eq!(split.len(), 1);
    }

    #[test]
    fn trailing_delimiter_does_not_add_an_empty_statement() {
        let split = split_script("A;\n/\nB;\n/\n");
        assert_eq!(split.statements(), ["A;", "B;;"]);
    }

    #[test]
    fn splitting_is_deterministic() {
        let script = "x;\n/\ny;\n/\nz";
        assert_eq!(split_script(script), split_script(script));
    }
}
