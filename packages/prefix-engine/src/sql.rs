//! Mutating statements issued by the engine, rendered as MySQL text.
//!
//! Dry runs report the rendered text. The MySQL store executes the same
//! identifiers and values, with the values bound as parameters.

use std::fmt;

/// `RENAME TABLE from TO to`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameTable {
    pub from: String,
    pub to: String,
}

impl fmt::Display for RenameTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RENAME TABLE {} TO {}",
            quote_ident(&self.from),
            quote_ident(&self.to)
        )
    }
}

/// Rewrite one row's key, bounded to a single row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyUpdate {
    pub table: String,
    pub column: String,
    pub from: String,
    pub to: String,
}

impl fmt::Display for KeyUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = quote_ident(&self.column);
        write!(
            f,
            "UPDATE {} SET {} = {} WHERE {} = {} LIMIT 1",
            quote_ident(&self.table),
            column,
            quote_literal(&self.to),
            column,
            quote_literal(&self.from)
        )
    }
}

/// Backtick-quote an identifier, doubling embedded backticks
pub fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Single-quote a string literal for display
pub fn quote_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("''"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// `LIKE` pattern matching names that start with `prefix`
///
/// `_` and `%` in the prefix are escaped so they match literally.
pub fn like_prefix_pattern(prefix: &str) -> String {
    let mut out = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rename_table_renders_quoted_identifiers() {
        let stmt = RenameTable {
            from: "wp_posts".to_string(),
            to: "foo_posts".to_string(),
        };

        assert_eq!(stmt.to_string(), "RENAME TABLE `wp_posts` TO `foo_posts`");
    }

    #[test]
    fn test_key_update_is_bounded_to_one_row() {
        let stmt = KeyUpdate {
            table: "wp_usermeta".to_string(),
            column: "meta_key".to_string(),
            from: "wp_capabilities".to_string(),
            to: "foo_capabilities".to_string(),
        };

        assert_eq!(
            stmt.to_string(),
            "UPDATE `wp_usermeta` SET `meta_key` = 'foo_capabilities' \
             WHERE `meta_key` = 'wp_capabilities' LIMIT 1"
        );
    }

    #[test]
    fn test_literals_and_identifiers_are_escaped() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(r"a\b"), r"'a\\b'");
        assert_eq!(quote_ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_prefix_pattern("wp_"), r"wp\_%");
        assert_eq!(like_prefix_pattern("a%b"), r"a\%b%");
        assert_eq!(like_prefix_pattern("site"), "site%");
    }
}
