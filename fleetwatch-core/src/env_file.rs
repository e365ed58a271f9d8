//! Read-only lookups in a project's `.env` file

use std::collections::BTreeMap;
use std::path::Path;

/// Key holding the domain a project is served under
pub const HOSTING_DOMAIN_KEY: &str = "HOSTINGDOMAIN";

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// `export ` prefix is allowed and one pair of matching quotes is stripped.
pub fn parse(content: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Look up one key, `None` when the file or the key is missing
pub fn lookup(path: &Path, key: &str) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    parse(&content).remove(key)
}

/// The project's hosting domain, empty when unset
pub fn hosting_domain(path: &Path) -> String {
    lookup(path, HOSTING_DOMAIN_KEY).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let vars = parse(
            "# deployment\n\nHOSTINGDOMAIN=example.com\n  # indented comment\n\
             PORT = 8080\nnot a pair\n",
        );
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["HOSTINGDOMAIN"], "example.com");
        assert_eq!(vars["PORT"], "8080");
    }

    #[test]
    fn test_parse_quotes_and_export() {
        let vars = parse("export A=\"quoted value\"\nB='single'\nC=\"unbalanced\nD=a=b\n");
        assert_eq!(vars["A"], "quoted value");
        assert_eq!(vars["B"], "single");
        assert_eq!(vars["C"], "\"unbalanced");
        assert_eq!(vars["D"], "a=b");
    }

    #[test]
    fn test_hosting_domain_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(hosting_domain(&dir.path().join(".env")), "");

        std::fs::write(dir.path().join(".env"), "OTHER=1\n").unwrap();
        assert_eq!(hosting_domain(&dir.path().join(".env")), "");

        std::fs::write(dir.path().join(".env"), "HOSTINGDOMAIN=apps.test\n").unwrap();
        assert_eq!(hosting_domain(&dir.path().join(".env")), "apps.test");
    }
}
