//! Text utilities.

/// Sanitize a page title for use as a filename.
///
/// Replaces characters that are not allowed in filenames on common
/// operating systems (Windows, macOS, Linux) with hyphens.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c if c.is_control() => '-',
            c if c.is_whitespace() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_reserved_characters() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a-b-c-d");
    }

    #[test]
    fn test_sanitize_maps_whitespace_to_underscores() {
        assert_eq!(sanitize_filename("Release Notes 2024"), "Release_Notes_2024");
    }

    #[test]
    fn test_sanitize_trims_leading_and_trailing_hyphens() {
        assert_eq!(sanitize_filename("/title/"), "title");
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_filename("リリースノート"), "リリースノート");
    }
}
