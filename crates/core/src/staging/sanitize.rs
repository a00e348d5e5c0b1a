/// Maximum length of the sanitized part of a staged name.
const MAX_SANITIZED_LEN: usize = 64;

/// Longest suffix (dot included) still treated as an extension when a name
/// has to be shortened.
const MAX_EXTENSION_LEN: usize = 16;

/// Reduces a client-supplied filename to a safe single path component.
///
/// Only the final component is kept (both `/` and `\` count as separators),
/// whitespace becomes `_`, anything outside `[A-Za-z0-9._-]` is dropped and
/// leading dots are stripped, so the result can never traverse directories or
/// be hidden.
pub fn sanitize_filename(original: &str) -> String {
    let last = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let mut out = String::with_capacity(last.len());
    for c in last.chars() {
        let mapped = if c.is_whitespace() {
            Some('_')
        } else if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            Some(c)
        } else {
            None
        };

        if let Some(c) = mapped {
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }
    }

    let trimmed = truncate_keeping_extension(out.trim_start_matches('.'));

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.' || c == '_') {
        "upload".to_string()
    } else {
        trimmed
    }
}

/// Shortens the stem so the extension survives the length cap. `name` is
/// ASCII only, so byte offsets are char boundaries.
fn truncate_keeping_extension(name: &str) -> String {
    if name.len() <= MAX_SANITIZED_LEN {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_EXTENSION_LEN => {
            let extension = &name[dot..];
            let stem_len = MAX_SANITIZED_LEN - extension.len();
            format!("{}{}", &name[..stem_len.min(dot)], extension)
        }
        _ => name[..MAX_SANITIZED_LEN].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spaces_become_underscores() {
        assert_eq!(sanitize_filename("cat photo.jpg"), "cat_photo.jpg");
        assert_eq!(sanitize_filename("a   b\tc.png"), "a_b_c.png");
    }

    #[test]
    fn test_traversal_is_stripped() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("..\\..\\boot.ini"), "boot.ini");
        assert_eq!(sanitize_filename(".."), "upload");
        assert_eq!(sanitize_filename("/"), "upload");
    }

    #[test]
    fn test_hidden_names_lose_leading_dots() {
        assert_eq!(sanitize_filename(".bashrc"), "bashrc");
    }

    #[test]
    fn test_non_ascii_dropped() {
        assert_eq!(sanitize_filename("Café résumé.jpg"), "Caf_rsum.jpg");
        assert_eq!(sanitize_filename("日本.png"), "png");
    }

    #[test]
    fn test_empty_falls_back() {
        assert_eq!(sanitize_filename(""), "upload");
        assert_eq!(sanitize_filename("???"), "upload");
    }

    #[test]
    fn test_length_is_capped() {
        let long = format!("{}.jpg", "x".repeat(200));
        assert_eq!(sanitize_filename(&long).len(), MAX_SANITIZED_LEN);
    }

    #[test]
    fn test_truncation_keeps_extension() {
        let long = format!("{}.jpeg", "x".repeat(200));
        let name = sanitize_filename(&long);
        assert!(name.ends_with("x.jpeg"), "name: {}", name);
        assert_eq!(name.len(), MAX_SANITIZED_LEN);
    }

    #[test]
    fn test_truncation_without_usable_extension() {
        let no_dot = "y".repeat(100);
        assert_eq!(sanitize_filename(&no_dot), "y".repeat(MAX_SANITIZED_LEN));

        let long_suffix = format!("a.{}", "z".repeat(100));
        assert_eq!(sanitize_filename(&long_suffix).len(), MAX_SANITIZED_LEN);
        assert!(sanitize_filename(&long_suffix).starts_with("a."));
    }
}
