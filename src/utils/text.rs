/// Characters that are not allowed in file names on common platforms.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

pub const MAX_FILENAME_CHARS: usize = 50;

pub fn strip_code_blocks(s: &str) -> String {
    let s = s.trim();
    if s.starts_with("```json") {
        s.trim_start_matches("```json").trim_end_matches("```").trim().to_string()
    } else if s.starts_with("```") {
        s.trim_start_matches("```").trim_end_matches("```").trim().to_string()
    } else {
        s.to_string()
    }
}

/// Returns at most `max` characters of `s`, never splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Turns a book title into a file stem: illegal characters removed, cut to
/// 50 characters, spaces replaced with underscores.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let stem = truncate_chars(&cleaned, MAX_FILENAME_CHARS)
        .trim()
        .replace(' ', "_");

    if stem.is_empty() {
        "untitled".to_string()
    } else {
        stem
    }
}

/// Splits prose on blank lines, trimming each paragraph and dropping empties.
pub fn split_paragraphs(body: &str) -> Vec<String> {
    let normalized = body.replace("\r\n", "\n");
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in normalized.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_blocks() {
        assert_eq!(strip_code_blocks("json"), "json");
        assert_eq!(strip_code_blocks("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("```\n{}\n```"), "{}");
        assert_eq!(strip_code_blocks("  ```json  \n  {}  \n  ```  "), "{}");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_sanitize_filename_removes_illegal_chars() {
        let name = sanitize_filename(r#"The \Dark/ *Star? of: "Doom" <Part> |One|"#);
        for c in ['\\', '/', '*', '?', ':', '"', '<', '>', '|', ' '] {
            assert!(!name.contains(c), "found {:?} in {}", c, name);
        }
        assert_eq!(name, "The_Dark_Star_of_Doom_Part_One");
    }

    #[test]
    fn test_sanitize_filename_limits_length() {
        let long_title = "A ".repeat(80);
        let name = sanitize_filename(&long_title);
        assert!(name.chars().count() <= MAX_FILENAME_CHARS);
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_sanitize_filename_empty_fallback() {
        assert_eq!(sanitize_filename("???"), "untitled");
        assert_eq!(sanitize_filename("   "), "untitled");
    }

    #[test]
    fn test_split_paragraphs() {
        let body = "First line\ncontinued.\n\n\n  Second paragraph.  \n\n   \nThird.";
        assert_eq!(
            split_paragraphs(body),
            vec![
                "First line\ncontinued.".to_string(),
                "Second paragraph.".to_string(),
                "Third.".to_string(),
            ]
        );
        assert!(split_paragraphs("  \n\n ").is_empty());
    }
}
