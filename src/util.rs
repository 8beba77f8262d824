//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Canonical form used for answer comparison: trimmed and case-folded.
pub fn normalize_answer(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Current UTC time in milliseconds.
pub fn now_millis() -> i64 {
  chrono::Utc::now().timestamp_millis()
}

/// Log-safe preview of a possibly large string (char-boundary safe).
pub fn preview(s: &str, max_chars: usize) -> String {
  let mut out: String = s.chars().take(max_chars).collect();
  if s.chars().count() > max_chars {
    out.push('…');
  }
  out
}

/// Map an arbitrary identifier to a filesystem-safe token.
pub fn sanitize_key(key: &str) -> String {
  key
    .chars()
    .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn template_replaces_every_occurrence() {
    let out = fill_template("{a} and {a} then {b}", &[("a", "x"), ("b", "y")]);
    assert_eq!(out, "x and x then y");
  }

  #[test]
  fn normalization_ignores_whitespace_and_case() {
    assert_eq!(normalize_answer(" paris "), "paris");
    assert_eq!(normalize_answer("PARIS"), normalize_answer("Paris"));
  }

  #[test]
  fn keys_are_sanitized() {
    assert_eq!(sanitize_key("archive_../etc"), "archive____etc");
    assert_eq!(preview("héllo world", 5), "héllo…");
  }
}
