use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

static SGR_REGEX: OnceLock<Regex> = OnceLock::new();

fn sgr_regex() -> &'static Regex {
    SGR_REGEX.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").expect("SGR_REGEX is valid"))
}

/// Remove SGR (color/style) escape sequences from a line.
///
/// Only `ESC [ <digits and semicolons> m` is removed; cursor movement and other
/// control sequences pass through untouched.
pub fn strip_sgr(line: &str) -> Cow<'_, str> {
    if !line.contains('\x1b') {
        return Cow::Borrowed(line);
    }
    let re = sgr_regex();
    let mut out = re.replace_all(line, "");
    // Removing one sequence can splice the halves of another back together.
    while re.is_match(&out) {
        out = Cow::Owned(re.replace_all(&out, "").into_owned());
    }
    out
}
