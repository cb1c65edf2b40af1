//! `${VAR}` expansion inside manifest lines.
//!
//! Only the braced form with an upper-case POSIX name is expanded, so text
//! such as `$HOME` or `${lower}` passes through untouched.

use tracing::warn;

/// Expand `${NAME}` references using `lookup`; unknown names are left as written
pub fn expand_env_vars<F>(line: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        if is_var_name(name) {
            match lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    warn!(variable = name, "environment variable is not set; leaving reference as written");
                    out.push_str(&rest[start..start + end + 3]);
                },
            }
        } else {
            out.push_str(&rest[start..start + end + 3]);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
