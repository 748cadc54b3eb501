//! Gitignore glob to regular expression translation.

/// Matches zero or more leading path segments.
const ANY_SEGMENTS: &str = "(?:.*/)?";
/// Matches the path itself or anything beneath it.
const ANY_SUFFIX: &str = "(?:/.*)?";

/// Translate a gitignore pattern into an anchored regular expression.
///
/// `pattern` is the pattern with any `!` prefix and trailing `/` already
/// removed; `directory_only` records whether the trailing `/` was present.
/// `scope_dir` is the `/`-separated directory holding the ignore file, empty
/// for the project root.
///
/// The produced expression matches `/`-separated paths relative to the project
/// root:
///
/// - in a nested scope, a pattern without a leading `/` is prefixed by the
///   scope directory; a leading `/` anchors it to the project root instead
/// - a pattern without any `/` matches at any depth under its scope
/// - a leading `*.` also matches at any depth
/// - `**/` matches zero or more segments, `/**` an optional suffix, and any
///   other `**` anything at all
/// - `*` and `?` never cross a `/`
/// - `[...]`, `[!...]` classes, `{a,b}` alternatives and `\` escapes follow
///   the usual glob rules
/// - directory-only patterns also cover everything beneath the directory
///
/// The function is pure; compiling the result is up to the caller.
pub fn glob_to_regex(pattern: &str, directory_only: bool, scope_dir: &str) -> String {
    let anchored = pattern.starts_with('/');
    let body = pattern.strip_prefix('/').unwrap_or(pattern);
    let floating = !pattern.contains('/');

    let mut regex = String::with_capacity(body.len() * 2 + scope_dir.len() + 16);
    regex.push('^');

    if !scope_dir.is_empty() && !anchored {
        regex.push_str(&regex::escape(scope_dir));
        regex.push('/');
    }

    if floating || (!anchored && scope_dir.is_empty() && body.starts_with("*.")) {
        regex.push_str(ANY_SEGMENTS);
    }

    translate(body, &mut regex);

    if directory_only {
        regex.push_str(ANY_SUFFIX);
    }

    regex.push('$');
    regex
}

/// Translate glob syntax into regex syntax, appending to `out`.
fn translate(glob: &str, out: &mut String) {
    let chars: Vec<char> = glob.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let rest = &chars[i..];
        match rest {
            ['*', '*', '/', ..] => {
                out.push_str(ANY_SEGMENTS);
                i += 3;
            }
            ['/', '*', '*'] => {
                out.push_str(ANY_SUFFIX);
                i += 3;
            }
            ['*', '*', ..] => {
                out.push_str(".*");
                i += 2;
            }
            ['*', ..] => {
                out.push_str("[^/]*");
                i += 1;
            }
            ['?', ..] => {
                out.push_str("[^/]");
                i += 1;
            }
            ['[', ..] => match translate_class(rest) {
                Some((class, consumed)) => {
                    out.push_str(&class);
                    i += consumed;
                }
                None => {
                    out.push_str("\\[");
                    i += 1;
                }
            },
            ['{', ..] => match translate_alternatives(rest) {
                Some((group, consumed)) => {
                    out.push_str(&group);
                    i += consumed;
                }
                None => {
                    out.push_str("\\{");
                    i += 1;
                }
            },
            ['\\', escaped, ..] => {
                push_literal(*escaped, out);
                i += 2;
            }
            [c, ..] => {
                push_literal(*c, out);
                i += 1;
            }
            [] => break,
        }
    }
}

/// Translate a `[...]` class starting at `chars[0]`.
///
/// Returns the regex class and the number of glob characters consumed, or
/// `None` when the class is never closed.
fn translate_class(chars: &[char]) -> Option<(String, usize)> {
    let mut class = String::from("[");
    let mut i = 1;

    if matches!(chars.get(i), Some('!' | '^')) {
        class.push('^');
        i += 1;
    }

    // A `]` right after the opening bracket is a literal member.
    if chars.get(i) == Some(&']') {
        class.push_str("\\]");
        i += 1;
    }

    while let Some(&c) = chars.get(i) {
        match c {
            ']' => {
                class.push(']');
                return Some((class, i + 1));
            }
            '\\' => {
                let escaped = *chars.get(i + 1)?;
                if !escaped.is_ascii_alphanumeric() {
                    class.push('\\');
                }
                class.push(escaped);
                i += 2;
            }
            '[' | '&' | '~' | '^' => {
                class.push('\\');
                class.push(c);
                i += 1;
            }
            '/' => return None,
            _ => {
                class.push(c);
                i += 1;
            }
        }
    }

    None
}

/// Translate a `{a,b}` group starting at `chars[0]`.
fn translate_alternatives(chars: &[char]) -> Option<(String, usize)> {
    let close = chars.iter().position(|&c| c == '}')?;
    let inner: String = chars[1..close].iter().collect();

    let alternatives: Vec<String> = inner
        .split(',')
        .map(|alt| {
            let mut out = String::new();
            translate(alt, &mut out);
            out
        })
        .collect();

    Some((format!("(?:{})", alternatives.join("|")), close + 1))
}

fn push_literal(c: char, out: &mut String) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}
