//! Identifier formatting.
//!
//! Raw schema keys, property keys, parameter names and operation ids are turned
//! into exported-style names (`widget_id` -> `WidgetID`). Rust field and function
//! names are derived from those formatted names.

const COMMON_INITIALISMS: &[&str] = &[
    "ACL", "API", "ASCII", "CPU", "CSS", "DNS", "EOF", "GUID", "HTML", "HTTP", "HTTPS", "ID", "IP",
    "JSON", "LHS", "QPS", "RAM", "RHS", "RPC", "SLA", "SMTP", "SQL", "SSH", "TCP", "TLS", "TTL",
    "UDP", "UI", "UID", "UUID", "URI", "URL", "UTF8", "VM", "XML", "XMPP", "XSRF", "XSS",
];

fn is_initialism(word: &str) -> bool {
    COMMON_INITIALISMS.contains(&word)
}

/// Capitalize the first letter of every word, where a word starts after any
/// character that is not a letter, digit or underscore.
fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_separator = true;
    for c in word.chars() {
        if prev_separator {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev_separator = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Split at every uppercase character and upper-case runs that are initialisms.
fn handle_common_initialisms(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut word = String::new();

    for c in input.chars() {
        if c.is_uppercase() && !word.is_empty() {
            push_word(&mut out, &word);
            word.clear();
        }
        word.push(c);
    }
    if !word.is_empty() {
        push_word(&mut out, &word);
    }
    out
}

fn push_word(out: &mut String, word: &str) {
    let upper = word.to_uppercase();
    if is_initialism(&upper) {
        out.push_str(&upper);
    } else {
        out.push_str(word);
    }
}

/// Format a raw identifier as an exported type or field name.
///
/// ```
/// use swaggergen::generator::format_name;
///
/// assert_eq!(format_name("widget_id"), "WidgetID");
/// assert_eq!(format_name("api-key"), "APIKey");
/// ```
pub fn format_name(name: &str) -> String {
    let joined: String = name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(title_case)
        .collect();
    handle_common_initialisms(&joined)
}

/// Lower-case the first character.
pub fn lower_start(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Upper-case the first character.
pub fn upper_start(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Convert a formatted name to `snake_case`, keeping initialism runs together.
///
/// `GetWidgetByID` becomes `get_widget_by_id`, `HTTPServer` becomes `http_server`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c == '-' || c == ' ' || c == '.' {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            continue;
        }
        if c.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Name of the generated `LazyLock<Regex>` static for a pattern.
pub fn regex_static(pattern_name: &str) -> String {
    format!("REGEX_{}", to_snake_case(pattern_name).to_uppercase())
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "do", "dyn", "else", "enum",
    "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "macro",
    "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static", "struct",
    "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual", "where",
    "while", "yield",
];

/// Make an identifier safe to use as a Rust field or binding name.
///
/// Keywords become raw identifiers; the few that cannot be raw get a trailing
/// underscore.
pub fn rust_ident(name: &str) -> String {
    match name {
        "self" | "Self" | "super" | "crate" | "_" => format!("{name}_"),
        _ if RUST_KEYWORDS.contains(&name) => format!("r#{name}"),
        _ if name.starts_with(|c: char| c.is_ascii_digit()) => format!("_{name}"),
        _ => name.to_string(),
    }
}
