pub const BULLET: &str = "• ";
const BULLET_CHAR: char = '•';

/// Articles, short prepositions and coordinating conjunctions kept lowercase
/// inside a title.
const MINOR_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "for", "so", "yet", "as", "at", "by", "in",
    "of", "off", "on", "per", "to", "up", "via",
];

pub fn capitalize_first_letter(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Capitalizes major words and lowercases minor ones. The first and last
/// words are always capitalized. Runs of whitespace collapse to one space.
pub fn proper_title_case(s: &str) -> String {
    let words: Vec<&str> = s.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            if i != 0 && i != last && MINOR_WORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize_first_letter(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Uppercases the first letter after optional leading whitespace and an
/// optional `•`, `-` or `*` list marker.
pub fn capitalize_text(s: &str) -> String {
    let body_start = s
        .char_indices()
        .find(|&(_, c)| !c.is_whitespace() && c != BULLET_CHAR && c != '-' && c != '*')
        .map(|(i, _)| i);
    let Some(at) = body_start else {
        return s.to_string();
    };
    // Only skip a single marker; "--x" keeps its second dash.
    let prefix = &s[..at];
    let markers = prefix
        .chars()
        .filter(|c| *c == BULLET_CHAR || *c == '-' || *c == '*')
        .count();
    if markers > 1 {
        return s.to_string();
    }
    format!("{}{}", prefix, capitalize_first_letter(&s[at..]))
}

pub fn capitalize_multiline_text(s: &str) -> String {
    s.split('\n')
        .map(capitalize_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Applied on every edit of a bulleted field. An emptied field stays empty.
pub fn ensure_bullet_prefix(value: &str) -> String {
    if value.is_empty() || value.starts_with(BULLET) {
        return value.to_string();
    }
    let rest = value.trim_start();
    let rest = rest
        .strip_prefix(BULLET_CHAR)
        .map(str::trim_start)
        .unwrap_or(rest);
    format!("{}{}", BULLET, rest)
}

/// True when a bulleted field holds nothing but markers and whitespace.
pub fn is_blank_bullets(value: &str) -> bool {
    value.chars().all(|c| c.is_whitespace() || c == BULLET_CHAR)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulletEdit {
    pub value: String,
    /// Cursor position in characters.
    pub cursor: usize,
}

fn byte_offset(value: &str, cursor: usize) -> usize {
    value
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(value.len())
}

/// Enter inside a bulleted field starts a new bullet.
pub fn insert_newline(value: &str, cursor: usize) -> BulletEdit {
    let cursor = cursor.min(value.chars().count());
    let at = byte_offset(value, cursor);
    let inserted = format!("\n{}", BULLET);
    let mut out = String::with_capacity(value.len() + inserted.len());
    out.push_str(&value[..at]);
    out.push_str(&inserted);
    out.push_str(&value[at..]);
    BulletEdit {
        value: out,
        cursor: cursor + inserted.chars().count(),
    }
}

/// Backspace removes a whole `• ` marker when the cursor sits right after one.
pub fn backspace(value: &str, cursor: usize) -> BulletEdit {
    let cursor = cursor.min(value.chars().count());
    if cursor == 0 {
        return BulletEdit {
            value: value.to_string(),
            cursor,
        };
    }
    let width = if cursor >= 2 {
        let start = byte_offset(value, cursor - 2);
        let end = byte_offset(value, cursor);
        if &value[start..end] == BULLET {
            2
        } else {
            1
        }
    } else {
        1
    };
    let start = byte_offset(value, cursor - width);
    let end = byte_offset(value, cursor);
    let mut out = String::with_capacity(value.len());
    out.push_str(&value[..start]);
    out.push_str(&value[end..]);
    BulletEdit {
        value: out,
        cursor: cursor - width,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    CapitalizeFirst,
    TitleCase,
    Capitalize,
    CapitalizeMultiline,
}

impl TextStyle {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "capitalizeFirst" => Some(Self::CapitalizeFirst),
            "titleCase" => Some(Self::TitleCase),
            "capitalize" => Some(Self::Capitalize),
            "capitalizeMultiline" => Some(Self::CapitalizeMultiline),
            _ => None,
        }
    }

    pub fn apply(self, s: &str) -> String {
        match self {
            Self::CapitalizeFirst => capitalize_first_letter(s),
            Self::TitleCase => proper_title_case(s),
            Self::Capitalize => capitalize_text(s),
            Self::CapitalizeMultiline => capitalize_multiline_text(s),
        }
    }
}
