use dashmap::DashMap;

/// Turns a struct field name into an environment variable name
///
/// Implementations must never return an empty string for a non-empty name.
pub trait Normalize: Send + Sync {
    fn normalize(&self, name: &str) -> String;
}

impl<F> Normalize for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, name: &str) -> String {
        self(name)
    }
}

/// Normalizes field names to upper snake case, e.g. `MyFieldName` and
/// `my_field_name` both become `MY_FIELD_NAME`.
///
/// Results are cached, a single instance can be shared between threads.
#[derive(Debug, Default)]
pub struct FieldNameNormalizer {
    cache: DashMap<String, String>,
}

impl FieldNameNormalizer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Normalize for FieldNameNormalizer {
    fn normalize(&self, name: &str) -> String {
        if let Some(hit) = self.cache.get(name) {
            return hit.value().clone();
        }

        let normalized = normalize_field_name(name);
        self.cache.insert(name.to_string(), normalized.clone());
        normalized
    }
}

/// Reports whether `name` only contains `A-Z`, `0-9` and `_`
pub fn is_normalized(name: &str) -> bool {
    name.bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_')
}

/// Converts `name` to upper snake case without caching.
///
/// Already normalized names are returned as is, so `FOO123` stays `FOO123`
/// while `Foo123` becomes `FOO_123`. Words are split:
///
/// - on any character that is not ASCII alphanumeric (`my_field`),
/// - between a lowercase and an uppercase letter (`myField`),
/// - before the last letter of an uppercase run followed by a lowercase
///   letter (`FOOBar`),
/// - between a letter and a digit, only when the three preceding characters
///   are all letters (`Foo123`, but `S3` and `Ec2` stay together),
/// - between a digit and a letter (`123Bar`, `123BAR`).
///
/// Acronyms mixed with lowercase letters split in unexpected places:
/// `PostgreSQL` becomes `POSTGRE_SQL` and `IPv4` becomes `I_PV_4`. Use an
/// explicit name in the tag for those.
pub fn normalize_field_name(name: &str) -> String {
    if is_normalized(name) {
        return name.to_string();
    }

    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    let mut word_len = 0;

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_ascii_alphanumeric() {
            word_len = 0;
            continue;
        }

        if word_len > 0 {
            if is_word_start(&chars, i) {
                out.push('_');
                word_len = 0;
            }
        } else if !out.is_empty() {
            out.push('_');
        }

        out.push(c.to_ascii_uppercase());
        word_len += 1;
    }

    if out.is_empty() {
        name.to_uppercase()
    } else {
        out
    }
}

// i > 0 and chars[i - 1] is alphanumeric
fn is_word_start(chars: &[char], i: usize) -> bool {
    let (prev, cur) = (chars[i - 1], chars[i]);
    let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());

    if cur.is_ascii_uppercase() {
        prev.is_ascii_lowercase()
            || prev.is_ascii_digit()
            || (prev.is_ascii_uppercase() && next_is_lower)
    } else if cur.is_ascii_digit() {
        prev.is_ascii_alphabetic()
            && i >= 3
            && chars[i - 3..i].iter().all(|c| c.is_ascii_alphabetic())
    } else {
        prev.is_ascii_digit()
    }
}
