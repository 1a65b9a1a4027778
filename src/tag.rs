use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::normalize::{FieldNameNormalizer, Normalize};
use crate::record::FieldDef;

/// Default key of the tag holding the variable name and options
pub const ENV_KEY: &str = "env";
/// Default key of the tag holding the default value
pub const DEFAULT_KEY: &str = "default";

const IGNORE: &str = "-";
const INLINE: &str = "inline";
const INCLUDE: &str = "include";
const NO_PREFIX: &str = "noprefix";

pub(crate) const PANIC_NORMALIZER_EMPTY_NAME: &str =
    "env_loadr: normalizer returned an empty name for a non-empty field name";

static SHARED_NORMALIZER: LazyLock<Arc<FieldNameNormalizer>> =
    LazyLock::new(|| Arc::new(FieldNameNormalizer::new()));

/// Resolved configuration of a single struct field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag {
    /// Environment variable name, without any prefix
    pub name: String,
    /// Value used when the variable is not set
    pub default: String,
    /// Skip the field
    pub ignore: bool,
    /// Traverse a nested struct without adding a prefix
    pub inline: bool,
    /// Process every field of a nested struct even in strict mode
    pub include: bool,
    /// Do not prefix the field's name with its parents' names
    pub no_prefix: bool,
}

impl Tag {
    /// Reports whether neither a name nor a directive is set. The default
    /// value is not taken into account.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && !self.ignore
            && !self.inline
            && !self.include
            && !self.no_prefix
    }

    pub fn should_ignore(&self) -> bool {
        self.ignore || self.name.is_empty()
    }
}

/// A tag string contained options that are not understood
///
/// The usable part of the tag is kept in `tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagParseError {
    pub tag_string: String,
    pub unsupported: Vec<String>,
    pub tag: Tag,
}

impl fmt::Display for TagParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error while parsing tag `{}`: unsupported tag options [{}]",
            self.tag_string,
            self.unsupported.join(", ")
        )
    }
}

impl std::error::Error for TagParseError {}

/// Parses a tag string of the form `NAME,option,option`.
///
/// `-` as name ignores the field regardless of any options. Options are
/// matched after trimming whitespace, empty options are allowed.
///
/// ```rust
/// use env_loadr::parse_tag;
///
/// let tag = parse_tag("PORT,noprefix").unwrap();
/// assert_eq!(tag.name, "PORT");
/// assert!(tag.no_prefix);
/// ```
pub fn parse_tag(s: &str) -> Result<Tag, TagParseError> {
    let mut tag = Tag::default();
    let unsupported = parse_into(&mut tag, s);
    if unsupported.is_empty() {
        Ok(tag)
    } else {
        Err(TagParseError {
            tag_string: s.to_string(),
            unsupported,
            tag,
        })
    }
}

fn parse_into(tag: &mut Tag, s: &str) -> Vec<String> {
    let mut parts = s.split(',');
    let name = parts.next().unwrap_or_default();
    if name == IGNORE {
        tag.ignore = true;
        return Vec::new();
    }

    tag.name = name.to_string();

    let mut unsupported = Vec::new();
    for opt in parts {
        match opt.trim() {
            "" => {}
            INLINE => tag.inline = true,
            INCLUDE => tag.include = true,
            NO_PREFIX => tag.no_prefix = true,
            _ => unsupported.push(opt.to_string()),
        }
    }
    unsupported
}

/// How nested struct names build the prefix of their fields' names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrefixMode {
    /// Every ancestor contributes, `OUTER_INNER_FIELD`
    #[default]
    Cumulative,
    /// Only the direct parent contributes, `INNER_FIELD`
    Immediate,
}

/// Settings used to turn struct fields into tags
#[derive(Clone)]
pub struct TagOptions {
    pub env_key: String,
    pub default_key: String,
    /// When `None`, field names are used as is
    pub normalizer: Option<Arc<dyn Normalize>>,
    /// Only fields with an env tag are processed
    pub strict_tags: bool,
    pub prefix_mode: PrefixMode,
    /// Return tag errors instead of logging them and using what could be parsed
    pub fail_on_unsupported: bool,
}

impl Default for TagOptions {
    fn default() -> Self {
        let normalizer: Arc<dyn Normalize> = SHARED_NORMALIZER.clone();
        Self {
            env_key: ENV_KEY.to_string(),
            default_key: DEFAULT_KEY.to_string(),
            normalizer: Some(normalizer),
            strict_tags: false,
            prefix_mode: PrefixMode::default(),
            fail_on_unsupported: false,
        }
    }
}

impl fmt::Debug for TagOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagOptions")
            .field("env_key", &self.env_key)
            .field("default_key", &self.default_key)
            .field("normalizer", &self.normalizer.is_some())
            .field("strict_tags", &self.strict_tags)
            .field("prefix_mode", &self.prefix_mode)
            .field("fail_on_unsupported", &self.fail_on_unsupported)
            .finish()
    }
}

impl TagOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env_key(mut self, key: impl Into<String>) -> Self {
        self.env_key = key.into();
        self
    }

    /// An empty key disables default values
    pub fn with_default_key(mut self, key: impl Into<String>) -> Self {
        self.default_key = key.into();
        self
    }

    pub fn with_normalizer(mut self, normalizer: impl Normalize + 'static) -> Self {
        self.normalizer = Some(Arc::new(normalizer));
        self
    }

    pub fn without_normalizer(mut self) -> Self {
        self.normalizer = None;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_tags = strict;
        self
    }

    pub fn with_prefix_mode(mut self, mode: PrefixMode) -> Self {
        self.prefix_mode = mode;
        self
    }

    pub fn fail_on_unsupported(mut self, fail: bool) -> Self {
        self.fail_on_unsupported = fail;
        self
    }

    /// Resolves the tag of a field.
    ///
    /// Unexported fields, and untagged fields when `strict` is set, are
    /// ignored. A missing name is derived from the field name. On error the
    /// returned [`TagParseError`] still carries the fully resolved tag.
    ///
    /// # Panics
    ///
    /// When the normalizer returns an empty name for a non-empty field name.
    pub fn resolve_field(&self, field: &FieldDef, strict: bool) -> Result<Tag, TagParseError> {
        let mut tag = Tag::default();
        if !field.exported {
            tag.ignore = true;
            return Ok(tag);
        }

        let raw = field.tag(&self.env_key);
        let unsupported = match raw {
            Some(s) => parse_into(&mut tag, s),
            None if strict => {
                tag.ignore = true;
                return Ok(tag);
            }
            None => Vec::new(),
        };

        if !tag.ignore {
            if tag.name.is_empty() {
                tag.name = self.normalize(field.name);
            }
            if !self.default_key.is_empty() {
                if let Some(default) = field.tag(&self.default_key) {
                    tag.default = default.to_string();
                }
            }
        }

        if unsupported.is_empty() {
            Ok(tag)
        } else {
            Err(TagParseError {
                tag_string: raw.unwrap_or_default().to_string(),
                unsupported,
                tag,
            })
        }
    }

    fn normalize(&self, name: &str) -> String {
        let Some(normalizer) = &self.normalizer else {
            return name.to_string();
        };

        let normalized = normalizer.normalize(name);
        if normalized.is_empty() && !name.is_empty() {
            panic!("{}", PANIC_NORMALIZER_EMPTY_NAME);
        }
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &'static str, tags: &'static [(&'static str, &'static str)]) -> FieldDef {
        FieldDef {
            name,
            ty: "String",
            exported: true,
            tags,
            docs: "",
        }
    }

    #[test]
    fn test_parse_tag() {
        let tests = [
            ("", Tag::default()),
            (
                "-",
                Tag {
                    ignore: true,
                    ..Tag::default()
                },
            ),
            (
                "-,inline",
                Tag {
                    ignore: true,
                    ..Tag::default()
                },
            ),
            (
                "foo",
                Tag {
                    name: "foo".to_string(),
                    ..Tag::default()
                },
            ),
            (
                "foo,inline",
                Tag {
                    name: "foo".to_string(),
                    inline: true,
                    ..Tag::default()
                },
            ),
            (
                ",include",
                Tag {
                    include: true,
                    ..Tag::default()
                },
            ),
            (
                "foo, noprefix ,,",
                Tag {
                    name: "foo".to_string(),
                    no_prefix: true,
                    ..Tag::default()
                },
            ),
        ];

        for (input, want) in tests {
            assert_eq!(parse_tag(input).unwrap(), want, "{:?}", input);
        }
    }

    #[test]
    fn test_parse_tag_unsupported() {
        let err = parse_tag(",extra1,include,extra2").unwrap_err();
        assert_eq!(err.unsupported, vec!["extra1", "extra2"]);
        assert_eq!(
            err.tag,
            Tag {
                include: true,
                ..Tag::default()
            }
        );

        let err = parse_tag(",extra1 ,noprefix,extra2,").unwrap_err();
        assert_eq!(err.unsupported, vec!["extra1 ", "extra2"]);
        assert!(err.tag.no_prefix);
        assert_eq!(
            err.to_string(),
            "error while parsing tag `,extra1 ,noprefix,extra2,`: unsupported tag options [extra1 , extra2]"
        );
    }

    #[test]
    fn test_tag_predicates() {
        assert!(Tag::default().is_empty());
        assert!(Tag::default().should_ignore());

        let include = parse_tag(",include").unwrap();
        assert!(!include.is_empty());
        assert!(include.should_ignore());

        let named = parse_tag("FOO").unwrap();
        assert!(!named.should_ignore());

        let only_default = Tag {
            default: "80".to_string(),
            ..Tag::default()
        };
        assert!(only_default.is_empty());
    }

    #[test]
    fn test_resolve_field() {
        let opts = TagOptions::default();

        let tag = opts.resolve_field(&field("FooBar", &[]), false).unwrap();
        assert_eq!(tag.name, "FOO_BAR");

        let tag = opts
            .resolve_field(&field("port", &[("env", "HTTP_PORT"), ("default", "80")]), false)
            .unwrap();
        assert_eq!(tag.name, "HTTP_PORT");
        assert_eq!(tag.default, "80");

        let tag = opts
            .resolve_field(&field("nested", &[("env", ",inline")]), false)
            .unwrap();
        assert_eq!(tag.name, "NESTED");
        assert!(tag.inline);
    }

    #[test]
    fn test_resolve_ignored_field_has_no_default() {
        let opts = TagOptions::default();
        let tag = opts
            .resolve_field(&field("foo", &[("env", "-"), ("default", "bar")]), false)
            .unwrap();

        assert!(tag.should_ignore());
        assert_eq!(tag.name, "");
        assert_eq!(tag.default, "");
    }

    #[test]
    fn test_resolve_strict() {
        let opts = TagOptions::default();
        assert!(opts
            .resolve_field(&field("foo", &[("default", "bar")]), true)
            .unwrap()
            .should_ignore());

        let tag = opts.resolve_field(&field("foo", &[("env", "")]), true).unwrap();
        assert_eq!(tag.name, "FOO");
    }

    #[test]
    fn test_resolve_unexported() {
        let def = FieldDef {
            exported: false,
            ..field("foo", &[("env", "FOO")])
        };
        assert!(TagOptions::default().resolve_field(&def, false).unwrap().ignore);
    }

    #[test]
    fn test_resolve_custom_keys() {
        let opts = TagOptions::new().with_env_key("var").with_default_key("");
        let tag = opts
            .resolve_field(&field("foo", &[("var", "QUX"), ("default", "bar")]), false)
            .unwrap();

        assert_eq!(tag.name, "QUX");
        assert_eq!(tag.default, "");
    }

    #[test]
    fn test_resolve_without_normalizer() {
        let opts = TagOptions::new().without_normalizer();
        let tag = opts.resolve_field(&field("fooBar", &[]), false).unwrap();
        assert_eq!(tag.name, "fooBar");
    }

    #[test]
    fn test_resolve_unsupported_keeps_tag() {
        let opts = TagOptions::default();
        let err = opts
            .resolve_field(&field("foo", &[("env", ",weird"), ("default", "x")]), false)
            .unwrap_err();

        assert_eq!(err.unsupported, vec!["weird"]);
        assert_eq!(err.tag.name, "FOO");
        assert_eq!(err.tag.default, "x");
    }

    #[test]
    #[should_panic(expected = "normalizer returned an empty name")]
    fn test_resolve_empty_normalizer_panics() {
        let opts = TagOptions::new().with_normalizer(|_: &str| String::new());
        let _ = opts.resolve_field(&field("foo", &[]), false);
    }
}
