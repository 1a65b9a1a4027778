use std::any::{self, Any, TypeId};
use std::{fs, path::Path};

use crate::error::Result;
use crate::record::{EnvValue, FieldDef};
use crate::registry::Registry;
use crate::tag::{Tag, TagOptions};
use crate::traverse::{Traverser, Visitor};

/// Tag key holding a field description, overrides the doc comment
pub const DOC_KEY: &str = "doc";

/// Documentation of a single environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldMetadata {
    pub key: String,
    pub type_name: String,
    pub default: String,
    pub description: String,
}

/// Every environment variable read by a struct, in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Documentation {
    fields: Vec<FieldMetadata>,
}

impl Documentation {
    pub fn of<T: EnvValue + Default>() -> Result<Self> {
        Self::with_options::<T>(&TagOptions::default(), &Registry::default())
    }

    pub fn with_options<T: EnvValue + Default>(
        options: &TagOptions,
        registry: &Registry,
    ) -> Result<Self> {
        let value = T::default();
        let mut visitor = DocsVisitor {
            registry,
            fields: Vec::new(),
        };
        Traverser::new(options).start(value.env_ref(), any::type_name::<T>(), &mut visitor)?;
        Ok(Self {
            fields: visitor.fields,
        })
    }

    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("## Environment Variables Summary\n\n");
        md.push_str("| Variable | Type | Description | Default |\n");
        md.push_str("|----------|------|-------------|---------|\n");
        for field in &self.fields {
            let default_display = if field.default.is_empty() {
                "-"
            } else {
                field.default.as_str()
            };
            md.push_str(&format!(
                "| {} | `{}` | {} | {} |\n",
                field.key, field.type_name, field.description, default_display
            ));
        }
        md
    }

    /// Write the markdown summary to a file
    ///
    /// # Example
    /// ```no_run
    /// use env_loadr::{Documentation, Env};
    ///
    /// #[derive(Env, Default)]
    /// pub struct Config {
    ///     /// Port to listen on
    ///     #[env(default = 8080)]
    ///     pub port: u16,
    /// }
    ///
    /// Documentation::of::<Config>().unwrap().write_docs("CONFIG.md").unwrap();
    /// ```
    pub fn write_docs(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        fs::write(path, self.to_markdown())
    }
}

struct DocsVisitor<'r> {
    registry: &'r Registry,
    fields: Vec<FieldMetadata>,
}

impl<'a> Visitor<&'a dyn Any> for DocsVisitor<'_> {
    fn is_known(&self, type_id: TypeId) -> bool {
        self.registry.can_unmarshal(type_id)
    }

    fn visit(&mut self, _: &'a dyn Any, field: &FieldDef, tag: &Tag) -> Result<()> {
        let description = field.tag(DOC_KEY).unwrap_or(field.docs);
        self.fields.push(FieldMetadata {
            key: tag.name.clone(),
            type_name: field.ty.to_string(),
            default: tag.default.clone(),
            description: description.replace('\n', " "),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Env;

    #[derive(Env, Default)]
    pub struct Database {
        /// Connection string
        pub url: String,
        #[env(doc = "Pool size", default = 4)]
        pub pool: u32,
    }

    #[derive(Env, Default)]
    pub struct Config {
        /// Port to listen on
        #[env("PORT", default = "8080")]
        pub port: u16,
        pub database: Database,
    }

    #[test]
    fn test_collects_fields() {
        let docs = Documentation::of::<Config>().unwrap();
        let keys: Vec<_> = docs.fields().iter().map(|f| f.key.as_str()).collect();
        assert_eq!(keys, vec!["PORT", "DATABASE_URL", "DATABASE_POOL"]);

        let pool = &docs.fields()[2];
        assert_eq!(pool.description, "Pool size");
        assert_eq!(pool.default, "4");
        assert_eq!(pool.type_name, "u32");
    }

    #[test]
    fn test_markdown() {
        let md = Documentation::of::<Config>().unwrap().to_markdown();

        assert!(md.starts_with("## Environment Variables Summary"));
        assert!(md.contains("| PORT | `u16` | Port to listen on | 8080 |"));
        assert!(md.contains("| DATABASE_URL | `String` | Connection string | - |"));
    }

    #[test]
    fn test_write_docs() {
        let path = std::env::temp_dir().join("env_loadr_test_docs.md");
        let docs = Documentation::of::<Config>().unwrap();
        docs.write_docs(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), docs.to_markdown());
        fs::remove_file(path).ok();
    }
}
