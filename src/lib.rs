//! Decode environment variables and `.env` files into typed structs, and
//! encode them back.
//!
//! ```rust
//! use env_loadr::{Decoder, Env, Map};
//!
//! #[derive(Env, Default)]
//! pub struct Database {
//!     pub url: String,
//!     #[env(default = 4)]
//!     pub pool_size: u32,
//! }
//!
//! #[derive(Env, Default)]
//! pub struct Config {
//!     #[env("PORT,noprefix", default = 8080)]
//!     pub port: u16,
//!     pub database: Database,
//! }
//!
//! let src: Map = [("DATABASE_URL", "postgres://localhost/app")]
//!     .into_iter()
//!     .collect();
//!
//! let mut config = Config::default();
//! Decoder::new(src).decode(&mut config).unwrap();
//!
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.database.url, "postgres://localhost/app");
//! assert_eq!(config.database.pool_size, 4);
//! ```

extern crate self as env_loadr;

pub mod decode;
pub mod docs;
pub mod dotenv;
pub mod encode;
pub mod environment;
pub mod error;
pub mod lookup;
pub mod macros;
pub mod normalize;
pub mod record;
pub mod registry;
pub mod replace;
pub mod scan;
pub mod tag;
pub mod traverse;
pub mod value;

use std::path::Path;

pub use decode::{unmarshal, Decoder};
pub use docs::{Documentation, FieldMetadata};
pub use encode::{format_line, marshal, quote, Encoder, Extractor};
pub use environment::{active_environment, ActiveEnvironment};
pub use error::{format_error, BoxError, Error, Result};
pub use lookup::{environ, Chain, Environ, Lookup, LookupFn};
pub use normalize::{FieldNameNormalizer, Normalize};
pub use record::{EnvValue, Field, FieldDef, Record, ValueMut, ValueRef};
pub use registry::{MarshalEnv, Registry, UnmarshalEnv};
pub use replace::{replace_all, Replacer};
pub use scan::{parse_line, ParseError, Reader};
pub use tag::{parse_tag, PrefixMode, Tag, TagOptions, TagParseError};
pub use traverse::{Traverser, Visitor};
pub use value::{Map, Value};

// Re-export macro
pub use env_loadr_macros::Env;

/// Loading configuration from the process environment
///
/// Implemented for every `#[derive(Env)]` struct that implements [`Default`].
/// Values may reference other variables with `$VAR` or `${VAR:-default}`.
pub trait Load: EnvValue + Default {
    /// Load configuration from the environment and `.env`, panicking on errors
    fn load() -> Self {
        match Self::load_or_error() {
            Ok(config) => config,
            Err(err) => panic!("{}", format_error(&err)),
        }
    }

    /// Load configuration from the environment and `.env`, returning errors instead of panicking
    ///
    /// The `.env` files are read from the nearest directory holding a `.env`,
    /// starting at the working directory.
    fn load_or_error() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let dir = dotenv::find_dir(&cwd).unwrap_or(cwd);
        Self::load_from(dir, None)
    }

    /// Load configuration from the environment and the `.env` files of `dir`
    /// for the active environment, see [`dotenv::files`]
    fn load_from(dir: impl AsRef<Path>, active: Option<&ActiveEnvironment>) -> Result<Self> {
        dotenv::load(dir, active)?;
        decode_environ()
    }
}

impl<T: EnvValue + Default> Load for T {}

fn decode_environ<T: EnvValue + Default>() -> Result<T> {
    let mut config = T::default();
    Decoder::new(Environ)
        .replace_vars(true)
        .decode(&mut config)?;
    Ok(config)
}
