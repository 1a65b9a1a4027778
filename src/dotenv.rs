use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::environment::ActiveEnvironment;
use crate::error::{Error, Result};
use crate::scan::Reader;
use crate::value::Map;

/// Names of the files read from a directory, in order of increasing priority
///
/// ```rust
/// use env_loadr::{dotenv, ActiveEnvironment};
///
/// assert_eq!(
///     dotenv::files(Some(&ActiveEnvironment::Production)),
///     vec![".env", ".env.local", ".env.prod", ".env.prod.local"],
/// );
/// ```
pub fn files(active: Option<&ActiveEnvironment>) -> Vec<String> {
    let mut names = vec![".env".to_string(), ".env.local".to_string()];
    if let Some(env) = active {
        names.push(format!(".env.{}", env));
        names.push(format!(".env.{}.local", env));
    }
    names
}

/// Returns the nearest of `start` and its ancestors holding a `.env` file
pub fn find_dir(start: impl AsRef<Path>) -> Option<PathBuf> {
    start
        .as_ref()
        .ancestors()
        .find(|dir| dir.join(".env").is_file())
        .map(Path::to_path_buf)
}

/// Reads the `.env` files of `dir` into a single map
///
/// Values of later files override earlier ones. Files that do not exist are
/// skipped. Variable references are kept as is.
pub fn read(dir: impl AsRef<Path>, active: Option<&ActiveEnvironment>) -> Result<Map> {
    let dir = dir.as_ref();
    let mut map = Map::new();

    for name in files(active) {
        let path = dir.join(&name);
        match Reader::open(&path) {
            Ok(reader) => {
                let found = reader.into_map()?;
                debug!(file = %path.display(), vars = found.len(), "read env file");
                map.merge_values(found);
            }
            Err(Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!(file = %path.display(), "env file not found, skipping");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(map)
}

/// Reads the `.env` files of `dir` and sets the variables that are not set yet
pub fn load(dir: impl AsRef<Path>, active: Option<&ActiveEnvironment>) -> Result<Map> {
    let map = read(dir, active)?;
    map.load();
    Ok(map)
}

/// Reads the `.env` files of `dir` and sets all their variables
pub fn overload(dir: impl AsRef<Path>, active: Option<&ActiveEnvironment>) -> Result<Map> {
    let map = read(dir, active)?;
    map.overload();
    Ok(map)
}
