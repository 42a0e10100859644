//! Where `#INCLUDE`d files come from.

use std::{collections::HashMap, fs, io};

use camino::{Utf8Path, Utf8PathBuf};
use foxlift_foundation::{ident::CaseInsensitive, source::decode_latin1};

/// The contents of an included file.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    /// Name the file is registered under in diagnostics.
    pub filename: String,
    pub source: String,
}

pub trait IncludeLoader {
    /// Loads the file `path` refers to when written in `#INCLUDE` inside the file named
    /// `including`.
    fn load(&self, including: &str, path: &str) -> io::Result<LoadedFile>;
}

/// Reads includes from disk, relative to the directory of the including file. FoxPro sources
/// are single-byte encoded, so files are decoded as ISO-8859-1.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemLoader;

impl FileSystemLoader {
    pub fn resolve(including: &str, path: &str) -> Utf8PathBuf {
        // FoxPro sources use Windows path separators.
        let path = path.replace('\\', "/");
        match Utf8Path::new(including).parent() {
            Some(directory) => directory.join(path),
            None => Utf8PathBuf::from(path),
        }
    }
}

impl IncludeLoader for FileSystemLoader {
    fn load(&self, including: &str, path: &str) -> io::Result<LoadedFile> {
        let resolved = Self::resolve(including, path);
        let bytes = fs::read(&resolved)?;
        Ok(LoadedFile {
            filename: resolved.into_string(),
            source: decode_latin1(&bytes),
        })
    }
}

/// Serves includes from memory. File names are matched case-insensitively, like on Windows.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<CaseInsensitive<String>, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, source: &str) -> Self {
        self.files
            .insert(CaseInsensitive::new(name.to_owned()), source.to_owned());
        self
    }
}

impl IncludeLoader for MemoryLoader {
    fn load(&self, _including: &str, path: &str) -> io::Result<LoadedFile> {
        match self.files.get(CaseInsensitive::new_ref(path)) {
            Some(source) => Ok(LoadedFile {
                filename: path.to_owned(),
                source: source.clone(),
            }),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no such file in memory",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_resolve_next_to_the_including_file() {
        assert_eq!(
            FileSystemLoader::resolve("src/main.prg", "include\\foxpro.h"),
            Utf8PathBuf::from("src/include/foxpro.h")
        );
        assert_eq!(
            FileSystemLoader::resolve("main.prg", "foxpro.h"),
            Utf8PathBuf::from("foxpro.h")
        );
    }

    #[test]
    fn memory_loader_ignores_case() {
        let loader = MemoryLoader::new().with_file("FoxPro.h", "#DEFINE x 1\n");
        assert_eq!(
            loader.load("main.prg", "foxpro.H").unwrap().source,
            "#DEFINE x 1\n"
        );
        assert_eq!(
            loader.load("main.prg", "missing.h").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
