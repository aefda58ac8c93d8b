use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use pest::Parser;
use pest_derive::Parser;
use tracing::debug;

use crate::error::LoadError;
use crate::table::RawMapping;

#[derive(Parser)]
#[grammar = "src/properties.pest"]
pub struct PropertiesParser;

/// Parse `key=value` property text. `name` is only used in errors.
pub fn parse_properties(name: &str, source: &str) -> Result<RawMapping, LoadError> {
    let mut pairs =
        PropertiesParser::parse(Rule::file, source).map_err(|err| LoadError::Syntax {
            name: name.to_owned(),
            source: Box::new(err),
        })?;

    let mut properties = RawMapping::new();
    let Some(file) = pairs.next() else {
        return Ok(properties);
    };

    for entry in file.into_inner().filter(|p| p.as_rule() == Rule::entry) {
        let mut inner = entry.into_inner();
        let (Some(key), Some(value)) = (inner.next(), inner.next()) else {
            continue;
        };
        properties.insert(key.as_str().to_owned(), value.as_str().trim().to_owned());
    }

    Ok(properties)
}

/// Fallback lookup for names that are not files on disk
pub trait ResourceProvider {
    /// Contents of the resource, or `None` if there is no such resource
    fn open(&self, name: &str) -> Result<Option<String>, LoadError>;
}

/// No bundled resources: only files on disk can be loaded
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn open(&self, _name: &str) -> Result<Option<String>, LoadError> {
        Ok(None)
    }
}

/// Resources are files under a root directory
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ResourceProvider for DirectoryResources {
    fn open(&self, name: &str) -> Result<Option<String>, LoadError> {
        read_if_exists(&self.root.join(name))
    }
}

/// Resources held in memory, e.g. compiled in with `include_str!`
#[derive(Debug, Default, Clone)]
pub struct MemoryResources(HashMap<String, String>);

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<String>) {
        self.0.insert(name.into(), contents.into());
    }
}

impl ResourceProvider for MemoryResources {
    fn open(&self, name: &str) -> Result<Option<String>, LoadError> {
        Ok(self.0.get(name).cloned())
    }
}

fn read_if_exists(path: &Path) -> Result<Option<String>, LoadError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LoadError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Reads property files from disk, falling back to a resource provider
#[derive(Debug, Default, Clone)]
pub struct Loader<P = NoResources> {
    resources: P,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: ResourceProvider> Loader<P> {
    pub fn with_resources(resources: P) -> Self {
        Self { resources }
    }

    /// Load one property source: a file path, or else a resource name
    pub fn load_source(&self, name: &str) -> Result<RawMapping, LoadError> {
        let source = match read_if_exists(Path::new(name))? {
            Some(source) => {
                debug!(name, "loaded properties from file");
                source
            }
            None => match self.resources.open(name)? {
                Some(source) => {
                    debug!(name, "loaded properties from resource");
                    source
                }
                None => {
                    return Err(LoadError::NotFound {
                        name: name.to_owned(),
                    });
                }
            },
        };
        parse_properties(name, &source)
    }

    /// Load every source in order; later sources override earlier ones
    pub fn load<I, S>(&self, names: I) -> Result<RawMapping, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut merged = RawMapping::new();
        for name in names {
            merged.extend(self.load_source(name.as_ref())?);
        }
        Ok(merged)
    }
}
