//! Resolve `${key}` placeholders across key/value property mappings.
//!
//! ```
//! let resolved = propres::resolve([[
//!     ("name", "${first.name} ${last.name}"),
//!     ("first.name", "Tom"),
//!     ("last.name", "Hanks"),
//! ]])
//! .unwrap();
//! assert_eq!(resolved["name"], "Tom Hanks");
//! ```

pub mod ast;
pub mod error;
pub mod loader;
pub mod parser;
pub mod resolver;
pub mod table;

pub use ast::{Token, TokenSequence};
pub use error::{LoadError, ParseError, ResolveError};
pub use loader::{
    DirectoryResources, Loader, MemoryResources, NoResources, ResourceProvider, parse_properties,
};
pub use parser::tokenize;
pub use resolver::{
    Resolution, ResolvedMapping, Resolver, ResolverOptions, SelfReferencePolicy, render, resolve,
};
pub use table::{RawMapping, TokenTable, consolidate};
