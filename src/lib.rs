//! hocon-resolve: a HOCON-style substitution resolver.
//!
//! Given an already-parsed configuration tree (see [`value::ConfigValue`]),
//! this crate rewrites every unresolved `${path}`/`${?path}` reference into
//! a concrete value, merging delayed override stacks, detecting cycles, and
//! respecting required-vs-optional substitution semantics. Parsing raw
//! YAML/JSON text into that tree and driving the resolver end to end is
//! handled by the small ambient [`Config`] facade.
//!
//! # Example
//!
//! ```rust
//! use hocon_resolve::{Config, ResolveOptions};
//!
//! let yaml = r#"
//! database:
//!   host: localhost
//!   port: 5432
//! url: "postgres://${database.host}:${database.port}"
//! "#;
//!
//! let config = Config::from_yaml(yaml).unwrap();
//! let resolved = config.resolve(ResolveOptions::new()).unwrap();
//! assert_eq!(
//!     resolved.get("url").unwrap().render_scalar(),
//!     "postgres://localhost:5432"
//! );
//! ```

pub mod error;
pub mod memo;
pub mod origin;
pub mod path;
pub mod resolver;
pub mod substitution;
pub mod value;

mod config;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use origin::Origin;
pub use path::Path;
pub use resolver::{resolve, ResolveOptions};
pub use substitution::SubstitutionExpression;
pub use value::{ConfigValue, ConfigValueKind, Number, ObjectValue, ValueCategory};
