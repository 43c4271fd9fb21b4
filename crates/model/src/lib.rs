//! In-memory model of an emulator configuration.
//!
//! A [`Configuration`] maps every interface of a [`Profile`] to its devices,
//! and every device to an ordered list of request/response pairs. It is
//! built once, either from an INI source through the [`validate`] module or
//! by the [`random`] generator, and never mutated afterwards.
//!
//! All consumers walk the tree through [`traverse`], which fixes the
//! canonical order: interfaces in profile order, devices by numeric index,
//! pairs in declaration order. Two configurations are equal when their
//! [`canonical`] serializations are equal.
//!
//! [`Profile`]: hwemu_primitives::Profile

pub mod canonical;
pub mod configuration;
pub mod ini;
pub mod random;
pub mod render;
pub mod traverse;
pub mod validate;

pub use canonical::{compare, equal, pretty, serialize, ComparisonMismatch};
pub use configuration::{BuildError, Configuration, ConfigurationBuilder, Device, InterfaceDevices};
pub use ini::{IniDocument, ParseError};
pub use random::{default_limits, random_config, ConfigGenerator, GeneratorError};
pub use render::{render_ini, SectionStyle};
pub use traverse::{traverse, Visitor};
pub use validate::{load_file, load_str, LoadError, ValidationError, ValidationErrorKind, Validator};
