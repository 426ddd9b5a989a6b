pub mod config;
pub mod edges;
pub mod errors;
pub mod registry;
pub mod scalar_kind;
pub mod type_def;

pub use config::RegistrationConfig;
pub use edges::{Edge, EdgeDefinition, EdgeRegistry, JoinKey, JoinSpec};
pub use errors::GraphSchemaError;
pub use registry::{ObjectRegistry, DISTINCT_FIELD, MUTATION_TYPE, ROOT_TYPE};
pub use scalar_kind::ScalarKind;
pub use type_def::{Field, FieldSet, Shape, ShapeKind, TypeDefinition};
