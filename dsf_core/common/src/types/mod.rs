pub mod field_type;
pub mod model;
pub mod relation;
pub mod schema;

pub use field_type::FieldType;
pub use model::{ColumnConstraint, FieldHint, ModelDefinition, ResourceIdentity, SchemaHints};
pub use relation::{Relation, ResourceKind};
pub use schema::{Constraints, SchemaField, StreamSchema, Watermark};
