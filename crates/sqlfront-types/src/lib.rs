//! Types shared by every stage of the sqlfront pipeline: the SQL type
//! lattice, operator kinds, constant values, built-in function signatures,
//! and the schema catalog the resolver binds names against.

pub mod datetime;
pub mod method;
pub mod operator;
pub mod schema;
pub mod sql_type;
pub mod value;

pub use method::{MethodMatch, MethodRegistry, ParamType, ResultRule, SqlMethod, methods};
pub use operator::{BinaryOperator, UnaryOperator};
pub use schema::{
    Catalog, Column, ColumnDescriptor, ColumnId, DescriptorRef, ForeignKeyDescriptor, Table,
    TableDescriptor, TableId, TableOrigin,
};
pub use sql_type::{BaseType, Builtin, DerivedType, SqlType, TypeRegistry, registry};
pub use value::{Literal, quote_string};
