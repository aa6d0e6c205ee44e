//! Study search for pacsview: the typed filter model and the compiler that
//! turns an arbitrary combination of optional criteria into one
//! parameterized SQL query (page + matching count) with correct joins,
//! predicates, ordering and pagination.

pub mod builder;
pub mod filter;
pub mod sql;

pub use builder::{CompiledSearch, QueryBuildError, StudyQuery, compile};
pub use filter::{DateOp, PageRequest, SortDirection, SortField, SortSpec, StudyFilter};
pub use sql::{BuiltQuery, SqlValue};
