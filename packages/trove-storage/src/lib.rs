pub mod db;
pub mod lookups;
pub mod schema;
pub mod sql;
pub mod store;

mod error;

pub use error::Error;
pub use sql::{CompiledQuery, Dialect, Expr, Select, SqlValue};
pub use store::{BoxFuture, PgSearchStore, Row, RowStream, SearchStore};

pub type Result<T, E = Error> = std::result::Result<T, E>;
