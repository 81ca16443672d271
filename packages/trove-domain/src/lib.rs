pub mod column;
pub mod feature;
pub mod model;
pub mod permissions;
pub mod text;

pub use column::{CANONICAL_COLUMNS, Column, ColumnType};
pub use feature::{Feature, FeatureSet};
pub use model::{FilterKind, SearchableModel};
pub use permissions::{CollectionVisibility, CreateQueries, PermissionSet, ViewData};
