pub mod row;
pub mod triple;

pub use row::{ERROR_MARKER, Row, RowStatus};
pub use triple::TokenLabel;
