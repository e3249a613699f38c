//! # Execution
//!
//! Statement execution on behalf of a [`Session`]. The only statement
//! executed here is `CREATE INDEX`, in all the forms the SQL layer lowers to
//! it: explicit indexes, primary keys and unique constraints.

pub mod ddl;
pub mod session;

pub use ddl::*;
pub use session::Session;
