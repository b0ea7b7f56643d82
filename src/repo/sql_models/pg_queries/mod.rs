mod schema;
pub use schema::*;

mod document;
pub use document::*;

mod counter;
pub use counter::*;
