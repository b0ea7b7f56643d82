mod counter_record;
pub use counter_record::*;

mod pg_queries;
pub use pg_queries::*;
