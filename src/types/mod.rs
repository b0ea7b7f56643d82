mod collection;
pub use collection::*;

mod filetime;
pub use filetime::*;

mod kitten;
pub use kitten::*;
