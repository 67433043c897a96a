//! Various unrelated utilities.

pub use self::worklist::Worklist;

mod worklist;
