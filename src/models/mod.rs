pub mod event;
pub mod tag;
pub mod transaction;

pub use event::OrderEvent;
pub use tag::{tag_value, Tag};
pub use transaction::{Cursor, GqlBlock, GqlOwner, GqlQuantity, GqlTransaction};
