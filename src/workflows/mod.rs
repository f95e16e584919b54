pub mod cancel;

pub use cancel::{cancel, CancelError, CancelReceipt, OrderSide};
