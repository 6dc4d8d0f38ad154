pub mod registration;
pub mod tx;
pub mod wishlist;

pub use tx::{Transaction, TransactionScope, run_in_transaction};
