pub mod inventory;
pub mod loan;
pub mod pagination;
pub mod ping;
pub mod read;
pub mod tag;
