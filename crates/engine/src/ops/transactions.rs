mod list;
mod transfer;
mod write;

pub use list::TransactionListFilter;
