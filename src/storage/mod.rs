pub mod records;
pub mod store;

pub use records::{ContractType, VerifyRecord};
pub use store::{Table, VanityStore};
