pub mod file;
pub mod memory;
pub mod store;

pub use file::FileAlertStore;
pub use memory::MemoryAlertStore;
pub use store::{AlertStore, StoreError};
