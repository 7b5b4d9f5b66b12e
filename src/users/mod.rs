pub mod memory;
pub mod model;
pub mod pg;
pub mod store;

pub use memory::MemoryUserStore;
pub use model::{Book, User, NO_AUTHOR};
pub use pg::PgUserStore;
pub use store::{StoreError, UserStore};
