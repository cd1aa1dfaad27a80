pub mod memory;
pub mod room;
pub mod session;
pub mod store;
