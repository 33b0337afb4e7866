pub mod event;
pub mod session;
pub mod store;
pub mod timer;
