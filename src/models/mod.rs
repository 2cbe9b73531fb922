pub mod event;
pub mod party;
pub mod request;
