pub mod history;
pub mod permissions;
pub mod registry;
