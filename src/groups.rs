pub mod plan;
pub mod roles;
pub mod service;
pub mod succession;


pub use service::GroupService;
