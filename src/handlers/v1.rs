pub mod friends;
pub mod groups;
