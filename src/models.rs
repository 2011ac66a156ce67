pub mod friends;
pub mod groups;
pub mod sessions;
pub mod users;
