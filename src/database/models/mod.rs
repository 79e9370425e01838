pub mod role;
pub mod tenant;
pub mod user;

pub use role::Role;
pub use tenant::Tenant;
pub use user::User;
