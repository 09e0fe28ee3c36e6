//! Role and permission model shared by the route guard and the menu builder.

pub mod guard;
pub mod menu;
pub mod page;
pub mod permission;
pub mod policy;
pub mod role;

pub use page::Page;
pub use permission::PermissionSet;
pub use policy::allow;
pub use role::Role;
