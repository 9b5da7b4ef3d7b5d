//! Registered users and their roles.
//!
//! Administrators list, promote and delete users through `UserManager`.

pub mod manager;
pub mod types;

pub use manager::{UserError, UserManager};
pub use types::{Role, RoleCounts, UserProfile, UserSummary};
