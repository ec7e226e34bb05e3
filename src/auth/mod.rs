pub mod actor;
pub mod jwt;

pub use actor::{Actor, Role};
pub use jwt::{create_access_token, verify_jwt, Claims};
