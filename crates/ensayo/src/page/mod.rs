//! Page objects for the demo site.
//!
//! Each page owns its locators and exposes intent-level operations; all
//! browser interaction goes through a borrowed [`crate::proxy::Proxy`]. Pages
//! are plain structs composed around the proxy, and mutating operations
//! return `Result<(), _>` or data rather than the page itself.

mod home;
mod login;
mod secure;

pub use home::HomePage;
pub use login::LoginPage;
pub use secure::SecureAreaPage;
