pub mod catalog;
pub mod catalog_sync;
pub mod mail;
pub mod password;
pub mod providers;
pub mod tokens;
pub mod users;

pub use catalog::CatalogService;
pub use catalog_sync::{CatalogSynchronizer, SyncReport};
pub use mail::{LogMailer, Mailer, SmtpMailer};
pub use tokens::{Claims, JwtTokenProvider};
pub use users::UserService;
