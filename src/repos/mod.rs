pub mod error;
pub mod user_repo;

pub use user_repo::{NewUser, PgUserRepo, StoredCredentials, UserStore};
