pub mod codec;
pub mod context;
pub mod password;
pub mod principal;
pub mod role;
pub mod rules;
pub mod token_service;

pub use codec::{SigningConfig, TokenClaims, TokenCodec, TokenError};
pub use context::AuthContext;
pub use password::{BcryptVerifier, PasswordVerifier};
pub use principal::{AccountStatus, Principal, PrincipalResolver, ResolveError};
pub use role::Role;
pub use rules::{Denial, PathList, RuleTable};
pub use token_service::{IssuedToken, TokenService};
