//! Bearer credential verification shared by the REST layer and the realtime
//! handshake. Tokens are issued elsewhere; this side only checks them.

mod extract;
mod jwt;

pub use extract::{bearer_token, AuthUser};
pub use jwt::{AuthError, JwtVerifier, USER_ID_CLAIMS};
