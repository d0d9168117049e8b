//! Opaque bearer tokens.
//!
//! A token is `user_id:base64(core):base64(salt)`; only an argon2 digest of
//! the core material is stored, so a leaked token table cannot be replayed.
//! Access tokens authenticate requests; refresh tokens exist solely to be
//! exchanged and are never accepted on the resource surface.

use crate::{
    model::{Id, user::UserMarker},
    util::PositiveDuration,
};
use argon2::{Argon2, Params};
use base64::{DecodeError, Engine, display::Base64Display, prelude::BASE64_STANDARD};
use std::{
    fmt::{Debug, Display, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const AUTH_TOKEN_CORE_LEN: usize = 24;
pub const AUTH_TOKEN_SALT_LEN: usize = 18;
pub const AUTH_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;

pub const ACCESS_TOKEN_TTL: Duration = Duration::hours(1);
pub const REFRESH_TOKEN_TTL: Duration = Duration::days(30);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing auth token failed: {0}")]
pub struct AuthTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum AuthTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// What a stored token may be used for.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Unknown token kind: {0}")]
pub struct InvalidTokenKindError(String);

impl TokenKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }

    #[must_use]
    pub fn ttl(self) -> PositiveDuration {
        let ttl = match self {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        };

        PositiveDuration::new_unchecked(ttl)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenKind {
    type Err = InvalidTokenKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(TokenKind::Access),
            "refresh" => Ok(TokenKind::Refresh),
            other => Err(InvalidTokenKindError(other.to_owned())),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; AUTH_TOKEN_CORE_LEN],
    pub salt: [u8; AUTH_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct AuthTokenHash(pub Box<[u8; AUTH_TOKEN_HASH_LEN]>);

/// A stored token grant.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Authentication {
    pub user: Id<UserMarker>,
    pub kind: TokenKind,
    pub token_hash: AuthTokenHash,
    pub created_at: UtcDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Authentication {
    #[must_use]
    pub fn is_expired(&self, now: UtcDateTime) -> bool {
        self.expires_after
            .is_some_and(|ttl| self.created_at + ttl.get() < now)
    }
}

impl AuthToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<AuthTokenHash, AuthTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; AUTH_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(AuthTokenHashError)?;

        Ok(AuthTokenHash(hash))
    }
}

impl FromStr for AuthToken {
    type Err = AuthTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(AuthTokenDecodeError::NotEnoughParts)?;
        let core_part = parts.next().ok_or(AuthTokenDecodeError::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(AuthTokenDecodeError::NotEnoughParts)?;

        let user_id = i64::from_str(user_id_part)
            .map_err(AuthTokenDecodeError::InvalidUserId)?
            .into();
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| AuthTokenDecodeError::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| AuthTokenDecodeError::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for AuthToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for AuthTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AuthTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The auth token hash had an invalid length")]
pub struct InvalidAuthTokenHashError;

impl TryFrom<Box<[u8]>> for AuthTokenHash {
    type Error = InvalidAuthTokenHashError;

    fn try_from(value: Box<[u8]>) -> Result<Self, Self::Error> {
        Ok(Self(
            value.try_into().map_err(|_| InvalidAuthTokenHashError)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthToken, AuthTokenDecodeError, Authentication, TokenKind};
    use crate::model::Id;
    use std::str::FromStr;
    use time::{Duration, macros::utc_datetime};

    #[test]
    fn token_string_round_trip() {
        let token = AuthToken::generate_random(Id::new(42));
        let parsed = AuthToken::from_str(&token.as_token_str()).unwrap();

        assert_eq!(parsed, token);
    }

    #[test]
    fn token_decode_rejects_malformed_input() {
        assert!(matches!(
            AuthToken::from_str("42"),
            Err(AuthTokenDecodeError::NotEnoughParts)
        ));
        assert!(matches!(
            AuthToken::from_str("nan:AAAA:AAAA"),
            Err(AuthTokenDecodeError::InvalidUserId(_))
        ));
        assert!(matches!(
            AuthToken::from_str("42:AAAA:AAAA"),
            Err(AuthTokenDecodeError::InvalidCoreLength)
        ));
    }

    #[test]
    fn hashing_is_deterministic_per_token() {
        let token = AuthToken::generate_random(Id::new(1));
        assert_eq!(token.hash().unwrap(), token.hash().unwrap());

        let other = AuthToken::generate_random(Id::new(1));
        assert_ne!(token.hash().unwrap(), other.hash().unwrap());
    }

    #[test]
    fn token_kind_round_trip() {
        for kind in [TokenKind::Access, TokenKind::Refresh] {
            assert_eq!(TokenKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(TokenKind::from_str("bearer").is_err());
    }

    #[test]
    fn expiry_is_relative_to_creation() {
        let created_at = utc_datetime!(2026-01-01 00:00);
        let authentication = Authentication {
            user: Id::new(1),
            kind: TokenKind::Access,
            token_hash: AuthToken::generate_random(Id::new(1)).hash().unwrap(),
            created_at,
            expires_after: Some(TokenKind::Access.ttl()),
        };

        assert!(!authentication.is_expired(created_at + Duration::minutes(59)));
        assert!(authentication.is_expired(created_at + Duration::minutes(61)));

        let perpetual = Authentication {
            expires_after: None,
            ..authentication
        };
        assert!(!perpetual.is_expired(created_at + Duration::days(365)));
    }
}
