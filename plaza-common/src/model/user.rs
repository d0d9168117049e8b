use crate::model::{Id, credential::PasswordDigest};
use serde::Serialize;
use thiserror::Error;
use time::UtcDateTime;

pub const USER_NAME_MIN_LEN: usize = 2;
pub const USER_NAME_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// A user profile as served to clients. The credential digest never leaves
/// the persistence layer.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub name: UserName,
    pub email: EmailAddress,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
    pub deleted_at: Option<UtcDateTime>,
}

/// Payload for registering a user; the submitted password has already been
/// digested by the time it reaches the store.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NewUser {
    pub name: UserName,
    pub email: EmailAddress,
    pub digest: PasswordDigest,
}

/// Field subset for a partial profile update. `None` fields keep their
/// stored values.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct UserChanges {
    pub name: Option<UserName>,
    pub email: Option<EmailAddress>,
    pub digest: Option<PasswordDigest>,
}

impl UserChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.digest.is_none()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserName(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUserNameError {
    #[error("Ensure this field has at least {USER_NAME_MIN_LEN} characters.")]
    TooShort,
    #[error("Ensure this field has no more than {USER_NAME_MAX_LEN} characters.")]
    TooLong,
    #[error("Name invalid.")]
    ForbiddenCharacter,
}

/// Letters (ASCII plus the Latin-1 accented ranges) and spaces.
fn is_name_char(c: char) -> bool {
    c == ' '
        || c.is_ascii_alphabetic()
        || ('\u{C0}'..='\u{D6}').contains(&c)
        || ('\u{D8}'..='\u{F6}').contains(&c)
        || ('\u{F8}'..='\u{FF}').contains(&c)
}

impl UserName {
    pub fn new(name: String) -> Result<Self, InvalidUserNameError> {
        let len = name.chars().count();
        if len < USER_NAME_MIN_LEN {
            Err(InvalidUserNameError::TooShort)
        } else if len > USER_NAME_MAX_LEN {
            Err(InvalidUserNameError::TooLong)
        } else if name.chars().all(is_name_char) {
            Ok(Self(name))
        } else {
            Err(InvalidUserNameError::ForbiddenCharacter)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct EmailAddress(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidEmailAddressError {
    #[error("Enter a valid email address.")]
    Malformed,
    #[error("Ensure this field has no more than {EMAIL_MAX_LEN} characters.")]
    TooLong,
}

impl EmailAddress {
    pub fn new(email: String) -> Result<Self, InvalidEmailAddressError> {
        if email.chars().count() > EMAIL_MAX_LEN {
            return Err(InvalidEmailAddressError::TooLong);
        }

        let well_formed = !email.chars().any(char::is_whitespace)
            && email.rsplit_once('@').is_some_and(|(local, domain)| {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && domain.contains('.')
            });

        if well_formed {
            Ok(Self(email))
        } else {
            Err(InvalidEmailAddressError::Malformed)
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{EmailAddress, InvalidEmailAddressError, InvalidUserNameError, UserName};

    #[test]
    fn user_name_accepts_letters_and_spaces() {
        assert!(UserName::new("Ana Clara".to_owned()).is_ok());
        assert!(UserName::new("José Antônio Müller".to_owned()).is_ok());
    }

    #[test]
    fn user_name_rejects_other_characters() {
        for name in ["Ana1", "ana@", "a_b", "name\n"] {
            assert_eq!(
                UserName::new(name.to_owned()),
                Err(InvalidUserNameError::ForbiddenCharacter)
            );
        }
    }

    #[test]
    fn user_name_length_bounds() {
        assert_eq!(
            UserName::new("A".to_owned()),
            Err(InvalidUserNameError::TooShort)
        );
        assert!(UserName::new("A".repeat(100)).is_ok());
        assert_eq!(
            UserName::new("A".repeat(101)),
            Err(InvalidUserNameError::TooLong)
        );
    }

    #[test]
    fn email_accepts_common_forms() {
        for email in ["ana@x.com", "a.b+c@mail.example.org"] {
            assert!(EmailAddress::new(email.to_owned()).is_ok());
        }
    }

    #[test]
    fn email_rejects_malformed() {
        for email in ["", "ana", "ana@", "@x.com", "ana@nodot", "a b@x.com", "ana@.com"] {
            assert_eq!(
                EmailAddress::new(email.to_owned()),
                Err(InvalidEmailAddressError::Malformed)
            );
        }
    }

    #[test]
    fn email_length_bound() {
        let local = "a".repeat(95);
        assert_eq!(
            EmailAddress::new(format!("{local}@x.com")),
            Err(InvalidEmailAddressError::TooLong)
        );
    }
}
