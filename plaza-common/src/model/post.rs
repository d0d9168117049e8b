use crate::model::{
    Id,
    user::{UserMarker, UserName},
};
use serde::Serialize;
use thiserror::Error;
use time::UtcDateTime;

pub const POST_TITLE_MAX_LEN: usize = 100;
pub const IMAGE_URL_MAX_LEN: usize = 255;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// The author fields embedded in a post detail or listing.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PostAuthor {
    pub id: Id<UserMarker>,
    pub name: UserName,
}

/// A post with its author resolved, as served on detail, list and update
/// responses.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: PostTitle,
    pub content: PostBody,
    pub image_url: Option<ImageUrl>,
    pub user: PostAuthor,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

/// A post carrying only the author's id, as returned from creation.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct PartialPost {
    pub id: Id<PostMarker>,
    pub title: PostTitle,
    pub content: PostBody,
    pub image_url: Option<ImageUrl>,
    pub user: Id<UserMarker>,
    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NewPost {
    pub title: PostTitle,
    pub content: PostBody,
    pub image_url: Option<ImageUrl>,
}

/// Field subset for a partial post update. The outer `Option` on
/// `image_url` distinguishes "not provided" from "provided as empty/null",
/// which clears the stored value.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct PostChanges {
    pub title: Option<PostTitle>,
    pub content: Option<PostBody>,
    pub image_url: Option<Option<ImageUrl>>,
}

impl PostChanges {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.image_url.is_none()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct PostTitle(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostTitleError {
    #[error("The title cannot be blank.")]
    Blank,
    #[error("The title cannot be longer than {POST_TITLE_MAX_LEN} characters.")]
    TooLong,
}

impl PostTitle {
    pub fn new(title: String) -> Result<Self, InvalidPostTitleError> {
        if title.trim().is_empty() {
            Err(InvalidPostTitleError::Blank)
        } else if title.chars().count() > POST_TITLE_MAX_LEN {
            Err(InvalidPostTitleError::TooLong)
        } else {
            Ok(Self(title))
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
pub struct PostBody(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostBodyError {
    #[error("The content cannot be blank.")]
    Blank,
}

impl PostBody {
    pub fn new(content: String) -> Result<Self, InvalidPostBodyError> {
        if content.trim().is_empty() {
            Err(InvalidPostBodyError::Blank)
        } else {
            Ok(Self(content))
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
pub struct ImageUrl(String);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidImageUrlError {
    #[error(
        "The provided image URL is not valid. Please enter a URL in the correct format \
        (e.g., http://example.com/image.jpg)."
    )]
    Malformed,
    #[error("The image URL cannot be longer than {IMAGE_URL_MAX_LEN} characters.")]
    TooLong,
}

impl ImageUrl {
    pub fn new(url: String) -> Result<Self, InvalidImageUrlError> {
        if url.chars().count() > IMAGE_URL_MAX_LEN {
            return Err(InvalidImageUrlError::TooLong);
        }

        let rest = url
            .strip_prefix("http://")
            .or_else(|| url.strip_prefix("https://"))
            .ok_or(InvalidImageUrlError::Malformed)?;

        if rest.is_empty() || url.chars().any(char::is_whitespace) {
            Err(InvalidImageUrlError::Malformed)
        } else {
            Ok(Self(url))
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
    use super::{
        ImageUrl, InvalidImageUrlError, InvalidPostBodyError, InvalidPostTitleError, PostBody,
        PostTitle,
    };

    #[test]
    fn title_rejects_blank_and_overlong() {
        assert_eq!(
            PostTitle::new(String::new()),
            Err(InvalidPostTitleError::Blank)
        );
        assert_eq!(
            PostTitle::new("   ".to_owned()),
            Err(InvalidPostTitleError::Blank)
        );
        assert_eq!(
            PostTitle::new("x".repeat(101)),
            Err(InvalidPostTitleError::TooLong)
        );
        assert!(PostTitle::new("x".repeat(100)).is_ok());
    }

    #[test]
    fn body_rejects_blank() {
        assert_eq!(PostBody::new(String::new()), Err(InvalidPostBodyError::Blank));
        assert!(PostBody::new("Hello".to_owned()).is_ok());
    }

    #[test]
    fn image_url_requires_http_scheme() {
        assert!(ImageUrl::new("http://example.com/image.jpg".to_owned()).is_ok());
        assert!(ImageUrl::new("https://example.com/image.jpg".to_owned()).is_ok());

        for url in ["ftp://example.com/a.jpg", "example.com/a.jpg", "http://", "http://a b"] {
            assert_eq!(
                ImageUrl::new(url.to_owned()),
                Err(InvalidImageUrlError::Malformed)
            );
        }
    }

    #[test]
    fn image_url_length_bound() {
        let url = format!("http://example.com/{}", "a".repeat(300));
        assert_eq!(ImageUrl::new(url), Err(InvalidImageUrlError::TooLong));
    }
}
