//! Hosting API abstraction
//!
//! The resolver only needs four read-only lookups. Keeping them behind a
//! trait lets tests drive every fallback branch without network access.

use async_trait::async_trait;

use crate::error::Error;

/// Git object kinds a tag ref can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// A commit; resolution is complete.
    Commit,
    /// An annotated tag object that needs one more lookup.
    Tag,
    /// Trees, blobs, or anything else a tag could technically target.
    Other,
}

impl ObjectKind {
    /// Map the API's `type` string.
    pub fn from_api(raw: &str) -> Self {
        return match raw {
            "commit" => Self::Commit,
            "tag" => Self::Tag,
            _ => Self::Other,
        };
    }
}

/// A git object pointer: the id and what kind of object it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Object kind.
    pub kind: ObjectKind,
    /// Object id. May be empty if the API omitted it.
    pub sha: String,
}

/// One entry from the tag listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    /// Commit the listing reports for this tag, when present.
    pub commit_sha: Option<String>,
    /// Tag name without the `refs/tags/` prefix.
    pub name: String,
}

/// A page of tags plus the number of the page after it, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagPage {
    /// Next page number; `None` on the last page.
    pub next_page: Option<u32>,
    /// Tags on this page, newest first by convention.
    pub tags: Vec<TagSummary>,
}

/// Read-only view of a code hosting service.
///
/// "Not found" is expected control flow and is reported as `Ok(None)`;
/// every `Err` is a real failure.
#[async_trait]
pub trait HostingApi: Send + Sync {
    /// Tag name of the most recent published release.
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<String>, Error>;

    /// One page of tags. Pages are numbered from 1.
    async fn list_tags(&self, owner: &str, repo: &str, page: u32) -> Result<TagPage, Error>;

    /// The object an annotated tag points at.
    async fn tag_object(&self, owner: &str, repo: &str, sha: &str) -> Result<ObjectRef, Error>;

    /// The object `refs/tags/<tag>` points at.
    async fn tag_ref(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<ObjectRef>, Error>;
}
