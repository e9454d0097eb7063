//! GitHub REST implementation of [`HostingApi`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, LINK};
use reqwest::{Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::Error;
use crate::hosting::{HostingApi, ObjectKind, ObjectRef, TagPage, TagSummary};

/// Public GitHub API root.
const API_BASE: &str = "https://api.github.com";

/// API version pinned so response shapes don't drift under us.
const API_VERSION: &str = "2022-11-28";

/// Largest page size the tag listing accepts.
const PER_PAGE: u32 = 100;

/// Authenticated GitHub client. Cheap to share behind an `Arc`.
pub struct GitHubClient {
    /// Shared connection pool.
    client: Client,
    /// Bearer token from the credential collaborator.
    token: String,
}

impl GitHubClient {
    /// Build a client for the given token.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the TLS backend cannot be initialised.
    pub fn new(token: String) -> Result<Self, Error> {
        let client = Client::builder()
            .user_agent(concat!("actpin/", env!("CARGO_PKG_VERSION")))
            .build()?;
        return Ok(Self { client, token });
    }

    /// GET a path under the API root. `Ok(None)` means 404.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` on transport failure or `Error::Api` for any
    /// status other than success and 404.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Response>, Error> {
        let url = format!("{API_BASE}{path}");
        debug!("GET {url} {query:?}");

        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.token)
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;

        let status = response.status();
        trace!("{url} -> {status}");
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(url, status, response).await);
        }
        return Ok(Some(response));
    }
}

#[async_trait]
impl HostingApi for GitHubClient {
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<String>, Error> {
        let path = format!("/repos/{owner}/{repo}/releases/latest");
        let Some(response) = self.get(&path, &[]).await? else {
            return Ok(None);
        };
        let release: ReleaseWire = response.json().await?;
        return Ok(Some(release.tag_name));
    }

    async fn list_tags(&self, owner: &str, repo: &str, page: u32) -> Result<TagPage, Error> {
        let path = format!("/repos/{owner}/{repo}/tags");
        let query = [("per_page", PER_PAGE.to_string()), ("page", page.to_string())];
        let Some(response) = self.get(&path, &query).await? else {
            return Ok(TagPage::default());
        };

        let next_page = response
            .headers()
            .get(LINK)
            .and_then(|v| return v.to_str().ok())
            .and_then(next_page_from_link);
        let wire: Vec<TagWire> = response.json().await?;
        let tags = wire
            .into_iter()
            .map(|t| {
                return TagSummary {
                    commit_sha: t.commit.map(|c| return c.sha),
                    name: t.name,
                };
            })
            .collect();
        return Ok(TagPage { next_page, tags });
    }

    async fn tag_object(&self, owner: &str, repo: &str, sha: &str) -> Result<ObjectRef, Error> {
        let path = format!("/repos/{owner}/{repo}/git/tags/{sha}");
        let Some(response) = self.get(&path, &[]).await? else {
            return Err(Error::Api {
                message: format!("tag object {sha} not found"),
                status: StatusCode::NOT_FOUND.as_u16(),
                url: format!("{API_BASE}{path}"),
            });
        };
        let tag: GitTagWire = response.json().await?;
        return Ok(tag.object.into_object_ref());
    }

    async fn tag_ref(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<ObjectRef>, Error> {
        let path = format!("/repos/{owner}/{repo}/git/ref/tags/{tag}");
        let Some(response) = self.get(&path, &[]).await? else {
            return Ok(None);
        };
        let git_ref: GitRefWire = response.json().await?;
        return Ok(Some(git_ref.object.into_object_ref()));
    }
}

/// Turn a non-success response into `Error::Api`, keeping GitHub's message.
async fn api_error(url: String, status: StatusCode, response: Response) -> Error {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorWire>(&body)
        .map(|e| return e.message)
        .unwrap_or(body);
    return Error::Api { message, status: status.as_u16(), url };
}

/// Extract the `page` query parameter of the `rel="next"` link, if any.
fn next_page_from_link(header: &str) -> Option<u32> {
    let next = header.split(',').find(|part| return part.contains(r#"rel="next""#))?;
    let target = next.split(';').next()?.trim().trim_start_matches('<').trim_end_matches('>');
    let url = Url::parse(target).ok()?;
    return url
        .query_pairs()
        .find(|(key, _)| return key == "page")
        .and_then(|(_, value)| return value.parse().ok());
}

// ── Wire types ────────────────────────────────────────────────────────

/// `{"message": ...}` error body.
#[derive(Deserialize)]
struct ErrorWire {
    /// Human-readable error text.
    message: String,
}

/// Subset of a release.
#[derive(Deserialize)]
struct ReleaseWire {
    /// Tag the release was cut from.
    tag_name: String,
}

/// Entry of `GET /repos/{owner}/{repo}/tags`.
#[derive(Deserialize)]
struct TagWire {
    /// Commit the tag resolves to.
    commit: Option<CommitWire>,
    /// Tag name.
    name: String,
}

/// Commit pointer inside a tag listing entry.
#[derive(Deserialize)]
struct CommitWire {
    /// Commit id.
    sha: String,
}

/// `GET /repos/{owner}/{repo}/git/ref/...` body.
#[derive(Deserialize)]
struct GitRefWire {
    /// Object the ref points at.
    object: GitObjectWire,
}

/// `GET /repos/{owner}/{repo}/git/tags/{sha}` body.
#[derive(Deserialize)]
struct GitTagWire {
    /// Object the annotated tag points at.
    object: GitObjectWire,
}

/// `{"sha": ..., "type": ...}` object pointer.
#[derive(Deserialize)]
struct GitObjectWire {
    /// Object type: `commit`, `tag`, `tree`, `blob`.
    #[serde(rename = "type")]
    kind: String,
    /// Object id.
    #[serde(default)]
    sha: String,
}

impl GitObjectWire {
    /// Convert to the API-neutral pointer.
    fn into_object_ref(self) -> ObjectRef {
        return ObjectRef { kind: ObjectKind::from_api(&self.kind), sha: self.sha };
    }
}
