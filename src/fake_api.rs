//! In-memory [`HostingApi`] for tests: canned repositories, call logging,
//! pagination, annotated tags and injected failures.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Error;
use crate::hosting::{HostingApi, ObjectKind, ObjectRef, TagPage, TagSummary};

/// A 40-char id made of one repeated hex digit.
pub fn sha(digit: char) -> String {
    return std::iter::repeat_n(digit, 40).collect();
}

/// Canned state for one repository.
pub struct RepoFixture {
    /// Artificial latency added to `latest_release`.
    delay: Duration,
    /// Listing page size.
    page_size: usize,
    /// `refs/tags/<name>` targets.
    refs: HashMap<String, ObjectRef>,
    /// Latest release tag, if any.
    release: Option<String>,
    /// Remaining `latest_release` calls that answer 502.
    release_failures: AtomicU32,
    /// Remaining `list_tags` calls that answer 502.
    tag_failures: AtomicU32,
    /// Annotated tag objects by id.
    tag_objects: HashMap<String, ObjectRef>,
    /// Tag listing, newest first.
    tags: Vec<TagSummary>,
}

impl RepoFixture {
    /// Empty repository: no release, no tags.
    pub fn new() -> Self {
        return Self {
            delay: Duration::ZERO,
            page_size: 100,
            refs: HashMap::new(),
            release: None,
            release_failures: AtomicU32::new(0),
            tag_failures: AtomicU32::new(0),
            tag_objects: HashMap::new(),
            tags: Vec::new(),
        };
    }

    /// Annotated tag `name` → tag object `object` → commit `commit`.
    /// The listing reports no commit for it, as a lazy API might.
    pub fn annotated_tag(mut self, name: &str, object: char, commit: char) -> Self {
        self.tags.push(TagSummary { commit_sha: None, name: name.to_string() });
        let _ = self.refs.insert(name.to_string(), ObjectRef { kind: ObjectKind::Tag, sha: sha(object) });
        return self.tag_object(object, ObjectKind::Commit, commit);
    }

    /// Delay `latest_release` answers.
    pub const fn delay_ms(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        return self;
    }

    /// Answer 502 to the next `times` release lookups.
    pub fn failing_release(self, times: u32) -> Self {
        self.release_failures.store(times, Ordering::SeqCst);
        return self;
    }

    /// Answer 502 to the next `times` tag listings.
    pub fn failing_tags(self, times: u32) -> Self {
        self.tag_failures.store(times, Ordering::SeqCst);
        return self;
    }

    /// Split the tag listing into pages of `size`.
    pub const fn page_size(mut self, size: usize) -> Self {
        self.page_size = size;
        return self;
    }

    /// Point `refs/tags/<name>` at an arbitrary object without listing it.
    pub fn ref_to(mut self, name: &str, kind: ObjectKind, target: char) -> Self {
        let _ = self.refs.insert(name.to_string(), ObjectRef { kind, sha: sha(target) });
        return self;
    }

    /// Publish a release cut from `tag`.
    pub fn release(mut self, tag: &str) -> Self {
        self.release = Some(tag.to_string());
        return self;
    }

    /// Lightweight tag `name` on `commit`, appended to the listing.
    pub fn tag(mut self, name: &str, commit: char) -> Self {
        self.tags.push(TagSummary { commit_sha: Some(sha(commit)), name: name.to_string() });
        return self.ref_to(name, ObjectKind::Commit, commit);
    }

    /// Set what annotated tag object `object` points at.
    pub fn tag_object(mut self, object: char, kind: ObjectKind, target: char) -> Self {
        let _ = self.tag_objects.insert(sha(object), ObjectRef { kind, sha: sha(target) });
        return self;
    }
}

/// Fake hosting API keyed by `owner/repo`. Unknown repositories behave
/// like 404s everywhere.
pub struct FakeApi {
    /// Every call as `"<method> <owner>/<repo> <arg>"`.
    calls: Mutex<Vec<String>>,
    /// Repositories by `owner/repo`.
    repos: HashMap<String, RepoFixture>,
}

impl FakeApi {
    /// No repositories.
    pub fn new() -> Self {
        return Self { calls: Mutex::new(Vec::new()), repos: HashMap::new() };
    }

    /// Number of logged calls to `method`.
    pub fn count(&self, method: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        return calls.iter().filter(|c| return c.split(' ').next() == Some(method)).count();
    }

    /// Register a repository.
    pub fn with_repo(mut self, name: &str, fixture: RepoFixture) -> Self {
        let _ = self.repos.insert(name.to_string(), fixture);
        return self;
    }

    /// Log a call and look up its repository.
    fn record(&self, method: &str, owner: &str, repo: &str, arg: &str) -> Option<&RepoFixture> {
        let mut calls = self.calls.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        calls.push(format!("{method} {owner}/{repo} {arg}"));
        return self.repos.get(&format!("{owner}/{repo}"));
    }
}

/// Consume one injected failure, if any remain.
fn take_failure(remaining: &AtomicU32) -> bool {
    return remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| return n.checked_sub(1))
        .is_ok();
}

/// A 502 answer for `url`.
fn server_error(url: String) -> Error {
    return Error::Api { message: "Server Error".to_string(), status: 502, url };
}

#[async_trait]
impl HostingApi for FakeApi {
    async fn latest_release(&self, owner: &str, repo: &str) -> Result<Option<String>, Error> {
        let Some(fixture) = self.record("latest_release", owner, repo, "") else {
            return Ok(None);
        };
        tokio::time::sleep(fixture.delay).await;

        if take_failure(&fixture.release_failures) {
            return Err(server_error(format!("fake://{owner}/{repo}/releases/latest")));
        }
        return Ok(fixture.release.clone());
    }

    async fn list_tags(&self, owner: &str, repo: &str, page: u32) -> Result<TagPage, Error> {
        let Some(fixture) = self.record("list_tags", owner, repo, &page.to_string()) else {
            return Ok(TagPage::default());
        };
        if take_failure(&fixture.tag_failures) {
            return Err(server_error(format!("fake://{owner}/{repo}/tags?page={page}")));
        }
        let index = usize::try_from(page.saturating_sub(1)).unwrap_or(usize::MAX);
        let start = index.saturating_mul(fixture.page_size);
        let tags: Vec<TagSummary> =
            fixture.tags.iter().skip(start).take(fixture.page_size).cloned().collect();
        let consumed = start.saturating_add(tags.len());
        let next_page = (consumed < fixture.tags.len()).then(|| return page.saturating_add(1));
        return Ok(TagPage { next_page, tags });
    }

    async fn tag_object(&self, owner: &str, repo: &str, sha: &str) -> Result<ObjectRef, Error> {
        let found = self
            .record("tag_object", owner, repo, sha)
            .and_then(|fixture| return fixture.tag_objects.get(sha).cloned());
        return found.ok_or_else(|| {
            return Error::Api {
                message: "Not Found".to_string(),
                status: 404,
                url: format!("fake://{owner}/{repo}/git/tags/{sha}"),
            };
        });
    }

    async fn tag_ref(&self, owner: &str, repo: &str, tag: &str) -> Result<Option<ObjectRef>, Error> {
        let found = self
            .record("tag_ref", owner, repo, tag)
            .and_then(|fixture| return fixture.refs.get(tag).cloned());
        return Ok(found);
    }
}
