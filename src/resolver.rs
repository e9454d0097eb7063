//! Version resolution: maps `owner/repo@ref` to a commit under a policy.
//!
//! Each policy is an ordered chain of strategies. A strategy either pins a
//! commit, yields to the next strategy (something was simply not found), or
//! fails the whole resolution (the hosting API misbehaved).

use semver::Version;
use tracing::{debug, warn};

use crate::error::Error;
use crate::hosting::{HostingApi, ObjectKind};
use crate::types::{CommitId, Policy, Resolution, ResolveOptions};
use crate::version::{is_moving_major_tag, normalize_major_ref, parse_major, parse_tag_version};

/// Annotated tags pointing at annotated tags are legal; cap the chain anyway.
const MAX_TAG_DEPTH: usize = 8;

/// A commit plus the version label it will carry in the document.
#[derive(Debug)]
struct Found {
    /// Resolved commit.
    commit_id: CommitId,
    /// Display version.
    version: String,
}

/// One step of a fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Highest semver tag across all majors, else the newest tag.
    HighestTag,
    /// Tag of the most recent published release.
    LatestRelease,
    /// Exactly the requested ref.
    RequestedRef,
    /// Highest semver tag sharing the requested major.
    SameMajor,
}

/// Strategies tried, in order, for each policy.
const fn chain(policy: Policy) -> &'static [Strategy] {
    return match policy {
        Policy::Latest => &[Strategy::LatestRelease, Strategy::HighestTag],
        Policy::Requested => &[Strategy::RequestedRef, Strategy::LatestRelease, Strategy::HighestTag],
        Policy::SameMajor => &[Strategy::SameMajor, Strategy::LatestRelease, Strategy::HighestTag],
    };
}

/// Resolves refs against a hosting API with fixed run-wide options.
pub struct Resolver<'a> {
    /// Read-only hosting API.
    api: &'a dyn HostingApi,
    /// Policy and knobs for this run.
    options: ResolveOptions,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over `api`.
    pub fn new(api: &'a dyn HostingApi, options: ResolveOptions) -> Self {
        return Self { api, options };
    }

    /// Resolve one reference. `label` is the trailing comment of an
    /// already pinned reference (`@<commit> # v2.10.0`), if any. Never panics
    /// and never returns an error: failures are recorded on the returned
    /// `Resolution`.
    pub async fn resolve(
        &self,
        owner: &str,
        repo: &str,
        requested_ref: &str,
        label: Option<&str>,
    ) -> Resolution {
        for &strategy in chain(self.options.policy) {
            debug!("{owner}/{repo}@{requested_ref}: trying {strategy:?}");
            match self.attempt(strategy, owner, repo, requested_ref, label).await {
                Ok(Some(found)) => {
                    return Resolution::Pinned { commit_id: found.commit_id, version: found.version };
                },
                Ok(None) => {},
                Err(e) => {
                    warn!("{owner}/{repo}@{requested_ref}: {e}");
                    return Resolution::failed(e);
                },
            }
        }
        return Resolution::failed("no release or tag could be resolved");
    }

    /// Run a single strategy.
    ///
    /// # Errors
    ///
    /// Returns any non-not-found hosting API error.
    async fn attempt(
        &self,
        strategy: Strategy,
        owner: &str,
        repo: &str,
        requested_ref: &str,
        label: Option<&str>,
    ) -> Result<Option<Found>, Error> {
        return match strategy {
            Strategy::HighestTag => self.pin_highest_tag(owner, repo).await,
            Strategy::LatestRelease => self.pin_latest_release(owner, repo).await,
            Strategy::RequestedRef => self.pin_requested(owner, repo, requested_ref, label).await,
            Strategy::SameMajor => self.pin_same_major(owner, repo, requested_ref, label).await,
        };
    }

    /// Search tags sharing `major` for one whose commit is `commit_id`.
    /// Pass one compares the commit the listing reports; pass two
    /// dereferences the remaining candidates one by one.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors from the tag listing.
    async fn find_full_tag_for_commit(
        &self,
        owner: &str,
        repo: &str,
        major: u64,
        commit_id: &CommitId,
    ) -> Result<Option<String>, Error> {
        let mut unmatched = Vec::new();
        let mut page = 1_u32;
        loop {
            let listing = self.api.list_tags(owner, repo, page).await?;
            for tag in listing.tags {
                if is_moving_major_tag(&tag.name) {
                    continue;
                }
                if parse_tag_version(&tag.name).is_none_or(|v| return v.major != major) {
                    continue;
                }
                if tag.commit_sha.as_deref() == Some(commit_id.as_str()) {
                    return Ok(Some(tag.name));
                }
                unmatched.push(tag.name);
            }
            match listing.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        for name in unmatched {
            match self.resolve_tag_commit(owner, repo, &name).await {
                Ok(Some(found)) if found == *commit_id => return Ok(Some(name)),
                Ok(_) => {},
                Err(e) => debug!("{owner}/{repo}: skipping {name}: {e}"),
            }
        }
        return Ok(None);
    }

    /// Highest semver tag across all majors, falling back to the newest tag.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors.
    async fn pin_highest_tag(&self, owner: &str, repo: &str) -> Result<Option<Found>, Error> {
        let Some(tag) = self.select_tag(owner, repo, None).await? else {
            debug!("{owner}/{repo}: no tags");
            return Ok(None);
        };
        return self.pin_tag(owner, repo, tag).await;
    }

    /// Tag of the latest release. A repository without releases yields.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors other than not-found.
    async fn pin_latest_release(&self, owner: &str, repo: &str) -> Result<Option<Found>, Error> {
        let Some(tag) = self.api.latest_release(owner, repo).await? else {
            debug!("{owner}/{repo}: no published release");
            return Ok(None);
        };
        let found = self.pin_tag(owner, repo, tag.clone()).await?;
        if found.is_none() {
            debug!("{owner}/{repo}: release tag {tag} did not resolve");
        }
        return Ok(found);
    }

    /// Resolve a moving major tag, trying the literal form and then the
    /// `v`-prefixed one. A candidate that points at a non-commit does not
    /// stop the next one from being tried.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors other than not-found, or the last
    /// `Error::TagNotCommit` when no candidate resolves.
    async fn pin_moving_major(
        &self,
        owner: &str,
        repo: &str,
        requested_ref: &str,
    ) -> Result<Option<Found>, Error> {
        let mut candidates = vec![requested_ref.to_string()];
        if !requested_ref.starts_with('v') {
            candidates.push(normalize_major_ref(requested_ref));
        }

        let mut not_commit = None;
        for candidate in candidates {
            let commit_id = match self.resolve_tag_commit(owner, repo, &candidate).await {
                Ok(Some(commit_id)) => commit_id,
                Ok(None) => continue,
                Err(e @ Error::TagNotCommit { .. }) => {
                    debug!("{owner}/{repo}: {e}");
                    not_commit = Some(e);
                    continue;
                },
                Err(e) => return Err(e),
            };
            let version = if self.options.expand_major {
                self.expanded_major_version(owner, repo, requested_ref, &commit_id)
                    .await
                    .unwrap_or(candidate)
            } else {
                candidate
            };
            return Ok(Some(Found { commit_id, version }));
        }
        return not_commit.map_or(Ok(None), Err);
    }

    /// Pin exactly what was written: a moving major, an exact tag, or a
    /// commit id that is already pinned.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors other than not-found.
    async fn pin_requested(
        &self,
        owner: &str,
        repo: &str,
        requested_ref: &str,
        label: Option<&str>,
    ) -> Result<Option<Found>, Error> {
        if requested_ref.is_empty() {
            return Ok(None);
        }
        if is_moving_major_tag(requested_ref) {
            return self.pin_moving_major(owner, repo, requested_ref).await;
        }
        if let Some(found) = self.pin_tag(owner, repo, requested_ref.to_string()).await? {
            return Ok(Some(found));
        }
        return Ok(keep_pinned(requested_ref, label));
    }

    /// Highest semver tag sharing the requested ref's major.
    ///
    /// A ref that is already a commit takes its major from the version
    /// label. Without a readable major, or without tags in it, the commit
    /// stays as it is rather than yielding to a strategy that could cross
    /// majors.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors.
    async fn pin_same_major(
        &self,
        owner: &str,
        repo: &str,
        requested_ref: &str,
        label: Option<&str>,
    ) -> Result<Option<Found>, Error> {
        let already_pinned = CommitId::parse(requested_ref).is_some();
        let major_text = if already_pinned { label_version(label) } else { Some(requested_ref) };
        let Some(major) = major_text.and_then(parse_major) else {
            debug!("{owner}/{repo}: no major in `{requested_ref}`");
            return Ok(keep_pinned(requested_ref, label));
        };
        let Some(tag) = self.select_tag(owner, repo, Some(major)).await? else {
            debug!("{owner}/{repo}: no tags for major {major}");
            return Ok(keep_pinned(requested_ref, label));
        };
        let found = self.pin_tag(owner, repo, tag).await?;
        return Ok(found.or_else(|| return keep_pinned(requested_ref, label)));
    }

    /// Resolve `tag` and label the result with the tag name.
    ///
    /// # Errors
    ///
    /// Returns errors from [`Self::resolve_tag_commit`].
    async fn pin_tag(&self, owner: &str, repo: &str, tag: String) -> Result<Option<Found>, Error> {
        let commit_id = self.resolve_tag_commit(owner, repo, &tag).await?;
        return Ok(commit_id.map(|commit_id| return Found { commit_id, version: tag }));
    }

    /// Resolve a tag name to the commit it ultimately points at, following
    /// annotated tag objects. `Ok(None)` means the tag does not exist.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors, or `Error::TagNotCommit` when the chain
    /// ends somewhere other than a commit.
    async fn resolve_tag_commit(
        &self,
        owner: &str,
        repo: &str,
        tag: &str,
    ) -> Result<Option<CommitId>, Error> {
        let not_commit = |reason: String| {
            return Error::TagNotCommit {
                owner: owner.to_string(),
                reason,
                repo: repo.to_string(),
                tag: tag.to_string(),
            };
        };

        let Some(mut object) = self.api.tag_ref(owner, repo, tag).await? else {
            return Ok(None);
        };
        for _ in 0..MAX_TAG_DEPTH {
            match object.kind {
                ObjectKind::Commit => {
                    return CommitId::parse(&object.sha)
                        .map(Some)
                        .ok_or_else(|| return not_commit(format!("bad commit id `{}`", object.sha)));
                },
                ObjectKind::Other => return Err(not_commit("points at a non-commit object".to_string())),
                ObjectKind::Tag => {
                    if object.sha.is_empty() {
                        return Err(not_commit("annotated tag without object id".to_string()));
                    }
                    object = self.api.tag_object(owner, repo, &object.sha).await?;
                },
            }
        }
        return Err(not_commit(format!("more than {MAX_TAG_DEPTH} levels of annotated tags")));
    }

    /// Page through tags and pick the highest semver, optionally restricted
    /// to one major. Without a major filter, falls back to the first tag the
    /// API returned when none parse.
    ///
    /// # Errors
    ///
    /// Returns hosting API errors.
    async fn select_tag(
        &self,
        owner: &str,
        repo: &str,
        major: Option<u64>,
    ) -> Result<Option<String>, Error> {
        let mut best: Option<(Version, String)> = None;
        let mut newest: Option<String> = None;
        let mut matched_earlier = false;
        let mut page = 1_u32;

        loop {
            let listing = self.api.list_tags(owner, repo, page).await?;
            let mut matched_here = false;
            for tag in listing.tags {
                if newest.is_none() {
                    newest = Some(tag.name.clone());
                }
                let Some(version) = parse_tag_version(&tag.name) else {
                    continue;
                };
                if major.is_some_and(|m| return version.major != m) {
                    continue;
                }
                matched_here = true;
                if best.as_ref().is_none_or(|(b, _)| return version.cmp_precedence(b).is_gt()) {
                    best = Some((version, tag.name));
                }
            }

            // Tags come newest first, so a major's tags are contiguous.
            if major.is_some() && !self.options.exhaustive_tag_scan && matched_earlier && !matched_here {
                debug!("{owner}/{repo}: same-major run ended on page {page}");
                break;
            }
            matched_earlier = matched_earlier || matched_here;

            match listing.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        if let Some((_, name)) = best {
            return Ok(Some(name));
        }
        if major.is_none() {
            return Ok(newest);
        }
        return Ok(None);
    }

    /// Name of the full semver tag behind a moving major, or `None` when
    /// the lookup fails. Only affects the version label, so failures are
    /// logged rather than propagated.
    async fn expanded_major_version(
        &self,
        owner: &str,
        repo: &str,
        major_ref: &str,
        commit_id: &CommitId,
    ) -> Option<String> {
        let major = parse_major(major_ref)?;
        return match self.find_full_tag_for_commit(owner, repo, major, commit_id).await {
            Ok(found) => {
                if found.is_none() {
                    debug!("{owner}/{repo}: no full tag shares {major_ref}'s commit");
                }
                found
            },
            Err(e) => {
                warn!("{owner}/{repo}: could not expand {major_ref}: {e}");
                None
            },
        };
    }
}

/// First word of a version label: `v2.10.0` from `v2.10.0 (security fix)`.
fn label_version(label: Option<&str>) -> Option<&str> {
    return label.and_then(|l| return l.split_whitespace().next());
}

/// A ref that is already a full commit id, kept as is and labelled with its
/// trailing comment when there is one.
fn keep_pinned(requested_ref: &str, label: Option<&str>) -> Option<Found> {
    let commit_id = CommitId::parse(requested_ref)?;
    let version = label.unwrap_or(requested_ref).to_string();
    return Some(Found { commit_id, version });
}
