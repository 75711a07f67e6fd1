//! Batch submission.
//!
//! [`Submitter::submit`] drains the staging queue and uploads it in warmth
//! groups, always in the order thin, moderate, thick:
//!
//! ```text
//! drain queue ──► group by tag ──► for each group:
//!                                    normalize + compress (blocking pool)
//!                                    one BatchApi call with what compressed
//!                                    reconcile counts
//!              ──► drop drained items (previews released) ──► SubmissionResult
//! ```
//!
//! Failures are contained. An item that cannot be compressed is counted
//! failed and left out of its group's upload. A group whose upload errors or
//! is rejected is counted failed as a whole, and the next group still runs.
//! Every drained item ends up in exactly one [`ItemOutcome`] and in exactly
//! one of `total_success` / `total_fail`.

use crate::api::{ApiError, BatchApi, BatchRequest, BatchResponse, ServerItem};
use crate::config::IntakeConfig;
use crate::imaging::{CompressSettings, ImageBackend, Normalizer, prepare_group};
use crate::notify::{NotificationSink, NullSink, SubmitEvent};
use crate::queue::{ItemId, QueueItem, StagingQueue};
use crate::types::{NormalizedImage, SourceFile, WarmthTag};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("no session identifier; sign in or set INTAKE_USER_ID")]
    MissingSession,
}

/// Why a whole group failed.
#[derive(Error, Debug)]
pub enum GroupSubmitError {
    #[error("upload failed: {0}")]
    Transport(#[from] ApiError),
    #[error("backend rejected the batch: {message}")]
    Rejected { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Included in an upload the backend accepted.
    Sent,
    CompressionFailed(String),
    GroupFailed(String),
    /// Uploaded, but the backend could not store this one.
    BackendFailed(String),
}

/// What happened to one drained item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub id: ItemId,
    /// Original filename, before any extension change.
    pub name: String,
    pub warmth: WarmthTag,
    pub status: ItemStatus,
}

/// Reconciled counts for one group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub fail_count: usize,
    pub accepted_items: Vec<ServerItem>,
}

#[derive(Debug)]
pub struct GroupReport {
    pub tag: WarmthTag,
    /// Items drained for this group.
    pub attempted: usize,
    /// Items that compressed and went into the upload.
    pub sent: usize,
    pub success: usize,
    pub fail: usize,
    pub error: Option<GroupSubmitError>,
    /// Per-item failure notes from the backend, verbatim.
    pub fail_details: Vec<String>,
}

#[derive(Debug, Default)]
pub struct SubmissionResult {
    pub total_success: usize,
    pub total_fail: usize,
    pub accepted_items: Vec<ServerItem>,
    pub groups: Vec<GroupReport>,
    pub outcomes: Vec<ItemOutcome>,
    pub elapsed: Duration,
}

impl SubmissionResult {
    /// Number of items the run accounted for.
    pub fn total(&self) -> usize {
        self.total_success + self.total_fail
    }

    pub fn outcome(&self, id: ItemId) -> Option<&ItemOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }
}

/// Fold a group's upload result into counts.
///
/// `sent` is how many images went into the call. The reported success count
/// is clamped to `sent` and any shortfall is counted failed, so the group's
/// `success + fail` always equals `sent`. Compression failures are added by
/// the caller.
pub fn reconcile(
    sent: usize,
    response: Result<BatchResponse, ApiError>,
) -> (BatchOutcome, Option<GroupSubmitError>, Vec<String>) {
    match response {
        Ok(resp) if resp.success => {
            let success = (resp.success_count as usize).min(sent);
            let outcome = BatchOutcome {
                success_count: success,
                fail_count: sent - success,
                accepted_items: resp.items,
            };
            (outcome, None, resp.fail_details.unwrap_or_default())
        }
        Ok(resp) => {
            let message = resp
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "no reason given".to_string());
            let outcome = BatchOutcome {
                fail_count: sent,
                ..BatchOutcome::default()
            };
            (
                outcome,
                Some(GroupSubmitError::Rejected { message }),
                resp.fail_details.unwrap_or_default(),
            )
        }
        Err(e) => {
            let outcome = BatchOutcome {
                fail_count: sent,
                ..BatchOutcome::default()
            };
            (outcome, Some(GroupSubmitError::Transport(e)), Vec::new())
        }
    }
}

/// Split drained items into warmth groups in the fixed processing order,
/// keeping relative queue order inside each group. Empty groups are omitted.
pub fn partition_by_tag(items: Vec<QueueItem>) -> Vec<(WarmthTag, Vec<QueueItem>)> {
    let mut groups: Vec<(WarmthTag, Vec<QueueItem>)> =
        WarmthTag::ALL.iter().map(|&tag| (tag, Vec::new())).collect();
    for item in items {
        if let Some((_, members)) = groups.iter_mut().find(|(tag, _)| *tag == item.warmth) {
            members.push(item);
        }
    }
    groups.retain(|(_, members)| !members.is_empty());
    groups
}

/// Pick which of the `sent` images the backend failed on.
///
/// `fail_details` entries read `"{filename}: {reason}"`. Named files are
/// matched first, in order; if fewer than `failed` can be matched, the last
/// unmatched images make up the difference. Exactly `failed` entries of the
/// returned vector are `Some(reason)`.
pub fn attribute_failures(
    sent: &[&str],
    failed: usize,
    fail_details: &[String],
) -> Vec<Option<String>> {
    let mut reasons: Vec<Option<String>> = vec![None; sent.len()];
    let failed = failed.min(sent.len());
    let mut marked = 0;

    for detail in fail_details {
        if marked == failed {
            break;
        }
        let Some((name, reason)) = detail.split_once(':') else {
            continue;
        };
        let (name, reason) = (name.trim(), reason.trim());
        let slot = sent
            .iter()
            .zip(reasons.iter())
            .position(|(sent_name, r)| r.is_none() && *sent_name == name);
        if let Some(index) = slot {
            reasons[index] = Some(reason.to_string());
            marked += 1;
        }
    }

    for reason in reasons.iter_mut().rev() {
        if marked == failed {
            break;
        }
        if reason.is_none() {
            *reason = Some("not stored by the backend".to_string());
            marked += 1;
        }
    }
    reasons
}

/// Drives a submission run against a backend.
pub struct Submitter<B, A> {
    backend: Arc<B>,
    api: A,
    user_id: String,
    normalizer: Normalizer,
    settings: CompressSettings,
    sink: Box<dyn NotificationSink>,
}

impl<B, A> Submitter<B, A>
where
    B: ImageBackend + Send + 'static,
    A: BatchApi,
{
    pub fn new(backend: Arc<B>, api: A, user_id: impl Into<String>) -> Self {
        Self {
            backend,
            api,
            user_id: user_id.into(),
            normalizer: Normalizer::default(),
            settings: CompressSettings::default(),
            sink: Box::new(NullSink),
        }
    }

    /// Take normalizer and compression settings from `config`.
    pub fn configured(mut self, config: &IntakeConfig) -> Self {
        self.normalizer = Normalizer::from_config(&config.normalize);
        self.settings = CompressSettings::from_config(&config.images);
        self
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_settings(mut self, settings: CompressSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_sink(mut self, sink: impl NotificationSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    fn check_session(&self) -> Result<(), SubmitError> {
        if self.user_id.trim().is_empty() {
            return Err(SubmitError::MissingSession);
        }
        Ok(())
    }

    /// Drain `queue` and submit everything in it.
    ///
    /// An empty queue is a no-op. Otherwise the queue is left untouched when
    /// the session is missing.
    pub async fn submit(&self, queue: &mut StagingQueue) -> Result<SubmissionResult, SubmitError> {
        if queue.is_empty() {
            return Ok(SubmissionResult::default());
        }
        self.check_session()?;
        let items = queue.drain_all();
        self.submit_items(items).await
    }

    /// Submit items already drained from a queue.
    pub async fn submit_items(
        &self,
        items: Vec<QueueItem>,
    ) -> Result<SubmissionResult, SubmitError> {
        if items.is_empty() {
            return Ok(SubmissionResult::default());
        }
        self.check_session()?;

        let start = Instant::now();
        let mut result = SubmissionResult::default();
        let groups = partition_by_tag(items);
        tracing::info!(
            groups = groups.len(),
            count = groups.iter().map(|(_, m)| m.len()).sum::<usize>(),
            "submitting"
        );

        // Items stay alive (previews held) until every group is done.
        let mut finished = Vec::new();
        for (tag, members) in groups {
            let report = self.submit_group(tag, &members, &mut result).await;
            result.total_success += report.success;
            result.total_fail += report.fail;
            result.groups.push(report);
            finished.push(members);
        }
        drop(finished);

        result.elapsed = start.elapsed();
        self.sink.notify(SubmitEvent::Finished {
            success: result.total_success,
            fail: result.total_fail,
            elapsed: result.elapsed,
        });
        tracing::info!(
            success = result.total_success,
            fail = result.total_fail,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "submission finished"
        );
        Ok(result)
    }

    /// Compress a group's sources concurrently, results in input order.
    async fn compress_group(
        &self,
        files: Vec<SourceFile>,
    ) -> Vec<Result<NormalizedImage, String>> {
        prepare_group(Arc::clone(&self.backend), self.normalizer, files, self.settings)
            .await
            .into_iter()
            .map(|r| r.map_err(|e| e.reason().to_string()))
            .collect()
    }

    async fn submit_group(
        &self,
        tag: WarmthTag,
        members: &[QueueItem],
        result: &mut SubmissionResult,
    ) -> GroupReport {
        self.sink.notify(SubmitEvent::GroupStarted {
            tag,
            count: members.len(),
        });

        let files = members.iter().map(|item| item.source.clone()).collect();
        let compressed = self.compress_group(files).await;

        let mut images = Vec::new();
        let mut sent_items = Vec::new();
        let mut compression_failures = 0;
        for (item, outcome) in members.iter().zip(compressed) {
            match outcome {
                Ok(image) => {
                    images.push(image);
                    sent_items.push(item);
                }
                Err(reason) => {
                    compression_failures += 1;
                    tracing::warn!(name = %item.source.name, tag = %tag, error = %reason, "compression failed");
                    self.sink.notify(SubmitEvent::ItemFailed {
                        tag,
                        id: item.id,
                        name: item.source.name.clone(),
                        reason: reason.clone(),
                    });
                    result.outcomes.push(ItemOutcome {
                        id: item.id,
                        name: item.source.name.clone(),
                        warmth: tag,
                        status: ItemStatus::CompressionFailed(reason),
                    });
                }
            }
        }

        let sent = images.len();
        let mut report = GroupReport {
            tag,
            attempted: members.len(),
            sent,
            success: 0,
            fail: compression_failures,
            error: None,
            fail_details: Vec::new(),
        };

        if sent == 0 {
            tracing::warn!(tag = %tag, "nothing to upload, every item failed to compress");
            self.sink.notify(SubmitEvent::GroupCompleted {
                tag,
                success: 0,
                fail: report.fail,
            });
            return report;
        }

        tracing::info!(tag = %tag, count = sent, "uploading group");
        let sent_names: Vec<String> = images.iter().map(|img| img.name.clone()).collect();
        let response = self
            .api
            .upload_batch(BatchRequest {
                images,
                warmth: tag,
                user_id: self.user_id.clone(),
            })
            .await;
        let (outcome, error, fail_details) = reconcile(sent, response);

        let statuses: Vec<ItemStatus> = match &error {
            Some(e) => vec![ItemStatus::GroupFailed(e.to_string()); sent],
            None => {
                let names: Vec<&str> = sent_names.iter().map(String::as_str).collect();
                attribute_failures(&names, outcome.fail_count, &fail_details)
                    .into_iter()
                    .map(|r| r.map_or(ItemStatus::Sent, ItemStatus::BackendFailed))
                    .collect()
            }
        };
        for (item, status) in sent_items.into_iter().zip(statuses) {
            if let ItemStatus::BackendFailed(reason) = &status {
                tracing::warn!(
                    name = %item.source.name,
                    tag = %tag,
                    error = %reason,
                    "backend did not store item"
                );
                self.sink.notify(SubmitEvent::ItemFailed {
                    tag,
                    id: item.id,
                    name: item.source.name.clone(),
                    reason: reason.clone(),
                });
            }
            result.outcomes.push(ItemOutcome {
                id: item.id,
                name: item.source.name.clone(),
                warmth: tag,
                status,
            });
        }

        report.success = outcome.success_count;
        report.fail += outcome.fail_count;
        report.fail_details = fail_details;
        result.accepted_items.extend(outcome.accepted_items);

        match &error {
            Some(e) => {
                tracing::warn!(tag = %tag, error = %e, "group failed");
                self.sink.notify(SubmitEvent::GroupFailed {
                    tag,
                    count: report.fail,
                    reason: e.to_string(),
                });
            }
            None => self.sink.notify(SubmitEvent::GroupCompleted {
                tag,
                success: report.success,
                fail: report.fail,
            }),
        }
        report.error = error;
        report
    }
}
