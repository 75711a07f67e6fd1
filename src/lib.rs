//! # Wardrobe Intake
//!
//! Photo intake for a wardrobe catalogue. Clothing photos are validated,
//! staged with a warmth tag, normalized to bounded JPEGs and uploaded to the
//! catalogue backend in one batch per tag.
//!
//! # Architecture: Validate, Stage, Submit
//!
//! ```text
//! 1. Validate   RawSelection  →  SourceFile        (size + type rules, nothing decoded)
//! 2. Stage      SourceFile    →  QueueItem         (tag, preview handle, editable)
//! 3. Submit     StagingQueue  →  SubmissionResult  (per tag: normalize, compress, upload)
//! ```
//!
//! Only the submit stage does real work. Everything before it is cheap so a
//! user can pick, re-tag and drop photos freely. Submission then fixes the
//! working set by draining the queue and reports what happened to every item,
//! even when some photos or whole groups fail.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Size ceiling and image type rules for picked files |
//! | [`queue`] | Bounded staging queue, pending selections, item ids |
//! | [`preview`] | Preview handles released on drop, live-handle registry |
//! | [`imaging`] | HEIC/HEIF normalization, bounded resize, JPEG encode |
//! | [`submit`] | Grouped batch submission and outcome reconciliation |
//! | [`api`] | Backend batch API trait and its reqwest client |
//! | [`notify`] | Submission events and notification sinks |
//! | [`config`] | `intake.toml` loading, validation and env overrides |
//! | [`types`] | Shared types: warmth tag, source file, normalized image |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Fixed Group Order
//!
//! Groups always go thin, moderate, thick, one at a time. Progress output
//! stays readable and a failing group cannot interleave with the next one.
//! Inside a group, photos are compressed concurrently on tokio's blocking
//! pool, then sent in a single request in queue order.
//!
//! ## Failures Are Counted, Not Raised
//!
//! A photo that cannot be decoded fails alone. A group whose upload fails
//! counts all its photos as failed and the run moves on. The only error a
//! caller sees from [`submit::Submitter::submit`] is a missing session.
//!
//! ## Pure-Rust Imaging
//!
//! The [`imaging`] module uses the `image` crate (Lanczos3 resampling, JPEG
//! encoding). The default build has no system dependency to install. HEIC
//! decoding needs libheif and sits behind the `heif` cargo feature. Without
//! it the normalizer passes HEIC payloads through and the item fails on its
//! own if nothing downstream can read it.
//!
//! ## Previews Tied to Ownership
//!
//! Each staged item owns a [`preview::PreviewHandle`] that releases itself in
//! `Drop`. Removal, source replacement, submission and dropping the queue all
//! release it without extra bookkeeping.

pub mod api;
pub mod config;
pub mod imaging;
pub mod notify;
pub mod output;
pub mod preview;
pub mod queue;
pub mod submit;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
