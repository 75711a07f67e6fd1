//! CLI output formatting for intake runs.
//!
//! # Information-First Display
//!
//! Every line leads with what a person cares about (the photo, the warmth
//! group, the count) and puts technical context (reasons, sizes) on indented
//! lines underneath.
//!
//! # Output Format
//!
//! ## Staging
//!
//! ```text
//! Staged 4 photos
//! thin (2)
//!     001 linen-shirt.jpg
//!     002 tee.heic
//! thick (2)
//!     003 coat.jpg
//!     004 scarf.png
//! Skipped 1 file
//!     notes.pdf: unsupported file type (application/pdf)
//! ```
//!
//! ## Submission
//!
//! ```text
//! thin: uploading 2 photos
//! thin: 2 accepted, 0 failed
//! thick: uploading 2 photos
//!     ! scarf.png: cannot decode image
//! thick: group failed (2 photos)
//!     upload failed: backend returned 503: service unavailable
//! Done: 2 succeeded, 2 failed in 3.4s
//! ```
//!
//! ## Check
//!
//! ```text
//! coat.jpg  4032x3024 → 800x600  2.1 MB → 96.4 KB (-95%)
//! scarf.png  failed: Unrecognized image format
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::imaging::CompressError;
use crate::notify::SubmitEvent;
use crate::queue::StagingQueue;
use crate::submit::SubmissionResult;
use crate::types::{NormalizedImage, WarmthTag};
use crate::validate::{RawSelection, ValidationError};
use std::time::Duration;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// "1 photo", "3 photos".
fn photos(n: usize) -> String {
    if n == 1 {
        "1 photo".to_string()
    } else {
        format!("{n} photos")
    }
}

/// Human-readable byte size: `512 B`, `96.4 KB`, `2.1 MB`.
fn format_bytes(n: usize) -> String {
    const KB: f64 = 1024.0;
    let n = n as f64;
    if n < KB {
        format!("{n} B")
    } else if n < KB * KB {
        format!("{:.1} KB", n / KB)
    } else {
        format!("{:.1} MB", n / (KB * KB))
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.1}s", elapsed.as_secs_f64())
}

// ============================================================================
// Staging
// ============================================================================

/// Format the queue contents grouped by warmth, in submission order.
pub fn format_queue(queue: &StagingQueue) -> Vec<String> {
    let mut lines = vec![format!("Staged {}", photos(queue.len()))];
    let mut position = 0;
    for tag in WarmthTag::ALL {
        let members: Vec<_> = queue.iter().filter(|item| item.warmth == tag).collect();
        if members.is_empty() {
            continue;
        }
        lines.push(format!("{} ({})", tag, members.len()));
        for item in members {
            position += 1;
            lines.push(format!(
                "{}{} {}",
                indent(1),
                format_index(position),
                item.source.name
            ));
        }
    }
    lines
}

/// Format files that did not pass validation or could not be staged.
pub fn format_rejections(rejected: &[(RawSelection, ValidationError)]) -> Vec<String> {
    if rejected.is_empty() {
        return Vec::new();
    }
    let noun = if rejected.len() == 1 { "file" } else { "files" };
    let mut lines = vec![format!("Skipped {} {}", rejected.len(), noun)];
    for (_, error) in rejected {
        lines.push(format!("{}{}", indent(1), error));
    }
    lines
}

pub fn print_queue(queue: &StagingQueue) {
    for line in format_queue(queue) {
        println!("{}", line);
    }
}

pub fn print_rejections(rejected: &[(RawSelection, ValidationError)]) {
    for line in format_rejections(rejected) {
        println!("{}", line);
    }
}

// ============================================================================
// Submission
// ============================================================================

/// Format a single submission progress event as display lines.
pub fn format_submit_event(event: &SubmitEvent) -> Vec<String> {
    match event {
        SubmitEvent::GroupStarted { tag, count } => {
            vec![format!("{}: uploading {}", tag, photos(*count))]
        }
        SubmitEvent::ItemFailed { name, reason, .. } => {
            vec![format!("{}! {}: {}", indent(1), name, reason)]
        }
        SubmitEvent::GroupFailed { tag, count, reason } => vec![
            format!("{}: group failed ({})", tag, photos(*count)),
            format!("{}{}", indent(1), reason),
        ],
        SubmitEvent::GroupCompleted { tag, success, fail } => {
            vec![format!("{}: {} accepted, {} failed", tag, success, fail)]
        }
        SubmitEvent::Finished {
            success,
            fail,
            elapsed,
        } => vec![format!(
            "Done: {} succeeded, {} failed in {}",
            success,
            fail,
            format_elapsed(*elapsed)
        )],
    }
}

/// Format the accepted items and backend failure notes of a finished run.
///
/// Totals are already printed by the `Finished` event.
pub fn format_summary(result: &SubmissionResult) -> Vec<String> {
    let mut lines = Vec::new();
    if !result.accepted_items.is_empty() {
        lines.push("Added to wardrobe".to_string());
        for (i, item) in result.accepted_items.iter().enumerate() {
            let detail: Vec<&str> = [item.category.as_str(), item.color.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            if detail.is_empty() {
                lines.push(format!("{}{} {}", indent(1), format_index(i + 1), item.name));
            } else {
                lines.push(format!(
                    "{}{} {} ({})",
                    indent(1),
                    format_index(i + 1),
                    item.name,
                    detail.join(", ")
                ));
            }
        }
    }
    let details: Vec<_> = result
        .groups
        .iter()
        .flat_map(|g| g.fail_details.iter().map(move |d| (g.tag, d)))
        .collect();
    if !details.is_empty() {
        lines.push("Backend reported".to_string());
        for (tag, detail) in details {
            lines.push(format!("{}{}: {}", indent(1), tag, detail));
        }
    }
    lines
}

pub fn print_summary(result: &SubmissionResult) {
    for line in format_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

/// Format one local dry-run result.
pub fn format_check_result(
    name: &str,
    original_dims: Option<(u32, u32)>,
    result: &Result<NormalizedImage, CompressError>,
) -> String {
    match result {
        Ok(img) => {
            let dims = match original_dims {
                Some((w, h)) => format!("{}x{} \u{2192} {}x{}", w, h, img.width, img.height),
                None => format!("{}x{}", img.width, img.height),
            };
            format!(
                "{}  {}  {} \u{2192} {} (-{:.0}%)",
                name,
                dims,
                format_bytes(img.original_size),
                format_bytes(img.bytes.len()),
                img.reduction_percent()
            )
        }
        Err(e) => format!("{}  failed: {}", name, e.reason()),
    }
}

pub fn print_check_result(
    name: &str,
    original_dims: Option<(u32, u32)>,
    result: &Result<NormalizedImage, CompressError>,
) {
    println!("{}", format_check_result(name, original_dims, result));
}
