//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Compose
//!
//! ```text
//! Photo
//!     Source: portrait.jpg (1200 × 1600)
//!     Background: removed (cached)
//!     Adjust: #ffffff, brightness +10
//! Crop
//!     2x2 (2 × 2 in) at 300, 500 → 720 × 720
//! Sheet
//!     8 copies, 3 columns × 3 rows
//!     Preview: preview.png
//! Exported pdf → ./passport_photos.pdf (1.4 MB)
//! ```
//!
//! ## Layout
//!
//! ```text
//! 2x2 (2 × 2 in) 600 × 600 px
//!     3 columns × 3 rows for 8 copies
//!     All copies fit on the page
//! ```
//!
//! ## Sizes
//!
//! ```text
//! 2x2      2 × 2 in        600 × 600 px    aspect 1.000
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::compose::AdjustmentSettings;
use crate::export::ExportFormat;
use crate::geometry::{PhotoSize, Rect};
use crate::grid::{LayoutSummary, PageLayout};
use crate::imaging::format_hex_color;
use std::path::{Path, PathBuf};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Where the background-removed variant came from, if used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalSource {
    Off,
    Service,
    Cache,
    /// The service call failed; the sheet uses the original photo.
    Failed(String),
}

/// Everything `compose` reports once it is done.
#[derive(Debug, Clone)]
pub struct ComposeSummary {
    pub input: PathBuf,
    pub dimensions: (u32, u32),
    pub removal: RemovalSource,
    pub settings: AdjustmentSettings,
    pub photo_size: PhotoSize,
    pub crop: Rect,
    pub layout: LayoutSummary,
    pub preview: Option<PathBuf>,
    pub export: Option<(ExportFormat, PathBuf, usize)>,
}

/// Human-readable byte count.
fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn format_brightness(value: i32) -> String {
    if value > 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// compose
// ============================================================================

pub fn format_compose_summary(summary: &ComposeSummary) -> Vec<String> {
    let mut lines = Vec::new();
    let (w, h) = summary.dimensions;

    lines.push("Photo".to_string());
    lines.push(format!(
        "{}Source: {} ({w} × {h})",
        indent(1),
        file_label(&summary.input)
    ));
    let background = match &summary.removal {
        RemovalSource::Off => "original".to_string(),
        RemovalSource::Service => "removed".to_string(),
        RemovalSource::Cache => "removed (cached)".to_string(),
        RemovalSource::Failed(reason) => format!("original (removal failed: {reason})"),
    };
    lines.push(format!("{}Background: {background}", indent(1)));
    lines.push(format!(
        "{}Adjust: {}, brightness {}",
        indent(1),
        format_hex_color(summary.settings.background),
        format_brightness(summary.settings.brightness.value())
    ));

    let (x, y, cw, ch) = summary.crop.to_pixels();
    lines.push("Crop".to_string());
    lines.push(format!(
        "{}{} ({}) at {x}, {y} → {cw} × {ch}",
        indent(1),
        summary.photo_size,
        summary.photo_size.label()
    ));

    lines.push("Sheet".to_string());
    lines.extend(
        format_layout_details(&summary.layout)
            .into_iter()
            .map(|l| format!("{}{l}", indent(1))),
    );
    if let Some(preview) = &summary.preview {
        lines.push(format!("{}Preview: {}", indent(1), preview.display()));
    }

    match &summary.export {
        Some((format, path, bytes)) => lines.push(format!(
            "Exported {format} → {} ({})",
            path.display(),
            format_bytes(*bytes)
        )),
        None => lines.push("Nothing exported".to_string()),
    }
    lines
}

pub fn print_compose_summary(summary: &ComposeSummary) {
    for line in format_compose_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// layout
// ============================================================================

fn format_layout_details(layout: &LayoutSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} copies, {} columns × {} rows",
        layout.copies, layout.columns, layout.rows
    )];
    if layout.copies_on_page < layout.copies {
        lines.push(format!(
            "{} of {} copies fit on the page; the rest are clipped",
            layout.copies_on_page, layout.copies
        ));
    }
    lines
}

pub fn format_layout(layout: &LayoutSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "{} ({}) {:.0} × {:.0} px",
        layout.size,
        layout.size.label(),
        layout.photo_width,
        layout.photo_height
    )];
    lines.extend(
        format_layout_details(layout)
            .into_iter()
            .map(|l| format!("{}{l}", indent(1))),
    );
    if layout.copies_on_page == layout.copies {
        lines.push(format!("{}All copies fit on the page", indent(1)));
    }
    lines
}

pub fn print_layout(layout: &LayoutSummary) {
    for line in format_layout(layout) {
        println!("{}", line);
    }
}

// ============================================================================
// sizes
// ============================================================================

pub fn format_sizes() -> Vec<String> {
    PhotoSize::ALL
        .iter()
        .map(|&size| {
            let (w, h) = size.pixels();
            let per_row = PageLayout::print(size).columns();
            format!(
                "{:<8} {:<15} {:<15} aspect {:.3}   {} per row",
                size.key(),
                size.label(),
                format!("{:.0} × {:.0} px", w, h),
                size.aspect(),
                per_row
            )
        })
        .collect()
}

pub fn print_sizes() {
    for line in format_sizes() {
        println!("{}", line);
    }
}
