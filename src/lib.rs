//! # docform
//!
//! A document layout and rendering engine for business documents: invoices,
//! purchase orders and list reports on a configurable letterhead, with
//! user-drawn rectangles, text boxes and images layered on top.
//!
//! The designer and the PDF are driven by the same geometry. Both ask
//! [`layout::resolve`] where things go, so what the editor shows is what the
//! renderer draws.
//!
//! ## Architecture
//!
//! ```text
//! LayoutSettings + shapes + record
//!       ↓
//!   [layout]   resolve() -> ResolvedLayout, shared with [editor]
//!       ↓
//!   [render]   compose a page display list in millimetres
//!       ↓
//!   [pdf]      serialize to PDF bytes in points
//! ```

pub mod cache;
pub mod editor;
pub mod error;
pub mod font;
pub mod geometry;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod render;
pub mod settings;
pub mod shapes;
pub mod storage;
pub mod style;
pub mod units;

pub use editor::{Editor, PointerEvent, Tool};
pub use error::{DocformError, Result, SettingsError, StorageError};
pub use layout::{resolve, ResolvedLayout};
pub use model::{Invoice, ListReport, PurchaseOrder};
pub use render::{DocumentRecord, DocumentRenderer, RenderOutput};
pub use settings::{JsonFileStore, LayoutSettings, MemoryStore, SettingsStore};
pub use shapes::{Shape, ShapeCollection};
pub use storage::ImageStore;

/// The kinds of document the renderer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    PurchaseOrder,
    Report,
}

impl DocumentKind {
    /// Parse the command-line spelling.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "invoice" => Some(Self::Invoice),
            "purchase-order" | "po" => Some(Self::PurchaseOrder),
            "report" => Some(Self::Report),
            _ => None,
        }
    }

    /// A sample record of this kind as pretty JSON.
    pub fn example_json(&self) -> std::result::Result<String, serde_json::Error> {
        match self {
            Self::Invoice => serde_json::to_string_pretty(&model::sample_invoice(3)),
            Self::PurchaseOrder => serde_json::to_string_pretty(&model::sample_purchase_order(3)),
            Self::Report => serde_json::to_string_pretty(&model::sample_list_report(8)),
        }
    }
}

/// Render a record described as JSON with the renderer's settings and shapes.
pub fn render_json<S: SettingsStore>(
    renderer: &mut DocumentRenderer<S>,
    kind: DocumentKind,
    json: &str,
) -> Result<RenderOutput> {
    match kind {
        DocumentKind::Invoice => {
            let invoice: Invoice = serde_json::from_str(json)?;
            renderer.render_invoice(&invoice)
        }
        DocumentKind::PurchaseOrder => {
            let order: PurchaseOrder = serde_json::from_str(json)?;
            renderer.render_purchase_order(&order)
        }
        DocumentKind::Report => {
            let report: ListReport = serde_json::from_str(json)?;
            renderer.render_list_report(&report)
        }
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, defaulting to
/// `info`. Logs go to stderr so stdout stays free for output. Calling it
/// twice is harmless.
pub fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
