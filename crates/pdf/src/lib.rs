pub mod archive;
pub mod attachments;
pub mod canvas;
pub mod chart_cache;
pub mod charts;
pub mod error;
pub mod extended;
pub mod financing_pages;
pub mod images;
pub mod layout;
pub mod logger;
pub mod merge;
pub mod offer;
pub mod renderer;
pub mod text;

pub use archive::{offer_file_name, package_offers, PackageError};
pub use attachments::{AttachmentResolver, DirectoryAttachmentResolver};
pub use chart_cache::{shared_chart_cache, ChartCache, ChartCacheStats, DEFAULT_CHART_CACHE_SIZE};
pub use charts::load_chart_dir;
pub use error::PdfError;
pub use extended::ExtendedPdfGenerator;
pub use logger::{ExtendedPdfLogger, LogEntry, LogLevel};
pub use merge::{merge_pdfs, PdfMerger};
pub use offer::OfferPdfBuilder;
pub use renderer::{ExtendedPdfSummary, PdfOfferRenderer};
