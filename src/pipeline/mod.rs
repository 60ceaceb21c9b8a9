//! Pipeline stages for table extraction and scoring.
//!
//! Each submodule implements exactly one step and is callable on its own;
//! [`crate::run::run`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ analyze ──▶ extract ──▶ aggregate ──▶ score ──▶ chart
//! (PDF/*)   (remote)    (JSON→grid)  (hconcat)    (xlsx/csv) (PNG)
//! ```
//!
//! 1. [`input`]: list PDFs and intermediate files in file-name order
//! 2. [`analyze`]: submit each PDF to Document Intelligence and persist the
//!    result as `<stem>.json`; the only stage with network I/O
//! 3. [`extract`]: rebuild dense grids from sparse cells and keep the
//!    tables that look like amino-acid composition data
//! 4. [`aggregate`]: pad kept tables to equal height and lay them side by side
//! 5. [`score`]: add PDCAAS / IVPDCAAS to the curated spreadsheet
//! 6. [`chart`]: optional PNG plots of the scored sheet

pub mod aggregate;
pub mod analyze;
pub mod chart;
pub mod extract;
pub mod input;
pub mod score;
