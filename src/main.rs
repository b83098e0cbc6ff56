//! # creative-match CLI
//!
//! Command-line interface for cross-source creative matching.
//!
//! ## Usage
//! ```bash
//! creative-match hash ./creatives -o local.json
//! creative-match match --reference local.json --candidate meta.json -o report.csv
//! ```

mod cli;

use creative_match::Result;

fn main() -> Result<()> {
    cli::run()
}
