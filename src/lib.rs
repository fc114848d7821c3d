//! Earkive - structural reconciliation of archival information packages
//!
//! This library reads and writes E-ARK style information packages: directory
//! trees whose structure is declared by METS description documents. Parsing
//! reconciles what a package declares against what is actually on disk,
//! accumulating every discrepancy in a validation report instead of aborting
//! on the first defect. Building is the inverse: the in-memory model is
//! staged, described and promoted to a finished package in one move.
//!
//! # Features
//!
//! - **Common-specification profile**: Parse and build packages following
//!   the E-ARK common specification layout
//! - **Legacy profile**: Import packages following the older
//!   single-document layout with inline metadata
//! - **Accumulating validation**: A complete report of structural findings
//!   per package, never a first-error abort
//! - **Integrity verification**: Declared checksums are recomputed and
//!   compared during parse
//! - **Cooperative cancellation**: Long parses and builds stop cleanly at
//!   item boundaries
//!
//! # Example - Parsing a package
//!
//! ```no_run
//! use earkive::parse::{parse_package, ParseOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let package = parse_package("SIP_2024_001".as_ref(), &ParseOptions::default())?;
//!
//! for entry in package.validation_report().entries() {
//!     println!("{}: {}", entry.code(), entry.message());
//! }
//! for rep in package.representations() {
//!     println!("{}: {} files", rep.representation_id(), rep.data().len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Building a package
//!
//! ```no_run
//! use earkive::build::{build_package, BuildOptions};
//! use earkive::model::{ContentType, IPFile, IPType, InformationPackage, Representation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut package = InformationPackage::new(IPType::Sip, "SIP_1", ContentType::mixed());
//! let mut rep = Representation::new("rep1");
//! rep.add_file(IPFile::new("/data/report.pdf"));
//! package.add_representation(rep);
//!
//! let built = build_package(&package, "out".as_ref(), &BuildOptions::default())?;
//! println!("package written to {}", built.display());
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod cancel;
pub mod checksum;
pub mod container;
pub mod error;
pub mod mets;
pub mod model;
pub mod parse;
pub mod profile;
pub mod report;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use model::InformationPackage;
pub use profile::Profile;
pub use report::{Severity, ValidationEntry, ValidationReport};
