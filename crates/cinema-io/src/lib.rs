//! cinema-io: Filesystem side of Cinema histogram augmentation.
//!
//! Opens a database (`<root>/image/info.json`), walks its parameter
//! space, and for every combination reads the value image, reduces it
//! with [`cinema_pipeline`], and merges the histogram into the image's
//! metadata document with [`cinema_export`]. Metadata files are replaced
//! atomically.
//!
//! ```no_run
//! use cinema_io::{Database, Driver, RunOptions};
//!
//! # fn main() -> Result<(), cinema_io::RunError> {
//! let database = Database::open("/data/cinema")?;
//! let report = Driver::new(&database, RunOptions::default()).run()?;
//! println!("{}", report.report());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod driver;
pub mod error;
pub mod report;
pub mod write;

pub use database::{DESCRIPTOR_FILE, Database, IMAGE_DIR};
pub use driver::{Driver, ErrorPolicy, RunOptions, StdClock};
pub use error::{ConfigError, ProcessError, RunError};
pub use report::{ImageRecord, RunReport, SkippedImage};
pub use write::write_atomic;
