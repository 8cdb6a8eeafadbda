//! Testing utilities for record mappings.
//!
//! - **Assertions**: compare decoded sequences with expected values
//! - **Fixtures**: a sample record type, matching CSV text and a counting
//!   producer for memoization tests
//! - **Mock I/O**: temporary directories and files
//!
//! # Quick Start
//!
//! ```
//! use lineio::LineReader;
//! use lineio::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let people = LineReader::csv::<Person>(",")?
//!     .read(lineio::TextInput::text(PEOPLE_CSV))
//!     .skip_lines(1)
//!     .collect_vec()?;
//! assert_collections_equal(&people, &sample_people());
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use mock_io::*;
