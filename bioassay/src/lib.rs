//! Reading and writing microarray scanner files as column-oriented
//! [`BioAssay`] tables.
//!
//! A [`BioAssay`] holds one array's spot measurements, one typed
//! [`Column`] per field. Every concrete file format (GenePix GPR/GAL, ATF,
//! ImaGene, ID/M/A exports) is described by a [`io::Format`] provider, which
//! supplies the column order, the integer/double typing of each column, the
//! translation between file column names and table field names, and the
//! framing of the file (separator, quoting, end tag, header).
//!
//! The generic [`io::BioAssayReader`] and [`io::BioAssayWriter`] are driven
//! entirely by that description.
//!
//! ```rust,ignore
//! # use bioassay::io::*;
//! let mut reader = BioAssayReader::from_path("./data/slide1.gpr", GprFormat::new())?;
//! let assay = reader.read()?;
//!
//! let mut writer = BioAssayWriter::from_path("./data/slide1.gal", GalFormat::new())?;
//! writer.write(&assay)?;
//! ```
//!
//! Dual-channel scanners that export one file per channel are folded into a
//! single table by the [`io::MultiStreamReader`]
//!
//! ```rust,ignore
//! # use bioassay::io::*;
//! # use std::fs::File;
//! # use std::io::BufReader;
//! let green = BufReader::new(File::open("cy3.txt")?);
//! let red = BufReader::new(File::open("cy5.txt")?);
//! let assay = ImaGeneOutput::reader(green, red).read()?.unwrap();
//! assert!(assay.greens().is_some() && assay.reds().is_some());
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

mod assay;
pub mod io;
pub mod location;

pub use assay::*;
pub use location::Locations;
