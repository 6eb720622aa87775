//! Delimited-text I/O for [`BioAssay`](crate::BioAssay) tables.
//!
//! The [`BioAssayReader`] and [`BioAssayWriter`] implement the mapping
//! between a line-oriented stream and a column-oriented table once; each
//! concrete file format only describes itself through the [`Format`] trait
//! and its [`FieldMetadata`].
use crate::*;
use std::io::{BufRead, Write};

mod error;
pub mod formats;
mod metadata;
mod multi;
mod reader;
mod text;
mod writer;

pub use error::{IoError, Result};
pub use formats::*;
pub use metadata::{FieldMetadata, FieldNameConverter, Format, LocationFields};
pub use multi::MultiStreamReader;
pub use reader::{BioAssayReader, ReadStats};
pub use text::LineReader;
pub use writer::BioAssayWriter;
