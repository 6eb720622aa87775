//! Generic [`BioAssay`] -> delimited stream writer
use super::*;
use crate::location::Locations;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{debug, debug_span};

/// Missing double values are written as this token
pub const MISSING_VALUE: &str = "Error";

/// Where the values of an output column come from
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Source {
    /// Coordinate of the packed `location` field
    Location(usize),
    Field,
    /// Requested but absent from the bioassay: written as empty cells
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Projected {
    stream: String,
    table: String,
    source: Source,
}

/// Writes a [`BioAssay`] to one stream, as described by a [`Format`].
///
/// The columns written are those of the format's field order that were
/// requested, or that exist in the bioassay once
/// [`add_all_fields_to_write`](BioAssayWriter::add_all_fields_to_write) has
/// been called. Location coordinates are always requested.
pub struct BioAssayWriter<W, F> {
    output: Option<W>,
    format: F,
    fields_to_write: HashSet<String>,
    write_all: bool,
}

impl<F: Format> BioAssayWriter<BufWriter<File>, F> {
    pub fn from_path<P: AsRef<Path>>(path: P, format: F) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        debug!("created {}", path.as_ref().display());
        Ok(BioAssayWriter::new(BufWriter::new(file), format))
    }
}

impl<W: Write, F: Format> BioAssayWriter<W, F> {
    pub fn new(output: W, format: F) -> Self {
        let mut writer = BioAssayWriter {
            output: Some(output),
            format,
            fields_to_write: HashSet::new(),
            write_all: false,
        };
        let defaults = writer.format.default_write_fields().to_vec();
        for field in defaults {
            writer.add_field_to_write(field);
        }
        writer
    }

    /// Request a field by its table name
    pub fn add_field_to_write(&mut self, field: &str) {
        if !self.fields_to_write.contains(field) {
            self.fields_to_write.insert(field.to_string());
        }
    }

    pub fn add_all_fields_to_write(&mut self) {
        self.write_all = true;
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    /// Write `assay`, failing with [`IoError::NoTable`] if there is none
    pub fn write_optional(&mut self, assay: Option<&BioAssay>) -> Result<()> {
        self.write(assay.ok_or(IoError::NoTable)?)
    }

    /// Write the header, every spot of `assay` and the footer, then flush and
    /// release the stream.
    ///
    /// The stream is released on failure as well.
    pub fn write(&mut self, assay: &BioAssay) -> Result<()> {
        let mut out = self.output.take().ok_or(IoError::NoStream)?;
        let _span = debug_span!("write", rows = assay.len()).entered();

        let location = self.format.metadata().location;
        for field in location.names() {
            self.add_field_to_write(field);
        }

        let projection = self.projection(assay);
        let columns = projection.iter().map(|p| p.stream.as_str()).collect::<Vec<_>>();
        debug!("columns: {:?}", columns);
        self.format.write_header(&mut out, assay, &columns)?;

        let meta = self.format.metadata();
        let mut locations: Option<Option<Locations>> = None;
        let mut line = String::new();

        for row in 0..assay.len() {
            line.clear();
            if let Some(tag) = meta.line_tag {
                line.push_str(tag);
                line.push(meta.separator as char);
            }
            for (j, col) in projection.iter().enumerate() {
                if j != 0 {
                    line.push(meta.separator as char);
                }
                match col.source {
                    Source::Location(idx) => {
                        let cached = locations.get_or_insert_with(|| assay.unpack_locations());
                        if let Some(v) = cached.as_ref().and_then(|l| l.coordinate(idx)) {
                            line.push_str(&v[row].to_string());
                        }
                    }
                    Source::Field => match assay.column(&col.table) {
                        Some(Column::Ints(v)) => line.push_str(&v[row].to_string()),
                        Some(Column::Doubles(v)) => {
                            if v[row].is_nan() {
                                line.push_str(MISSING_VALUE);
                            } else {
                                line.push_str(&v[row].to_string());
                            }
                        }
                        Some(Column::Strings(v)) => self.format.format_text(&v[row], &mut line),
                        None => {}
                    },
                    Source::Missing => {}
                }
            }
            line.push_str(meta.eol);
            out.write_all(line.as_bytes())?;
        }
        self.format.write_footer(&mut out, assay)?;
        out.flush()?;
        Ok(())
    }

    /// Output columns, in the format's order: a column is written if it was
    /// requested, or if all fields are written and the bioassay has it
    fn projection(&self, assay: &BioAssay) -> Vec<Projected> {
        let meta = self.format.metadata();

        let order: Vec<String> = if meta.field_order.is_empty() {
            meta.location
                .names()
                .map(String::from)
                .chain(
                    assay
                        .fields()
                        .filter(|f| *f != FIELD_NAME_LOCATION)
                        .map(|f| meta.converter.to_stream(f).to_string()),
                )
                .collect()
        } else {
            meta.field_order.clone()
        };

        let mut projection: Vec<Projected> = Vec::new();
        for stream in order {
            let table = meta.converter.to_table(&stream).to_string();
            if projection.iter().any(|p| p.table == table) {
                continue;
            }
            let wanted = (self.write_all && assay.contains(&table)) || self.fields_to_write.contains(&table);
            if !wanted {
                continue;
            }
            let source = match meta.location.position(&stream) {
                Some(idx) => Source::Location(idx),
                None if assay.contains(&table) => Source::Field,
                None => Source::Missing,
            };
            projection.push(Projected {
                stream,
                table,
                source,
            });
        }
        projection
    }
}
