//! Generic delimited stream -> [`BioAssay`] reader
use super::text::{split, unquote};
use super::*;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, debug_span};

const INITIAL_CAPACITY: usize = 1000;

/// Data-quality tolerances applied during the last [`BioAssayReader::read`].
///
/// None of these are errors: a data line with the wrong number of fields is
/// skipped, and a numeric cell that does not parse becomes `0` or `NaN`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadStats {
    /// Data lines seen, including skipped ones
    pub lines: usize,
    pub skipped_lines: usize,
    /// Integer cells replaced by `0`
    pub int_defaults: usize,
    /// Double cells replaced by `NaN`
    pub double_defaults: usize,
}

/// Reads one stream into a [`BioAssay`], as described by a [`Format`].
///
/// Only the requested fields are stored, plus the location coordinates
/// declared by the format, which are always read and packed into the
/// `location` field.
///
/// # Example
///
/// ```rust,ignore
/// # use bioassay::io::*;
/// let mut reader = BioAssayReader::from_path("slide.gpr", GprFormat::new())?;
/// reader.add_field_to_read("F635 Mean");
/// let assay = reader.read()?;
/// ```
pub struct BioAssayReader<R, F> {
    input: Option<LineReader<R>>,
    format: F,
    fields_to_read: HashSet<String>,
    read_all: bool,
    stats: ReadStats,
}

impl<F: Format> BioAssayReader<BufReader<File>, F> {
    pub fn from_path<P: AsRef<Path>>(path: P, format: F) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("opened {}", path.as_ref().display());
        Ok(BioAssayReader::new(BufReader::new(file), format))
    }
}

impl<R: BufRead, F: Format> BioAssayReader<R, F> {
    pub fn new(input: R, format: F) -> Self {
        let mut reader = BioAssayReader::without_input(format);
        reader.set_input(input);
        reader
    }

    /// Reader with no stream yet; `read` fails until [`set_input`] is called
    ///
    /// [`set_input`]: BioAssayReader::set_input
    pub fn without_input(format: F) -> Self {
        let mut reader = BioAssayReader {
            input: None,
            read_all: format.read_all_fields(),
            fields_to_read: HashSet::new(),
            stats: ReadStats::default(),
            format,
        };
        let defaults = reader.format.default_read_fields().to_vec();
        for field in defaults {
            reader.add_field_to_read(field);
        }
        reader
    }

    pub fn set_input(&mut self, input: R) {
        self.input = Some(LineReader::new(input));
    }

    /// Request a field, given either its table or its stream name
    pub fn add_field_to_read(&mut self, field: &str) {
        let stream = self.format.metadata().converter.to_stream(field);
        if !self.fields_to_read.contains(stream) {
            self.fields_to_read.insert(stream.to_string());
        }
    }

    pub fn add_all_fields_to_read(&mut self) {
        self.read_all = true;
    }

    pub fn format(&self) -> &F {
        &self.format
    }

    pub fn into_format(self) -> F {
        self.format
    }

    pub fn stats(&self) -> &ReadStats {
        &self.stats
    }

    /// Reset per-read state. The field selection is kept.
    pub fn clear(&mut self) {
        self.input = None;
        self.stats = ReadStats::default();
    }

    fn is_selected(&self, stream: &str) -> bool {
        self.read_all || self.fields_to_read.contains(stream)
    }

    /// Consume the stream and build the [`BioAssay`].
    ///
    /// The stream is released once the data has been read, so a second call
    /// fails with [`IoError::NoStream`] until a new input is set.
    pub fn read(&mut self) -> Result<BioAssay> {
        let mut input = self.input.take().ok_or(IoError::NoStream)?;
        let _span = debug_span!("read").entered();

        let location = self.format.metadata().location;
        for field in location.names() {
            self.add_field_to_read(field);
        }

        let mut assay = BioAssay::new();
        let names = self.format.read_header(&mut input, &mut assay)?;
        if names.is_empty() {
            return Ok(assay);
        }

        let mut slots = names
            .iter()
            .map(|name| {
                if self.is_selected(name) {
                    Some(Column::with_capacity(
                        self.format.metadata().classify(name),
                        INITIAL_CAPACITY,
                    ))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        let meta = self.format.metadata();
        let stats = &mut self.stats;
        *stats = ReadStats::default();

        while let Some(line) = input.next_line()? {
            if meta.end_tag.as_deref() == Some(line.as_str()) {
                break;
            }
            stats.lines += 1;

            let data = match meta.line_tag {
                Some(tag) => match line
                    .strip_prefix(tag)
                    .and_then(|rest| rest.strip_prefix(meta.separator as char))
                {
                    Some(rest) => rest,
                    None => {
                        stats.skipped_lines += 1;
                        debug!("line {}: missing `{}` tag", input.line_number(), tag);
                        continue;
                    }
                },
                None => line.as_str(),
            };
            let tokens = split(meta.separator, data);
            if tokens.len() != names.len() {
                stats.skipped_lines += 1;
                debug!(
                    "line {}: expected {} fields, found {}",
                    input.line_number(),
                    names.len(),
                    tokens.len()
                );
                continue;
            }

            for (slot, token) in slots.iter_mut().zip(tokens.iter()) {
                let token = token.trim();
                match slot {
                    Some(Column::Ints(v)) => v.push(match token.parse::<i32>() {
                        Ok(x) => x,
                        Err(_) => {
                            stats.int_defaults += 1;
                            0
                        }
                    }),
                    Some(Column::Doubles(v)) => v.push(match token.parse::<f64>() {
                        Ok(x) => x,
                        Err(_) => {
                            stats.double_defaults += 1;
                            f64::NAN
                        }
                    }),
                    Some(Column::Strings(v)) => {
                        let value = if meta.strip_quotes { unquote(token) } else { token };
                        v.push(value.to_string());
                    }
                    None => {}
                }
            }
        }
        drop(input);

        debug!(
            "{} lines, {} skipped, {} int and {} double defaults",
            stats.lines, stats.skipped_lines, stats.int_defaults, stats.double_defaults
        );

        assemble(meta, &names, slots, assay)
    }
}

/// Move the accumulated columns into `assay` under their table names and
/// pack the location coordinates
fn assemble(
    meta: &FieldMetadata,
    names: &[String],
    slots: Vec<Option<Column>>,
    mut assay: BioAssay,
) -> Result<BioAssay> {
    let mut coords: [Option<Vec<i32>>; 4] = Default::default();

    for (name, slot) in names.iter().zip(slots) {
        let data = match slot {
            Some(data) => data,
            None => continue,
        };
        if let Some(idx) = meta.location.position(name) {
            match data {
                Column::Ints(v) => coords[idx] = Some(v),
                _ => return Err(IoError::InvalidFieldType(name.clone())),
            }
            continue;
        }
        assay.set_column(meta.converter.to_table(name), data)?;
    }

    // Meta coordinates a format does not declare are zero
    let [meta_rows, meta_columns, rows, columns] = coords;
    if let (Some(rows), Some(columns)) = (rows, columns) {
        let declared = |v: Option<Vec<i32>>, name: Option<&str>| match (v, name) {
            (Some(v), _) => Some(v),
            (None, None) => Some(vec![0; rows.len()]),
            (None, Some(_)) => None,
        };
        if let (Some(meta_rows), Some(meta_columns)) = (
            declared(meta_rows, None),
            declared(meta_columns, meta.location.meta_column),
        ) {
            assay.set_locations(&meta_rows, &meta_columns, &rows, &columns)?;
        }
    }
    Ok(assay)
}
