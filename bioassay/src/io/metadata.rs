//! Declarative description of a file format
use super::*;

/// Bidirectional translation between the column names of a file ("stream"
/// names) and the field names of a [`BioAssay`] ("table" names).
///
/// Names without an entry translate to themselves.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldNameConverter {
    to_stream: HashMap<String, String>,
    to_table: HashMap<String, String>,
}

impl FieldNameConverter {
    pub fn new() -> FieldNameConverter {
        FieldNameConverter::default()
    }

    pub fn add<S: Into<String>, T: Into<String>>(&mut self, table: S, stream: T) {
        let (table, stream) = (table.into(), stream.into());
        self.to_stream.insert(table.clone(), stream.clone());
        self.to_table.insert(stream, table);
    }

    pub fn with<S: Into<String>, T: Into<String>>(mut self, table: S, stream: T) -> Self {
        self.add(table, stream);
        self
    }

    /// Column name in the file for a bioassay field
    pub fn to_stream<'a>(&'a self, table: &'a str) -> &'a str {
        self.to_stream.get(table).map(String::as_str).unwrap_or(table)
    }

    /// Bioassay field name for a column of the file
    pub fn to_table<'a>(&'a self, stream: &'a str) -> &'a str {
        self.to_table.get(stream).map(String::as_str).unwrap_or(stream)
    }
}

/// Stream names of the four coordinates packed into the `location` field.
///
/// A format that does not store one of them leaves it `None`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LocationFields {
    pub meta_row: Option<&'static str>,
    pub meta_column: Option<&'static str>,
    pub row: Option<&'static str>,
    pub column: Option<&'static str>,
}

impl LocationFields {
    pub const fn new(
        meta_row: Option<&'static str>,
        meta_column: Option<&'static str>,
        row: Option<&'static str>,
        column: Option<&'static str>,
    ) -> LocationFields {
        LocationFields {
            meta_row,
            meta_column,
            row,
            column,
        }
    }

    /// Declared names, in meta-row, meta-column, row, column order
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        [self.meta_row, self.meta_column, self.row, self.column]
            .into_iter()
            .flatten()
    }

    /// Coordinate index of `name` (0 = meta-row ... 3 = column)
    pub fn position(&self, name: &str) -> Option<usize> {
        [self.meta_row, self.meta_column, self.row, self.column]
            .iter()
            .position(|f| *f == Some(name))
    }
}

/// Everything the generic reader and writer need to know about the columns
/// and the framing of a format
#[derive(Clone, Debug)]
pub struct FieldMetadata {
    /// Columns in the order they appear in the stream. Formats whose header
    /// lists the columns use this as the write order only.
    pub field_order: Vec<String>,
    pub int_fields: HashSet<String>,
    pub double_fields: HashSet<String>,
    pub converter: FieldNameConverter,
    pub separator: u8,
    /// Remove one layer of double quotes around text values on read
    pub strip_quotes: bool,
    /// A line equal to this ends the data section
    pub end_tag: Option<String>,
    /// First cell of every data line, not a column
    pub line_tag: Option<&'static str>,
    pub location: LocationFields,
    pub eol: &'static str,
}

impl Default for FieldMetadata {
    fn default() -> FieldMetadata {
        FieldMetadata::tab_delimited()
    }
}

impl FieldMetadata {
    /// Tab separated, quoted text, DOS line endings
    pub fn tab_delimited() -> FieldMetadata {
        FieldMetadata {
            field_order: Vec::new(),
            int_fields: HashSet::new(),
            double_fields: HashSet::new(),
            converter: FieldNameConverter::default(),
            separator: b'\t',
            strip_quotes: true,
            end_tag: None,
            line_tag: None,
            location: LocationFields::default(),
            eol: "\r\n",
        }
    }

    pub fn with_order(mut self, fields: &[&str]) -> Self {
        self.field_order = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn with_ints(mut self, fields: &[&str]) -> Self {
        self.int_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_doubles(mut self, fields: &[&str]) -> Self {
        self.double_fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    pub fn with_converter(mut self, converter: FieldNameConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_location(mut self, location: LocationFields) -> Self {
        self.location = location;
        self
    }

    pub fn with_end_tag<S: Into<String>>(mut self, tag: S) -> Self {
        self.end_tag = Some(tag.into());
        self
    }

    pub fn with_line_tag(mut self, tag: &'static str) -> Self {
        self.line_tag = Some(tag);
        self
    }

    pub fn with_eol(mut self, eol: &'static str) -> Self {
        self.eol = eol;
        self
    }

    pub fn keep_quotes(mut self) -> Self {
        self.strip_quotes = false;
        self
    }

    /// Storage type of a stream column.
    ///
    /// Location coordinates are integers whatever the typing lists say.
    pub fn classify(&self, stream_name: &str) -> FieldType {
        if self.location.position(stream_name).is_some() || self.int_fields.contains(stream_name) {
            FieldType::Int
        } else if self.double_fields.contains(stream_name) {
            FieldType::Double
        } else {
            FieldType::Text
        }
    }
}

/// A concrete file format.
///
/// Only [`Format::metadata`] is required; headerless formats with a fixed
/// column order need nothing else.
pub trait Format {
    fn metadata(&self) -> &FieldMetadata;

    /// Stream names requested for reading when a reader is created
    fn default_read_fields(&self) -> &[&'static str] {
        &[]
    }

    /// Table names requested for writing when a writer is created
    fn default_write_fields(&self) -> &[&'static str] {
        &[]
    }

    /// Read every column of the stream unless told otherwise
    fn read_all_fields(&self) -> bool {
        false
    }

    /// Consume the header lines, if any, and return the stream names of the
    /// data columns in order
    fn read_header<R: BufRead>(
        &mut self,
        _input: &mut LineReader<R>,
        _assay: &mut BioAssay,
    ) -> Result<Vec<String>> {
        Ok(self.metadata().field_order.clone())
    }

    /// Emit whatever precedes the data lines. `columns` are the stream names
    /// about to be written.
    fn write_header<W: Write>(&self, _out: &mut W, _assay: &BioAssay, _columns: &[&str]) -> Result<()> {
        Ok(())
    }

    /// Emit whatever follows the data lines
    fn write_footer<W: Write>(&self, _out: &mut W, _assay: &BioAssay) -> Result<()> {
        Ok(())
    }

    /// Append a text cell to a data line
    fn format_text(&self, value: &str, line: &mut String) {
        line.push('"');
        line.push_str(value);
        line.push('"');
    }

    /// Hook applied to the table read from stream `index` before it is merged
    /// by a [`MultiStreamReader`]
    fn transform(&self, _assay: &mut BioAssay, _index: usize) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn converter_defaults_to_identity() {
        let conv = FieldNameConverter::new().with("id", "ID").with("description", "Name");
        assert_eq!(conv.to_stream("id"), "ID");
        assert_eq!(conv.to_table("Name"), "description");
        assert_eq!(conv.to_table("Block"), "Block");
        assert_eq!(conv.to_stream("Block"), "Block");
    }

    #[test]
    fn locations_are_always_integers() {
        let meta = FieldMetadata::tab_delimited()
            .with_doubles(&["Row", "Signal"])
            .with_ints(&["Flags"])
            .with_location(LocationFields::new(None, Some("Block"), Some("Row"), Some("Column")));
        assert_eq!(meta.classify("Row"), FieldType::Int);
        assert_eq!(meta.classify("Column"), FieldType::Int);
        assert_eq!(meta.classify("Flags"), FieldType::Int);
        assert_eq!(meta.classify("Signal"), FieldType::Double);
        assert_eq!(meta.classify("Name"), FieldType::Text);
    }

    #[test]
    fn location_positions() {
        let loc = LocationFields::new(None, Some("Block"), Some("Row"), Some("Column"));
        assert_eq!(loc.names().collect::<Vec<_>>(), vec!["Block", "Row", "Column"]);
        assert_eq!(loc.position("Block"), Some(1));
        assert_eq!(loc.position("Column"), Some(3));
        assert_eq!(loc.position("Name"), None);
    }
}
