//! BioDiscovery ImaGene files: array lists and per-channel quantifications
use super::*;

pub const FIELD_NAME_META_ROW: &str = "Meta Row";
pub const FIELD_NAME_META_COLUMN: &str = "Meta Column";
pub const FIELD_NAME_ROW: &str = "Row";
pub const FIELD_NAME_COLUMN: &str = "Column";

/// Per-channel intensity, folded into `green` or `red` when merging
pub const FIELD_NAME_SIGNAL: &str = "Signal Median";

/// Value of the `type` annotation of a merged ImaGene quantification
pub const IMAGENE_RESULTS_TYPE: &str = "ImaGene Results";
/// Value of the `type` annotation of an ImaGene array list
pub const IMAGENE_ARRAY_LIST_TYPE: &str = "ImaGene Array List";
pub const ANNOTATION_TYPE: &str = "type";

pub const IMAGENE_LOCATION: LocationFields = LocationFields::new(
    Some(FIELD_NAME_META_ROW),
    Some(FIELD_NAME_META_COLUMN),
    Some(FIELD_NAME_ROW),
    Some(FIELD_NAME_COLUMN),
);

const MAGIC: &str = "Begin Header";
const END_HEADER: &str = "End Header";
const BEGIN_SECTION: &str = "Begin ";
const END_SECTION: &str = "End ";
const BEGIN_RAW_DATA: &str = "Begin Raw Data";
const END_RAW_DATA: &str = "End Raw Data";
const END_OF_FILE: &str = "End of File";

/// Header sections written as a row of names over a row of values
const TABLE_SECTIONS: [&str; 1] = ["Field Dimensions"];

const ARRAY_LIST_FIELDS: [&str; 5] = [
    FIELD_NAME_META_ROW,
    FIELD_NAME_META_COLUMN,
    FIELD_NAME_ROW,
    FIELD_NAME_COLUMN,
    FIELD_NAME_ID,
];

/// Headerless spot layout: meta-row, meta-column, row, column, id
#[derive(Clone, Debug)]
pub struct ImaGeneArrayList {
    meta: FieldMetadata,
}

impl ImaGeneArrayList {
    pub fn new() -> ImaGeneArrayList {
        ImaGeneArrayList {
            meta: FieldMetadata::tab_delimited()
                .with_order(&ARRAY_LIST_FIELDS)
                .with_location(IMAGENE_LOCATION),
        }
    }
}

impl Default for ImaGeneArrayList {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for ImaGeneArrayList {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn default_write_fields(&self) -> &[&'static str] {
        &[FIELD_NAME_ID]
    }

    fn read_all_fields(&self) -> bool {
        true
    }

    fn read_header<R: BufRead>(&mut self, _input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
        assay
            .annotation
            .insert(ANNOTATION_TYPE.into(), IMAGENE_ARRAY_LIST_TYPE.into());
        Ok(self.meta.field_order.clone())
    }

    fn format_text(&self, value: &str, line: &mut String) {
        line.push_str(value);
    }
}

const OUTPUT_READ_FIELDS: [&str; 8] = [
    "Field",
    FIELD_NAME_META_ROW,
    FIELD_NAME_META_COLUMN,
    FIELD_NAME_ROW,
    FIELD_NAME_COLUMN,
    "Gene ID",
    FIELD_NAME_SIGNAL,
    "Flag",
];

const OUTPUT_WRITE_FIELDS: [&str; 4] = ["Field", FIELD_NAME_ID, FIELD_NAME_FLAG, FIELD_NAME_SIGNAL];

const OUTPUT_FIELDS: [&str; 52] = [
    "Field",
    FIELD_NAME_META_ROW,
    FIELD_NAME_META_COLUMN,
    FIELD_NAME_ROW,
    FIELD_NAME_COLUMN,
    "Gene ID",
    "Flag",
    "Signal Mean",
    "Background Mean",
    "Signal Median",
    "Background Median",
    "Signal Mode",
    "Background Mode",
    "Signal Area",
    "Background Area",
    "Signal Total",
    "Background Total",
    "Signal Stdev",
    "Background Stdev",
    "Shape Regularity",
    "Ignored Area",
    "Spot Area",
    "Ignored Median",
    "Area To Perimeter",
    "Open Perimeter",
    "XCoord",
    "YCoord",
    "Diameter",
    "Position offset",
    "Offset X",
    "Offset Y",
    "Expected X",
    "Expected Y",
    "CM-X",
    "CM-Y",
    "CM Offset",
    "CM Offset-X",
    "CM Offset-Y",
    "Min Diam",
    "Max Diam",
    "Control",
    "Failed Control",
    "Background contamination present",
    "Signal contamination present",
    "Ignored % failed",
    "Open perimeter failed",
    "Shape regularity failed",
    "Perim-to-area failed",
    "Offset failed",
    "Empty spot",
    "Negative spot",
    "Selected spot",
];

const OUTPUT_INT_FIELDS: [&str; 17] = [
    FIELD_NAME_META_ROW,
    FIELD_NAME_META_COLUMN,
    FIELD_NAME_ROW,
    FIELD_NAME_COLUMN,
    "Flag",
    "Control",
    "Failed Control",
    "Background contamination present",
    "Signal contamination present",
    "Ignored % failed",
    "Open perimeter failed",
    "Shape regularity failed",
    "Perim-to-area failed",
    "Offset failed",
    "Empty spot",
    "Negative spot",
    "Selected spot",
];

const OUTPUT_DOUBLE_FIELDS: [&str; 33] = [
    "Signal Mean",
    "Background Mean",
    "Signal Median",
    "Background Median",
    "Signal Mode",
    "Background Mode",
    "Signal Area",
    "Background Area",
    "Signal Total",
    "Background Total",
    "Signal Stdev",
    "Background Stdev",
    "Shape Regularity",
    "Ignored Area",
    "Spot Area",
    "Ignored Median",
    "Area To Perimeter",
    "Open Perimeter",
    "XCoord",
    "YCoord",
    "Diameter",
    "Position offset",
    "Offset X",
    "Offset Y",
    "Expected X",
    "Expected Y",
    "CM-X",
    "CM-Y",
    "CM Offset",
    "CM Offset-X",
    "CM Offset-Y",
    "Min Diam",
    "Max Diam",
];

/// Quantification of one channel as exported by ImaGene.
///
/// A two-channel scan comes as two files; [`ImaGeneOutput::reader`] reads
/// both and keeps the signal of the first as `green` and of the second as
/// `red`. The writer emits a single channel: `green` and `red` have no
/// column in these files.
#[derive(Clone, Debug)]
pub struct ImaGeneOutput {
    meta: FieldMetadata,
}

impl ImaGeneOutput {
    pub fn new() -> ImaGeneOutput {
        ImaGeneOutput {
            meta: FieldMetadata::tab_delimited()
                .with_order(&OUTPUT_FIELDS)
                .with_ints(&OUTPUT_INT_FIELDS)
                .with_doubles(&OUTPUT_DOUBLE_FIELDS)
                .with_converter(
                    FieldNameConverter::new()
                        .with(FIELD_NAME_ID, "Gene ID")
                        .with(FIELD_NAME_FLAG, "Flag"),
                )
                .with_location(IMAGENE_LOCATION)
                .with_end_tag(END_RAW_DATA)
                .keep_quotes(),
        }
    }

    /// Two-stream reader merging a green and a red channel file
    pub fn reader<R: BufRead>(green: R, red: R) -> MultiStreamReader<R, ImaGeneOutput> {
        let mut reader = MultiStreamReader::new(ImaGeneOutput::new());
        reader.add_stream(green);
        reader.add_stream(red);
        reader
    }
}

impl Default for ImaGeneOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for ImaGeneOutput {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn default_read_fields(&self) -> &[&'static str] {
        &OUTPUT_READ_FIELDS
    }

    fn default_write_fields(&self) -> &[&'static str] {
        &OUTPUT_WRITE_FIELDS
    }

    fn read_header<R: BufRead>(&mut self, input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
        read_imagene_header(input, &mut assay.annotation)
    }

    fn write_header<W: Write>(&self, out: &mut W, assay: &BioAssay, columns: &[&str]) -> Result<()> {
        let eol = self.meta.eol;
        let mut header = String::new();
        header.push_str(MAGIC);
        header.push_str(eol);
        HeaderSection::from_annotation(&assay.annotation).write(1, eol, &mut header);
        let names = columns.join("\t");
        for line in [END_HEADER, BEGIN_RAW_DATA, names.as_str()] {
            header.push_str(line);
            header.push_str(eol);
        }
        out.write_all(header.as_bytes())?;
        Ok(())
    }

    fn write_footer<W: Write>(&self, out: &mut W, _assay: &BioAssay) -> Result<()> {
        let eol = self.meta.eol;
        write!(out, "{}{}{}{}", END_RAW_DATA, eol, END_OF_FILE, eol)?;
        Ok(())
    }

    fn format_text(&self, value: &str, line: &mut String) {
        line.push_str(value);
    }

    /// Stream 0 is the green channel and stream 1 the red one; the signal of
    /// any other stream is dropped
    fn transform(&self, assay: &mut BioAssay, index: usize) -> Result<()> {
        let values = match assay.remove(FIELD_NAME_SIGNAL) {
            Some(Column::Doubles(v)) => v.iter().map(|&x| x as i32).collect::<Vec<_>>(),
            Some(Column::Ints(v)) => v,
            _ => return Err(IoError::NoField(FIELD_NAME_SIGNAL.into())),
        };
        match index {
            0 => assay.set_greens(values)?,
            1 => assay.set_reds(values)?,
            _ => return Ok(()),
        }
        assay
            .annotation
            .insert(ANNOTATION_TYPE.into(), IMAGENE_RESULTS_TYPE.into());
        Ok(())
    }
}

/// Section bookkeeping while walking an ImaGene header
#[derive(Default)]
struct Sections {
    path: Vec<String>,
    first_row: bool,
    key_value: bool,
    columns: Vec<String>,
}

impl Sections {
    fn open(&mut self, name: &str) {
        self.path.push(name.to_string());
        self.first_row = true;
    }

    fn close(&mut self) {
        self.path.pop();
    }

    fn key(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.path.join("."), name)
        }
    }

    /// The first row of a section decides whether it is a list of
    /// `key<TAB>value` pairs or a table whose first row names the columns
    fn row(&mut self, line: &str, annotation: &mut Annotation) {
        let cells = line.split('\t').collect::<Vec<_>>();
        let colon = cells.iter().any(|c| c.ends_with(':'));

        if self.first_row {
            self.key_value = cells.len() <= 2 || colon;
            if !colon {
                self.columns = cells.iter().map(|c| c.to_string()).collect();
            }
        }

        if self.key_value {
            let key = self.key(cells[0]);
            let value = cells.get(1).copied().unwrap_or("");
            if let Some(sub) = cells.get(2).and_then(|c| c.strip_suffix(':')) {
                let sub_value = cells.get(3).copied().unwrap_or("");
                annotation.insert(format!("{}.{}", key, sub), sub_value.to_string());
            }
            annotation.insert(key, value.to_string());
        } else if !self.first_row {
            for (name, cell) in self.columns.iter().zip(&cells) {
                annotation.insert(self.key(name), cell.to_string());
            }
        }
        self.first_row = false;
    }
}

/// One level of the header tree rebuilt from `section.key` annotations
#[derive(Default)]
struct HeaderSection<'a> {
    name: &'a str,
    /// Name, value and the optional `name:` sub-entry of each row
    entries: Vec<(&'a str, &'a str, Option<(&'a str, &'a str)>)>,
    children: Vec<HeaderSection<'a>>,
}

impl<'a> HeaderSection<'a> {
    fn from_annotation(annotation: &'a Annotation) -> HeaderSection<'a> {
        let mut root = HeaderSection::default();
        for (key, value) in annotation {
            if key == ANNOTATION_TYPE {
                continue;
            }
            // `key.sub` is written on the row of `key`
            if let Some((parent, _)) = key.rsplit_once('.') {
                if annotation.contains_key(parent) {
                    continue;
                }
            }
            let mut path = key.split('.').collect::<Vec<_>>();
            let name = match path.pop() {
                Some(name) => name,
                None => continue,
            };
            let mut section = &mut root;
            for &s in &path {
                section = section.child(s);
            }
            section.entries.push((name, value.as_str(), sub_entry(annotation, key)));
        }
        root
    }

    fn child(&mut self, name: &'a str) -> &mut HeaderSection<'a> {
        let idx = match self.children.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.children.push(HeaderSection {
                    name,
                    ..HeaderSection::default()
                });
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }

    /// A table needs more than two columns to be read back as one
    fn is_table(&self) -> bool {
        TABLE_SECTIONS.contains(&self.name) && self.entries.len() > 2 && self.entries.iter().all(|e| e.2.is_none())
    }

    fn write(&self, depth: usize, eol: &str, out: &mut String) {
        let indent = "\t".repeat(depth);
        if self.is_table() {
            let names = self.entries.iter().map(|e| e.0).collect::<Vec<_>>();
            let values = self.entries.iter().map(|e| e.1).collect::<Vec<_>>();
            for row in [names, values] {
                out.push_str(&indent);
                out.push_str(&row.join("\t"));
                out.push_str(eol);
            }
        } else {
            for (name, value, sub) in &self.entries {
                out.push_str(&format!("{}{}\t{}", indent, name, value));
                if let Some((sub, sub_value)) = sub {
                    out.push_str(&format!("\t{}:\t{}", sub, sub_value));
                }
                out.push_str(eol);
            }
        }
        for child in &self.children {
            out.push_str(&format!("{}{}{}{}", indent, BEGIN_SECTION, child.name, eol));
            child.write(depth + 1, eol, out);
            out.push_str(&format!("{}{}{}{}", indent, END_SECTION, child.name, eol));
        }
    }
}

fn sub_entry<'a>(annotation: &'a Annotation, key: &str) -> Option<(&'a str, &'a str)> {
    let prefix = format!("{}.", key);
    annotation.iter().find_map(|(k, v)| {
        k.strip_prefix(prefix.as_str())
            .filter(|sub| !sub.contains('.'))
            .map(|sub| (sub, v.as_str()))
    })
}

fn invalid<S: Into<String>>(msg: S) -> IoError {
    IoError::Header(msg.into())
}

/// Store the header sections as annotations and return the raw data column
/// names
pub(crate) fn read_imagene_header<R: BufRead>(
    input: &mut LineReader<R>,
    annotation: &mut Annotation,
) -> Result<Vec<String>> {
    let magic = input.next_line()?.ok_or_else(|| invalid("empty stream"))?;
    if !magic.starts_with(MAGIC) {
        return Err(invalid("not an ImaGene output stream"));
    }

    let mut sections = Sections {
        first_row: true,
        ..Sections::default()
    };
    while let Some(line) = input.next_line()? {
        let line = line.trim_start_matches('\t');
        if line.starts_with(END_HEADER) {
            return raw_data_columns(input);
        }
        if line.is_empty() {
            continue;
        }
        if let Some(name) = line.strip_prefix(BEGIN_SECTION) {
            sections.open(name);
        } else if line.starts_with(END_SECTION) {
            sections.close();
        } else {
            sections.row(line, annotation);
        }
    }
    Err(invalid("missing End Header"))
}

fn raw_data_columns<R: BufRead>(input: &mut LineReader<R>) -> Result<Vec<String>> {
    while let Some(line) = input.next_line()? {
        if line.starts_with(BEGIN_RAW_DATA) {
            let names = input.next_line()?.ok_or_else(|| invalid("missing raw data column names"))?;
            return Ok(names.split('\t').map(|n| n.trim().to_string()).collect());
        }
    }
    Err(invalid("missing Begin Raw Data"))
}

#[cfg(test)]
mod test {
    use super::*;

    fn channel(signal: [&str; 2]) -> String {
        format!(
            "Begin Header\n\
\tVersion\t5.6\n\
\tBegin Field Dimensions\n\
\t\tField\tMetarows\tMetacols\tRows\tCols\n\
\t\tA\t4\t8\t20\t21\n\
\tEnd Field Dimensions\n\
\tBegin Measurement parameters\n\
\t\tSegmentation Method\tauto\tName:\tfixed\n\
\tEnd Measurement parameters\n\
End Header\n\
\n\
Begin Raw Data\n\
Field\tMeta Row\tMeta Column\tRow\tColumn\tGene ID\tFlag\tSignal Median\tSignal Mean\n\
A\t1\t1\t1\t1\tNO_DATA 5BOV1A8\t0\t{}\t800.5\n\
A\t4\t8\t20\t21\t\t2\t{}\t12.0\n\
End Raw Data\n\
trailing garbage\n",
            signal[0], signal[1]
        )
    }

    #[test]
    fn header_annotations() {
        let data = channel(["875.6", "3"]);
        let mut input = LineReader::new(data.as_bytes());
        let mut annotation = Annotation::new();
        let names = read_imagene_header(&mut input, &mut annotation).unwrap();
        assert_eq!(names[0], "Field");
        assert_eq!(names.len(), 9);

        let get = |k: &str| annotation.get(k).map(String::as_str);
        assert_eq!(get("Version"), Some("5.6"));
        assert_eq!(get("Field Dimensions.Metarows"), Some("4"));
        assert_eq!(get("Field Dimensions.Cols"), Some("21"));
        assert_eq!(get("Measurement parameters.Segmentation Method"), Some("auto"));
        assert_eq!(get("Measurement parameters.Segmentation Method.Name"), Some("fixed"));
    }

    #[test]
    fn truncated_headers() {
        let mut annotation = Annotation::new();
        let mut input = LineReader::new(&b"ATF\t1.0\n"[..]);
        assert!(read_imagene_header(&mut input, &mut annotation).is_err());
        let mut input = LineReader::new(&b"Begin Header\n\tVersion\t5.6\n"[..]);
        assert!(read_imagene_header(&mut input, &mut annotation).is_err());
        let mut input = LineReader::new(&b"Begin Header\nEnd Header\n"[..]);
        assert!(read_imagene_header(&mut input, &mut annotation).is_err());
    }

    #[test]
    fn two_channels() {
        let green = channel(["875.6", "3"]);
        let red = channel(["0", "2268.9"]);
        let ba = ImaGeneOutput::reader(green.as_bytes(), red.as_bytes())
            .read()
            .unwrap()
            .unwrap();

        assert_eq!(ba.len(), 2);
        assert_eq!(ba.greens(), Some(&[875, 3][..]));
        assert_eq!(ba.reds(), Some(&[0, 2268][..]));
        assert_eq!(ba.flags(), Some(&[0, 2][..]));
        assert_eq!(ba.ids().unwrap(), &["NO_DATA 5BOV1A8".to_string(), String::new()]);
        assert!(!ba.contains(FIELD_NAME_SIGNAL));
        assert!(!ba.contains("Signal Mean"));
        assert_eq!(ba.annotation.get(ANNOTATION_TYPE).map(String::as_str), Some(IMAGENE_RESULTS_TYPE));

        let locs = ba.unpack_locations().unwrap();
        assert_eq!(
            (locs.meta_rows[1], locs.meta_columns[1], locs.rows[1], locs.columns[1]),
            (4, 8, 20, 21)
        );
    }

    fn read_channel(data: &str) -> BioAssay {
        let mut reader = BioAssayReader::new(data.as_bytes(), ImaGeneOutput::new());
        reader.add_all_fields_to_read();
        reader.read().unwrap()
    }

    #[test]
    fn write_channel() {
        let ba = read_channel(&channel(["875.6", "3"]));
        let mut out = Vec::new();
        let mut writer = BioAssayWriter::new(&mut out, ImaGeneOutput::new());
        writer.add_all_fields_to_write();
        writer.write(&ba).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Begin Header\r\n\
\tVersion\t5.6\r\n\
\tBegin Field Dimensions\r\n\
\t\tCols\tField\tMetacols\tMetarows\tRows\r\n\
\t\t21\tA\t8\t4\t20\r\n\
\tEnd Field Dimensions\r\n\
\tBegin Measurement parameters\r\n\
\t\tSegmentation Method\tauto\tName:\tfixed\r\n\
\tEnd Measurement parameters\r\n\
End Header\r\n\
Begin Raw Data\r\n\
Field\tMeta Row\tMeta Column\tRow\tColumn\tGene ID\tFlag\tSignal Mean\tSignal Median\r\n\
A\t1\t1\t1\t1\tNO_DATA 5BOV1A8\t0\t800.5\t875.6\r\n\
A\t4\t8\t20\t21\t\t2\t12\t3\r\n\
End Raw Data\r\n\
End of File\r\n"
        );

        let back = read_channel(&text);
        assert_eq!(back.annotation, ba.annotation);
        assert_eq!(back.locations(), ba.locations());
        assert_eq!(back.ids(), ba.ids());
        assert_eq!(back.doubles(FIELD_NAME_SIGNAL), ba.doubles(FIELD_NAME_SIGNAL));
    }

    #[test]
    fn nested_header_sections() {
        let mut ba = BioAssay::new();
        ba.set_ids(vec!["g".into()]).unwrap();
        for (key, value) in [
            ("Quality settings.Empty Spots", "1"),
            ("Quality settings.Empty Spots.Threshold", "0.5"),
            ("Quality settings.Poor Spots Parameters.Offset flag", "0"),
            (ANNOTATION_TYPE, IMAGENE_RESULTS_TYPE),
        ] {
            ba.annotation.insert(key.into(), value.into());
        }
        let mut out = Vec::new();
        BioAssayWriter::new(&mut out, ImaGeneOutput::new()).write(&ba).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(
            "Begin Header\r\n\
\tBegin Quality settings\r\n\
\t\tEmpty Spots\t1\tThreshold:\t0.5\r\n\
\t\tBegin Poor Spots Parameters\r\n\
\t\t\tOffset flag\t0\r\n\
\t\tEnd Poor Spots Parameters\r\n\
\tEnd Quality settings\r\n\
End Header\r\n"
        ));

        let mut annotation = Annotation::new();
        read_imagene_header(&mut LineReader::new(text.as_bytes()), &mut annotation).unwrap();
        ba.annotation.remove(ANNOTATION_TYPE);
        assert_eq!(annotation, ba.annotation);
    }

    #[test]
    fn channel_without_signal() {
        let mut ba = BioAssay::new();
        ba.set_ids(vec!["g".into()]).unwrap();
        let err = ImaGeneOutput::new().transform(&mut ba, 0).unwrap_err();
        assert!(matches!(err, IoError::NoField(ref f) if f == FIELD_NAME_SIGNAL));
    }

    #[test]
    fn array_list_round_trip() {
        let data = "1\t2\t3\t4\tgene\"a\"\n2\t1\t5\t6\tgene b\n";
        let mut reader = BioAssayReader::new(data.as_bytes(), ImaGeneArrayList::new());
        let ba = reader.read().unwrap();
        assert_eq!(ba.annotation.get(ANNOTATION_TYPE).map(String::as_str), Some(IMAGENE_ARRAY_LIST_TYPE));
        let locs = ba.unpack_locations().unwrap();
        assert_eq!(
            (locs.meta_rows[0], locs.meta_columns[0], locs.rows[0], locs.columns[0]),
            (1, 2, 3, 4)
        );

        let mut out = Vec::new();
        BioAssayWriter::new(&mut out, ImaGeneArrayList::new()).write(&ba).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1\t2\t3\t4\tgene\"a\"\r\n2\t1\t5\t6\tgene b\r\n"
        );
    }
}
