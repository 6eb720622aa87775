//! Axon Text File framing, shared by the GenePix formats
use super::*;
use crate::io::text::{split, unquote};

pub const FIELD_NAME_BLOCK: &str = "Block";
pub const FIELD_NAME_ROW: &str = "Row";
pub const FIELD_NAME_COLUMN: &str = "Column";

/// ATF files have no meta-row; blocks map to meta-columns
pub const ATF_LOCATION: LocationFields =
    LocationFields::new(None, Some(FIELD_NAME_BLOCK), Some(FIELD_NAME_ROW), Some(FIELD_NAME_COLUMN));

/// Annotation holding the kind of a GenePix file
pub const ANNOTATION_TYPE: &str = "Type";

const MAGIC: &str = "ATF";
const VERSION: &str = "1.0";
const EOL: &str = "\r\n";

/// Tab separated, quoted text, block/row/column locations
pub fn atf_metadata() -> FieldMetadata {
    FieldMetadata::tab_delimited().with_location(ATF_LOCATION)
}

fn invalid<S: Into<String>>(msg: S) -> IoError {
    IoError::Header(msg.into())
}

/// Parse the ATF header: magic record, dimension record, optional
/// `"key=value"` records (stored as annotations) and the column names.
pub(crate) fn read_atf_header<R: BufRead>(input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
    let magic = input.next_line()?.ok_or_else(|| invalid("empty stream"))?;
    let tokens = magic.split(|c: char| c == '\t' || c == ' ').filter(|t| !t.is_empty()).collect::<Vec<_>>();
    if !magic.starts_with(MAGIC) || tokens.len() != 2 {
        return Err(invalid("not an ATF stream"));
    }
    if tokens[1] != VERSION {
        return Err(invalid(format!("unsupported ATF version {}", tokens[1])));
    }

    let dims = input.next_line()?.ok_or_else(|| invalid("missing dimension record"))?;
    let dims = dims.split_whitespace().collect::<Vec<_>>();
    if dims.len() != 2 {
        return Err(invalid("invalid dimension record"));
    }
    let records = dims[0]
        .parse::<usize>()
        .map_err(|_| invalid(format!("invalid number of optional records: {}", dims[0])))?;
    let n_columns = dims[1]
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| invalid(format!("invalid number of columns: {}", dims[1])))?;

    for _ in 0..records {
        let line = input.next_line()?.ok_or_else(|| invalid("truncated optional records"))?;
        let record = unquote(line.trim()).trim();
        if record.is_empty() {
            return Err(invalid(format!("empty optional record at line {}", input.line_number())));
        }
        let (key, value) = record.split_once('=').unwrap_or((record, ""));
        assay.annotation.insert(key.trim().to_string(), value.to_string());
    }

    let line = input.next_line()?.ok_or_else(|| invalid("missing column names"))?;
    let names = split(b'\t', &line)
        .iter()
        .map(|name| unquote(name.trim()).to_string())
        .collect::<Vec<_>>();
    if names.len() != n_columns {
        return Err(invalid(format!(
            "{} column names for {} declared columns",
            names.len(),
            n_columns
        )));
    }
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(invalid(format!("duplicate column `{}`", name)));
        }
    }
    Ok(names)
}

/// Emit the ATF header for `columns`, with one optional record per
/// annotation entry
pub(crate) fn write_atf_header<W: Write>(out: &mut W, annotation: &Annotation, columns: &[&str]) -> Result<()> {
    let mut header = String::new();
    header.push_str(MAGIC);
    header.push('\t');
    header.push_str(VERSION);
    header.push_str(EOL);
    header.push_str(&format!("{}\t{}{}", annotation.len(), columns.len(), EOL));
    for (key, value) in annotation {
        header.push_str(&format!("\"{}={}\"{}", key, value, EOL));
    }
    let names = columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>();
    header.push_str(&names.join("\t"));
    header.push_str(EOL);
    out.write_all(header.as_bytes())?;
    Ok(())
}

/// Annotations written to a GenePix file. The `Type` record is set to `own`
/// unless it already names a file of the same `family`.
pub(crate) fn genepix_annotation(annotation: &Annotation, family: &str, own: &str) -> Annotation {
    let mut annotation = annotation.clone();
    let same_family = annotation
        .get(ANNOTATION_TYPE)
        .map_or(false, |t| t.trim_start().starts_with(family));
    if !same_family {
        annotation.insert(ANNOTATION_TYPE.into(), own.into());
    }
    annotation
}

/// Any ATF file. Every column is read; columns other than the locations are
/// kept as text.
#[derive(Clone, Debug)]
pub struct AtfFormat {
    meta: FieldMetadata,
}

impl AtfFormat {
    pub fn new() -> AtfFormat {
        AtfFormat { meta: atf_metadata() }
    }
}

impl Default for AtfFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for AtfFormat {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn read_all_fields(&self) -> bool {
        true
    }

    fn read_header<R: BufRead>(&mut self, input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
        read_atf_header(input, assay)
    }

    fn write_header<W: Write>(&self, out: &mut W, assay: &BioAssay, columns: &[&str]) -> Result<()> {
        write_atf_header(out, &assay.annotation, columns)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn header(data: &str) -> Result<(Vec<String>, BioAssay)> {
        let mut input = LineReader::new(data.as_bytes());
        let mut ba = BioAssay::new();
        let names = read_atf_header(&mut input, &mut ba)?;
        Ok((names, ba))
    }

    #[test]
    fn valid_header() {
        let (names, ba) = header(
            "ATF\t1.0\r\n2\t3\r\n\"Type=GenePix Results 3\"\r\n\"Creator= GenePix Pro 6.0\"\r\n\"Block\"\t\"Row\"\t\"Column\"\r\n",
        )
        .unwrap();
        assert_eq!(names, vec!["Block", "Row", "Column"]);
        assert_eq!(ba.annotation.get("Type").map(String::as_str), Some("GenePix Results 3"));
        assert_eq!(ba.annotation.get("Creator").map(String::as_str), Some(" GenePix Pro 6.0"));
    }

    #[test]
    fn rejected_headers() {
        assert!(header("").is_err());
        assert!(header("FOO\t1.0\n0\t1\nA\n").is_err());
        assert!(header("ATF\t2.0\n0\t1\nA\n").is_err());
        assert!(header("ATF 1.0 extra\n0\t1\nA\n").is_err());
        assert!(header("ATF\t1.0\n-1\t1\nA\n").is_err());
        assert!(header("ATF\t1.0\n0\t0\n\n").is_err());
        assert!(header("ATF\t1.0\n1\t1\n\"\"\nA\n").is_err());
        assert!(header("ATF\t1.0\n0\t2\nA\n").is_err());
        assert!(matches!(header("ATF\t1.0\n0\t2\nA\tA\n"), Err(IoError::Header(_))));
    }

    #[test]
    fn space_separated_magic() {
        let (names, _) = header("ATF 1.0\n0 1\n\"Name\"\n").unwrap();
        assert_eq!(names, vec!["Name"]);
    }

    #[test]
    fn write_header() {
        let mut annotation = Annotation::new();
        annotation.insert("Type".into(), "GenePix ArrayList V1.0".into());
        let mut out = Vec::new();
        write_atf_header(&mut out, &annotation, &["Block", "Name"]).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ATF\t1.0\r\n1\t2\r\n\"Type=GenePix ArrayList V1.0\"\r\n\"Block\"\t\"Name\"\r\n"
        );
    }

    #[test]
    fn genepix_type_record() {
        let mut annotation = Annotation::new();
        let typed = genepix_annotation(&annotation, "GenePix ArrayList", "GenePix ArrayList V1.0");
        assert_eq!(typed.get("Type").map(String::as_str), Some("GenePix ArrayList V1.0"));

        annotation.insert("Type".into(), "GenePix ArrayList V1.1".into());
        let typed = genepix_annotation(&annotation, "GenePix ArrayList", "GenePix ArrayList V1.0");
        assert_eq!(typed.get("Type").map(String::as_str), Some("GenePix ArrayList V1.1"));

        annotation.insert("Type".into(), "GenePix Results 3".into());
        annotation.insert("Scanner".into(), "GenePix 4000B".into());
        let typed = genepix_annotation(&annotation, "GenePix ArrayList", "GenePix ArrayList V1.0");
        assert_eq!(typed.get("Type").map(String::as_str), Some("GenePix ArrayList V1.0"));
        assert_eq!(typed.get("Scanner").map(String::as_str), Some("GenePix 4000B"));
    }

    #[test]
    fn read_any_atf() {
        let data = "ATF\t1.0\n0\t4\n\"Block\"\t\"Row\"\t\"Column\"\t\"Note\"\n1\t2\t3\t\"spot\"\n";
        let mut reader = BioAssayReader::new(data.as_bytes(), AtfFormat::new());
        let ba = reader.read().unwrap();
        assert_eq!(ba.strings("Note").unwrap(), &["spot".to_string()]);
        let locs = ba.unpack_locations().unwrap();
        assert_eq!((locs.meta_columns[0], locs.rows[0], locs.columns[0]), (1, 2, 3));
    }
}
