//! ID/M/A exports: normalized log-ratios (M) and mean log-intensities (A)
use super::*;
use crate::io::text::{split, unquote};

const FIELDS: [&str; 8] = ["ID", "Name", "R", "Rb", "G", "Gb", "Mnorm", "A"];
const READ_FIELDS: [&str; 6] = ["ID", "Name", "Mnorm", "A", "R", "G"];
const WRITE_FIELDS: [&str; 3] = [FIELD_NAME_ID, FIELD_NAME_A, FIELD_NAME_M];

/// Column line written and recognized at the top of an IDMA file
pub const IDMA_MAGIC: &str = "ID\tName\tR\tRb\tG\tGb\tMnorm\tA";

#[derive(Clone, Debug)]
pub struct IdmaFormat {
    meta: FieldMetadata,
}

impl IdmaFormat {
    pub fn new() -> IdmaFormat {
        IdmaFormat {
            meta: FieldMetadata::tab_delimited()
                .with_order(&FIELDS)
                .with_doubles(&FIELDS[2..])
                .with_converter(
                    FieldNameConverter::new()
                        .with(FIELD_NAME_ID, "ID")
                        .with(FIELD_NAME_DESCRIPTION, "Name")
                        .with(FIELD_NAME_M, "Mnorm")
                        .with(FIELD_NAME_A, "A")
                        .with(FIELD_NAME_RED, "R")
                        .with(FIELD_NAME_GREEN, "G"),
                ),
        }
    }
}

impl Default for IdmaFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for IdmaFormat {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn default_read_fields(&self) -> &[&'static str] {
        &READ_FIELDS
    }

    fn default_write_fields(&self) -> &[&'static str] {
        &WRITE_FIELDS
    }

    fn read_header<R: BufRead>(&mut self, input: &mut LineReader<R>, _assay: &mut BioAssay) -> Result<Vec<String>> {
        let line = input
            .next_line()?
            .ok_or_else(|| IoError::Header("missing column names".into()))?;
        let names = split(b'\t', &line)
            .iter()
            .map(|name| unquote(name.trim()).to_string())
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(IoError::Header(format!("duplicate column `{}`", dup)));
        }
        Ok(names)
    }

    fn write_header<W: Write>(&self, out: &mut W, _assay: &BioAssay, columns: &[&str]) -> Result<()> {
        let names = columns.iter().map(|c| format!("\"{}\"", c)).collect::<Vec<_>>();
        write!(out, "{}{}", names.join("\t"), self.meta.eol)?;
        Ok(())
    }
}
