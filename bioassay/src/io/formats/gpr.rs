//! GenePix Results: per-spot measurements of a two-channel scan
use super::atf::{atf_metadata, genepix_annotation, read_atf_header, write_atf_header};
use super::*;

/// Red channel median
pub const FIELD_NAME_F635_MEDIAN: &str = "F635 Median";
/// Green channel median
pub const FIELD_NAME_F532_MEDIAN: &str = "F532 Median";

/// Prefix of the `Type` record of every version of the format
pub const GPR_FAMILY: &str = "GenePix Results";
/// `Type` record written when the bioassay carries none of the family
pub const GPR_TYPE: &str = "GenePix Results 3";

const FIELDS: [&str; 56] = [
    "Block",
    "Column",
    "Row",
    "Name",
    "ID",
    "X",
    "Y",
    "Dia.",
    "F635 Median",
    "F635 Mean",
    "F635 SD",
    "F635 CV",
    "B635",
    "B635 Median",
    "B635 Mean",
    "B635 SD",
    "B635 CV",
    "% > B635+1SD",
    "% > B635+2SD",
    "F635 % Sat.",
    "F532 Median",
    "F532 Mean",
    "F532 SD",
    "F532 CV",
    "B532",
    "B532 Median",
    "B532 Mean",
    "B532 SD",
    "B532 CV",
    "% > B532+1SD",
    "% > B532+2SD",
    "F532 % Sat.",
    "Ratio of Medians (635/532)",
    "Ratio of Means (635/532)",
    "Median of Ratios (635/532)",
    "Mean of Ratios (635/532)",
    "Ratios SD (635/532)",
    "Rgn Ratio (635/532)",
    "Rgn R2 (635/532)",
    "F Pixels",
    "B Pixels",
    "Circularity",
    "Sum of Medians (635/532)",
    "Sum of Means (635/532)",
    "Log Ratio (635/532)",
    "F635 Median - B635",
    "F532 Median - B532",
    "F635 Mean - B635",
    "F532 Mean - B532",
    "F635 Total Intensity",
    "F532 Total Intensity",
    "SNR 635",
    "SNR 532",
    "Flags",
    "Normalize",
    "Autoflag",
];

const INT_FIELDS: [&str; 44] = [
    "Block",
    "Column",
    "Row",
    "X",
    "Y",
    "Dia.",
    "F635 Median",
    "F635 Mean",
    "F635 SD",
    "F635 CV",
    "B635",
    "B635 Median",
    "B635 Mean",
    "B635 SD",
    "B635 CV",
    "% > B635+1SD",
    "% > B635+2SD",
    "F635 % Sat.",
    "F532 Median",
    "F532 Mean",
    "F532 SD",
    "F532 CV",
    "B532",
    "B532 Median",
    "B532 Mean",
    "B532 SD",
    "B532 CV",
    "% > B532+1SD",
    "% > B532+2SD",
    "F532 % Sat.",
    "F Pixels",
    "B Pixels",
    "Circularity",
    "Sum of Medians (635/532)",
    "Sum of Means (635/532)",
    "F635 Median - B635",
    "F532 Median - B532",
    "F635 Mean - B635",
    "F532 Mean - B532",
    "F635 Total Intensity",
    "F532 Total Intensity",
    "Flags",
    "Normalize",
    "Autoflag",
];

const DOUBLE_FIELDS: [&str; 10] = [
    "Ratio of Medians (635/532)",
    "Ratio of Means (635/532)",
    "Median of Ratios (635/532)",
    "Mean of Ratios (635/532)",
    "Ratios SD (635/532)",
    "Rgn Ratio (635/532)",
    "Rgn R2 (635/532)",
    "Log Ratio (635/532)",
    "SNR 635",
    "SNR 532",
];

const READ_FIELDS: [&str; 8] = [
    "Block",
    "Column",
    "Row",
    "Name",
    "ID",
    FIELD_NAME_F635_MEDIAN,
    FIELD_NAME_F532_MEDIAN,
    "Flags",
];

const WRITE_FIELDS: [&str; 5] = [
    FIELD_NAME_DESCRIPTION,
    FIELD_NAME_ID,
    FIELD_NAME_GREEN,
    FIELD_NAME_RED,
    FIELD_NAME_FLAG,
];

#[derive(Clone, Debug)]
pub struct GprFormat {
    meta: FieldMetadata,
}

impl GprFormat {
    pub fn new() -> GprFormat {
        GprFormat {
            meta: atf_metadata()
                .with_order(&FIELDS)
                .with_ints(&INT_FIELDS)
                .with_doubles(&DOUBLE_FIELDS)
                .with_converter(
                    FieldNameConverter::new()
                        .with(FIELD_NAME_ID, "ID")
                        .with(FIELD_NAME_DESCRIPTION, "Name")
                        .with(FIELD_NAME_RED, FIELD_NAME_F635_MEDIAN)
                        .with(FIELD_NAME_GREEN, FIELD_NAME_F532_MEDIAN)
                        .with(FIELD_NAME_FLAG, "Flags"),
                ),
        }
    }
}

impl Default for GprFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for GprFormat {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn default_read_fields(&self) -> &[&'static str] {
        &READ_FIELDS
    }

    fn default_write_fields(&self) -> &[&'static str] {
        &WRITE_FIELDS
    }

    fn read_header<R: BufRead>(&mut self, input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
        read_atf_header(input, assay)
    }

    fn write_header<W: Write>(&self, out: &mut W, assay: &BioAssay, columns: &[&str]) -> Result<()> {
        let annotation = genepix_annotation(&assay.annotation, GPR_FAMILY, GPR_TYPE);
        write_atf_header(out, &annotation, columns)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GPR: &str = "ATF\t1.0\n\
2\t10\n\
\"Type=GenePix Results 3\"\n\
\"Scanner=GenePix 4000B\"\n\
\"Block\"\t\"Column\"\t\"Row\"\t\"Name\"\t\"ID\"\t\"F635 Median\"\t\"F532 Median\"\t\"Log Ratio (635/532)\"\t\"Flags\"\t\"X\"\n\
1\t1\t1\t\"Actin\"\t\"AT001\"\t1200\t600\t1.0\t0\t1530\n\
1\t2\t1\t\"Tubulin\"\t\"AT002\"\t80\t0\tError\t-50\t1720\n";

    #[test]
    fn default_fields() {
        let mut reader = BioAssayReader::new(GPR.as_bytes(), GprFormat::new());
        let ba = reader.read().unwrap();
        assert_eq!(ba.reds(), Some(&[1200, 80][..]));
        assert_eq!(ba.greens(), Some(&[600, 0][..]));
        assert_eq!(ba.flags(), Some(&[0, -50][..]));
        assert_eq!(ba.ids().unwrap(), &["AT001".to_string(), "AT002".to_string()]);
        assert!(!ba.contains("X"));
        assert!(!ba.contains("Log Ratio (635/532)"));
        assert_eq!(ba.annotation.len(), 2);
    }

    #[test]
    fn typed_extra_fields() {
        let mut reader = BioAssayReader::new(GPR.as_bytes(), GprFormat::new());
        reader.add_field_to_read("Log Ratio (635/532)");
        reader.add_field_to_read("X");
        let ba = reader.read().unwrap();
        let ratios = ba.doubles("Log Ratio (635/532)").unwrap();
        assert_eq!(ratios[0], 1.0);
        assert!(ratios[1].is_nan());
        assert_eq!(ba.ints("X"), Some(&[1530, 1720][..]));
    }

    #[test]
    fn write_defaults_in_gpr_order() {
        let mut ba = BioAssay::new();
        ba.set_reds(vec![10]).unwrap();
        ba.set_greens(vec![20]).unwrap();
        ba.set_ids(vec!["g".into()]).unwrap();
        ba.set_locations(&[0], &[2], &[3], &[4]).unwrap();

        let mut out = Vec::new();
        BioAssayWriter::new(&mut out, GprFormat::new()).write(&ba).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.split("\r\n").collect::<Vec<_>>();
        assert_eq!(lines[1], "1\t8");
        assert_eq!(lines[2], "\"Type=GenePix Results 3\"");
        assert_eq!(
            lines[3],
            "\"Block\"\t\"Column\"\t\"Row\"\t\"Name\"\t\"ID\"\t\"F635 Median\"\t\"F532 Median\"\t\"Flags\""
        );
        // description and flags are requested but absent
        assert_eq!(lines[4], "2\t4\t3\t\t\"g\"\t10\t20\t");
    }
}
