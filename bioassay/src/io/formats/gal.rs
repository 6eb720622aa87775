//! GenePix Array List: the spot layout of a slide
use super::atf::{atf_metadata, genepix_annotation, read_atf_header, write_atf_header};
use super::*;

const FIELDS: [&str; 5] = ["Block", "Column", "Row", "Name", "ID"];
const WRITE_FIELDS: [&str; 2] = [FIELD_NAME_ID, FIELD_NAME_DESCRIPTION];

/// Prefix of the `Type` record of every version of the format
pub const GAL_FAMILY: &str = "GenePix ArrayList";
/// `Type` record written when the bioassay carries none of the family
pub const GAL_TYPE: &str = "GenePix ArrayList V1.0";

#[derive(Clone, Debug)]
pub struct GalFormat {
    meta: FieldMetadata,
}

impl GalFormat {
    pub fn new() -> GalFormat {
        GalFormat {
            meta: atf_metadata()
                .with_order(&FIELDS)
                .with_ints(&FIELDS[..3])
                .with_converter(
                    FieldNameConverter::new()
                        .with(FIELD_NAME_ID, "ID")
                        .with(FIELD_NAME_DESCRIPTION, "Name"),
                ),
        }
    }
}

impl Default for GalFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for GalFormat {
    fn metadata(&self) -> &FieldMetadata {
        &self.meta
    }

    fn default_read_fields(&self) -> &[&'static str] {
        &FIELDS
    }

    fn default_write_fields(&self) -> &[&'static str] {
        &WRITE_FIELDS
    }

    fn read_header<R: BufRead>(&mut self, input: &mut LineReader<R>, assay: &mut BioAssay) -> Result<Vec<String>> {
        read_atf_header(input, assay)
    }

    fn write_header<W: Write>(&self, out: &mut W, assay: &BioAssay, columns: &[&str]) -> Result<()> {
        let annotation = genepix_annotation(&assay.annotation, GAL_FAMILY, GAL_TYPE);
        write_atf_header(out, &annotation, columns)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GAL: &str = "ATF\t1.0\r\n\
1\t5\r\n\
\"Type=GenePix ArrayList V1.0\"\r\n\
\"Block\"\t\"Column\"\t\"Row\"\t\"Name\"\t\"ID\"\r\n\
1\t1\t1\t\"Actin\"\t\"AT001\"\r\n\
1\t2\t1\t\"Tubulin\"\t\"AT002\"\r\n\
2\t1\t3\t\"empty\"\t\"\"\r\n";

    #[test]
    fn read_gal() {
        let mut reader = BioAssayReader::new(GAL.as_bytes(), GalFormat::new());
        let ba = reader.read().unwrap();
        assert_eq!(ba.len(), 3);
        assert_eq!(ba.ids().unwrap()[1], "AT002");
        assert_eq!(ba.ids().unwrap()[2], "");
        assert_eq!(ba.descriptions().unwrap()[0], "Actin");
        assert_eq!(ba.annotation.get("Type").map(String::as_str), Some(GAL_TYPE));

        let locs = ba.unpack_locations().unwrap();
        assert_eq!(locs.meta_columns, vec![1, 1, 2]);
        assert_eq!(locs.columns, vec![1, 2, 1]);
        assert_eq!(locs.rows, vec![1, 1, 3]);
    }

    #[test]
    fn write_gal() {
        let mut ba = BioAssay::new();
        ba.set_ids(vec!["AT001".into()]).unwrap();
        ba.set_descriptions(vec!["Actin".into()]).unwrap();
        ba.set_locations(&[0], &[1], &[4], &[2]).unwrap();

        let mut out = Vec::new();
        BioAssayWriter::new(&mut out, GalFormat::new()).write(&ba).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "ATF\t1.0\r\n1\t5\r\n\"Type=GenePix ArrayList V1.0\"\r\n\
\"Block\"\t\"Column\"\t\"Row\"\t\"Name\"\t\"ID\"\r\n\
1\t2\t4\t\"Actin\"\t\"AT001\"\r\n"
        );
    }
}
