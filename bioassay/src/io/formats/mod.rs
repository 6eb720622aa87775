//! Concrete file formats and detection of the format of a file
use super::*;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

pub mod agilent;
pub mod atf;
pub mod gal;
pub mod gpr;
pub mod idma;
pub mod imagene;

pub use agilent::AgilentFormat;
pub use atf::AtfFormat;
pub use gal::GalFormat;
pub use gpr::GprFormat;
pub use idma::IdmaFormat;
pub use imagene::{ImaGeneArrayList, ImaGeneOutput};

/// Bytes looked at when guessing the format of a file from its content
const SNIFF_LEN: u64 = 5000;

const GPR_MARKER: &str = "Type=GenePix Results";
const GAL_MARKER: &str = "Type=GenePix ArrayList";

/// Every format this crate knows, for callers that choose one at runtime
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormatKind {
    Atf,
    Gal,
    Gpr,
    Idma,
    Agilent,
    ImaGeneArrayList,
    ImaGeneOutput,
}

impl FormatKind {
    pub const ALL: [FormatKind; 7] = [
        FormatKind::Atf,
        FormatKind::Gal,
        FormatKind::Gpr,
        FormatKind::Idma,
        FormatKind::Agilent,
        FormatKind::ImaGeneArrayList,
        FormatKind::ImaGeneOutput,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FormatKind::Atf => "ATF",
            FormatKind::Gal => "GAL",
            FormatKind::Gpr => "GPR",
            FormatKind::Idma => "IDMA",
            FormatKind::Agilent => "Agilent",
            FormatKind::ImaGeneArrayList => "ImaGene array list",
            FormatKind::ImaGeneOutput => "ImaGene output",
        }
    }

    /// Lowercase identifier accepted by [`FormatKind::from_str`]
    pub fn short_name(&self) -> &'static str {
        match self {
            FormatKind::Atf => "atf",
            FormatKind::Gal => "gal",
            FormatKind::Gpr => "gpr",
            FormatKind::Idma => "idma",
            FormatKind::Agilent => "agilent",
            FormatKind::ImaGeneArrayList => "imagene-list",
            FormatKind::ImaGeneOutput => "imagene",
        }
    }

    /// Conventional file extension
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Atf => "atf",
            FormatKind::Gal => "gal",
            FormatKind::Gpr => "gpr",
            FormatKind::Idma => "idma",
            FormatKind::Agilent | FormatKind::ImaGeneArrayList | FormatKind::ImaGeneOutput => "txt",
        }
    }

    /// Case-insensitive; `txt` is taken as IDMA. Agilent and ImaGene files
    /// share that extension and are told apart by [`FormatKind::sniff`].
    pub fn from_extension(ext: &str) -> Option<FormatKind> {
        match ext.to_ascii_lowercase().as_str() {
            "atf" => Some(FormatKind::Atf),
            "gal" => Some(FormatKind::Gal),
            "gpr" => Some(FormatKind::Gpr),
            "idma" | "txt" => Some(FormatKind::Idma),
            _ => None,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<FormatKind> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(FormatKind::from_extension)
    }

    /// Guess the format from the first lines of a file
    pub fn sniff(head: &str) -> Option<FormatKind> {
        let first = head.lines().next()?;
        if first.starts_with("Begin Header") {
            return Some(FormatKind::ImaGeneOutput);
        }
        if first.split('\t').next() == Some(agilent::TYPE_ROW) {
            return Some(FormatKind::Agilent);
        }
        if first.replace('"', "").starts_with(idma::IDMA_MAGIC) {
            return Some(FormatKind::Idma);
        }
        if first.starts_with("ATF") {
            for line in head.lines() {
                if line.contains(GPR_MARKER) {
                    return Some(FormatKind::Gpr);
                }
                if line.contains(GAL_MARKER) {
                    return Some(FormatKind::Gal);
                }
            }
            return Some(FormatKind::Atf);
        }
        if is_array_list_row(first) {
            return Some(FormatKind::ImaGeneArrayList);
        }
        None
    }

    /// Format of the file at `path`, from its content first and then from its
    /// extension
    pub fn detect<P: AsRef<Path>>(path: P) -> Result<Option<FormatKind>> {
        let path = path.as_ref();
        let mut head = Vec::new();
        File::open(path)?.take(SNIFF_LEN).read_to_end(&mut head)?;
        let kind = FormatKind::sniff(&String::from_utf8_lossy(&head)).or_else(|| FormatKind::from_path(path));
        debug!("{}: {:?}", path.display(), kind);
        Ok(kind)
    }
}

/// Headerless ImaGene array list row: four integer coordinates and an id
fn is_array_list_row(line: &str) -> bool {
    let cells = line.split('\t').collect::<Vec<_>>();
    cells.len() == 5 && cells[..4].iter().all(|c| c.trim().parse::<i32>().is_ok())
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Parse a short name (`gpr`, `imagene-list`, ...) or a file extension
impl FromStr for FormatKind {
    type Err = IoError;

    fn from_str(s: &str) -> Result<FormatKind> {
        let s = s.to_ascii_lowercase();
        FormatKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.short_name() == s)
            .or_else(|| FormatKind::from_extension(&s))
            .ok_or(IoError::UnknownFormat(s))
    }
}

fn read_file<P: AsRef<Path>, F: Format>(path: P, format: F) -> Result<(BioAssay, ReadStats)> {
    let mut reader = BioAssayReader::from_path(path.as_ref(), format)?;
    reader.add_all_fields_to_read();
    let mut assay = reader.read()?;
    if let Some(stem) = path.as_ref().file_stem() {
        assay.name = stem.to_string_lossy().into_owned();
    }
    Ok((assay, *reader.stats()))
}

fn write_file<P: AsRef<Path>, F: Format>(path: P, format: F, assay: &BioAssay) -> Result<()> {
    let mut writer = BioAssayWriter::from_path(path, format)?;
    writer.add_all_fields_to_write();
    writer.write(assay)
}

/// Read every column of the file at `path`. The bioassay is named after the
/// file stem.
pub fn read_path<P: AsRef<Path>>(path: P, kind: FormatKind) -> Result<(BioAssay, ReadStats)> {
    match kind {
        FormatKind::Atf => read_file(path, AtfFormat::new()),
        FormatKind::Gal => read_file(path, GalFormat::new()),
        FormatKind::Gpr => read_file(path, GprFormat::new()),
        FormatKind::Idma => read_file(path, IdmaFormat::new()),
        FormatKind::Agilent => read_file(path, AgilentFormat::new()),
        FormatKind::ImaGeneArrayList => read_file(path, ImaGeneArrayList::new()),
        FormatKind::ImaGeneOutput => read_file(path, ImaGeneOutput::new()),
    }
}

/// Write every field of `assay` that `kind` can hold to `path`
pub fn write_path<P: AsRef<Path>>(path: P, kind: FormatKind, assay: &BioAssay) -> Result<()> {
    match kind {
        FormatKind::Atf => write_file(path, AtfFormat::new(), assay),
        FormatKind::Gal => write_file(path, GalFormat::new(), assay),
        FormatKind::Gpr => write_file(path, GprFormat::new(), assay),
        FormatKind::Idma => write_file(path, IdmaFormat::new(), assay),
        FormatKind::Agilent => write_file(path, AgilentFormat::new(), assay),
        FormatKind::ImaGeneArrayList => write_file(path, ImaGeneArrayList::new(), assay),
        FormatKind::ImaGeneOutput => write_file(path, ImaGeneOutput::new(), assay),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extensions() {
        assert_eq!(FormatKind::from_extension("GPR"), Some(FormatKind::Gpr));
        assert_eq!(FormatKind::from_path("a/b/slide.gal"), Some(FormatKind::Gal));
        assert_eq!(FormatKind::from_path("export.txt"), Some(FormatKind::Idma));
        assert_eq!(FormatKind::from_path("noext"), None);
        assert_eq!(FormatKind::from_path("image.tiff"), None);
        for kind in &FormatKind::ALL[..4] {
            assert_eq!(FormatKind::from_extension(kind.extension()), Some(*kind));
        }
    }

    #[test]
    fn short_names() {
        for kind in FormatKind::ALL {
            assert_eq!(kind.short_name().parse::<FormatKind>().unwrap(), kind);
        }
        assert_eq!("ImaGene-List".parse::<FormatKind>().unwrap(), FormatKind::ImaGeneArrayList);
        assert_eq!("txt".parse::<FormatKind>().unwrap(), FormatKind::Idma);
        assert!(matches!("tiff".parse::<FormatKind>(), Err(IoError::UnknownFormat(ref s)) if s == "tiff"));
    }

    #[test]
    fn sniffing() {
        assert_eq!(FormatKind::sniff("Begin Header\n\tVersion\t5.6\n"), Some(FormatKind::ImaGeneOutput));
        assert_eq!(
            FormatKind::sniff("\"ID\"\t\"Name\"\t\"R\"\t\"Rb\"\t\"G\"\t\"Gb\"\t\"Mnorm\"\t\"A\"\r\n"),
            Some(FormatKind::Idma)
        );
        assert_eq!(
            FormatKind::sniff("ATF\t1.0\n1\t5\n\"Type=GenePix ArrayList V1.0\"\n"),
            Some(FormatKind::Gal)
        );
        assert_eq!(
            FormatKind::sniff("ATF\t1.0\n1\t5\n\"Type=GenePix Results 3\"\n"),
            Some(FormatKind::Gpr)
        );
        assert_eq!(FormatKind::sniff("ATF\t1.0\n0\t1\n\"X\"\n"), Some(FormatKind::Atf));
        assert_eq!(FormatKind::sniff("TYPE\ttext\tinteger\nFEPARAMS\tA\tB\n"), Some(FormatKind::Agilent));
        assert_eq!(FormatKind::sniff("1\t1\t1\t1\tgene\r\n"), Some(FormatKind::ImaGeneArrayList));
        assert_eq!(FormatKind::sniff("1\t1\tx\t1\tgene\n"), None);
        assert_eq!(FormatKind::sniff("1\t1\t1\t1\n"), None);
        assert_eq!(FormatKind::sniff(""), None);
    }

    #[test]
    fn every_format_is_written_and_detected() {
        let dir = tempfile::tempdir().unwrap();
        let mut ba = BioAssay::new();
        ba.set_ids(vec!["g1".into(), "g2".into()]).unwrap();
        ba.set_locations(&[1, 1], &[2, 2], &[3, 4], &[5, 6]).unwrap();

        for kind in FormatKind::ALL {
            let path = dir.path().join(format!("{}.{}", kind.short_name(), kind.extension()));
            write_path(&path, kind, &ba).unwrap();
            assert_eq!(FormatKind::detect(&path).unwrap(), Some(kind), "{}", kind);

            let (back, stats) = read_path(&path, kind).unwrap();
            assert_eq!(back.ids(), ba.ids(), "{}", kind);
            assert_eq!(stats.skipped_lines, 0, "{}", kind);
        }
    }
}
