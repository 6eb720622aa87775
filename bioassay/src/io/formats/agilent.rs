//! Agilent Feature Extraction output
//!
//! A file is a sequence of blocks, each made of a `TYPE` row declaring the
//! type of every column, a row naming the block and its columns, then `DATA`
//! rows. The `FEPARAMS` and `STATS` blocks hold one row each and end with a
//! `*` line; they are stored as annotations. The `FEATURES` block holds the
//! spots.
use super::*;

pub const FIELD_NAME_ROW: &str = "Row";
pub const FIELD_NAME_COLUMN: &str = "Col";
pub const FIELD_NAME_AGILENT_ID: &str = "ProbeName";
pub const FIELD_NAME_GENE_NAME: &str = "GeneName";

/// Agilent slides have a single grid: only rows and columns are stored
pub const AGILENT_LOCATION: LocationFields =
    LocationFields::new(None, None, Some(FIELD_NAME_ROW), Some(FIELD_NAME_COLUMN));

/// First cell of the row declaring the column types of a block
pub const TYPE_ROW: &str = "TYPE";
const DATA_ROW: &str = "DATA";
const END_ROW: &str = "*";
const FEPARAMS: &str = "FEPARAMS";
const STATS: &str = "STATS";
const FEATURES: &str = "FEATURES";
const EOL: &str = "\n";

const TEXT: &str = "text";
const INTEGER: &str = "integer";
const FLOAT: &str = "float";
const BOOLEAN: &str = "boolean";

const READ_FIELDS: [&str; 20] = [
    "FeatureNum",
    FIELD_NAME_AGILENT_ID,
    "gMedianSignal",
    "rMedianSignal",
    "rBGMedianSignal",
    "gBGMedianSignal",
    "ControlType",
    "IsManualFlag",
    "gIsFeatPopnOL",
    "rIsFeatPopnOL",
    "gIsBGPopnOL",
    "rIsBGPopnOL",
    "gIsFeatNonUnifOL",
    "rIsFeatNonUnifOL",
    "gIsBGNonUnifOL",
    "rIsBGNonUnifOL",
    "gIsFound",
    "rIsFound",
    "gIsPosAndSignif",
    "rIsPosAndSignif",
];

const WRITE_FIELDS: [&str; 4] = ["FeatureNum", FIELD_NAME_ID, "gMedianSignal", "rMedianSignal"];

/// Feature extraction parameters written back, with their declared type
const FEPARAMS_FIELDS: [(&str, &str); 89] = [
    ("FeatureExtractor_UserName", TEXT),
    ("FeatureExtractor_ComputerName", TEXT),
    ("FeatureExtractor_ExtractionTime", TEXT),
    ("SpotFinder", TEXT),
    ("SpotFinder_Version", TEXT),
    ("SpotFinder_NumRows", INTEGER),
    ("SpotFinder_NumCols", INTEGER),
    ("SpotFinder_DevLimit", FLOAT),
    ("SpotFinder_ROIW", FLOAT),
    ("SpotFinder_ROIH", FLOAT),
    ("SpotFinder_NomSpotWidth", FLOAT),
    ("SpotFinder_NomSpotHeight", FLOAT),
    ("CornerMethod", TEXT),
    ("SpotFinder_Baseline", FLOAT),
    ("SpotFinder_AutoFindTh", FLOAT),
    ("CornerUL_x", FLOAT),
    ("CornerUL_y", FLOAT),
    ("CornerUR_x", FLOAT),
    ("CornerUR_y", FLOAT),
    ("CornerLL_x", FLOAT),
    ("CornerLL_y", FLOAT),
    ("CalcSpotStats", TEXT),
    ("CalcSpotStats_Version", TEXT),
    ("CalcSpotStats_SpotStatsMethod", INTEGER),
    ("CalcSpotStats_RejectMethod", INTEGER),
    ("CalcSpotStats_StatBoundFeat", FLOAT),
    ("CalcSpotStats_StatBoundBG", FLOAT),
    ("CalcSpotStats_CalculateSpotSize", INTEGER),
    ("CalcSpotStats_CookieWidth", FLOAT),
    ("CalcSpotStats_CookieHeight", FLOAT),
    ("CalcSpotStats_BGInnerWidth", FLOAT),
    ("CalcSpotStats_BGInnerHeight", FLOAT),
    ("CalcSpotStats_BGOuterWidth", FLOAT),
    ("CalcSpotStats_BGOuterHeight", FLOAT),
    ("OutlierFlagger", TEXT),
    ("OutlierFlagger_Version", TEXT),
    ("OutlierFlagger_NonUnifOLOn", INTEGER),
    ("OutlierFlagger_FeatATerm", FLOAT),
    ("OutlierFlagger_FeatBTerm", FLOAT),
    ("OutlierFlagger_FeatCTerm", FLOAT),
    ("OutlierFlagger_BGATerm", FLOAT),
    ("OutlierFlagger_BGBTerm", FLOAT),
    ("OutlierFlagger_BGCTerm", FLOAT),
    ("OutlierFlagger_ConfIntPValue", FLOAT),
    ("OutlierFlagger_PopnOLOn", INTEGER),
    ("OutlierFlagger_IQRatio", FLOAT),
    ("OutlierFlagger_MinPopulation", INTEGER),
    ("BGSubtractor", TEXT),
    ("BGSubtractor_Version", TEXT),
    ("BGSubtractor_BGSubMethod", INTEGER),
    ("BGSubtractor_MaxPVal", FLOAT),
    ("BGSubtractor_WellAboveMulti", FLOAT),
    ("BGSubtractor_BackgroundCorrectionOn", INTEGER),
    ("BGSubtractor_SpatialDetrendOn", INTEGER),
    ("BGSubtractor_DetrendLowPassFilter", INTEGER),
    ("BGSubtractor_DetrendLowPassPercentage", INTEGER),
    ("BGSubtractor_DetrendLowPassWindow", INTEGER),
    ("BGSubtractor_DetrendLowPassIncrement", INTEGER),
    ("BGSubtractor_DetrendNeighborhoodSize", FLOAT),
    ("DyeNorm", TEXT),
    ("DyeNorm_Version", TEXT),
    ("DyeNorm_SelectMethod", INTEGER),
    ("DyeNorm_IsBGPopnOLOn", INTEGER),
    ("DyeNorm_CorrMethod", INTEGER),
    ("DyeNorm_RankTolerance", FLOAT),
    ("DyeNorm_LOWESSSmoothFactor", FLOAT),
    ("DyeNorm_LOWESSNumSteps", INTEGER),
    ("DyeNorm_LOWESSDelta", FLOAT),
    ("Ratio", TEXT),
    ("Ratio_Version", TEXT),
    ("Ratio_ErrorModel", INTEGER),
    ("Ratio_AddErrorRed", FLOAT),
    ("Ratio_AddErrorGreen", FLOAT),
    ("Ratio_MultErrorRed", FLOAT),
    ("Ratio_MultErrorGreen", FLOAT),
    ("Ratio_UseSurrogates", INTEGER),
    ("Ratio_UsePropErrOnly", INTEGER),
    ("Ratio_AutoEstimateAddErrorRed", INTEGER),
    ("Ratio_AutoEstimateAddErrorGreen", INTEGER),
    ("Ratio_MultNcAutoEstimate", FLOAT),
    ("Ratio_MultRMSAutoEstimate", FLOAT),
    ("FeatureExtractor", TEXT),
    ("FeatureExtractor_Version", TEXT),
    ("FeatureExtractor_ArrayName", TEXT),
    ("FeatureExtractor_ScanFileName", TEXT),
    ("FeatureExtractor_ScanFileGUID", TEXT),
    ("FeatureExtractor_Barcode", TEXT),
    ("FeatureExtractor_DesignFileName", TEXT),
    ("FeatureExtractor_PrintingFileName", TEXT),
];

const STATS_FIELDS: [(&str, &str); 61] = [
    ("gDarkOffsetAverage", FLOAT),
    ("gDarkOffsetMedian", FLOAT),
    ("gDarkOffsetStdDev", FLOAT),
    ("gDarkOffsetNumPts", INTEGER),
    ("rDarkOffsetAverage", FLOAT),
    ("rDarkOffsetMedian", FLOAT),
    ("rDarkOffsetStdDev", FLOAT),
    ("rDarkOffsetNumPts", INTEGER),
    ("gNumSatFeat", INTEGER),
    ("gLocalBGInlierAve", FLOAT),
    ("gLocalBGInlierSDev", FLOAT),
    ("gLocalBGInlierNum", INTEGER),
    ("gGlobalBGInlierAve", FLOAT),
    ("gGlobalBGInlierSDev", FLOAT),
    ("gGlobalBGInlierNum", INTEGER),
    ("rNumSatFeat", INTEGER),
    ("rLocalBGInlierAve", FLOAT),
    ("rLocalBGInlierSDev", FLOAT),
    ("rLocalBGInlierNum", INTEGER),
    ("rGlobalBGInlierAve", FLOAT),
    ("rGlobalBGInlierSDev", FLOAT),
    ("rGlobalBGInlierNum", INTEGER),
    ("gNumFeatureNonUnifOL", INTEGER),
    ("gNumPopnOL", INTEGER),
    ("gNumNonUnifBGOL", INTEGER),
    ("gNumPopnBGOL", INTEGER),
    ("gOffsetUsed", FLOAT),
    ("gGlobalFeatInlierAve", FLOAT),
    ("gGlobalFeatInlierSDev", FLOAT),
    ("gGlobalFeatInlierNum", FLOAT),
    ("rNumFeatureNonUnifOL", INTEGER),
    ("rNumPopnOL", INTEGER),
    ("rNumNonUnifBGOL", INTEGER),
    ("rNumPopnBGOL", INTEGER),
    ("rOffsetUsed", FLOAT),
    ("rGlobalFeatInlierAve", FLOAT),
    ("rGlobalFeatInlierSDev", FLOAT),
    ("rGlobalFeatInlierNum", FLOAT),
    ("AllColorPrcntSat", FLOAT),
    ("AnyColorPrcntSat", FLOAT),
    ("AnyColorPrcntFeatNonUnifOL", FLOAT),
    ("AnyColorPrcntBGNonUnifOL", FLOAT),
    ("AnyColorPrcntFeatPopnOL", FLOAT),
    ("AnyColorPrcntBGPopnOL", FLOAT),
    ("TotalPrcntFeatOL", FLOAT),
    ("gNumNegBGSubFeat", INTEGER),
    ("rNumNegBGSubFeat", INTEGER),
    ("gLinearDyeNormFactor", FLOAT),
    ("rLinearDyeNormFactor", FLOAT),
    ("DyeNormDimensionlessRMS", FLOAT),
    ("DyeNormUnitWeightedRMS", FLOAT),
    ("rSpatialDetrendRMSFit", FLOAT),
    ("rSpatialDetrendRMSFilteredMinusFit", FLOAT),
    ("rSpatialDetrendSurfaceArea", FLOAT),
    ("rSpatialDetrendVolume", FLOAT),
    ("rSpatialDetrendAveFit", FLOAT),
    ("gSpatialDetrendRMSFit", FLOAT),
    ("gSpatialDetrendRMSFilteredMinusFit", FLOAT),
    ("gSpatialDetrendSurfaceArea", FLOAT),
    ("gSpatialDetrendVolume", FLOAT),
    ("gSpatialDetrendAveFit", FLOAT),
];

const FEATURE_FIELDS: [&str; 86] = [
    "FeatureNum",
    FIELD_NAME_ROW,
    FIELD_NAME_COLUMN,
    "ProbeUID",
    "ControlType",
    FIELD_NAME_AGILENT_ID,
    "GeneName",
    "SystematicName",
    "Description",
    "PositionX",
    "PositionY",
    "LogRatio",
    "LogRatioError",
    "PValueLogRatio",
    "gSurrogateUsed",
    "rSurrogateUsed",
    "gIsFound",
    "rIsFound",
    "gProcessedSignal",
    "rProcessedSignal",
    "gProcessedSigError",
    "rProcessedSigError",
    "gNumPixOLHi",
    "rNumPixOLHi",
    "gNumPixOLLo",
    "rNumPixOLLo",
    "gNumPix",
    "rNumPix",
    "gMeanSignal",
    "rMeanSignal",
    "gMedianSignal",
    "rMedianSignal",
    "gPixSDev",
    "rPixSDev",
    "gBGNumPix",
    "rBGNumPix",
    "gBGMeanSignal",
    "rBGMeanSignal",
    "gBGMedianSignal",
    "rBGMedianSignal",
    "gBGPixSDev",
    "rBGPixSDev",
    "gNumSatPix",
    "rNumSatPix",
    "gIsSaturated",
    "rIsSaturated",
    "PixCorrelation",
    "BGPixCorrelation",
    "gIsFeatNonUnifOL",
    "rIsFeatNonUnifOL",
    "gIsBGNonUnifOL",
    "rIsBGNonUnifOL",
    "gIsFeatPopnOL",
    "rIsFeatPopnOL",
    "gIsBGPopnOL",
    "rIsBGPopnOL",
    "IsManualFlag",
    "gBGSubSignal",
    "rBGSubSignal",
    "gBGSubSigError",
    "rBGSubSigError",
    "BGSubSigCorrelation",
    "gIsPosAndSignif",
    "rIsPosAndSignif",
    "gPValFeatEqBG",
    "rPValFeatEqBG",
    "gNumBGUsed",
    "rNumBGUsed",
    "gIsWellAboveBG",
    "rIsWellAboveBG",
    "gBGUsed",
    "rBGUsed",
    "gBGSDUsed",
    "rBGSDUsed",
    "IsNormalization",
    "gDyeNormSignal",
    "rDyeNormSignal",
    "gDyeNormError",
    "rDyeNormError",
    "DyeNormCorrelation",
    "ErrorModel",
    "xDev",
    "gSpatialDetrendIsInFilteredSet",
    "rSpatialDetrendIsInFilteredSet",
    "gSpatialDetrendSurfaceValue",
    "rSpatialDetrendSurfaceValue",
];
/// Storage of a column from its declared type. Booleans are stored as
/// integers.
fn column_type(name: &str) -> Result<FieldType> {
    match name {
        TEXT => Ok(FieldType::Text),
        INTEGER | BOOLEAN => Ok(FieldType::Int),
        FLOAT => Ok(FieldType::Double),
        other => Err(invalid(format!("unknown column type `{}`", other))),
    }
}

fn type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::Int => INTEGER,
        FieldType::Double => FLOAT,
        FieldType::Text => TEXT,
    }
}

fn invalid<S: Into<String>>(msg: S) -> IoError {
    IoError::Header(msg.into())
}

/// `TYPE` row and names row of the next block, as (type, name) pairs. The
/// first pair holds the `TYPE` tag and the block name.
fn block_header<R: BufRead>(input: &mut LineReader<R>) -> Result<Vec<(String, String)>> {
    let types = input.next_line()?.ok_or_else(|| invalid("missing FEATURES block"))?;
    let names = input
        .next_line()?
        .ok_or_else(|| invalid(format!("line {}: block without names", input.line_number())))?;
    if !types.starts_with(TYPE_ROW) {
        return Err(invalid(format!("line {}: expected a TYPE row", input.line_number() - 1)));
    }

    let types = types.split('\t').collect::<Vec<_>>();
    let names = names.split('\t').collect::<Vec<_>>();
    if types.len() != names.len() {
        return Err(invalid(format!(
            "block {}: {} types for {} columns",
            names[0],
            types.len(),
            names.len()
        )));
    }
    for ty in &types[1..] {
        column_type(ty)?;
    }
    Ok(types
        .into_iter()
        .zip(names)
        .map(|(t, n)| (t.to_string(), n.to_string()))
        .collect())
}

/// Store the `DATA` rows of a parameter block as annotations, up to its `*`
/// line
fn read_parameters<R: BufRead>(
    input: &mut LineReader<R>,
    columns: &[(String, String)],
    annotation: &mut Annotation,
) -> Result<()> {
    let block = &columns[0].1;
    while let Some(line) = input.next_line()? {
        if line == END_ROW {
            return Ok(());
        }
        let values = line.split('\t').collect::<Vec<_>>();
        if values[0] != DATA_ROW {
            return Err(invalid(format!("line {}: expected a DATA row", input.line_number())));
        }
        if values.len() > columns.len() {
            return Err(invalid(format!("line {}: too many values for {}", input.line_number(), block)));
        }
        for ((_, name), value) in columns.iter().zip(values).skip(1) {
            annotation.insert(name.clone(), value.to_string());
        }
    }
    Err(invalid(format!("unterminated {} block", block)))
}

/// Parameter block of the annotations named in `fields`. The block is
/// written even when none of them is present.
fn write_parameters(header: &mut String, block: &str, fields: &[(&str, &str)], annotation: &Annotation) {
    let present = fields
        .iter()
        .filter_map(|(name, ty)| annotation.get(*name).map(|value| (*name, *ty, value.as_str())))
        .collect::<Vec<_>>();

    let mut types = String::from(TYPE_ROW);
    let mut names = String::from(block);
    let mut values = String::from(DATA_ROW);
    for (name, ty, value) in present {
        types.push('\t');
        types.push_str(ty);
        names.push('\t');
        names.push_str(name);
        values.push('\t');
        values.push_str(value);
    }
    for row in [types.as_str(), names.as_str(), values.as_str(), END_ROW] {
        header.push_str(row);
        header.push_str(EOL);
    }
}

/// Feature Extraction text export.
///
/// Column types come from the file; the id column is kept as text
/// whatever its declared type.
#[derive(Clone, Debug)]
pub struct AgilentFormat {
    meta: FieldMetadata,
}

impl AgilentFormat {
    pub fn new() -> AgilentFormat {
        AgilentFormat {
            meta: FieldMetadata::tab_delimited()
                .with_order(&FEATURE_FIELDS)
                .with_converter(
                    FieldNameConverter::new()
                        .with(FIELD_NAME_ID, FIELD_NAME_AGILENT_ID)
                        .with(FIELD_NAME_DESCRIPTION, FIELD_NAME_GENE_NAME),
                )
                .with_location(AGILENT_LOCATION)
                .with_line_tag(DATA_ROW)
                .with_end_tag(END_ROW)
                .with_eol(EOL)
                .keep_quotes(),
        }
    }

    /// Declared type of a column about to be written
    fn written_type(&self, assay: &BioAssay, column: &str) -> &'static str {
        if self.meta.location.position(column).is_some() {
            return INTEGER;
        }
        assay
            .field_type(self.meta.converter.to_table(column))
            .map_or(TEXT, type_name)
    }
}

impl Default for AgilentFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for AgilentFormat {
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
        loop {
            let columns = block_header(input)?;
            if columns[0].1 != FEATURES {
                read_parameters(input, &columns, &mut assay.annotation)?;
                continue;
            }

            self.meta.int_fields.clear();
            self.meta.double_fields.clear();
            let mut seen = HashSet::new();
            for (ty, name) in &columns[1..] {
                if !seen.insert(name.as_str()) {
                    return Err(invalid(format!("duplicate column `{}`", name)));
                }
                match column_type(ty)? {
                    FieldType::Int if self.meta.converter.to_table(name) != FIELD_NAME_ID => {
                        self.meta.int_fields.insert(name.clone());
                    }
                    FieldType::Double => {
                        self.meta.double_fields.insert(name.clone());
                    }
                    _ => {}
                }
            }
            return Ok(columns.into_iter().skip(1).map(|(_, name)| name).collect());
        }
    }

    fn write_header<W: Write>(&self, out: &mut W, assay: &BioAssay, columns: &[&str]) -> Result<()> {
        let mut header = String::new();
        write_parameters(&mut header, FEPARAMS, &FEPARAMS_FIELDS, &assay.annotation);
        write_parameters(&mut header, STATS, &STATS_FIELDS, &assay.annotation);

        header.push_str(TYPE_ROW);
        for column in columns {
            header.push('\t');
            header.push_str(self.written_type(assay, column));
        }
        header.push_str(EOL);
        header.push_str(FEATURES);
        for column in columns {
            header.push('\t');
            header.push_str(column);
        }
        header.push_str(EOL);
        out.write_all(header.as_bytes())?;
        Ok(())
    }

    fn format_text(&self, value: &str, line: &mut String) {
        line.push_str(value);
    }
}
