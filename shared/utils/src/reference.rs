//! Reference data loading: the unit table and the process metadata template.
//!
//! Both are read once per run and handed to the core as immutable inputs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::info;

use lci_models::{ProcessMetadata, UnitReference, UnitTable};

use crate::error::LciError;

/// Reads a unit table from CSV with columns
/// `Unit, Unit UUID, Flow Property, Flow Property UUID`
pub fn read_unit_table<R: Read>(reader: R) -> Result<UnitTable> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut table = UnitTable::new();

    for (idx, row) in csv_reader.deserialize::<UnitReference>().enumerate() {
        let reference = row.with_context(|| format!("Invalid unit table row {}", idx + 2))?;
        table.insert(reference).map_err(LciError::from)?;
    }

    Ok(table)
}

pub fn load_unit_table(path: &Path) -> Result<UnitTable> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open unit table {}", path.display()))?;
    let table = read_unit_table(file)
        .with_context(|| format!("Failed to read unit table {}", path.display()))?;

    info!(path = %path.display(), units = table.len(), "Unit table loaded");
    Ok(table)
}

/// One row of the process metadata template, under its column names. The
/// non-optional columns must be present in the header, though their cells may
/// be empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct MetadataTemplateRow {
    data_collection_period: String,
    data_completeness: String,
    data_selection: String,
    dataset_other_evaluation: String,
    data_treatment: String,
    #[serde(rename = "LCIMethod")]
    lci_method: String,
    modelling_constants: String,
    reviewer: String,
    sampling_procedure: String,
    access_use_restrictions: String,
    data_documentor: String,
    data_generator: String,
    dataset_owner: String,
    intended_application: String,
    project_description: String,
    #[serde(default)]
    time_description: Option<String>,
    #[serde(default)]
    technology_description: Option<String>,
    #[serde(default)]
    geography_description: Option<String>,
    #[serde(default)]
    valid_from: Option<String>,
    #[serde(default)]
    valid_until: Option<String>,
    #[serde(default)]
    publication: Option<String>,
    #[serde(default)]
    copyright: Option<String>,
}

impl From<MetadataTemplateRow> for ProcessMetadata {
    fn from(row: MetadataTemplateRow) -> Self {
        Self {
            time_description: non_empty(row.time_description),
            technology_description: non_empty(row.technology_description),
            geography_description: non_empty(row.geography_description),
            data_collection_description: non_empty(row.data_collection_period),
            completeness_description: non_empty(row.data_completeness),
            data_selection_description: non_empty(row.data_selection),
            review_details: non_empty(row.dataset_other_evaluation),
            data_treatment_description: non_empty(row.data_treatment),
            inventory_method_description: non_empty(row.lci_method),
            modeling_constants_description: non_empty(row.modelling_constants),
            sampling_description: non_empty(row.sampling_procedure),
            restrictions_description: non_empty(row.access_use_restrictions),
            intended_application: non_empty(row.intended_application),
            project_description: non_empty(row.project_description),
            copyright: non_empty(row.copyright).and_then(|c| parse_flag(&c)),
            valid_from: non_empty(row.valid_from),
            valid_until: non_empty(row.valid_until),
            reviewer: non_empty(row.reviewer),
            data_documentor: non_empty(row.data_documentor),
            data_generator: non_empty(row.data_generator),
            data_set_owner: non_empty(row.dataset_owner),
            publication: non_empty(row.publication),
        }
    }
}

/// Reads the first data row of a metadata template
pub fn read_metadata_template<R: Read>(reader: R) -> Result<ProcessMetadata> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let row = csv_reader
        .deserialize::<MetadataTemplateRow>()
        .next()
        .ok_or_else(|| LciError::reference_data("process_metadata", "Template has no data row"))?
        .context("Invalid metadata template row")?;

    Ok(row.into())
}

pub fn load_metadata_template(path: &Path) -> Result<ProcessMetadata> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open metadata template {}", path.display()))?;
    let metadata = read_metadata_template(file)
        .with_context(|| format!("Failed to read metadata template {}", path.display()))?;

    info!(path = %path.display(), actors = metadata.actors().len(), "Process metadata loaded");
    Ok(metadata)
}

fn non_empty(value: impl Into<Option<String>>) -> Option<String> {
    value.into().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNITS: &str = "\
Unit,Unit UUID,Flow Property,Flow Property UUID
Item(s),5beb6eed-33a9-47b8-9ede-1dfe8f679159,Number of items,01846770-4cfe-4a25-8ad9-919d8d378345
kg,20aadc24-a391-41cf-b340-3e4529f44bde,Mass,93a60a56-a3c8-11da-a746-0800200b9a66
";

    const TEMPLATE: &str = "\
DataCollectionPeriod,DataCompleteness,DataSelection,DatasetOtherEvaluation,DataTreatment,LCIMethod,ModellingConstants,Reviewer,SamplingProcedure,AccessUseRestrictions,DataDocumentor,DataGenerator,DatasetOwner,IntendedApplication,ProjectDescription
2019-2020,All parts,Primary BOM,Internal review,None,Attributional,Mass based,Jane Analyst,Full BOM,Public,Sam Writer,Sam Writer,ACME Corp,Screening LCA,Aircraft foreground
";

    #[test]
    fn test_read_unit_table() {
        let table = read_unit_table(UNITS.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let item = table.resolve("Item(s)").unwrap();
        assert_eq!(item.unit_id, "5beb6eed-33a9-47b8-9ede-1dfe8f679159");
        assert_eq!(item.flow_property_name, "Number of items");
        assert!(table.resolve("lbs").is_none());
    }

    #[test]
    fn test_conflicting_unit_rows_are_rejected() {
        let data = format!("{}kg,00000000-0000-0000-0000-000000000000,Mass,x\n", UNITS);
        assert!(read_unit_table(data.as_bytes()).is_err());
    }

    #[test]
    fn test_duplicate_identical_unit_rows_are_accepted() {
        let data = format!("{}kg,20aadc24-a391-41cf-b340-3e4529f44bde,Mass,93a60a56-a3c8-11da-a746-0800200b9a66\n", UNITS);
        assert_eq!(read_unit_table(data.as_bytes()).unwrap().len(), 2);
    }

    #[test]
    fn test_read_metadata_template() {
        let metadata = read_metadata_template(TEMPLATE.as_bytes()).unwrap();
        assert_eq!(metadata.data_collection_description.as_deref(), Some("2019-2020"));
        assert_eq!(metadata.review_details.as_deref(), Some("Internal review"));
        assert_eq!(metadata.inventory_method_description.as_deref(), Some("Attributional"));
        assert_eq!(metadata.data_set_owner.as_deref(), Some("ACME Corp"));
        assert_eq!(metadata.valid_from, None);
        assert_eq!(metadata.copyright, None);
        assert_eq!(
            metadata.actors(),
            vec![
                ("reviewer", "Jane Analyst"),
                ("dataDocumentor", "Sam Writer"),
                ("dataGenerator", "Sam Writer"),
                ("dataSetOwner", "ACME Corp"),
            ]
        );
    }

    #[test]
    fn test_optional_template_columns() {
        let data = "\
DataCollectionPeriod,DataCompleteness,DataSelection,DatasetOtherEvaluation,DataTreatment,LCIMethod,ModellingConstants,Reviewer,SamplingProcedure,AccessUseRestrictions,DataDocumentor,DataGenerator,DatasetOwner,IntendedApplication,ProjectDescription,ValidFrom,ValidUntil,Copyright,Publication
,,,,,,,,,,,,,,,1/1/2020,12/31/2024,yes,EPA report
";
        let metadata = read_metadata_template(data.as_bytes()).unwrap();
        assert_eq!(metadata.valid_from.as_deref(), Some("1/1/2020"));
        assert_eq!(metadata.valid_until.as_deref(), Some("12/31/2024"));
        assert_eq!(metadata.copyright, Some(true));
        assert_eq!(metadata.publication.as_deref(), Some("EPA report"));
        assert_eq!(metadata.reviewer, None);
        assert!(metadata.actors().is_empty());
    }

    #[test]
    fn test_misspelled_template_column_is_an_error() {
        let data = TEMPLATE.replacen("DataCompleteness", "DataCompletness", 1);
        let error = read_metadata_template(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", error).contains("DataCompleteness"));
    }

    #[test]
    fn test_empty_template_is_an_error() {
        let header = TEMPLATE.lines().next().unwrap();
        assert!(read_metadata_template(header.as_bytes()).is_err());
    }
}
