//! Foreground Builder Service
//!
//! Runs the batch pipeline: ingest BOM sources, check their hierarchy, build
//! the process graph, then write the process summary and the archive.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

use lci_archive::{write_archive, ArchiveReport};
use lci_models::{BomTable, ProcessSummary, SummaryTotals};
use lci_utils::{
    load_metadata_template, load_unit_table, AppConfig, BomParser, BomValidator, GraphBuilder,
    LciError, ParsedBom, ProcessDefaults, ProcessGraph, ProcessSummarizer,
};

/// What one run read and wrote
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sources: usize,
    pub sheets: usize,
    pub records: usize,
    pub hierarchy_issues: usize,
    pub collisions: usize,
    pub totals: SummaryTotals,
    pub archive: ArchiveReport,
    pub archive_path: PathBuf,
    pub summary_path: PathBuf,
}

pub struct ForegroundService {
    config: AppConfig,
}

impl ForegroundService {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<RunReport> {
        let _span = info_span!("foreground_build").entered();

        let (parsed, table) = self.ingest()?;
        let hierarchy_issues = self.check_hierarchy(&parsed);

        let graph = self.build_graph(&table)?;
        if graph.is_empty() {
            warn!(records = table.len(), "No part has children; the archive holds no processes");
        }

        let summaries = ProcessSummarizer::summarize(&graph);
        let totals = ProcessSummarizer::totals(&graph);
        let summary_path = PathBuf::from(&self.config.output.summary_path);
        self.write_summary(&summary_path, &summaries)?;
        info!(
            processes = totals.processes,
            exchanges = totals.exchanges,
            cutoffs = totals.cutoffs,
            "Process summary written"
        );

        let archive_path = PathBuf::from(&self.config.output.archive_path);
        let archive = self.write_archive(&archive_path, &graph)?;

        Ok(RunReport {
            sources: parsed.len(),
            sheets: parsed.iter().map(|p| p.sheets.len()).sum(),
            records: table.len(),
            hierarchy_issues,
            collisions: graph.collisions().len(),
            totals,
            archive,
            archive_path,
            summary_path,
        })
    }

    /// Reads every configured source into one ordered table
    fn ingest(&self) -> Result<(Vec<ParsedBom>, BomTable)> {
        let input = &self.config.input;
        let mut parsed = Vec::with_capacity(input.sources.len());
        let mut table = BomTable::new();

        for source in &input.sources {
            let path = input.resolve(source);
            let source_id = source.source_id();
            let bom = BomParser::new()
                .with_max_sheets(source.max_sheets)
                .parse_file(&path, &source_id)
                .map_err(|e| LciError::ingestion(&source_id, format!("{:#}", e)))?;

            for warning in &bom.parse_warnings {
                warn!(source_id = %source_id, "{}", warning);
            }
            for sheet in &bom.sheets {
                info!(source_id = %source_id, sheet = %sheet.name, rows = sheet.len(), "Read BOM sheet");
            }

            bom.append_to(&mut table);
            parsed.push(bom);
        }

        if table.is_empty() {
            return Err(LciError::empty_input("No BOM records were read from the configured sources").into());
        }

        info!(sources = parsed.len(), records = table.len(), "BOM ingestion complete");
        Ok((parsed, table))
    }

    /// Logs hierarchy diagnostics; they never stop the run
    fn check_hierarchy(&self, parsed: &[ParsedBom]) -> usize {
        let validator = BomValidator::new();
        let mut issues = 0;

        for bom in parsed {
            for result in validator.validate(bom) {
                for issue in &result.issues {
                    warn!(
                        source_id = %issue.source_id,
                        sheet = %issue.sheet,
                        row = issue.row,
                        declared_parent = %issue.declared_parent,
                        expected_parent = issue.expected_parent.as_deref().unwrap_or(""),
                        "{}",
                        issue.message()
                    );
                }
                issues += result.issues.len();
            }
        }

        info!(issues, "Hierarchy check complete");
        issues
    }

    fn build_graph(&self, table: &BomTable) -> Result<ProcessGraph> {
        let reference = &self.config.reference;
        let mut defaults = ProcessDefaults::from(&self.config.process);
        if let Some(path) = &reference.metadata_template_path {
            defaults = defaults.with_metadata(load_metadata_template(Path::new(path))?);
        }

        Ok(GraphBuilder::new(defaults, self.config.process.key_scope).build(table.records()))
    }

    fn write_summary(&self, path: &Path, summaries: &[ProcessSummary]) -> Result<()> {
        ensure_parent_dir(path)?;
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary {}", path.display()))?;
        ProcessSummarizer::write_csv(summaries, file)
    }

    fn write_archive(&self, path: &Path, graph: &ProcessGraph) -> Result<ArchiveReport> {
        let units = load_unit_table(Path::new(&self.config.reference.unit_table_path))?;
        let created_at = self.config.process.creation_date.unwrap_or_else(Utc::now);

        ensure_parent_dir(path)?;
        let report = write_archive(path, graph.processes(), &units, created_at)?;
        if !report.unresolved_units.is_empty() {
            warn!(units = ?report.unresolved_units, "Archive written with unresolved units");
        }
        Ok(report)
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output folder {}", dir.display())),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use lci_archive::ModelType;
    use lci_utils::{BomSourceConfig, KeyScope};
    use std::io::Read;
    use tempfile::TempDir;

    const UNITS: &str = "\
Unit,Unit UUID,Flow Property,Flow Property UUID
Item(s),5beb6eed-33a9-47b8-9ede-1dfe8f679159,Number of items,01846770-4cfe-4a25-8ad9-919d8d378345
";

    const BOM_1: &str = "\
Level,Part Number,PT,QNA,Part Name,Next Assembly
0,P1,A,1,Wing,
1,P2,A,2,Spar,P1
2,P4,P,4,Cap,P2
1,P3,P,12,Rib,P1
";

    const TEMPLATE: &str = "\
DataCollectionPeriod,DataCompleteness,DataSelection,DatasetOtherEvaluation,DataTreatment,LCIMethod,ModellingConstants,Reviewer,SamplingProcedure,AccessUseRestrictions,DataDocumentor,DataGenerator,DatasetOwner,IntendedApplication,ProjectDescription
2019,All parts,BOM,None,None,Attributional,None,Jane Analyst,Full,Public,Sam Writer,Sam Writer,ACME Corp,Screening,Aircraft
";

    fn workspace(boms: &[(&str, &str)]) -> (TempDir, AppConfig) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("units.csv"), UNITS).unwrap();
        fs::write(root.join("template.csv"), TEMPLATE).unwrap();
        for (name, content) in boms {
            fs::write(root.join(name), content).unwrap();
        }

        let mut config = AppConfig::default();
        config.input.data_folder = root.display().to_string();
        config.input.sources = boms.iter().map(|(name, _)| BomSourceConfig::new(*name)).collect();
        config.reference.unit_table_path = root.join("units.csv").display().to_string();
        config.reference.metadata_template_path = Some(root.join("template.csv").display().to_string());
        config.output.archive_path = root.join("output/assemblyPSM.zip").display().to_string();
        config.output.summary_path = root.join("output/assembly_process_summary.csv").display().to_string();
        config.process.creation_date = Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());

        (dir, config)
    }

    #[test]
    fn test_full_run() {
        let (_dir, config) = workspace(&[("BOM_1.csv", BOM_1)]);
        let report = ForegroundService::new(config).run().unwrap();

        assert_eq!(report.sources, 1);
        assert_eq!(report.sheets, 1);
        assert_eq!(report.records, 4);
        assert_eq!(report.hierarchy_issues, 0);
        assert_eq!(report.collisions, 0);
        assert_eq!(report.totals.processes, 2);
        assert_eq!(report.totals.inputs, 3);
        assert_eq!(report.totals.cutoffs, 2);
        assert_eq!(report.archive.count(ModelType::Process), 2);
        assert_eq!(report.archive.count(ModelType::Actor), 3);
        assert!(report.archive.unresolved_units.is_empty());

        let summary = fs::read_to_string(&report.summary_path).unwrap();
        assert_eq!(
            summary,
            "ProcessName,NumExchanges,Cutoffs\nSpar-P2,2,1\nWing-P1,3,1\n"
        );

        let file = File::open(&report.archive_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.len(), report.archive.entries);

        let actor_entry = ModelType::Actor.entry_name(&lci_archive::identity::actor_id("ACME Corp").to_string());
        let mut text = String::new();
        archive.by_name(&actor_entry).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.contains("ACME Corp"));
    }

    #[test]
    fn test_reruns_produce_identical_archives() {
        let (_dir, config) = workspace(&[("BOM_1.csv", BOM_1)]);
        let service = ForegroundService::new(config);

        let first = service.run().unwrap();
        let first_bytes = fs::read(&first.archive_path).unwrap();
        let second = service.run().unwrap();
        let second_bytes = fs::read(&second.archive_path).unwrap();

        assert_eq!(first.archive.digest, second.archive.digest);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn test_hierarchy_issues_do_not_stop_the_run() {
        let bom = "\
Level,Part Number,QNA,Part Name,Next Assembly
0,P1,1,Wing,
1,P2,2,Spar,P9
2,P4,4,Cap,P2
";
        let (_dir, config) = workspace(&[("BOM_1.csv", bom)]);
        let report = ForegroundService::new(config).run().unwrap();

        assert_eq!(report.hierarchy_issues, 1);
        assert_eq!(report.totals.processes, 1);
    }

    #[test]
    fn test_sources_are_scoped_by_default() {
        let bom_2 = "\
Level,Part Number,QNA,Part Name,Next Assembly
0,D1,1,Door,
1,P2,3,Hinge,D1
2,H7,2,Pin,P2
";
        let (_dir, mut config) = workspace(&[("BOM_1.csv", BOM_1), ("BOM_2.csv", bom_2)]);
        let report = ForegroundService::new(config.clone()).run().unwrap();
        assert_eq!(report.sources, 2);
        assert_eq!(report.totals.processes, 4);
        assert_eq!(report.totals.inputs, 5);

        config.process.key_scope = KeyScope::Global;
        let report = ForegroundService::new(config).run().unwrap();
        assert_eq!(report.totals.processes, 4);
        assert_eq!(report.totals.inputs, 7);
    }

    #[test]
    fn test_unknown_unit_is_not_fatal() {
        let (_dir, mut config) = workspace(&[("BOM_1.csv", BOM_1)]);
        config.process.default_unit = "Unit(s)".to_string();
        let report = ForegroundService::new(config).run().unwrap();

        assert_eq!(report.archive.unresolved_units, vec!["Unit(s)".to_string()]);
        assert_eq!(report.archive.count(ModelType::Process), 2);
        assert_eq!(report.archive.count(ModelType::FlowProperty), 0);
    }

    #[test]
    fn test_empty_input_is_fatal() {
        let (_dir, config) = workspace(&[("BOM_1.csv", "Level,Part Number,QNA,Part Name,Next Assembly\n")]);
        let error = ForegroundService::new(config).run().unwrap_err();

        let lci_error = error.downcast_ref::<LciError>().unwrap();
        assert_eq!(lci_error.error_code(), "EMPTY_INPUT");
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let (_dir, mut config) = workspace(&[("BOM_1.csv", BOM_1)]);
        config.input.sources.push(BomSourceConfig::new("BOM_9.csv"));
        let error = ForegroundService::new(config).run().unwrap_err();

        let lci_error = error.downcast_ref::<LciError>().unwrap();
        assert_eq!(lci_error.error_code(), "INGESTION_ERROR");
        assert!(error.to_string().contains("BOM_9"));
    }
}
