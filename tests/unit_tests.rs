//! Unit tests for read assignment, pair tagging, frequency tables and the
//! run watcher.
//!
//! Reads are described through the `AlignedRead` trait so the matching rules
//! can be checked without alignment files.

use std::fs;
use std::path::Path;

use amplikit::autorun::{CommandRunner, RunWatcher, WatchFolders};
use amplikit::config::AutorunConfig;
use amplikit::frequency::{SampleValues, VariantCall, VariantTable};
use amplikit::matcher::{classify_read, find_source_region, has_valid_strand};
use amplikit::output::{write_coverage_table, write_frequency_table, write_tag_summary};
use amplikit::parser::panel::parse_panel_reader;
use amplikit::parser::RegionIndex;
use amplikit::tagging::{PairBuffer, PairEmit, ReadGroups, TagCounts};
use amplikit::types::{AlignedRead, Interval, ReadClass, Strand};

// -------------------------------------------------------------------------
// Helper functions
// -------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TestRead {
    start: i64,
    end: i64,
    reverse: bool,
    first: bool,
    paired: bool,
    unmapped: bool,
    mate_unmapped: bool,
}

impl TestRead {
    /// Paired, mapped R1 covering `[start, end)` (0-based, half-open).
    fn new(start: i64, end: i64, reverse: bool) -> Self {
        TestRead {
            start,
            end,
            reverse,
            first: true,
            paired: true,
            unmapped: false,
            mate_unmapped: false,
        }
    }

    fn second(mut self) -> Self {
        self.first = false;
        self
    }
}

impl AlignedRead for TestRead {
    fn reference_start(&self) -> i64 {
        self.start
    }
    fn reference_end(&self) -> i64 {
        self.end
    }
    fn is_reverse(&self) -> bool {
        self.reverse
    }
    fn is_first_in_pair(&self) -> bool {
        self.first
    }
    fn is_paired(&self) -> bool {
        self.paired
    }
    fn is_unmapped(&self) -> bool {
        self.unmapped
    }
    fn is_mate_unmapped(&self) -> bool {
        self.mate_unmapped
    }
    fn is_secondary(&self) -> bool {
        false
    }
    fn query_name(&self) -> &[u8] {
        b"read"
    }
}

fn interval(chrom: &str, start: i64, end: i64, id: &str, strand: Strand) -> Interval {
    Interval::new(chrom.to_string(), start, end, id.to_string(), strand)
}

/// chr1: A [101-150] +, B [201-250] -
fn two_amplicon_index() -> RegionIndex {
    RegionIndex::from_intervals(vec![
        interval("chr1", 101, 150, "A", Strand::Positive),
        interval("chr1", 201, 250, "B", Strand::Negative),
    ])
}

fn region_id<'a>(read: &TestRead, index: &'a RegionIndex, offset: i64) -> Option<&'a str> {
    let regions = index.get("chr1")?;
    find_source_region(read, regions, offset).map(|region| region.id.as_str())
}

// -------------------------------------------------------------------------
// Source region lookup
// -------------------------------------------------------------------------

mod test_find_source_region {
    use super::*;

    #[test]
    fn test_forward_read_matches_first_amplicon() {
        let index = two_amplicon_index();
        // 0-based 101 is 1-based 102: 101 <= 102 <= 105
        let read = TestRead::new(101, 180, false);
        assert_eq!(region_id(&read, &index, 4), Some("A"));
    }

    #[test]
    fn test_reverse_read_matches_second_amplicon() {
        let index = two_amplicon_index();
        // 246 <= 248 <= 250
        let read = TestRead::new(170, 248, true);
        assert_eq!(region_id(&read, &index, 4), Some("B"));
    }

    #[test]
    fn test_forward_boundaries() {
        let index = two_amplicon_index();
        assert_eq!(region_id(&TestRead::new(100, 160, false), &index, 4), Some("A"));
        assert_eq!(region_id(&TestRead::new(104, 160, false), &index, 4), Some("A"));
        assert_eq!(region_id(&TestRead::new(105, 160, false), &index, 4), None);
        assert_eq!(region_id(&TestRead::new(99, 160, false), &index, 4), None);
    }

    #[test]
    fn test_reverse_boundaries() {
        let index = two_amplicon_index();
        assert_eq!(region_id(&TestRead::new(180, 250, true), &index, 4), Some("B"));
        assert_eq!(region_id(&TestRead::new(180, 246, true), &index, 4), Some("B"));
        assert_eq!(region_id(&TestRead::new(180, 245, true), &index, 4), None);
        assert_eq!(region_id(&TestRead::new(180, 251, true), &index, 4), None);
    }

    #[test]
    fn test_zero_offset_requires_exact_anchor() {
        let index = two_amplicon_index();
        assert_eq!(region_id(&TestRead::new(100, 160, false), &index, 0), Some("A"));
        assert_eq!(region_id(&TestRead::new(101, 160, false), &index, 0), None);
        assert_eq!(region_id(&TestRead::new(180, 250, true), &index, 0), Some("B"));
        assert_eq!(region_id(&TestRead::new(180, 249, true), &index, 0), None);
    }

    #[test]
    fn test_reverse_read_ending_in_earlier_amplicon() {
        let index = two_amplicon_index();
        let read = TestRead::new(60, 148, true);
        assert_eq!(region_id(&read, &index, 4), Some("A"));
    }

    #[test]
    fn test_read_between_amplicons() {
        let index = two_amplicon_index();
        assert_eq!(region_id(&TestRead::new(170, 230, false), &index, 4), None);
        assert_eq!(region_id(&TestRead::new(120, 180, true), &index, 4), None);
    }

    #[test]
    fn test_overlapping_amplicons_first_wins() {
        let index = RegionIndex::from_intervals(vec![
            interval("chr1", 103, 190, "late", Strand::Positive),
            interval("chr1", 101, 150, "early", Strand::Positive),
        ]);
        let read = TestRead::new(102, 180, false);
        assert_eq!(region_id(&read, &index, 4), Some("early"));
    }

    #[test]
    fn test_lookup_is_idempotent() {
        let index = two_amplicon_index();
        let read = TestRead::new(101, 180, false);
        let first = region_id(&read, &index, 4);
        let second = region_id(&read, &index, 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_chromosome_without_amplicons() {
        let index = two_amplicon_index();
        assert!(index.get("chr2").is_none());
        let read = TestRead::new(101, 180, false);
        assert_eq!(
            classify_read(&read, "chr2", &index, 4),
            ReadClass::OutTarget
        );
    }
}

// -------------------------------------------------------------------------
// Strand validation
// -------------------------------------------------------------------------

mod test_has_valid_strand {
    use super::*;

    #[test]
    fn test_read_orientation_table() {
        let plus = interval("chr1", 101, 150, "A", Strand::Positive);
        let minus = interval("chr1", 201, 250, "B", Strand::Negative);

        let r1_forward = TestRead::new(0, 10, false);
        let r1_reverse = TestRead::new(0, 10, true);
        let r2_forward = TestRead::new(0, 10, false).second();
        let r2_reverse = TestRead::new(0, 10, true).second();

        assert!(has_valid_strand(&r1_forward, &plus));
        assert!(!has_valid_strand(&r1_forward, &minus));
        assert!(has_valid_strand(&r1_reverse, &minus));
        assert!(!has_valid_strand(&r1_reverse, &plus));
        assert!(has_valid_strand(&r2_forward, &minus));
        assert!(!has_valid_strand(&r2_forward, &plus));
        assert!(has_valid_strand(&r2_reverse, &plus));
        assert!(!has_valid_strand(&r2_reverse, &minus));
    }
}

// -------------------------------------------------------------------------
// Read classification
// -------------------------------------------------------------------------

mod test_classify_read {
    use super::*;

    #[test]
    fn test_unpaired() {
        let index = two_amplicon_index();
        let mut read = TestRead::new(101, 180, false);
        read.paired = false;
        assert_eq!(classify_read(&read, "chr1", &index, 4), ReadClass::Unpaired);
    }

    #[test]
    fn test_unmapped_read_or_mate() {
        let index = two_amplicon_index();
        let mut read = TestRead::new(101, 180, false);
        read.unmapped = true;
        assert_eq!(classify_read(&read, "chr1", &index, 4), ReadClass::Unmapped);

        let mut read = TestRead::new(101, 180, false);
        read.mate_unmapped = true;
        assert_eq!(classify_read(&read, "chr1", &index, 4), ReadClass::Unmapped);
    }

    #[test]
    fn test_out_target() {
        let index = two_amplicon_index();
        let read = TestRead::new(400, 480, false);
        assert_eq!(classify_read(&read, "chr1", &index, 4), ReadClass::OutTarget);
    }

    #[test]
    fn test_strand_mismatch_is_cross_panel() {
        let index = two_amplicon_index();
        // forward R2 lines up with A but belongs to a minus-strand amplicon
        let read = TestRead::new(101, 180, false).second();
        match classify_read(&read, "chr1", &index, 4) {
            ReadClass::CrossPanel(region) => assert_eq!(region.id, "A"),
            other => panic!("expected CrossPanel, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_pair_mates() {
        let index = two_amplicon_index();
        let r1 = TestRead::new(101, 180, false);
        let r2 = TestRead::new(70, 148, true).second();
        match (
            classify_read(&r1, "chr1", &index, 4),
            classify_read(&r2, "chr1", &index, 4),
        ) {
            (ReadClass::Valid(a), ReadClass::Valid(b)) => {
                assert_eq!(a.id, "A");
                assert_eq!(b.id, "A");
            }
            other => panic!("expected two valid reads, got {:?}", other),
        }
    }
}

// -------------------------------------------------------------------------
// Panel parsing
// -------------------------------------------------------------------------

mod test_panel {
    use super::*;

    #[test]
    fn test_panel_sorted_per_chromosome() {
        let bed = "track name=panel\n\
chr2\t500\t600\tC\t0\t+\n\
chr1\t200\t250\tB\t0\t-\n\
chr1\t100\t150\tA\t0\t+\n";
        let index = parse_panel_reader(bed.as_bytes()).unwrap();
        assert_eq!(index.len(), 3);
        let chr1: Vec<&str> = index.get("chr1").unwrap().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(chr1, vec!["A", "B"]);
        // 0-based BED start becomes 1-based
        assert_eq!(index.get("chr1").unwrap()[0].start, 101);
        assert_eq!(index.get("chr1").unwrap()[0].end, 150);
    }

    #[test]
    fn test_panel_duplicate_id() {
        let bed = "chr1\t100\t150\tA\t0\t+\nchr1\t200\t250\tA\t0\t-\n";
        let err = parse_panel_reader(bed.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("A"));
    }
}

// -------------------------------------------------------------------------
// Pair tagging
// -------------------------------------------------------------------------

mod test_tagging {
    use super::*;

    #[test]
    fn test_pair_buffer_emits_when_mate_arrives() {
        let mut buffer: PairBuffer<u32> = PairBuffer::new();
        assert!(matches!(buffer.push(b"q1", 1), PairEmit::Buffered));
        assert!(matches!(buffer.push(b"q2", 2), PairEmit::Buffered));
        assert!(matches!(buffer.push(b"q1", 3), PairEmit::Pair(1, 3)));
        assert_eq!(buffer.orphans(), 1);
    }

    #[test]
    fn test_read_group_ids_follow_panel_order() {
        let index = two_amplicon_index();
        let groups = ReadGroups::new(&index, "LB");
        assert_eq!(groups.id_of("A"), Some("1"));
        assert_eq!(groups.id_of("B"), Some("2"));
        assert_eq!(groups.id_of("C"), None);
    }

    #[test]
    fn test_header_rewrite_replaces_read_groups() {
        let index = two_amplicon_index();
        let groups = ReadGroups::new(&index, "LB");
        let header = "@HD\tVN:1.6\tSO:coordinate\n\
@SQ\tSN:chr1\tLN:1000\n\
@RG\tID:old\tSM:s1\n\
@PG\tID:bwa\tPN:bwa\n";
        let rewritten = groups.rewrite_header(header);
        assert!(!rewritten.contains("ID:old"));
        let rg_pos = rewritten.find("@RG\tID:1\tLB:A").unwrap();
        let pg_pos = rewritten.find("@PG").unwrap();
        assert!(rg_pos < pg_pos);
        assert!(rewritten.contains("@RG\tID:2\tLB:B"));
    }

    #[test]
    fn test_summary_counts_and_ratios() {
        let index = two_amplicon_index();
        let a = &index.get("chr1").unwrap()[0];
        let mut counts = TagCounts::default();
        counts.record(&ReadClass::Unpaired);
        counts.record(&ReadClass::OutTarget);
        counts.record(&ReadClass::CrossPanel(a));
        counts.record(&ReadClass::Valid(a));
        counts.valid_in_pair = 1;

        let mut out = Vec::new();
        write_tag_summary(&mut out, &counts).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Category\tCount\tRatio");
        assert_eq!(lines[1], "Unpaired\t1\t0.250000");
        assert_eq!(lines[2], "Unmapped\t0\t0.000000");
        assert_eq!(lines[4], "Cross_panel\t1\t0.250000");
        assert_eq!(lines[5], "Valid\t1\t0.250000");
    }

    #[test]
    fn test_summary_of_empty_input() {
        let mut out = Vec::new();
        write_tag_summary(&mut out, &TagCounts::default()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.lines().skip(1).all(|line| line.ends_with("\t0\t0.000000")));
    }
}

// -------------------------------------------------------------------------
// Frequency tables
// -------------------------------------------------------------------------

mod test_frequency_tables {
    use super::*;

    fn call(pos: i64, alts: &[&str], samples: Vec<SampleValues>) -> VariantCall {
        VariantCall {
            chrom: "chr7".to_string(),
            pos,
            alts: alts.iter().map(|alt| alt.to_string()).collect(),
            info_dp: Some(200),
            info_af: None,
            samples,
        }
    }

    fn sample(name: &str, af: &[f64]) -> SampleValues {
        SampleValues {
            name: name.to_string(),
            af: Some(af.iter().copied().map(Some).collect()),
            ad: None,
        }
    }

    #[test]
    fn test_tables_from_two_samples() {
        let mut table = VariantTable::new();
        table
            .add_call(&call(140453136, &["T"], vec![sample("P1", &[0.25])]))
            .unwrap();
        table
            .add_call(&call(140453136, &["T", "G"], vec![sample("P2", &[0.1, 0.05])]))
            .unwrap();
        table.set_coverage("chr7:140453136", "P1", 812).unwrap();
        let samples = vec!["P1".to_string(), "P2".to_string()];

        let mut out = Vec::new();
        write_coverage_table(&mut out, &table, &samples).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "#Chromosome\tPosition\tID\tP1\tP2\nchr7\t140453136\tT,G\t812\t0\n"
        );

        let mut out = Vec::new();
        write_frequency_table(&mut out, &table, &samples).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "chr7\t140453136\tT\t0.250000\t0.100000");
        assert_eq!(lines[2], "chr7\t140453136\tG\t\t0.050000");
    }

    #[test]
    fn test_frequency_from_allele_depths() {
        let mut table = VariantTable::new();
        let values = SampleValues {
            name: "P1".to_string(),
            af: None,
            ad: Some(vec![Some(150), Some(50)]),
        };
        table.add_call(&call(55249071, &["T"], vec![values])).unwrap();
        let site = table.get("chr7:55249071").unwrap();
        assert!((site.alleles["T"]["P1"].unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_coverage_rejected() {
        let mut table = VariantTable::new();
        table.add_call(&call(10, &["A"], vec![sample("P1", &[0.5])])).unwrap();
        table.set_coverage("chr7:10", "P1", 30).unwrap();
        assert!(table.set_coverage("chr7:10", "P1", 31).is_err());
        // unknown sites are ignored
        assert!(table.set_coverage("chr7:11", "P1", 31).is_ok());
    }
}

// -------------------------------------------------------------------------
// Run watcher
// -------------------------------------------------------------------------

mod test_run_watcher {
    use super::*;
    use anyhow::Result;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingRunner {
        commands: Vec<Vec<String>>,
    }

    impl CommandRunner for RecordingRunner {
        fn run(&mut self, cmd: &[String]) -> Result<()> {
            self.commands.push(cmd.to_vec());
            Ok(())
        }
    }

    const AMPLICON_SHEET: &str = "[Header]\n\
Experiment Name,RUN1\n\
Workflow,Amplicon - DS\n\
[Manifests]\n\
A,C:\\Manifests\\Lung_A.txt\n\
B,C:\\Manifests\\Lung_B.txt\n\
[Data]\n\
Sample_ID,Sample_Name,Manifest\n\
S1,P1,A\n";

    const OTHER_SHEET: &str = "[Header]\n\
Experiment Name,RUN2\n\
Workflow,GenerateFASTQ\n";

    struct Site {
        _root: TempDir,
        folders: WatchFolders,
    }

    fn site() -> Site {
        let root = TempDir::new().unwrap();
        let folders = WatchFolders {
            listened: root.path().join("listened"),
            storage: root.path().join("storage"),
            analysis: root.path().join("analysis"),
        };
        for folder in [&folders.listened, &folders.storage, &folders.analysis] {
            fs::create_dir(folder).unwrap();
        }
        Site {
            _root: root,
            folders,
        }
    }

    fn add_run(listened: &Path, name: &str, sheet: &str, completed: bool) {
        let calls = listened.join(name).join("Data").join("Intensities").join("BaseCalls");
        fs::create_dir_all(calls.join("Alignment")).unwrap();
        fs::write(calls.join("SampleSheet.csv"), sheet).unwrap();
        if completed {
            fs::write(listened.join(name).join("CompletedJobInfo.xml"), "<xml/>").unwrap();
        }
    }

    fn config() -> AutorunConfig {
        AutorunConfig {
            workflow_path: "/wf/WF_NAME/bin/jflow_cli.py".to_string(),
            ..AutorunConfig::default()
        }
    }

    #[test]
    fn test_amplicon_run_launches_workflows_then_stores_data() {
        let site = site();
        add_run(&site.folders.listened, "RUN1", AMPLICON_SHEET, true);
        let mut watcher = RunWatcher::new(site.folders.clone(), config(), RecordingRunner::default());

        let processed = watcher.run_pass().unwrap();
        assert_eq!(processed, vec!["RUN1".to_string()]);

        let commands = &watcher.runner().commands;
        assert_eq!(commands.len(), 4);
        assert_eq!(commands[0][0], "/wf/ADIVaR/bin/jflow_cli.py");
        assert_eq!(commands[1][0], "/wf/AmpliconDSAnnot/bin/jflow_cli.py");
        assert_eq!(commands[2][0], "rsync");
        assert!(commands[2][4].ends_with("Alignment/"));
        assert!(commands[2][5].ends_with("AmpliconDS"));
        assert_eq!(commands[3][0], "rsync");
        assert_eq!(
            commands[3][5],
            site.folders.storage.join("RUN1").display().to_string()
        );

        let log = fs::read_to_string(site.folders.analysis.join("RUN1/ADIVaR/log.txt")).unwrap();
        let tags: Vec<&str> = log.lines().map(|line| line.split('\t').next().unwrap()).collect();
        assert_eq!(tags, vec!["[START]", "[CMD]", "[END]"]);
        assert!(log.contains("--libA-folder"));

        assert!(!site.folders.listened.join("RUN1").exists());
    }

    #[test]
    fn test_incomplete_run_is_left_alone() {
        let site = site();
        add_run(&site.folders.listened, "RUN1", AMPLICON_SHEET, false);
        let mut watcher = RunWatcher::new(site.folders.clone(), config(), RecordingRunner::default());

        assert!(watcher.run_pass().unwrap().is_empty());
        assert!(watcher.runner().commands.is_empty());
        assert!(site.folders.listened.join("RUN1").exists());
    }

    #[test]
    fn test_other_protocol_only_stores_data() {
        let site = site();
        add_run(&site.folders.listened, "RUN2", OTHER_SHEET, true);
        let mut watcher = RunWatcher::new(site.folders.clone(), config(), RecordingRunner::default());

        watcher.run_pass().unwrap();
        let commands = &watcher.runner().commands;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0][0], "rsync");
        assert!(site.folders.analysis.join("RUN2").is_dir());
    }

    #[test]
    fn test_existing_workflow_output_is_skipped() {
        let site = site();
        add_run(&site.folders.listened, "RUN1", AMPLICON_SHEET, true);
        fs::create_dir_all(site.folders.analysis.join("RUN1").join("ADIVaR")).unwrap();
        let mut watcher = RunWatcher::new(site.folders.clone(), config(), RecordingRunner::default());

        watcher.run_pass().unwrap();
        let launched: Vec<&str> = watcher
            .runner()
            .commands
            .iter()
            .map(|cmd| cmd[0].as_str())
            .filter(|program| *program != "rsync")
            .collect();
        assert_eq!(launched, vec!["/wf/AmpliconDSAnnot/bin/jflow_cli.py"]);
    }

    #[test]
    fn test_runs_processed_in_name_order() {
        let site = site();
        add_run(&site.folders.listened, "RUN_B", OTHER_SHEET, true);
        add_run(&site.folders.listened, "RUN_A", OTHER_SHEET, true);
        let mut watcher = RunWatcher::new(site.folders.clone(), config(), RecordingRunner::default());

        let processed = watcher.run_pass().unwrap();
        assert_eq!(processed, vec!["RUN_A".to_string(), "RUN_B".to_string()]);
    }
}
