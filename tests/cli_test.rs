use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PARSER_DEFINITION: &str = "\
Node\tKey\tImport\tExport
Visit\tstation_name\t$Text('Station')\tStation
Visit\tsample_date\t$Date('Date')\tDate
Sample\tsample_min_depth_m\t$Float('Min depth')\tMin depth
Sample\tsample_max_depth_m\t$Float('Max depth')\tMax depth
Variable\tscientific_name\t$Text('Taxon')\tScientific name
Variable\tsize_class\t$Text('Size')\tSize class
Variable\ttrophy\t$Text('Trophy')\tTrophy
Variable\tAbundance\t$Parameter('Counted units/l', 'ind/l')\t
Variable\tBiovolume concentration\t$Parameter('Biovolume mm3/l', 'mm3/l')\t
Variable\tparameter\t\tParameter
Variable\tvalue\t\tValue
Variable\tunit\t\tUnit
";

const DATA: &str = "\
Station\tDate\tMin depth\tMax depth\tTaxon\tSize\tTrophy\tCounted units/l\tBiovolume mm3/l
BY31\t2012-06-14\t0\t10\tSkeletonema marinoi\t1\tAU\t1234\t0,25
BY31\t2012-06-14\t0\t10\tSkeletonema marinoi\t2\tAU\t766\t0,5
BY31\t2012-06-14\t0\t10\tDinophysis acuta\t1\tMX\t20\t
BY15\t2012-06-15\t0\t10\tSkeletonema marinoi\t1\tAU\t50\t
";

/// Write a configuration with parser definition, taxa and bvol files next to it.
fn create_config(dir: &TempDir) -> PathBuf {
    std::fs::write(dir.path().join("parser.txt"), PARSER_DEFINITION).unwrap();
    std::fs::write(
        dir.path().join("taxa.txt"),
        "scientific_name\tclass\tgenus\tharmful\ttrophic_type\n\
         Skeletonema marinoi\tBacillariophyceae\tSkeletonema\t\tAU\n\
         Dinophysis acuta\tDinophyceae\tDinophysis\tX\tMX\n\
         Bacillariophyceae\tBacillariophyceae\t\t\t\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("bvol.txt"),
        "scientific_name\tsize_class\tbvol_trophic_type\n\
         Skeletonema marinoi\t1\tAU\n\
         Skeletonema marinoi\t2\tAU\n",
    )
    .unwrap();

    let path = dir.path().join("toolbox.toml");
    std::fs::write(
        &path,
        "[parser]\n\
         definition = \"parser.txt\"\n\
         \n\
         [taxa]\n\
         taxa_file = \"taxa.txt\"\n\
         bvol_file = \"bvol.txt\"\n",
    )
    .unwrap();
    path
}

fn create_data(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("BY31_2012.txt");
    std::fs::write(&path, DATA).unwrap();
    path
}

fn cmd() -> Command {
    Command::cargo_bin("plankton-report").unwrap()
}

// --- Summary subcommand ---

#[test]
fn test_summary() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);

    cmd()
        .args([
            "summary",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("BY31_2012"))
        .stdout(predicate::str::contains("Variables"))
        .stdout(predicate::str::contains("Biovolume concentration"));
}

#[test]
fn test_summary_reports_screening_warnings() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = dir.path().join("negative.txt");
    std::fs::write(
        &data,
        "Station\tDate\tMin depth\tMax depth\tTaxon\tCounted units/l\n\
         BY31\t2012-06-14\t0\t10\tSkeletonema marinoi\t-5\n",
    )
    .unwrap();

    cmd()
        .args([
            "summary",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Screening warnings"));
}

#[test]
fn test_summary_missing_config() {
    let dir = TempDir::new().unwrap();
    let data = create_data(&dir);

    cmd()
        .args([
            "summary",
            "--config",
            dir.path().join("nope.toml").to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
        ])
        .assert()
        .failure();
}

#[test]
fn test_summary_without_variables() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = dir.path().join("visits_only.txt");
    std::fs::write(
        &data,
        "Station\tDate\tMin depth\tMax depth\n\
         BY31\t2012-06-14\t0\t10\n",
    )
    .unwrap();

    cmd()
        .args([
            "summary",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No variables found"));
}

// --- Export subcommand ---

#[test]
fn test_export_text() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);
    let output = dir.path().join("export.txt");

    cmd()
        .args([
            "export",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Success"))
        .stdout(predicate::str::contains("6 rows"));

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.starts_with("Station\tDate\tMin depth"));
    assert!(content.contains("Biovolume concentration\t0.25\tmm3/l"));
}

#[test]
fn test_export_excel() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);
    let output = dir.path().join("export.xlsx");

    cmd()
        .args([
            "export",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    assert!(output.exists());
}

#[test]
fn test_export_missing_input() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);

    cmd()
        .args([
            "export",
            "--config",
            config.to_str().unwrap(),
            "--input",
            "/nonexistent/file.txt",
            "--output",
            dir.path().join("out.txt").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to import"));
}

// --- Report subcommand ---

#[test]
fn test_report_counted() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);
    let output = dir.path().join("report.txt");

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report (counted)"));

    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    // Six header rows, the title row and three species rows.
    assert_eq!(lines.len(), 10);
    assert!(lines[0].contains("Station:"));
    assert!(lines[6].starts_with("Class\tPot. toxic\tScientific name"));
}

#[test]
fn test_report_net_with_aggregated_rows() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);
    let output = dir.path().join("report.txt");

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--mode",
            "net",
            "--aggregate-rows",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Report (net)"));

    // Row merging applies to counted reports only.
    let content = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 10);
    assert!(lines[6].ends_with("Occurrence\tOccurrence"));
}

#[test]
fn test_report_with_rank_aggregation() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);
    let output = dir.path().join("report.csv");

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
            "--rank",
            "Class",
            "--trophy",
            "AU",
        ])
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    assert!(content.contains("Bacillariophyceae"));
    assert!(!content.contains("Dinophysis acuta"));
}

#[test]
fn test_report_multiple_inputs() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let first = create_data(&dir);
    let second = dir.path().join("BY15_2012.txt");
    std::fs::copy(&first, &second).unwrap();
    let output = dir.path().join("report.txt");

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            first.to_str().unwrap(),
            second.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let content = std::fs::read_to_string(&output).unwrap();
    // Two samples per file, two columns each.
    let title: Vec<&str> = content.lines().nth(6).unwrap().split('\t').collect();
    assert_eq!(title.len(), 7 + 8);
}

#[test]
fn test_report_invalid_mode() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            dir.path().join("report.txt").to_str().unwrap(),
            "--mode",
            "gross",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown report mode"));
}

#[test]
fn test_report_invalid_rank() {
    let dir = TempDir::new().unwrap();
    let config = create_config(&dir);
    let data = create_data(&dir);

    cmd()
        .args([
            "report",
            "--config",
            config.to_str().unwrap(),
            "--input",
            data.to_str().unwrap(),
            "--output",
            dir.path().join("report.txt").to_str().unwrap(),
            "--rank",
            "Kingdomish",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown aggregation rank"));
}

// --- General ---

#[test]
fn test_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("summary"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("report"));
}

#[test]
fn test_no_subcommand() {
    cmd().assert().failure();
}
