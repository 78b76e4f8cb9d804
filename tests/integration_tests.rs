use adhd_med_map::domain::model::Availability;
use adhd_med_map::domain::model::AvailabilityReport;
use adhd_med_map::domain::ports::Viewer;
use adhd_med_map::{CliConfig, EtlEngine, LocalStorage, MapError, MapPipeline};
use async_trait::async_trait;
use httpmock::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const SHEET: &str = "\
European Medicines Agency - Article 57 product data
\"Product name\",\"Active substance\nINN\",\"Product authorisation country\nISO\"
Ritalin,Methylphenidate hydrochloride,France
Concerta,Methylphenidate hydrochloride,Germany (DE)
Strattera,Atomoxetine,European Union
Intuniv,Guanfacine hydrochloride,Spain
Aspirin,Acetylsalicylic acid,Italy
";

#[derive(Default)]
struct RecordingViewer {
    opened: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl Viewer for RecordingViewer {
    async fn show(&self, path: &Path) -> adhd_med_map::Result<()> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

fn config_for(temp: &TempDir, source: String, output: &str) -> CliConfig {
    CliConfig {
        source,
        skip_rows: 1,
        output: output.to_string(),
        output_dir: temp.path().join("output"),
        cache_dir: temp.path().join("cache"),
        ..CliConfig::default()
    }
}

fn write_source(temp: &TempDir, name: &str, content: &str) -> String {
    let path = temp.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_end_to_end_export_from_http_source() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start();
    let sheet_mock = server.mock(|when, then| {
        when.method(GET).path("/article-57.csv");
        then.status(200)
            .header("Content-Type", "text/csv")
            .body(SHEET);
    });

    let config = config_for(&temp, server.url("/article-57.csv"), "export");
    let storage = LocalStorage::new(config.output_dir.clone());
    let pipeline = MapPipeline::new(storage, config).unwrap();
    let engine = EtlEngine::new(pipeline);

    let output = engine.run().await.unwrap();
    sheet_mock.assert();

    let run_dir = Path::new(&output);
    assert!(run_dir.starts_with(temp.path().join("output")));
    for file in [
        "adhd_map.html",
        "adhd_map.json",
        "availability.json",
        "atomoxetine.svg",
        "clonidine.svg",
        "dexamfetamine.svg",
        "guanfacine.svg",
        "lisdexamfetamine.svg",
        "methylphenidate.svg",
    ] {
        assert!(run_dir.join(file).exists(), "missing {}", file);
    }

    let report: AvailabilityReport =
        serde_json::from_slice(&std::fs::read(run_dir.join("availability.json")).unwrap()).unwrap();
    assert_eq!(report.countries.len(), 37);

    let france = report.country("FRA").unwrap();
    assert_eq!(france.medications_available, vec!["Atomoxetine", "Methylphenidate"]);
    let spain = report.country("ESP").unwrap();
    assert_eq!(spain.medications_available, vec!["Atomoxetine", "Guanfacine"]);
    let italy = report.country("ITA").unwrap();
    assert_eq!(italy.flag("Methylphenidate"), Availability::Unavailable);
    assert_eq!(italy.flag("Atomoxetine"), Availability::Available);

    let figure: serde_json::Value =
        serde_json::from_slice(&std::fs::read(run_dir.join("adhd_map.json")).unwrap()).unwrap();
    assert_eq!(figure["data"].as_array().unwrap().len(), 6);
    assert_eq!(figure["layout"]["sliders"][0]["steps"][0]["label"], "Atomoxetine");
}

#[tokio::test]
async fn test_invalid_output_mode_fails_before_loading() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start();
    let sheet_mock = server.mock(|when, then| {
        when.method(GET).path("/article-57.csv");
        then.status(200).body(SHEET);
    });

    let config = config_for(&temp, server.url("/article-57.csv"), "invalid");
    let storage = LocalStorage::new(config.output_dir.clone());
    let engine = EtlEngine::new(MapPipeline::new(storage, config).unwrap());

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, MapError::Configuration { .. }));
    sheet_mock.assert_hits(0);
}

#[tokio::test]
async fn test_cached_table_skips_second_download() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start();
    let sheet_mock = server.mock(|when, then| {
        when.method(GET).path("/article-57.csv");
        then.status(200).body(SHEET);
    });

    for _ in 0..2 {
        let viewer = Arc::new(RecordingViewer::default());
        let config = config_for(&temp, server.url("/article-57.csv"), "show");
        let storage = LocalStorage::new(config.output_dir.clone());
        let pipeline = MapPipeline::new(storage, config)
            .unwrap()
            .with_viewer(viewer.clone());
        let output = EtlEngine::new(pipeline).run().await.unwrap();

        let opened = viewer.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0], PathBuf::from(&output));
        assert!(opened[0].starts_with(temp.path().join("cache").join("view")));
    }

    sheet_mock.assert_hits(1);
}

#[tokio::test]
async fn test_disabled_cache_downloads_every_run() {
    let temp = TempDir::new().unwrap();
    let server = MockServer::start();
    let sheet_mock = server.mock(|when, then| {
        when.method(GET).path("/article-57.csv");
        then.status(200).body(SHEET);
    });

    for _ in 0..2 {
        let mut config = config_for(&temp, server.url("/article-57.csv"), "show");
        config.disable_cache = true;
        let storage = LocalStorage::new(config.output_dir.clone());
        let pipeline = MapPipeline::new(storage, config)
            .unwrap()
            .with_viewer(Arc::new(RecordingViewer::default()));
        EtlEngine::new(pipeline).run().await.unwrap();
    }

    sheet_mock.assert_hits(2);
    let cached = std::fs::read_dir(temp.path().join("cache"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
        .count();
    assert_eq!(cached, 0);
}

#[tokio::test]
async fn test_case_insensitive_medication_file() {
    let temp = TempDir::new().unwrap();
    let source = write_source(
        &temp,
        "rows.csv",
        "banner\nActive substance,Product authorisation country\n\
         Methylphenidate HCl,France\nAtomoxetine,Spain\nmethylphenidate extended release,Germany\n",
    );
    let medications = temp.path().join("medications.toml");
    std::fs::write(
        &medications,
        "[[medication]]\nname = \"Methylphenidate\"\npattern = '\\bmethylphenidat'\ncase_sensitive = false\n",
    )
    .unwrap();

    let mut config = config_for(&temp, source, "show");
    config.medications = Some(medications);
    config.disable_cache = true;
    let storage = LocalStorage::new(config.output_dir.clone());
    let pipeline = MapPipeline::new(storage, config)
        .unwrap()
        .with_viewer(Arc::new(RecordingViewer::default()));

    use adhd_med_map::domain::ports::Pipeline;
    let records = pipeline.extract().await.unwrap();
    let report = pipeline.transform(records).await.unwrap();

    assert_eq!(report.per_medication.len(), 1);
    assert_eq!(report.per_medication[0].matched_rows, 2);
    assert_eq!(report.per_medication[0].countries.len(), 2);
    assert_eq!(
        report.country("FRA").unwrap().flag("Methylphenidate"),
        Availability::Available
    );
    assert_eq!(
        report.country("DEU").unwrap().flag("Methylphenidate"),
        Availability::Available
    );
    assert_eq!(
        report.country("ESP").unwrap().flag("Methylphenidate"),
        Availability::Unavailable
    );
}

#[tokio::test]
async fn test_missing_columns_is_data_format_error() {
    let temp = TempDir::new().unwrap();
    let source = write_source(&temp, "bad.csv", "banner\nSubstance,Country\nAtomoxetine,France\n");
    let mut config = config_for(&temp, source, "show");
    config.disable_cache = true;
    let storage = LocalStorage::new(config.output_dir.clone());
    let engine = EtlEngine::new(MapPipeline::new(storage, config).unwrap());

    let err = engine.run().await.unwrap_err();
    assert!(matches!(err, MapError::DataFormat { .. }));
}

#[tokio::test]
async fn test_unknown_country_is_reported() {
    let temp = TempDir::new().unwrap();
    let source = write_source(
        &temp,
        "unknown.csv",
        "banner\nActive substance,Product authorisation country\nClonidine,Atlantis\n",
    );
    let mut config = config_for(&temp, source, "show");
    config.disable_cache = true;
    let storage = LocalStorage::new(config.output_dir.clone());
    let engine = EtlEngine::new(MapPipeline::new(storage, config).unwrap());

    match engine.run().await.unwrap_err() {
        MapError::UnresolvedCountry { label, .. } => assert_eq!(label, "Atlantis"),
        other => panic!("unexpected error: {:?}", other),
    }
}
