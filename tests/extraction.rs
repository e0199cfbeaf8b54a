//! Integration tests for colpensiones-extract.
//!
//! These drive the public API only, with page documents built in memory or
//! written to temp files. Run with:
//!   cargo test --test extraction -- --nocapture

use colpensiones_extract::pipeline::classify::classify;
use colpensiones_extract::pipeline::normalize::{normalize_currency, normalize_date, normalize_period};
use colpensiones_extract::pipeline::schema::{PAYMENTS, WEEKS};
use colpensiones_extract::pipeline::stitch::TableStitcher;
use colpensiones_extract::{
    analyze_gaps, extract, extract_file, extract_to_file, Cell, ContributionWeekRecord, Diagnostic,
    ExtractError, ExtractionConfig, ExtractionProgressCallback, ExtractionSession, RawPage,
    RawRow, RawTable, RowClassification, SchemaKind, StitchState, YearMonth,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn cells(texts: &[&str]) -> RawRow {
    texts.iter().map(|t| Cell::new(t)).collect()
}

fn weeks_header() -> RawRow {
    cells(&[
        "[1] Identificación Aportante",
        "[2] Nombre o Razón Social",
        "[3] Desde",
        "[4] Hasta",
        "[5] Último Salario",
        "[6] Semanas",
        "[7] Lic",
        "[8] Sim",
        "[9] Total",
    ])
}

fn weeks_row(id: &str) -> RawRow {
    cells(&[
        id,
        "EMPRESA EJEMPLO S.A.S.",
        "01/01/1995",
        "31/12/1995",
        "$ 1.235.000,50",
        "51,43",
        "",
        "",
        "51,43",
    ])
}

fn payments_header() -> RawRow {
    cells(&[
        "[34] Identificación Aportante",
        "[35] Nombre o Razón Social",
        "[36] RA",
        "[37] Período",
        "[38] Fecha De Pago",
        "[39] Referencia de Pago",
        "[40] IBC Reportado",
        "[41] Cotización Pagada",
        "[42] Cotización Mora Sin Intereses",
        "[43] Nov.",
        "[44] Días Rep.",
        "[45] Días Cot.",
        "[46] Observación",
    ])
}

fn payments_row(period: &str) -> RawRow {
    cells(&[
        "16610898",
        "EMPRESA EJEMPLO S.A.S.",
        "1",
        period,
        "15/01/1998",
        "REF123",
        "$ 471.800",
        "$ 64.900",
        "$ 0",
        "",
        "30",
        "30",
        "",
    ])
}

fn table(header: RawRow, rows: impl IntoIterator<Item = RawRow>) -> RawTable {
    std::iter::once(header).chain(rows).collect()
}

/// Page 1: weeks table with three rows. Page 2: no table, closing text.
fn two_page_weeks_report() -> Vec<RawPage> {
    vec![
        RawPage::new(
            vec![table(
                weeks_header(),
                ["111111", "222222", "333333"].map(weeks_row),
            )],
            "HISTORIA LABORAL\nREPORTE DE SEMANAS COTIZADAS",
        ),
        RawPage::text_only("TOTAL SEMANAS COTIZADAS\nfin del reporte"),
    ]
}

/// Payments table across two pages with a reprinted header, then a page
/// without continuation text.
fn payments_report() -> Vec<RawPage> {
    vec![
        RawPage::new(
            vec![table(
                payments_header(),
                [payments_row("199712"), payments_row("199801")],
            )],
            "DETALLE DE PAGOS EFECTUADOS A PARTIR DE 1995",
        ),
        RawPage::new(
            vec![table(
                payments_header(),
                [
                    payments_row("199803"),
                    cells(&["TOTAL GENERAL", "", "", "", "", "", "", "", "", "", "", "", ""]),
                ],
            )],
            "DETALLE DE PAGOS EFECTUADOS A PARTIR DE 1995",
        ),
        RawPage::text_only("Observaciones generales del afiliado"),
    ]
}

fn write_pages(dir: &tempfile::TempDir, name: &str, pages: &[RawPage]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string(pages).unwrap()).unwrap();
    path
}

// ── Normalisation ────────────────────────────────────────────────────────────

#[test]
fn colombian_currency_is_normalised() {
    assert_eq!(normalize_currency("$ 1.235.000,50"), Some(1235000.50));
    assert_eq!(normalize_currency("$ 2.000.000,00"), Some(2000000.0));
    assert_eq!(normalize_currency("$ 800.000"), Some(800000.0));
}

#[test]
fn compact_periods_are_validated() {
    assert_eq!(normalize_period("199712"), YearMonth::new(1997, 12));
    assert_eq!(normalize_period("199712").unwrap().to_string(), "1997-12");
    assert_eq!(normalize_period("199713"), None);
    assert_eq!(normalize_period("199700"), None);
}

#[test]
fn canonical_dates_normalise_to_themselves() {
    let once = normalize_date("1997-12-05").unwrap();
    assert_eq!(once.to_string(), "1997-12-05");
    assert_eq!(normalize_date(&once.to_string()), Some(once));
    assert_eq!(normalize_date("05/12/1997"), Some(once));
}

// ── Schema matching and classification ───────────────────────────────────────

#[test]
fn header_matching_ignores_case_and_accents() {
    let header = cells(&[
        "IDENTIFICACION",
        "nombre",
        "Desde",
        "HASTA",
        "ultimo salario",
        "Semanas",
        "",
        "",
        "",
    ]);
    let t = table(header, [weeks_row("111111")]);
    assert!(WEEKS.matches(&t, 6));
    assert!(!WEEKS.matches(&t, 7));
    assert!(!PAYMENTS.matches(&t, 1));
}

#[test]
fn reprinted_header_is_never_data() {
    assert_eq!(classify(&weeks_header(), &WEEKS), RowClassification::HeaderRepeat);
    assert_eq!(classify(&payments_header(), &PAYMENTS), RowClassification::HeaderRepeat);

    // The second page's header is skipped, its data row is kept.
    let mut stitcher: TableStitcher<ContributionWeekRecord> = TableStitcher::new(6, false);
    let mut diagnostics = Vec::new();
    let page1 = RawPage::new(vec![table(weeks_header(), [weeks_row("111111")])], "");
    let page2 = RawPage::new(vec![table(weeks_header(), [weeks_row("222222")])], "");
    stitcher.process_page(1, &page1, &mut diagnostics);
    assert!(stitcher.header_consumed());
    let outcome = stitcher.process_page(2, &page2, &mut diagnostics);
    assert_eq!(outcome.records_added, 1);
    assert_eq!(stitcher.records().len(), 2);
    assert!(diagnostics.is_empty());
}

#[test]
fn total_general_is_summary_for_both_schemas() {
    let weeks_total = cells(&["TOTAL GENERAL", "", "", "", "", "1.193,00", "", "", "1.193,00"]);
    assert_eq!(classify(&weeks_total, &WEEKS), RowClassification::Summary);
    let payments_total = cells(&["TOTAL GENERAL", "", "", "", "", "", "$ 1.000", "", "", "", "", "", ""]);
    assert_eq!(classify(&payments_total, &PAYMENTS), RowClassification::Summary);
}

// ── Gap analysis ─────────────────────────────────────────────────────────────

#[test]
fn gap_analysis_over_dashed_periods() {
    let report = analyze_gaps(&["2020-01", "2020-03", "2020-04"]).unwrap();
    assert_eq!(report.missing_count, 1);
    assert_eq!(report.missing_periods, vec![YearMonth::new(2020, 2).unwrap()]);
    assert_eq!(report.start_period.to_string(), "2020-01");
    assert_eq!(report.end_period.to_string(), "2020-04");

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["missing_periods"], serde_json::json!(["2020-02"]));
}

#[test]
fn gap_analysis_errors() {
    let empty: [&str; 0] = [];
    assert!(matches!(analyze_gaps(&empty), Err(ExtractError::NoPeriods)));
    assert!(matches!(
        analyze_gaps(&["2020-01", "2020-13"]),
        Err(ExtractError::InvalidPeriod { .. })
    ));
}

// ── End-to-end ───────────────────────────────────────────────────────────────

#[test]
fn weeks_table_ends_on_closing_text() {
    let pages = two_page_weeks_report();
    let config = ExtractionConfig::default();
    let mut session = ExtractionSession::new(&config, pages.len());
    for (i, page) in pages.iter().enumerate() {
        session.process_page(i + 1, page);
    }
    assert_eq!(
        session.weeks().history(),
        &[StitchState::Seeking, StitchState::Accumulating, StitchState::Done]
    );
    assert_eq!(session.payments().state(), StitchState::Seeking);

    let output = session.finish();
    assert_eq!(output.weeks.len(), 3);
    assert_eq!(output.stats.weeks_end_page, Some(2));
    let first = &output.weeks[0];
    assert_eq!(first.contributor_id.as_deref(), Some("111111"));
    assert_eq!(first.last_salary, Some(1235000.50));
    assert_eq!(first.weeks, Some(51.43));
    assert_eq!(first.deduction_weeks, None);
    assert_eq!(first.period_from.map(|d| d.to_string()).as_deref(), Some("1995-01-01"));
}

#[test]
fn summary_totals_are_last_wins() {
    let pages = vec![
        RawPage::text_only("RESUMEN\n[26] TOTAL SEMANAS\nCOTIZADAS\n1193,00"),
        RawPage::text_only("sin totales en esta página"),
        RawPage::text_only("[26] TOTAL SEMANAS\n\n1250,00"),
    ];
    let output = extract(&pages, &ExtractionConfig::default()).unwrap();
    assert_eq!(output.summary.weeks_total_report, Some(1250.0));

    let only_first = extract(&pages[..2], &ExtractionConfig::default()).unwrap();
    assert_eq!(only_first.summary.weeks_total_report, Some(1193.0));
}

#[test]
fn payments_across_pages_with_gap_report() {
    let output = extract(&payments_report(), &ExtractionConfig::default()).unwrap();

    assert_eq!(output.payments.len(), 3);
    assert!(output.diagnostics.is_empty(), "{:?}", output.diagnostics);
    assert_eq!(output.stats.payments_state, StitchState::Done);
    assert_eq!(output.stats.payments_end_page, Some(3));

    let p = &output.payments[0];
    assert_eq!(p.contributor_id, "16610898");
    assert_eq!(p.reported_income_base, Some(471800.0));
    assert_eq!(p.reported_days, Some(30));
    assert_eq!(p.contributed_days, Some(30));

    let gaps = output.gap_report().unwrap();
    assert_eq!(gaps.start_period.to_string(), "1997-12");
    assert_eq!(gaps.end_period.to_string(), "1998-03");
    assert_eq!(gaps.missing_periods, vec![YearMonth::new(1998, 2).unwrap()]);
}

#[test]
fn payments_keep_scanning_without_early_stop() {
    let mut pages = payments_report();
    pages.push(RawPage::new(
        vec![table(payments_header(), [payments_row("199805")])],
        "ANEXO",
    ));

    let stopped = extract(&pages, &ExtractionConfig::default()).unwrap();
    assert_eq!(stopped.payments.len(), 3);

    let config = ExtractionConfig::builder()
        .payments_early_stop(false)
        .build()
        .unwrap();
    let open = extract(&pages, &config).unwrap();
    assert_eq!(open.payments.len(), 4);
    assert_eq!(open.stats.payments_state, StitchState::Accumulating);
}

#[test]
fn bad_field_becomes_null_with_diagnostic() {
    let mut bad = weeks_row("444444");
    bad[2] = Cell::new("31/02/1995");
    let pages = vec![RawPage::new(vec![table(weeks_header(), [bad])], "")];
    let output = extract(&pages, &ExtractionConfig::default()).unwrap();

    assert_eq!(output.weeks.len(), 1);
    assert_eq!(output.weeks[0].period_from, None);
    assert!(output.weeks[0].period_to.is_some());
    assert!(matches!(
        &output.diagnostics[..],
        [Diagnostic::ParseFailure { page: 1, schema: SchemaKind::Weeks, raw, .. }] if raw == "31/02/1995"
    ));
}

#[test]
fn output_json_uses_documented_member_names() {
    let output = extract(&two_page_weeks_report(), &ExtractionConfig::default()).unwrap();
    let json = serde_json::to_value(&output).unwrap();
    assert!(json["weeks_data"].is_array());
    assert!(json["payments_data"].is_array());
    assert!(json["summary_values"]["weeks_total_report"].is_null());
    assert_eq!(json["weeks_data"][0]["period_to"], "1995-12-31");
    assert_eq!(json["stats"]["weeks_state"], "done");
}

// ── Files ────────────────────────────────────────────────────────────────────

#[test]
fn extract_file_reads_bare_and_wrapped_documents() {
    let dir = tempfile::tempdir().unwrap();
    let bare = write_pages(&dir, "bare.json", &two_page_weeks_report());
    assert_eq!(extract_file(&bare, &ExtractionConfig::default()).unwrap().weeks.len(), 3);

    let wrapped = dir.path().join("wrapped.json");
    std::fs::write(
        &wrapped,
        r#"{"pages": [{"raw_tables": [], "raw_text": "[26] TOTAL SEMANAS 1250,00"}, {"raw_text": "fin"}]}"#,
    )
    .unwrap();
    let output = extract_file(&wrapped, &ExtractionConfig::default()).unwrap();
    assert_eq!(output.stats.total_pages, 2);
    assert_eq!(output.summary.weeks_total_report, Some(1250.0));
}

#[test]
fn null_cells_in_documents_are_absent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nulls.json");
    let header = r#"["Identificación aportante", "Nombre o razón social", "Desde", "Hasta", "Último salario", "Semanas", null, null, "Total"]"#;
    let data = r#"["111111", "ACME", "01/01/1995", "31/12/1995", null, "51,43", null, null, "51,43"]"#;
    std::fs::write(
        &path,
        format!(r#"[{{"raw_tables": [[{header}, {data}]], "raw_text": ""}}]"#),
    )
    .unwrap();

    let output = extract_file(&path, &ExtractionConfig::default()).unwrap();
    assert_eq!(output.weeks.len(), 1);
    assert_eq!(output.weeks[0].last_salary, None);
    assert!(output.diagnostics.is_empty());
}

#[test]
fn missing_input_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    match extract_file(&missing, &ExtractionConfig::default()) {
        Err(ExtractError::FileNotFound { path }) => assert_eq!(path, missing),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}

#[test]
fn malformed_document_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        extract_file(&path, &ExtractionConfig::default()),
        Err(ExtractError::SourceRead { .. })
    ));
}

#[test]
fn extract_to_file_writes_result() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pages(&dir, "in.json", &payments_report());
    let output_path = dir.path().join("out").join("result.json");

    let stats = extract_to_file(&input, &output_path, &ExtractionConfig::default()).unwrap();
    assert_eq!(stats.total_pages, 3);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(written["payments_data"].as_array().unwrap().len(), 3);
    assert_eq!(written["payments_data"][2]["period"], "1998-03");
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ExtractionProgressCallback for Recorder {
    fn on_extraction_start(&self, total_pages: usize) {
        self.push(format!("start {total_pages}"));
    }

    fn on_page_complete(&self, page_num: usize, _total: usize, weeks_added: usize, payments_added: usize) {
        self.push(format!("page {page_num} {weeks_added} {payments_added}"));
    }

    fn on_table_end(&self, schema: SchemaKind, page_num: usize) {
        self.push(format!("end {schema} {page_num}"));
    }

    fn on_extraction_complete(&self, weeks: usize, payments: usize) {
        self.push(format!("done {weeks} {payments}"));
    }
}

#[test]
fn progress_events_follow_the_run() {
    let recorder = Arc::new(Recorder::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();

    extract(&two_page_weeks_report(), &config).unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 2".to_string(),
            "page 1 3 0".to_string(),
            format!("end {} 2", SchemaKind::Weeks),
            "page 2 0 0".to_string(),
            "done 3 0".to_string(),
        ]
    );
}

#[test]
fn concurrent_runs_do_not_share_state() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                extract(&two_page_weeks_report(), &ExtractionConfig::default())
                    .unwrap()
                    .weeks
                    .len()
            })
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 3);
    }
}
