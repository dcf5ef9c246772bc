use std::fs;
use std::path::PathBuf;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::cli::SplitArgs;
use crate::model::{
    Boundary, ErrorLedger, Rect, RecoveryState, SessionCandidate, SessionId, TextFragment,
};

use super::boundary::{compute_boundaries, Lookahead};
use super::emit::SessionEmitter;
use super::locate::locate_sessions;
use super::recover::recover_page;
use super::segment::segment_page_text;

fn fragment(text: &str, top: f32) -> TextFragment {
    TextFragment {
        text: text.to_string(),
        rect: Rect::new(72.0, top - 12.0, 300.0, top),
    }
}

fn candidate(id: SessionId, top: f32) -> SessionCandidate {
    SessionCandidate {
        id,
        rect: Rect::new(72.0, top - 12.0, 300.0, top),
    }
}

fn resolved_values(candidates: &[SessionCandidate]) -> Vec<Option<i64>> {
    candidates.iter().map(|entry| entry.id.value()).collect()
}

#[test]
fn segment_returns_nothing_without_marker() {
    assert!(segment_page_text("plain page content", "Sess").is_empty());
}

#[test]
fn segment_yields_one_segment_for_trailing_occurrence() {
    let segments = segment_page_text("preamble Session 42 tail", "Sess");
    assert_eq!(segments, vec!["Session 42 tail".to_string()]);
}

#[test]
fn segment_skips_placeholder_header_occurrences() {
    let text = "Session 101 data Session # Session 103 data";
    let segments = segment_page_text(text, "Sess");

    assert_eq!(segments.len(), 2);
    assert!(segments[0].starts_with("Session 101"));
    assert!(segments[1].starts_with("Session 103"));
}

#[test]
fn segment_skips_leading_placeholder_header() {
    let segments = segment_page_text("Session # Session 200 body", "Sess");
    assert_eq!(segments, vec!["Session 200 body".to_string()]);
}

#[test]
fn locate_resolves_every_id_when_all_numeric() {
    let fragments = vec![
        fragment("Session 101", 700.0),
        fragment("alpha", 650.0),
        fragment("Session 102", 500.0),
        fragment("beta", 450.0),
    ];
    let text = "Session 101\nalpha\nSession 102\nbeta";
    let segments = segment_page_text(text, "Sess");

    let candidates = locate_sessions(&fragments, &segments, "Sess").unwrap();

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(101), Some(102)],
        "all-numeric pages must leave no unresolved entries"
    );
}

#[test]
fn locate_suppresses_placeholder_false_positives() {
    let fragments = vec![
        fragment("Session", 700.0),
        fragment("101 data", 700.0),
        fragment("Session", 600.0),
        fragment("#", 600.0),
        fragment("Session", 500.0),
        fragment("103 data", 500.0),
    ];
    let text = "Session 101 data Session # Session 103 data";
    let segments = segment_page_text(text, "Sess");

    let candidates = locate_sessions(&fragments, &segments, "Sess").unwrap();

    assert_eq!(resolved_values(&candidates), vec![Some(101), Some(103)]);
    assert_eq!(candidates[0].rect.top, 700.0);
    assert_eq!(candidates[1].rect.top, 500.0);
}

#[test]
fn locate_marks_garbled_id_unresolved() {
    let fragments = vec![fragment("Session 1O1", 700.0)];
    let segments = segment_page_text("Session 1O1", "Sess");

    let candidates = locate_sessions(&fragments, &segments, "Sess").unwrap();

    assert_eq!(resolved_values(&candidates), vec![None]);
}

#[test]
fn recover_fills_around_lone_anchor_without_carry_over() {
    let mut candidates = vec![
        candidate(SessionId::Unresolved, 700.0),
        candidate(SessionId::Resolved(205), 500.0),
        candidate(SessionId::Unresolved, 300.0),
    ];
    let mut ledger = ErrorLedger::default();

    let state = recover_page(0, &mut candidates, RecoveryState::default(), &mut ledger);

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(204), Some(205), Some(206)]
    );
    assert_eq!(state.last_confirmed_id, Some(206));
    assert_eq!(ledger.ids(), &[204, 206]);
}

#[test]
fn recover_is_idempotent_on_fully_resolved_lists() {
    let mut candidates = vec![
        candidate(SessionId::Resolved(101), 700.0),
        candidate(SessionId::Resolved(102), 500.0),
        candidate(SessionId::Resolved(103), 300.0),
    ];
    let mut ledger = ErrorLedger::default();
    let state = RecoveryState {
        last_confirmed_id: Some(100),
    };

    let state = recover_page(3, &mut candidates, state, &mut ledger);

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(101), Some(102), Some(103)]
    );
    assert_eq!(state.last_confirmed_id, Some(103));
    assert!(ledger.is_empty());
}

#[test]
fn recover_continues_sequence_without_anchor() {
    let mut candidates = vec![
        candidate(SessionId::Unresolved, 700.0),
        candidate(SessionId::Unresolved, 500.0),
    ];
    let mut ledger = ErrorLedger::default();
    let state = RecoveryState {
        last_confirmed_id: Some(110),
    };

    let state = recover_page(1, &mut candidates, state, &mut ledger);

    assert_eq!(resolved_values(&candidates), vec![Some(111), Some(112)]);
    assert_eq!(state.last_confirmed_id, Some(112));
}

#[test]
fn recover_overwrites_ocr_misreads_against_carry_over() {
    let mut candidates = vec![
        candidate(SessionId::Resolved(101), 700.0),
        candidate(SessionId::Resolved(999), 500.0),
        candidate(SessionId::Unresolved, 300.0),
    ];
    let mut ledger = ErrorLedger::default();
    let state = RecoveryState {
        last_confirmed_id: Some(100),
    };

    let state = recover_page(2, &mut candidates, state, &mut ledger);

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(101), Some(102), Some(103)],
        "a page confirmed against the carry-over must read as a unit run"
    );
    assert_eq!(state.last_confirmed_id, Some(103));
    assert_eq!(ledger.ids(), &[102, 103]);
}

#[test]
fn recover_reports_page_unrecoverable_without_any_anchor() {
    let mut candidates = vec![
        candidate(SessionId::Unresolved, 700.0),
        candidate(SessionId::Unresolved, 500.0),
    ];
    let mut ledger = ErrorLedger::default();

    let state = recover_page(0, &mut candidates, RecoveryState::default(), &mut ledger);

    assert_eq!(resolved_values(&candidates), vec![None, None]);
    assert_eq!(state.last_confirmed_id, None);
    assert!(ledger.is_empty());
}

#[test]
fn recover_discards_contradicted_non_final_anchor() {
    let mut candidates = vec![
        candidate(SessionId::Resolved(100), 700.0),
        candidate(SessionId::Resolved(999), 500.0),
        candidate(SessionId::Unresolved, 300.0),
    ];
    let mut ledger = ErrorLedger::default();

    let state = recover_page(0, &mut candidates, RecoveryState::default(), &mut ledger);

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(100), Some(999), None],
        "two inconsistent reads with no carry-over leave the page as found"
    );
    assert_eq!(state.last_confirmed_id, None);
}

#[test]
fn recover_accepts_final_element_as_anchor() {
    let mut candidates = vec![
        candidate(SessionId::Resolved(100), 700.0),
        candidate(SessionId::Unresolved, 500.0),
        candidate(SessionId::Resolved(999), 300.0),
    ];
    let mut ledger = ErrorLedger::default();

    let state = recover_page(0, &mut candidates, RecoveryState::default(), &mut ledger);

    assert_eq!(
        resolved_values(&candidates),
        vec![Some(997), Some(998), Some(999)]
    );
    assert_eq!(state.last_confirmed_id, Some(999));
}

#[test]
fn boundaries_between_sessions_stay_on_one_page() {
    let candidates = vec![
        candidate(SessionId::Resolved(300), 700.0),
        candidate(SessionId::Resolved(301), 400.0),
    ];
    let lookahead = Some(Lookahead {
        page: 3,
        marker_top: 650.0,
    });

    let plan = compute_boundaries(2, &candidates, lookahead, 6, 9.0);

    assert_eq!(plan.boundaries.len(), 2);
    assert_eq!(plan.boundaries[0].start_page, 2);
    assert_eq!(plan.boundaries[0].end_page, 2);
    assert_eq!(plan.boundaries[0].top_crop_y, 709.0);
    assert_eq!(plan.boundaries[0].bottom_crop_y, 409.0);

    assert_eq!(plan.boundaries[1].start_page, 2);
    assert_eq!(plan.boundaries[1].end_page, 3);
    assert_eq!(plan.boundaries[1].bottom_crop_y, 659.0);

    assert_eq!(plan.resume_page, 3);
}

#[test]
fn last_session_without_lookahead_runs_to_document_end() {
    let candidates = vec![candidate(SessionId::Resolved(412), 500.0)];

    let plan = compute_boundaries(1, &candidates, None, 4, 9.0);

    let boundary = plan.boundaries[0];
    assert_eq!(boundary.start_page, 1);
    assert_eq!(boundary.end_page, 3);
    assert_eq!(boundary.top_crop_y, 509.0);
    assert_eq!(boundary.bottom_crop_y, 0.0);
    assert_eq!(boundary.page_span(), 3);

    assert_eq!(
        plan.resume_page, 4,
        "the outer loop must not reprocess pages consumed by the span"
    );
}

#[test]
fn lookahead_over_marker_free_pages_spans_interior_pages() {
    let candidates = vec![candidate(SessionId::Resolved(7), 600.0)];
    let lookahead = Some(Lookahead {
        page: 4,
        marker_top: 720.0,
    });

    let plan = compute_boundaries(1, &candidates, lookahead, 8, 9.0);

    let boundary = plan.boundaries[0];
    assert_eq!(boundary.start_page, 1);
    assert_eq!(boundary.end_page, 4);
    assert!(boundary.page_span() >= 3);
    assert_eq!(plan.resume_page, 4);
}

fn build_document(pages: &[Vec<(&str, f32)>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for (text, y) in lines {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), (*y).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content should encode"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("document should save");
    bytes
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sessplit-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

#[test]
fn emitter_disambiguates_duplicate_labels() {
    let bytes = build_document(&[vec![("Session 101", 700.0)]]);
    let dir = scratch_dir("emit-dupes");

    let mut emitter = SessionEmitter::new(&dir);
    let duplicate = candidate(SessionId::Resolved(101), 700.0);
    let boundary = Boundary {
        start_page: 0,
        end_page: 0,
        top_crop_y: 721.0,
        bottom_crop_y: 0.0,
    };

    let entry = emitter
        .emit(&bytes, &duplicate, &boundary)
        .expect("first emit should succeed");
    assert_eq!(entry.output_file, "101.pdf");

    let entry = emitter
        .emit(&bytes, &duplicate, &boundary)
        .expect("second emit should succeed");
    assert_eq!(entry.output_file, "101-0002.pdf");

    assert!(dir.join("101.pdf").exists());
    assert!(dir.join("101-0002.pdf").exists());
    assert_eq!(emitter.count(), 2);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_run_emits_one_file_per_session() {
    let bytes = build_document(&[
        vec![
            ("Session 101", 700.0),
            ("alpha", 650.0),
            ("Session 102", 500.0),
            ("beta", 450.0),
        ],
        vec![("Session 103", 700.0), ("gamma", 650.0)],
    ]);

    let dir = scratch_dir("split-run");
    let input = dir.join("input.pdf");
    fs::write(&input, &bytes).expect("input should be writable");
    let manifest_path = dir.join("manifest.json");

    let args = SplitArgs {
        input,
        output_dir: dir.clone(),
        recover: false,
        marker: "Sess".to_string(),
        gap: 9.0,
        manifest_path: Some(manifest_path.clone()),
    };

    super::run(args).expect("split should succeed");

    for name in ["101.pdf", "102.pdf", "103.pdf"] {
        assert!(dir.join(name).exists(), "missing output {name}");
    }

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).expect("manifest should exist"))
            .expect("manifest should parse");
    assert_eq!(manifest["sessions_extracted"], 3);
    assert_eq!(manifest["undetected_count"], 0);
    assert_eq!(manifest["recovery_enabled"], false);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_run_recovers_corrupted_ids_across_pages() {
    let bytes = build_document(&[
        vec![("Session 200", 700.0), ("Session 2O1", 500.0)],
        vec![("Session NA?", 700.0)],
    ]);

    let dir = scratch_dir("split-recover");
    let input = dir.join("input.pdf");
    fs::write(&input, &bytes).expect("input should be writable");
    let manifest_path = dir.join("manifest.json");

    let args = SplitArgs {
        input,
        output_dir: dir.clone(),
        recover: true,
        marker: "Sess".to_string(),
        gap: 9.0,
        manifest_path: Some(manifest_path.clone()),
    };

    super::run(args).expect("split should succeed");

    for name in ["200.pdf", "201.pdf", "202.pdf"] {
        assert!(dir.join(name).exists(), "missing output {name}");
    }

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).expect("manifest should exist"))
            .expect("manifest should parse");
    assert_eq!(manifest["sessions_extracted"], 3);
    assert_eq!(manifest["undetected_count"], 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_run_keeps_every_undetected_session_output() {
    let bytes = build_document(&[vec![
        ("Session ABC", 700.0),
        ("Session XYZ", 500.0),
    ]]);

    let dir = scratch_dir("split-undetected");
    let input = dir.join("input.pdf");
    fs::write(&input, &bytes).expect("input should be writable");
    let manifest_path = dir.join("manifest.json");

    let args = SplitArgs {
        input,
        output_dir: dir.clone(),
        recover: false,
        marker: "Sess".to_string(),
        gap: 9.0,
        manifest_path: Some(manifest_path.clone()),
    };

    super::run(args).expect("split should succeed");

    assert!(dir.join("NA.pdf").exists());
    assert!(dir.join("NA-0002.pdf").exists());

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).expect("manifest should exist"))
            .expect("manifest should parse");
    assert_eq!(manifest["sessions_extracted"], 2);
    assert_eq!(manifest["undetected_count"], 2);
    assert_eq!(manifest["sessions"][0]["output_file"], "NA.pdf");
    assert_eq!(manifest["sessions"][1]["output_file"], "NA-0002.pdf");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn split_run_skips_marker_free_interior_pages() {
    let bytes = build_document(&[
        vec![("Session 500", 700.0), ("alpha", 650.0)],
        vec![("continued alpha", 700.0)],
        vec![("Session 501", 700.0)],
    ]);

    let dir = scratch_dir("split-interior");
    let input = dir.join("input.pdf");
    fs::write(&input, &bytes).expect("input should be writable");
    let manifest_path = dir.join("manifest.json");

    let args = SplitArgs {
        input,
        output_dir: dir.clone(),
        recover: false,
        marker: "Sess".to_string(),
        gap: 9.0,
        manifest_path: Some(manifest_path.clone()),
    };

    super::run(args).expect("a marker-free interior page must not fail the run");

    assert!(dir.join("500.pdf").exists());
    assert!(dir.join("501.pdf").exists());

    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(&manifest_path).expect("manifest should exist"))
            .expect("manifest should parse");
    assert_eq!(manifest["sessions_extracted"], 2);
    assert_eq!(manifest["sessions"][0]["label"], "500");
    assert_eq!(manifest["sessions"][0]["start_page"], 1);
    assert_eq!(manifest["sessions"][0]["end_page"], 3);
    assert_eq!(manifest["sessions"][1]["start_page"], 3);
    assert_eq!(manifest["sessions"][1]["end_page"], 3);

    let _ = fs::remove_dir_all(&dir);
}
