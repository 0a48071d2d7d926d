use idir_core::{
    course_to_slug, generate_certificate_id, generate_certificate_id_with, id_prefix,
    is_valid_certificate_id, to_segment, CertificateId,
};
use rand::rngs::mock::StepRng;
use regex::Regex;
use std::collections::HashSet;

#[test]
fn scenario_automation_101() {
    let id = generate_certificate_id("Automation 101", &[], 2026).unwrap();
    let re = Regex::new(r"^IDIR-AUTOMATION-101-2026-[0-9A-F]{10}$").unwrap();
    assert!(re.is_match(id.as_str()), "unexpected id {}", id);
    assert_eq!(id.year(), "2026");
}

#[test]
fn deterministic_rng_gives_deterministic_suffix() {
    let mut rng = StepRng::new(0, 0);
    let id = generate_certificate_id_with("Automation 101", &[], 2026, &mut rng).unwrap();
    assert_eq!(id.as_str(), "IDIR-AUTOMATION-101-2026-0000000000");
}

#[test]
fn slug_drops_stop_words_and_keeps_three_words() {
    assert_eq!(course_to_slug("The Art and Science of Python"), "ART-SCIENCE-OF");
    assert_eq!(
        course_to_slug("Introducción a la Programación y Datos"),
        "INTRODUCCION-LA-PROGRAMACION"
    );
    assert_eq!(course_to_slug("  an   or  "), "COURSE");
    assert_eq!(course_to_slug("!!!"), "COURSE");
}

#[test]
fn slug_words_are_capped_at_segment_length() {
    assert_eq!(
        course_to_slug("Supercalifragilisticexpialidocious"),
        "SUPERCALIFRAGILISTIC"
    );
}

#[test]
fn to_segment_collapses_separators_and_truncates() {
    assert_eq!(to_segment("  acme corp / 2026 "), "ACME-CORP-2026");
    assert_eq!(to_segment("Ñandú!!"), "NANDU");
    assert_eq!(to_segment(""), "");
    assert_eq!(to_segment("---"), "");
    assert_eq!(to_segment("abcdefghij klmnopqrs tuvw"), "ABCDEFGHIJ-KLMNOPQRS");
    assert_eq!(to_segment("abcdefghijklmnopqrs tuv"), "ABCDEFGHIJKLMNOPQRS");
}

#[test]
fn explicit_segments_replace_the_course_slug() {
    let segments = vec!["Acme Corp".to_string(), "Cohort 7".to_string()];
    assert_eq!(id_prefix("Automation 101", &segments), "IDIR-ACME-CORP-COHORT-7");

    let blank = vec!["  ".to_string(), "%%".to_string()];
    assert_eq!(id_prefix("Automation 101", &blank), "IDIR-AUTOMATION-101");
}

#[test]
fn every_generated_id_is_valid_and_distinct() {
    let titles = [
        "Automation 101",
        "Introducción a la Programación",
        "",
        "The A An And Or",
        "Rust: ownership & borrowing (advanced)",
    ];
    let mut seen = HashSet::new();
    for title in titles {
        for _ in 0..50 {
            let id = generate_certificate_id(title, &[], 2026).unwrap();
            assert!(is_valid_certificate_id(id.as_str()), "invalid id {}", id);
            assert!(seen.insert(id));
        }
    }
}

#[test]
fn validator_rejects_malformed_ids() {
    assert!(is_valid_certificate_id("IDIR-AUTOMATION-101-2026-0A1B2C3D4E"));
    assert!(is_valid_certificate_id("IDIR-X-2026-FFFFFFFFFF"));

    for bad in [
        "IDIR-AUTOMATION-101-2026-0a1b2c3d4e",
        "IDIR-AUTOMATION-101-226-0A1B2C3D4E",
        "IDIR--2026-0A1B2C3D4E",
        "IDIR-2026-0A1B2C3D4E",
        "IDIR-AUTOMATION--101-2026-0A1B2C3D4E",
        "CERT-AUTOMATION-2026-0A1B2C3D4E",
        "IDIR-automation-2026-0A1B2C3D4E",
        "IDIR-ABCDEFGHIJKLMNOPQRSTU-2026-0A1B2C3D4E",
        "IDIR-AUTOMATION-2026-0A1B2C3D4",
        " IDIR-AUTOMATION-2026-0A1B2C3D4E",
        "",
    ] {
        assert!(!is_valid_certificate_id(bad), "accepted {}", bad);
        assert!(CertificateId::parse(bad).is_err());
    }
}

#[test]
fn out_of_range_year_is_rejected() {
    assert!(generate_certificate_id("Automation 101", &[], 12026).is_err());
}

#[test]
fn certificate_id_deserialization_validates() {
    let ok: Result<CertificateId, _> = serde_json::from_str(r#""IDIR-X-2026-FFFFFFFFFF""#);
    assert!(ok.is_ok());
    let bad: Result<CertificateId, _> = serde_json::from_str(r#""IDIR-x-2026-FFFFFFFFFF""#);
    assert!(bad.is_err());
}

#[test]
fn segments_and_year_are_recoverable_from_an_id() {
    let id = CertificateId::parse("IDIR-ACME-ROBOTICS-2026-0123456789").unwrap();
    assert_eq!(id.segments(), vec!["ACME".to_string(), "ROBOTICS".to_string()]);
    assert_eq!(id.year(), "2026");

    let single = CertificateId::parse("IDIR-COURSE-2024-ABCDEF0123").unwrap();
    assert_eq!(single.segments(), vec!["COURSE".to_string()]);
}
