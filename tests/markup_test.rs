//! Integration tests for semantic markup export.

use reslice::encode::{artifact_file_name, to_markup};
use reslice::{detect_kind_from_bytes, ArtifactKind, Exporter, MarkupFlavor, ResumeDocument};

const RESUME_JSON: &str = r#"{
    "personal": {
        "fullName": "Grace Hopper",
        "title": "Rear Admiral",
        "email": "grace@example.com",
        "website": "https://example.com/grace",
        "summary": "Compiler pioneer & educator."
    },
    "experience": [{
        "company": "US Navy",
        "position": "Computer Scientist",
        "startDate": "1943",
        "endDate": "1986",
        "highlights": ["Developed the first compiler", "Popularized <COBOL>"]
    }],
    "education": [{
        "institution": "Yale University",
        "degree": "PhD",
        "field": "Mathematics",
        "startDate": "1930",
        "endDate": "1934"
    }],
    "skills": [{ "name": "COBOL", "level": "Expert" }, { "name": "FLOW-MATIC" }]
}"#;

#[test]
fn test_html_export_from_json() {
    let resume = ResumeDocument::from_json(RESUME_JSON).unwrap();
    let artifact = Exporter::new()
        .export_markup(&resume, MarkupFlavor::Html)
        .unwrap();

    assert_eq!(artifact.file_name, "Grace Hopper.html");
    assert_eq!(artifact.mime_type, "text/html");
    assert_eq!(
        detect_kind_from_bytes(&artifact.bytes).unwrap(),
        ArtifactKind::Markup
    );

    let html = String::from_utf8(artifact.bytes).unwrap();
    assert!(html.contains("<h1>Grace Hopper</h1>"));
    assert!(html.contains("<h2>Rear Admiral</h2>"));
    assert!(html.contains("Compiler pioneer &amp; educator."));
    assert!(html.contains("<li>Popularized &lt;COBOL&gt;</li>"));
    assert!(html.contains("1943 – 1986"));
    assert!(html.contains("<h4>Computer Scientist at US Navy</h4>"));
    assert!(html.contains("<h4>PhD, Mathematics at Yale University</h4>"));
    assert!(!html.contains('\u{2014}'));
    assert!(html.contains("<li>COBOL (Expert)</li>"));
    assert!(html.contains("<li>FLOW-MATIC</li>"));
    assert!(html.contains("href=\"https://example.com/grace\""));
}

#[test]
fn test_section_order() {
    let resume = ResumeDocument::from_json(RESUME_JSON).unwrap();
    let html = to_markup(&resume, MarkupFlavor::Html);

    let summary = html.find("<h3>Summary</h3>").unwrap();
    let experience = html.find("<h3>Experience</h3>").unwrap();
    let education = html.find("<h3>Education</h3>").unwrap();
    let skills = html.find("<h3>Skills</h3>").unwrap();
    assert!(summary < experience && experience < education && education < skills);
}

#[test]
fn test_word_export() {
    let resume = ResumeDocument::from_json(RESUME_JSON).unwrap();
    let artifact = Exporter::new()
        .with_resume_name("hopper_cv")
        .export_markup(&resume, MarkupFlavor::Word)
        .unwrap();

    assert_eq!(artifact.file_name, "hopper_cv.doc");
    assert_eq!(artifact.mime_type, "application/msword");
    let doc = String::from_utf8(artifact.bytes).unwrap();
    assert!(doc.starts_with("<html xmlns:o="));
    assert!(doc.contains("<w:View>Print</w:View>"));
}

#[test]
fn test_empty_resume_omits_sections() {
    let html = to_markup(&ResumeDocument::default(), MarkupFlavor::Html);
    assert!(!html.contains("<h3>"));
    assert!(html.ends_with("</html>\n"));
}

#[test]
fn test_save_markup() {
    let dir = tempfile::tempdir().unwrap();
    let resume = ResumeDocument::from_json(RESUME_JSON).unwrap();
    let artifact = Exporter::new()
        .export_markup(&resume, MarkupFlavor::Html)
        .unwrap();

    let path = artifact.save_in(dir.path()).unwrap();
    assert_eq!(path, dir.path().join("Grace Hopper.html"));
    assert_eq!(
        reslice::detect_kind_from_path(&path).unwrap(),
        ArtifactKind::Markup
    );
}

#[test]
fn test_hostile_file_names() {
    assert_eq!(artifact_file_name(Some("cv/2024"), "doc"), "cv_2024.doc");
    assert_eq!(artifact_file_name(Some("a|b"), "html"), "a_b.html");
}
