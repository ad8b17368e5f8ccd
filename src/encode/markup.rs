//! Semantic markup export (plain HTML or Word-compatible HTML).

use crate::resume::{date_range, ResumeDocument};
use std::fmt::Write;

/// Markup dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupFlavor {
    /// Standalone HTML page
    #[default]
    Html,
    /// HTML with Office namespaces, opened by Word as a document
    Word,
}

impl MarkupFlavor {
    /// File extension.
    pub fn extension(&self) -> &'static str {
        match self {
            MarkupFlavor::Html => "html",
            MarkupFlavor::Word => "doc",
        }
    }

    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        match self {
            MarkupFlavor::Html => "text/html",
            MarkupFlavor::Word => "application/msword",
        }
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Render the resume as markup.
pub fn to_markup(resume: &ResumeDocument, flavor: MarkupFlavor) -> String {
    let mut out = String::new();
    let personal = &resume.personal;
    let name = escape_html(personal.full_name.trim());

    match flavor {
        MarkupFlavor::Html => out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n"),
        MarkupFlavor::Word => out.push_str(
            "<html xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
             xmlns:w=\"urn:schemas-microsoft-com:office:word\" \
             xmlns=\"http://www.w3.org/TR/REC-html40\">\n",
        ),
    }
    out.push_str("<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", name);
    if flavor == MarkupFlavor::Word {
        out.push_str(
            "<!--[if gte mso 9]><xml><w:WordDocument><w:View>Print</w:View>\
             <w:Zoom>100</w:Zoom></w:WordDocument></xml><![endif]-->\n",
        );
    }
    out.push_str("</head>\n<body>\n");

    let _ = writeln!(out, "<h1>{}</h1>", name);
    if let Some(title) = non_empty(&personal.title) {
        let _ = writeln!(out, "<h2>{}</h2>", escape_html(title));
    }

    let contact: Vec<String> = [
        non_empty(&personal.email).map(|e| {
            format!(
                "<a href=\"mailto:{0}\">{0}</a>",
                escape_html(e)
            )
        }),
        non_empty(&personal.phone).map(escape_html),
        non_empty(&personal.location).map(escape_html),
        non_empty(&personal.website)
            .map(|w| format!("<a href=\"{0}\">{0}</a>", escape_html(w))),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !contact.is_empty() {
        let _ = writeln!(out, "<p>{}</p>", contact.join(" | "));
    }

    if let Some(summary) = non_empty(&personal.summary) {
        let _ = writeln!(out, "<h3>Summary</h3>\n<p>{}</p>", escape_html(summary));
    }

    if !resume.experience.is_empty() {
        out.push_str("<h3>Experience</h3>\n");
        for job in &resume.experience {
            let _ = writeln!(
                out,
                "<h4>{} at {}</h4>",
                escape_html(&job.position),
                escape_html(&job.company)
            );
            let mut meta = date_range(&job.start_date, job.end_date.as_deref());
            if let Some(location) = non_empty(&job.location) {
                meta.push_str(", ");
                meta.push_str(location);
            }
            let _ = writeln!(out, "<p><em>{}</em></p>", escape_html(&meta));
            if let Some(description) = non_empty(&job.description) {
                let _ = writeln!(out, "<p>{}</p>", escape_html(description));
            }
            if !job.highlights.is_empty() {
                out.push_str("<ul>\n");
                for highlight in &job.highlights {
                    let _ = writeln!(out, "<li>{}</li>", escape_html(highlight));
                }
                out.push_str("</ul>\n");
            }
        }
    }

    if !resume.education.is_empty() {
        out.push_str("<h3>Education</h3>\n");
        for school in &resume.education {
            let degree = match non_empty(&school.field) {
                Some(field) => format!("{}, {}", school.degree, field),
                None => school.degree.clone(),
            };
            let _ = writeln!(
                out,
                "<h4>{} at {}</h4>",
                escape_html(&degree),
                escape_html(&school.institution)
            );
            let _ = writeln!(
                out,
                "<p><em>{}</em></p>",
                escape_html(&date_range(&school.start_date, school.end_date.as_deref()))
            );
            if let Some(description) = non_empty(&school.description) {
                let _ = writeln!(out, "<p>{}</p>", escape_html(description));
            }
        }
    }

    if !resume.skills.is_empty() {
        out.push_str("<h3>Skills</h3>\n<ul>\n");
        for skill in &resume.skills {
            match non_empty(&skill.level) {
                Some(level) => {
                    let _ = writeln!(
                        out,
                        "<li>{} ({})</li>",
                        escape_html(&skill.name),
                        escape_html(level)
                    );
                }
                None => {
                    let _ = writeln!(out, "<li>{}</li>", escape_html(&skill.name));
                }
            }
        }
        out.push_str("</ul>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}
