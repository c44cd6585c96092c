const MAX_STEM_LEN: usize = 100;
const FALLBACK_STEM: &str = "resume";

/// Builds a header-safe attachment filename from a display title.
///
/// Keeps ASCII letters, digits, `-`, `_` and `.`; every other character
/// becomes `_` and whitespace runs collapse to one space. A trailing `.pdf`
/// in the title is not doubled.
pub fn pdf_filename(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_space = false;

    for c in title.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            stem.push(' ');
            pending_space = false;
        }
        if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
            stem.push(c);
        } else {
            stem.push('_');
        }
    }

    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.truncate(stem.len() - ".pdf".len());
    }

    // stem is pure ASCII here, so byte truncation is safe
    stem.truncate(MAX_STEM_LEN);
    let stem = stem.trim_matches(|c: char| c == '.' || c == ' ');

    if stem.chars().any(|c| c.is_ascii_alphanumeric()) {
        format!("{stem}.pdf")
    } else {
        format!("{FALLBACK_STEM}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_title() {
        assert_eq!(pdf_filename("Jane Doe Resume"), "Jane Doe Resume.pdf");
    }

    #[test]
    fn test_header_breaking_characters_replaced() {
        let name = pdf_filename("Senior \"Eng\" / CV");
        assert_eq!(name, "Senior _Eng_ _ CV.pdf");
        assert!(!name.contains('"'));
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(pdf_filename("  line\nbreak\t\ttab  "), "line break tab.pdf");
    }

    #[test]
    fn test_existing_extension_not_doubled() {
        assert_eq!(pdf_filename("report.PDF"), "report.pdf");
        assert_eq!(pdf_filename("cv.pdf"), "cv.pdf");
    }

    #[test]
    fn test_non_ascii_only_falls_back() {
        assert_eq!(pdf_filename("简历"), "resume.pdf");
        assert_eq!(pdf_filename("   "), "resume.pdf");
        assert_eq!(pdf_filename("..."), "resume.pdf");
    }

    #[test]
    fn test_partial_non_ascii_kept_readable() {
        assert_eq!(pdf_filename("Zoë Müller"), "Zo_ M_ller.pdf");
    }

    #[test]
    fn test_long_title_capped() {
        let name = pdf_filename(&"a".repeat(300));
        assert_eq!(name.len(), MAX_STEM_LEN + ".pdf".len());
    }
}
