//! Line-oriented calibration file grammar:
//!
//! ```text
//! @<tag>
//! <param_name> <value>
//! ```
//!
//! Blank lines and lines starting with `#` are comments. Each `@tag` starts
//! a new section; sections are independent of one another.

use std::collections::HashMap;

pub type Section = HashMap<String, f32>;

/// Splits a calibration file's text into named sections of `name -> value`
/// pairs, in the order they were encountered. Malformed individual lines
/// (missing value, non-numeric value) are skipped rather than failing the
/// whole parse — the caller decides whether a section's contents still make
/// sense once the decode step runs against it.
pub fn parse_sections(text: &str) -> Vec<(String, Section)> {
    let mut sections: Vec<(String, Section)> = Vec::new();

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(tag) = line.strip_prefix('@') {
            sections.push((tag.trim().to_string(), Section::new()));
            continue;
        }

        let mut parts = line.split_whitespace();
        let (Some(name), Some(raw_value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(value) = raw_value.parse::<f32>() else {
            continue;
        };

        if let Some((_, section)) = sections.last_mut() {
            section.insert(name.to_string(), value);
        }
    }

    sections
}

/// Serializes sections back into the on-disk grammar, in a stable order
/// (sections as given, parameters sorted by name within a section) so that
/// `parse(write(parse(text)))` reproduces the same sections.
pub fn write_sections(sections: &[(String, Section)]) -> String {
    let mut out = String::new();
    for (tag, params) in sections {
        out.push('@');
        out.push_str(tag);
        out.push('\n');
        let mut names: Vec<&String> = params.keys().collect();
        names.sort();
        for name in names {
            out.push_str(&format!("{name} {}\n", params[name]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tags_and_params() {
        let text = "# comment\n@magiron\ns01 0.5\nh00 42.475\n\n@magmot\nm2ya 1.0\n";
        let sections = parse_sections(text);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].0, "magiron");
        assert_eq!(sections[0].1.get("s01"), Some(&0.5));
        assert_eq!(sections[1].0, "magmot");
        assert_eq!(sections[1].1.get("m2ya"), Some(&1.0));
    }

    #[test]
    fn skips_malformed_lines() {
        let text = "@magiron\ns01\nbadvalue notanumber\nh00 1.0\n";
        let sections = parse_sections(text);
        assert_eq!(sections[0].1.len(), 1);
        assert_eq!(sections[0].1.get("h00"), Some(&1.0));
    }

    #[test]
    fn truncated_section_yields_partial_params() {
        let text = "@magiron\ns01 0.5\n@magmot\nm2ya 1.0\n";
        let sections = parse_sections(text);
        assert_eq!(sections[0].1.len(), 1);
    }

    #[test]
    fn roundtrips_through_write() {
        let text = "@magiron\nh00 1.5\ns01 0.25\n";
        let parsed = parse_sections(text);
        let written = write_sections(&parsed);
        let reparsed = parse_sections(&written);
        assert_eq!(parsed, reparsed);
    }
}
