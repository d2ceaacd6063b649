use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractError;

static CLASS_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Class \d+:\s*").unwrap());

/// Split page text into per-class blocks.
///
/// Each block runs from one `Class N:` header up to the next header (or the
/// end of the text) and is trimmed. Text before the first header carries no
/// course data and is dropped.
pub fn split_class_blocks(page_text: &str) -> Vec<&str> {
    let starts: Vec<usize> = CLASS_HEADER_RE
        .find_iter(page_text)
        .map(|m| m.start())
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts.get(i + 1).copied().unwrap_or(page_text.len());
            page_text[start..end].trim()
        })
        .collect()
}

/// Anchored matcher for the `<code> - <description>` line of a class block.
#[derive(Debug, Clone)]
pub struct CoursePattern {
    re: Regex,
}

impl CoursePattern {
    /// The code is matched literally; regex metacharacters in it are escaped.
    pub fn new(code: &str) -> Result<Self, ExtractError> {
        let pattern = format!(r"^\s*{}\s*-", regex::escape(code));
        let re = Regex::new(&pattern).map_err(|source| ExtractError::CoursePattern {
            code: code.to_string(),
            source,
        })?;
        Ok(Self { re })
    }

    /// Only the second line of the block is considered.
    pub fn matches(&self, block: &str) -> bool {
        block
            .trim()
            .split('\n')
            .nth(1)
            .is_some_and(|line| self.re.is_match(line.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_course_code(block: &str, code: &str) -> Result<bool, ExtractError> {
        Ok(CoursePattern::new(code)?.matches(block))
    }

    #[test]
    fn no_header_no_blocks() {
        assert!(split_class_blocks("").is_empty());
        assert!(split_class_blocks("Class Planner\nWinter 2026\nLec 1\nOpen: 3 of 9 Left").is_empty());
        assert!(split_class_blocks("Class one: nothing numbered here").is_empty());
    }

    #[test]
    fn preamble_dropped_and_order_kept() {
        let text = "Plan Summary\nClass 1:\nA - Aero\nLec 1\nClass 2:\n60 - Myth\nLec 1";
        let blocks = split_class_blocks(text);
        assert_eq!(blocks, vec!["Class 1:\nA - Aero\nLec 1", "Class 2:\n60 - Myth\nLec 1"]);
    }

    #[test]
    fn header_case_insensitive() {
        let blocks = split_class_blocks("CLASS 7:\nA - Aero\nclass 8:  \n60 - Myth");
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("CLASS 7:"));
        assert!(blocks[1].starts_with("class 8:"));
    }

    #[test]
    fn blocks_are_trimmed() {
        let blocks = split_class_blocks("  Class 3:\n61 - Calc\n\n   \n");
        assert_eq!(blocks, vec!["Class 3:\n61 - Calc"]);
    }

    #[test]
    fn fixture_blocks() {
        let text = std::fs::read_to_string("tests/fixtures/class_plan.txt").unwrap();
        let blocks = split_class_blocks(&text);
        assert_eq!(blocks.len(), 5);
        for (i, block) in blocks.iter().enumerate() {
            assert!(block.starts_with(&format!("Class {}:", i + 1)));
        }
    }

    #[test]
    fn matches_code_on_second_line() {
        let block = "Class 1:\nA - Introduction to Aerospace Studies\nLec 1";
        assert!(matches_course_code(block, "A").unwrap());
        assert!(matches_course_code("Class 1:\n  A-Aero", "A").unwrap());
        assert!(matches_course_code("Class 1:\nA   -", "A").unwrap());
    }

    #[test]
    fn single_line_block_never_matches() {
        assert!(!matches_course_code("Class 1: A - Aero", "A").unwrap());
    }

    #[test]
    fn code_elsewhere_in_block_ignored() {
        let block = "Class 1:\nB - Biology\nLec 1 A - Room A\nA - decoy";
        assert!(!matches_course_code(block, "A").unwrap());
        let header_only = "Class 61:\nM - Math";
        assert!(!matches_course_code(header_only, "61").unwrap());
    }

    #[test]
    fn no_under_or_over_matching() {
        let sixty = "Class 2:\n60 - Nordic Mythology";
        assert!(!matches_course_code(sixty, "6").unwrap());
        assert!(matches_course_code(sixty, "60").unwrap());
        assert!(!matches_course_code(sixty, "600").unwrap());
        assert!(!matches_course_code("Class 4:\n161 - Topics", "61").unwrap());
    }

    #[test]
    fn case_sensitive_code() {
        assert!(!matches_course_code("Class 1:\na - aero", "A").unwrap());
    }

    #[test]
    fn code_metacharacters_are_literal() {
        let block = "Class 9:\nC++ - Systems Programming";
        assert!(matches_course_code(block, "C++").unwrap());
        assert!(!matches_course_code("Class 9:\nCCC - Other", "C+").unwrap());
        assert!(!matches_course_code("Class 9:\nM1 - Other", "M.").unwrap());
        assert!(matches_course_code("Class 9:\nM. - Dotted", "M.").unwrap());
    }
}
