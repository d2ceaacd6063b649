#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Lecture,
    Lab,
}

impl SectionKind {
    fn detect(line: &str) -> Option<Self> {
        if starts_with_ci(line, "lec ") {
            Some(Self::Lecture)
        } else if starts_with_ci(line, "lab ") {
            Some(Self::Lab)
        } else {
            None
        }
    }
}

/// A lecture/lab line, with its status line appended when one follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRow {
    pub kind: SectionKind,
    pub text: String,
}

/// Collect lecture and lab rows from a class block.
///
/// The header and course-code lines are skipped. A row absorbs the next line
/// as its status unless that line is blank or starts another section
/// (`Lec`, `Lab` or `Dis`). Discussion rows and stray lines are dropped.
pub fn extract_rows(block: &str) -> Vec<SectionRow> {
    let lines: Vec<&str> = block.trim().split('\n').skip(2).collect();
    let mut rows = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        let Some(kind) = SectionKind::detect(line) else {
            i += 1;
            continue;
        };

        let mut text = line.to_string();
        if let Some(next) = lines.get(i + 1).map(|l| l.trim()) {
            if !next.is_empty() && !starts_section(next) {
                text.push(' ');
                text.push_str(next);
                i += 1;
            }
        }

        rows.push(SectionRow { kind, text });
        i += 1;
    }

    rows
}

fn starts_section(line: &str) -> bool {
    SectionKind::detect(line).is_some() || starts_with_ci(line, "dis ")
}

fn starts_with_ci(line: &str, prefix: &str) -> bool {
    line.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
