use thiserror::Error;

/// Failures inside the availability parser.
///
/// These never leave `parser::get_course_availability`; they are folded into
/// the `ERROR` outcome there.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot build pattern for course code {code:?}: {source}")]
    CoursePattern {
        code: String,
        #[source]
        source: regex::Error,
    },
}
