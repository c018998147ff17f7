//! Placeholder substitution for the notification title and body.
//!
//! Only `{filename}` and `{elapsed_time}` are recognised. `{{` and `}}` produce
//! literal braces. Anything else in braces is rejected instead of being passed
//! through to the recipient.

use std::sync::OnceLock;

use log::debug;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder {{{name}}} at byte {position}")]
    UnknownPlaceholder { name: String, position: usize },

    #[error("unmatched '{brace}' at byte {position}")]
    UnmatchedBrace { brace: char, position: usize },
}

/// Values substituted into a message template
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub filename: &'a str,
    pub elapsed_time: &'a str,
}

impl<'a> TemplateVars<'a> {
    fn lookup(&self, name: &str) -> Option<&'a str> {
        match name {
            "filename" => Some(self.filename),
            "elapsed_time" => Some(self.elapsed_time),
            _ => None,
        }
    }
}

pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    static CELL: OnceLock<Regex> = OnceLock::new();
    let re = CELL.get_or_init(|| {
        debug!("Compiling regex for message templates");
        Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|\{|\}").expect("failed to compile regex")
    });

    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;
    for captures in re.captures_iter(template) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        result.push_str(&template[last_end..whole.start()]);
        last_end = whole.end();

        match (whole.as_str(), captures.get(1)) {
            ("{{", _) => result.push('{'),
            ("}}", _) => result.push('}'),
            (_, Some(name)) => match vars.lookup(name.as_str()) {
                Some(value) => result.push_str(value),
                None => {
                    return Err(TemplateError::UnknownPlaceholder {
                        name: name.as_str().to_string(),
                        position: whole.start(),
                    })
                }
            },
            (brace, None) => {
                return Err(TemplateError::UnmatchedBrace {
                    brace: brace.chars().next().unwrap_or('{'),
                    position: whole.start(),
                })
            }
        }
    }
    result.push_str(&template[last_end..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const VARS: TemplateVars<'static> = TemplateVars {
        filename: "benchy.gcode",
        elapsed_time: "01:23:45",
    };

    #[rstest]
    #[case("Print job complete", "Print job complete")]
    #[case(
        "{filename} done printing after {elapsed_time}",
        "benchy.gcode done printing after 01:23:45"
    )]
    #[case("{filename}{filename}", "benchy.gcodebenchy.gcode")]
    #[case("{{filename}} is {filename}", "{filename} is benchy.gcode")]
    #[case("literal }} and {{", "literal } and {")]
    #[case("", "")]
    fn renders(#[case] template: &str, #[case] expected: &str) {
        let actual = render(template, &VARS).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn unknown_placeholder_is_rejected() {
        let actual = render("{filename} took {duration}", &VARS).unwrap_err();
        assert_eq!(
            actual,
            TemplateError::UnknownPlaceholder {
                name: "duration".to_string(),
                position: 16,
            }
        );
    }

    #[test]
    fn format_spec_is_not_a_known_placeholder() {
        let actual = render("{filename:>20}", &VARS).unwrap_err();
        assert!(matches!(actual, TemplateError::UnknownPlaceholder { .. }));
    }

    #[rstest]
    #[case("open {filename", '{', 5)]
    #[case("close } here", '}', 6)]
    fn unmatched_brace(#[case] template: &str, #[case] brace: char, #[case] position: usize) {
        let actual = render(template, &VARS).unwrap_err();
        assert_eq!(actual, TemplateError::UnmatchedBrace { brace, position });
    }

    #[test]
    fn error_message_names_placeholder() {
        let err = render("{nope}", &VARS).unwrap_err();
        assert_eq!(err.to_string(), "unknown placeholder {nope} at byte 0");
    }
}
