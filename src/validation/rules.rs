//! Field rules and the candidate values they transform

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use uuid::Uuid;
use validator::ValidateLength;

use super::dates::{localize, parse_form_date, FormDate};
use super::ValidationContext;
use crate::error::{AppError, AppResult};

/// A field value as it moves through its rule chain
#[derive(Debug, Clone, PartialEq)]
pub enum Candidate {
    Absent,
    Text(String),
    List(Vec<String>),
    /// Parsed date without zone, waiting for `LocalizeDate`
    Local(chrono::NaiveDateTime),
    Instant(DateTime<FixedOffset>),
}

impl Candidate {
    fn map_text(self, f: impl Fn(&str) -> String) -> Candidate {
        match self {
            Candidate::Text(s) => Candidate::Text(f(&s)),
            Candidate::List(items) => Candidate::List(items.iter().map(|s| f(s)).collect()),
            other => other,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Candidate::Absent => true,
            Candidate::Text(s) => s.is_empty(),
            Candidate::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Absolute instant, reading zone-less dates as UTC
    pub fn instant(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Candidate::Instant(instant) => Some(*instant),
            Candidate::Local(wall) => Some(Utc.from_utc_datetime(wall).fixed_offset()),
            _ => None,
        }
    }
}

/// One link of a field's rule chain
#[derive(Debug, Clone)]
pub enum Rule {
    /// Strip surrounding whitespace
    Trim,
    /// Replace markup-significant characters with HTML entities
    Escape,
    /// An empty value ends the chain and the field is absent
    Optional,
    /// Coerce a scalar or missing value to a list
    List,
    Required(&'static str),
    Alphanumeric(&'static str),
    /// Value (or every list element) must be an entity id
    Reference(&'static str),
    OneOf(&'static [&'static str], &'static str),
    IsDate(&'static str),
    /// Pin a zone-less date to the client's zone
    LocalizeDate,
    BeforeNow(&'static str),
    AfterNow(&'static str),
}

/// What a rule did with a candidate
#[derive(Debug)]
pub enum Step {
    Continue(Candidate),
    /// Chain ends successfully with this value
    Done(Candidate),
    /// Chain ends with an error; the candidate is kept for echo-back
    Fail(&'static str, Candidate),
}

impl Rule {
    pub fn apply(&self, candidate: Candidate, ctx: &ValidationContext) -> AppResult<Step> {
        let step = match self {
            Rule::Trim => Step::Continue(candidate.map_text(|s| s.trim().to_string())),
            Rule::Escape => Step::Continue(candidate.map_text(escape)),
            Rule::Optional => {
                if candidate.is_empty() {
                    Step::Done(Candidate::Absent)
                } else {
                    Step::Continue(candidate)
                }
            }
            Rule::List => Step::Continue(match candidate {
                Candidate::Absent => Candidate::List(Vec::new()),
                Candidate::Text(s) if s.is_empty() => Candidate::List(Vec::new()),
                Candidate::Text(s) => Candidate::List(vec![s]),
                other => other,
            }),
            Rule::Required(message) => {
                let present = match &candidate {
                    Candidate::Text(s) => s.validate_length(Some(1), None, None),
                    Candidate::List(items) => !items.is_empty(),
                    Candidate::Absent => false,
                    _ => true,
                };
                check(present, message, candidate)
            }
            Rule::Alphanumeric(message) => {
                let ok = match &candidate {
                    Candidate::Text(s) => !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()),
                    _ => true,
                };
                check(ok, message, candidate)
            }
            Rule::Reference(message) => {
                let ok = match &candidate {
                    Candidate::Text(s) => Uuid::parse_str(s).is_ok(),
                    Candidate::List(items) => items.iter().all(|s| Uuid::parse_str(s).is_ok()),
                    _ => true,
                };
                check(ok, message, candidate)
            }
            Rule::OneOf(allowed, message) => {
                let ok = match &candidate {
                    Candidate::Text(s) => allowed.contains(&s.as_str()),
                    _ => true,
                };
                check(ok, message, candidate)
            }
            Rule::IsDate(message) => match &candidate {
                Candidate::Text(s) => match parse_form_date(s) {
                    Some(FormDate::Local(wall)) => Step::Continue(Candidate::Local(wall)),
                    Some(FormDate::Zoned(instant)) => Step::Continue(Candidate::Instant(instant)),
                    None => Step::Fail(message, candidate),
                },
                Candidate::Local(_) | Candidate::Instant(_) => Step::Continue(candidate),
                _ => Step::Fail(message, candidate),
            },
            Rule::LocalizeDate => match candidate {
                Candidate::Local(wall) => {
                    let tz_offset = ctx.tz_offset.ok_or_else(|| {
                        AppError::BadRequest("tzoffset must accompany date fields".to_string())
                    })?;
                    Step::Continue(Candidate::Instant(localize(wall, tz_offset)?))
                }
                other => Step::Continue(other),
            },
            Rule::BeforeNow(message) => {
                let ok = candidate.instant().map_or(true, |at| at <= ctx.now);
                check(ok, message, candidate)
            }
            Rule::AfterNow(message) => {
                let ok = candidate.instant().map_or(true, |at| at > ctx.now);
                check(ok, message, candidate)
            }
        };
        Ok(step)
    }
}

fn check(ok: bool, message: &'static str, candidate: Candidate) -> Step {
    if ok {
        Step::Continue(candidate)
    } else {
        Step::Fail(message, candidate)
    }
}

/// HTML-escape the characters that matter inside markup and attributes
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '/' => escaped.push_str("&#x2F;"),
            '\\' => escaped.push_str("&#x5C;"),
            '`' => escaped.push_str("&#96;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ValidationContext {
        ValidationContext {
            now: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            tz_offset: Some(0),
        }
    }

    fn text(s: &str) -> Candidate {
        Candidate::Text(s.to_string())
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("<b>Tom & \"Jerry\"</b>"), "&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;&#x2F;b&gt;");
        assert_eq!(escape("O'Brien"), "O&#x27;Brien");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_trim_applies_to_list_elements() {
        let step = Rule::Trim
            .apply(Candidate::List(vec![" a ".into(), "b ".into()]), &ctx())
            .unwrap();
        assert!(matches!(step, Step::Continue(Candidate::List(ref v)) if v == &["a", "b"]));
    }

    #[test]
    fn test_list_coercion() {
        let coerce = |c| match Rule::List.apply(c, &ctx()).unwrap() {
            Step::Continue(Candidate::List(items)) => items,
            other => panic!("unexpected {:?}", other),
        };
        assert!(coerce(Candidate::Absent).is_empty());
        assert!(coerce(text("")).is_empty());
        assert_eq!(coerce(text("g1")), vec!["g1"]);
        assert_eq!(coerce(Candidate::List(vec!["g1".into(), "g2".into()])), vec!["g1", "g2"]);
    }

    #[test]
    fn test_optional_short_circuits_empty() {
        assert!(matches!(
            Rule::Optional.apply(text(""), &ctx()).unwrap(),
            Step::Done(Candidate::Absent)
        ));
        assert!(matches!(
            Rule::Optional.apply(text("2024-01-01"), &ctx()).unwrap(),
            Step::Continue(_)
        ));
    }

    #[test]
    fn test_alphanumeric() {
        let rule = Rule::Alphanumeric("bad");
        assert!(matches!(rule.apply(text("Tolkien"), &ctx()).unwrap(), Step::Continue(_)));
        assert!(matches!(rule.apply(text("Le Guin"), &ctx()).unwrap(), Step::Fail("bad", _)));
        assert!(matches!(rule.apply(text("O'Brien"), &ctx()).unwrap(), Step::Fail("bad", _)));
    }

    #[test]
    fn test_reference_rule() {
        let rule = Rule::Reference("bad ref");
        let id = Uuid::new_v4().to_string();
        assert!(matches!(rule.apply(text(&id), &ctx()).unwrap(), Step::Continue(_)));
        assert!(matches!(rule.apply(text("42"), &ctx()).unwrap(), Step::Fail("bad ref", _)));
        assert!(matches!(
            rule.apply(Candidate::List(vec![id, "nope".into()]), &ctx()).unwrap(),
            Step::Fail("bad ref", _)
        ));
    }

    #[test]
    fn test_localize_requires_offset() {
        let local = match Rule::IsDate("bad").apply(text("2024-01-01"), &ctx()).unwrap() {
            Step::Continue(c) => c,
            other => panic!("unexpected {:?}", other),
        };
        let no_offset = ValidationContext { tz_offset: None, ..ctx() };
        assert!(matches!(
            Rule::LocalizeDate.apply(local, &no_offset),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_after_now_and_before_now() {
        let tomorrow = Candidate::Instant(
            Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap().fixed_offset(),
        );
        let yesterday = Candidate::Instant(
            Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap().fixed_offset(),
        );

        assert!(matches!(Rule::AfterNow("past").apply(tomorrow.clone(), &ctx()).unwrap(), Step::Continue(_)));
        assert!(matches!(Rule::AfterNow("past").apply(yesterday.clone(), &ctx()).unwrap(), Step::Fail("past", _)));
        assert!(matches!(Rule::BeforeNow("future").apply(yesterday, &ctx()).unwrap(), Step::Continue(_)));
        assert!(matches!(Rule::BeforeNow("future").apply(tomorrow, &ctx()).unwrap(), Step::Fail("future", _)));
    }
}
