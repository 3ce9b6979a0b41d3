//! Validation and normalization of form submissions.
//!
//! Each entity kind declares a [`FormRules`] table: an ordered rule chain per
//! field plus cross-field rules. Every field chain runs, so all failures are
//! collected; inside one chain the first failure ends that field. Cross-field
//! rules only see fields whose own chains passed.

pub mod dates;
pub mod rules;

use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use crate::error::{AppError, AppResult};

pub use rules::{Candidate, Rule};

/// Name of the form field carrying the client's timezone offset in minutes
pub const TZ_OFFSET_FIELD: &str = "tzoffset";

/// An incoming form: field name to one or more raw values, in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: IndexMap<String, Vec<String>>,
}

impl Submission {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in pairs {
            fields.entry(key.into()).or_default().push(value.into());
        }
        Self { fields }
    }

    /// First value of a field
    pub fn single(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn candidate(&self, field: &str) -> Candidate {
        match self.fields.get(field).map(Vec::as_slice) {
            None | Some([]) => Candidate::Absent,
            Some([value]) => Candidate::Text(value.clone()),
            Some(values) => Candidate::List(values.to_vec()),
        }
    }

    /// Client offset from UTC in minutes (`getTimezoneOffset` convention).
    /// Missing is `None`; present but malformed is a bad request.
    pub fn tz_offset(&self) -> AppResult<Option<i32>> {
        let Some(raw) = self.single(TZ_OFFSET_FIELD).map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let offset: i32 = raw
            .parse()
            .map_err(|_| AppError::BadRequest(format!("tzoffset must be an integer, got {:?}", raw)))?;
        if offset.abs() > dates::MAX_OFFSET_MINUTES {
            return Err(AppError::BadRequest(format!("tzoffset {} is out of range", offset)));
        }
        Ok(Some(offset))
    }
}

/// Clock and client zone for one submission
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    pub now: DateTime<Utc>,
    pub tz_offset: Option<i32>,
}

impl ValidationContext {
    pub fn for_submission(submission: &Submission, now: DateTime<Utc>) -> AppResult<Self> {
        Ok(Self {
            now,
            tz_offset: submission.tz_offset()?,
        })
    }
}

/// A field-level validation failure, shown next to the field on redisplay
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Ordered rule chain for one form field
#[derive(Debug, Clone)]
pub struct FieldRules {
    pub field: &'static str,
    pub rules: Vec<Rule>,
}

/// Rule spanning two fields
#[derive(Debug, Clone)]
pub enum CrossRule {
    /// `field` must not be earlier than `other` when both are dates
    NotBefore {
        field: &'static str,
        other: &'static str,
        message: &'static str,
    },
}

/// The rule table for one entity kind
#[derive(Debug, Clone, Default)]
pub struct FormRules {
    fields: Vec<FieldRules>,
    cross: Vec<CrossRule>,
}

impl FormRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: &'static str, rules: Vec<Rule>) -> Self {
        self.fields.push(FieldRules { field, rules });
        self
    }

    pub fn cross(mut self, rule: CrossRule) -> Self {
        self.cross.push(rule);
        self
    }

    /// Run every field chain, then the cross-field rules.
    ///
    /// Only a missing client offset for a submitted date (or a malformed one)
    /// is an `Err`; field failures are reported inside [`Validated`].
    pub fn run(&self, submission: &Submission, ctx: &ValidationContext) -> AppResult<Validated> {
        let mut values = IndexMap::new();
        let mut errors = Vec::new();

        for FieldRules { field, rules } in &self.fields {
            let mut candidate = submission.candidate(field);
            for rule in rules {
                match rule.apply(candidate, ctx)? {
                    rules::Step::Continue(next) => candidate = next,
                    rules::Step::Done(last) => {
                        candidate = last;
                        break;
                    }
                    rules::Step::Fail(message, last) => {
                        errors.push(FieldError::new(field, message));
                        candidate = last;
                        break;
                    }
                }
            }
            values.insert(*field, candidate);
        }

        let mut validated = Validated { values, errors };
        for rule in &self.cross {
            match rule {
                CrossRule::NotBefore { field, other, message } => {
                    if validated.has_error(field) || validated.has_error(other) {
                        continue;
                    }
                    if let (Some(later), Some(earlier)) = (validated.instant(field), validated.instant(other)) {
                        if later < earlier {
                            validated.errors.push(FieldError::new(field, message));
                        }
                    }
                }
            }
        }

        Ok(validated)
    }
}

/// Normalized field values plus every failure found
#[derive(Debug, Clone)]
pub struct Validated {
    values: IndexMap<&'static str, Candidate>,
    errors: Vec<FieldError>,
}

impl Validated {
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_error(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Text value; lists are joined and non-text values read as empty
    pub fn text(&self, field: &str) -> String {
        match self.values.get(field) {
            Some(Candidate::Text(s)) => s.clone(),
            Some(Candidate::List(items)) => items.join(","),
            _ => String::new(),
        }
    }

    pub fn list(&self, field: &str) -> Vec<String> {
        match self.values.get(field) {
            Some(Candidate::List(items)) => items.clone(),
            Some(Candidate::Text(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn instant(&self, field: &str) -> Option<DateTime<FixedOffset>> {
        self.values.get(field).and_then(Candidate::instant)
    }
}

/// A not-yet-persisted entity built from a submission
pub trait Draft: Sized {
    fn rules() -> &'static FormRules;

    fn from_validated(values: &Validated) -> Self;
}

/// Outcome of validating a submission into a draft
#[derive(Debug, Clone)]
pub enum Checked<D> {
    Valid(D),
    /// The draft holds whatever parsed, for redisplay with the errors
    Invalid { draft: D, errors: Vec<FieldError> },
}

/// Validate a submission against the draft's rule table
pub fn check<D: Draft>(submission: &Submission, ctx: &ValidationContext) -> AppResult<Checked<D>> {
    let validated = D::rules().run(submission, ctx)?;
    let draft = D::from_validated(&validated);
    if validated.errors.is_empty() {
        Ok(Checked::Valid(draft))
    } else {
        Ok(Checked::Invalid {
            draft,
            errors: validated.errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> ValidationContext {
        ValidationContext {
            now: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            tz_offset: Some(0),
        }
    }

    fn lifespan_rules() -> FormRules {
        FormRules::new()
            .field("name", vec![Rule::Trim, Rule::Required("Name required"), Rule::Escape])
            .field(
                "born",
                vec![Rule::Optional, Rule::IsDate("Invalid born"), Rule::LocalizeDate, Rule::BeforeNow("Born in future")],
            )
            .field(
                "died",
                vec![Rule::Optional, Rule::IsDate("Invalid died"), Rule::LocalizeDate, Rule::BeforeNow("Died in future")],
            )
            .cross(CrossRule::NotBefore {
                field: "died",
                other: "born",
                message: "Died before born",
            })
    }

    #[test]
    fn test_repeated_keys_become_lists() {
        let submission = Submission::from_pairs([("genre", "a"), ("title", "Dune"), ("genre", "b")]);
        assert_eq!(submission.candidate("genre"), Candidate::List(vec!["a".into(), "b".into()]));
        assert_eq!(submission.candidate("title"), Candidate::Text("Dune".into()));
        assert_eq!(submission.candidate("missing"), Candidate::Absent);
        assert_eq!(submission.single("genre"), Some("a"));
    }

    #[test]
    fn test_tz_offset_parsing() {
        assert_eq!(Submission::from_pairs([("tzoffset", "-120")]).tz_offset().unwrap(), Some(-120));
        assert_eq!(Submission::from_pairs([("tzoffset", "")]).tz_offset().unwrap(), None);
        assert_eq!(Submission::default().tz_offset().unwrap(), None);
        assert!(Submission::from_pairs([("tzoffset", "abc")]).tz_offset().is_err());
        assert!(Submission::from_pairs([("tzoffset", "5000")]).tz_offset().is_err());
    }

    #[test]
    fn test_collects_errors_from_every_field() {
        let submission = Submission::from_pairs([("name", "  "), ("born", "yesterday"), ("died", "2999-01-01")]);
        let validated = lifespan_rules().run(&submission, &ctx()).unwrap();

        let fields: Vec<_> = validated.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "born", "died"]);
        assert_eq!(validated.errors()[0].message, "Name required");
    }

    #[test]
    fn test_cross_rule_ordering() {
        let run = |born: &str, died: &str| {
            let submission = Submission::from_pairs([("name", "x"), ("born", born), ("died", died)]);
            lifespan_rules().run(&submission, &ctx()).unwrap()
        };

        let reversed = run("1950-01-02", "1950-01-01");
        assert_eq!(reversed.errors(), &[FieldError::new("died", "Died before born")]);

        assert!(run("1950-01-01", "1950-01-01").errors().is_empty());
        assert!(run("1950-01-01", "2000-01-01").errors().is_empty());
        assert!(run("", "1950-01-01").errors().is_empty());
        assert!(run("1950-01-01", "").errors().is_empty());
    }

    #[test]
    fn test_cross_rule_skipped_when_field_failed() {
        let submission = Submission::from_pairs([("name", "x"), ("born", "2000-01-01"), ("died", "1990-13-40")]);
        let validated = lifespan_rules().run(&submission, &ctx()).unwrap();
        assert_eq!(validated.errors(), &[FieldError::new("died", "Invalid died")]);
    }

    #[test]
    fn test_date_without_offset_is_rejected() {
        let submission = Submission::from_pairs([("name", "x"), ("born", "1950-01-01")]);
        let no_offset = ValidationContext { tz_offset: None, ..ctx() };
        assert!(matches!(
            lifespan_rules().run(&submission, &no_offset),
            Err(AppError::BadRequest(_))
        ));

        // No date submitted, no offset needed
        let submission = Submission::from_pairs([("name", "x")]);
        assert!(lifespan_rules().run(&submission, &no_offset).is_ok());
    }

    #[test]
    fn test_sanitized_values_are_kept() {
        let submission = Submission::from_pairs([("name", "  <i>Bob</i> ")]);
        let validated = lifespan_rules().run(&submission, &ctx()).unwrap();
        assert_eq!(validated.text("name"), "&lt;i&gt;Bob&lt;&#x2F;i&gt;");
        assert_eq!(validated.instant("born"), None);
    }
}
