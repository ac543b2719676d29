//! Patient name resolution from flattened report text.
//!
//! Report headers pack many labelled fields onto a few lines
//! ("Name: Mr. Ravi Kumar Age: 34 Sex: M Lab No: 1182 Referred By: ...").
//! Resolution starts at the first `Name` label and runs the labelled
//! [`NameRule`]s on the text right after it; a later label is only consulted
//! when the earlier one yields nothing usable. The first capture that
//! survives [`clean_name`] is rendered in the configured [`NameCase`].

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// The field label, as a whole word in any case
static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bname\b").expect("valid regex"));

/// Right after a label: optional `:`/`-`, an optional title, then exactly two
/// capitalized words.
static LABELLED_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[:\-]*\s*(?:(?i:mrs|mr|ms|dr)\.?\s*)?([A-Z][a-z]+ [A-Z][a-z]+)")
        .expect("valid regex")
});

/// Right after a label: an optional title, then at most two letter tokens in
/// any case.
static LABELLED_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*[:\-]*\s*(?:(?:mrs|mr|ms|dr)\b\.?\s*)?([a-z][a-z.,']*(?:\s+[a-z][a-z.,']*)?)")
        .expect("valid regex")
});

/// A bare `Mr.`/`Mrs.` title followed by two capitalized words.
static TITLE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:mrs|mr)\b\.?\s+([A-Z][a-z]+ [A-Z][a-z]+)").expect("valid regex")
});

/// Boilerplate that leaks into captured spans: Mr., Mrs., Dr., Lab, Billing,
/// Age, Sex, P. ID, Referred, Report.
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:mrs|mr|dr)\b\.?|\bp\.\s*id\b|\b(?:lab|billing|age|sex|referred|report)\b",
    )
    .expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// How resolved names are rendered (and therefore how folders are named)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum NameCase {
    /// `RAVI KUMAR`; commas become periods
    #[default]
    Upper,
    /// `Ravi Kumar`
    Title,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolverOptions {
    pub case: NameCase,
    /// Also accept a bare "Mr."/"Mrs." title as the label
    pub allow_title_label: bool,
}

/// A single candidate extraction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    LabelledPair,
    LabelledRun,
    TitlePair,
}

impl NameRule {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LabelledPair => "labelled-pair",
            Self::LabelledRun => "labelled-run",
            Self::TitlePair => "title-pair",
        }
    }

    /// Labelled rules only look at the text directly after a `Name` label
    pub fn is_labelled(&self) -> bool {
        !matches!(self, Self::TitlePair)
    }

    /// The raw span this rule captures, before cleanup. For labelled rules
    /// `text` starts right after the label.
    pub fn capture<'t>(&self, text: &'t str) -> Option<&'t str> {
        let pattern = match self {
            Self::LabelledPair => &*LABELLED_PAIR,
            Self::LabelledRun => &*LABELLED_RUN,
            Self::TitlePair => &*TITLE_PAIR,
        };

        pattern
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }
}

/// A resolved patient name, already case-normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientName(String);

impl PatientName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NameResolver {
    rules: Vec<NameRule>,
    case: NameCase,
}

impl NameResolver {
    pub fn new(options: ResolverOptions) -> Self {
        let mut rules = vec![NameRule::LabelledPair, NameRule::LabelledRun];
        if options.allow_title_label {
            rules.push(NameRule::TitlePair);
        }

        Self {
            rules,
            case: options.case,
        }
    }

    pub fn rules(&self) -> &[NameRule] {
        &self.rules
    }

    /// Resolve the patient name, or `None` when no rule yields a usable name
    pub fn resolve(&self, text: &str) -> Option<PatientName> {
        for label in LABEL.find_iter(text) {
            if let Some(name) = self.apply_rules(&text[label.end()..], true) {
                return Some(name);
            }
            tracing::debug!(offset = label.start(), "Label gave no usable name");
        }

        let name = self.apply_rules(text, false);
        if name.is_none() {
            tracing::debug!("No name rule matched");
        }
        name
    }

    fn apply_rules(&self, text: &str, labelled: bool) -> Option<PatientName> {
        for rule in self.rules.iter().filter(|r| r.is_labelled() == labelled) {
            let Some(span) = rule.capture(text) else {
                continue;
            };

            match clean_name(span) {
                Some(cleaned) => {
                    let name = apply_case(&cleaned, self.case);
                    tracing::debug!(rule = rule.name(), raw = span, name = %name, "Resolved patient name");
                    return Some(PatientName(name));
                }
                None => {
                    tracing::debug!(rule = rule.name(), raw = span, "Captured span was not a name");
                }
            }
        }

        None
    }
}

impl Default for NameResolver {
    fn default() -> Self {
        Self::new(ResolverOptions::default())
    }
}

/// Strip boilerplate tokens from a captured span.
///
/// Returns `None` unless at least two words containing letters are left.
pub fn clean_name(span: &str) -> Option<String> {
    let stripped = BOILERPLATE.replace_all(span, " ");
    let collapsed = WHITESPACE.replace_all(&stripped, " ");
    let trimmed = collapsed.trim_matches(|c: char| c.is_whitespace() || ".,:;-'".contains(c));

    let words = trimmed
        .split_whitespace()
        .filter(|word| word.chars().any(char::is_alphabetic))
        .count();

    (words >= 2).then(|| trimmed.to_string())
}

/// Render a cleaned name in the configured case
pub fn apply_case(name: &str, case: NameCase) -> String {
    match case {
        NameCase::Upper => name.to_uppercase().replace(',', "."),
        NameCase::Title => name
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
