//! Constraint Planner: rule-based extraction of query filters.
//!
//! Rules run in a fixed order and the first value for a key wins:
//!
//! 1. explicit ISO dates in the question
//! 2. month-year phrases ("December 1997")
//! 3. named periods resolved against ranked fragments: a fragment whose
//!    title the question mentions and whose text carries a date range
//! 4. a bare year outside quoted names ("in 1997")
//!
//! Category, top-N, rank-by and KPI rules read the question only; the KPI
//! formula is taken from the first ranked fragment defining that KPI.
//! Anything unresolved stays absent.

use std::sync::LazyLock;

use chrono::NaiveDate;
use quarry_core::models::{
    ConstraintKey, ConstraintSet, ConstraintSource, ConstraintValue, RankedFragmentSet,
};
use regex::Regex;
use tracing::debug;

/// Product categories of the dataset, in catalog order.
pub const CATEGORIES: &[&str] = &[
    "Beverages",
    "Condiments",
    "Confections",
    "Dairy Products",
    "Grains/Cereals",
    "Meat/Poultry",
    "Produce",
    "Seafood",
];

const MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
    ("jan", 1),
    ("feb", 2),
    ("mar", 3),
    ("apr", 4),
    ("jun", 6),
    ("jul", 7),
    ("aug", 8),
    ("sep", 9),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("dec", 12),
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
];

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4}-\d{2}-\d{2})\b").expect("iso date regex is valid"));

static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{4}-\d{2}-\d{2})\s*(?:to|through|until|-|–)\s*(\d{4}-\d{2}-\d{2})")
        .expect("date range regex is valid")
});

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([a-z]{3,9})\.?\s+((?:19|20)\d{2})\b").expect("month year regex is valid")
});

static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year regex is valid"));

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).expect("quoted regex is valid"));

static TOP_N: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\btop[\s-]+(\d+|one|two|three|four|five|six|seven|eight|nine|ten)\b")
        .expect("top n regex is valid")
});

static RANK_BY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bby\s+(?:total\s+|gross\s+)?(revenue|quantity|margin|sales|orders)\b")
        .expect("rank by regex is valid")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct ConstraintPlanner;

impl ConstraintPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Collect constraints from the question and from `fragments` in rank
    /// order. The first date range found wins: explicit dates, then month
    /// and year, then a named period from a fragment, then a bare year.
    pub fn plan(&self, question: &str, fragments: &RankedFragmentSet) -> ConstraintSet {
        let mut set = ConstraintSet::new();
        let unquoted = mask_quoted(question);

        explicit_dates(question, &mut set);
        month_year(&unquoted, &mut set);
        named_period(question, fragments, &mut set);
        bare_year(&unquoted, &mut set);

        category(question, &unquoted, &mut set);
        top_n(question, &mut set);
        if let Some(c) = RANK_BY.captures(question) {
            set.insert(
                ConstraintKey::RankBy,
                ConstraintValue::Text(c[1].to_ascii_lowercase()),
                ConstraintSource::Question,
            );
        }
        kpi(question, fragments, &mut set);

        debug!(constraints = set.len(), "constraints planned");
        set
    }
}

fn insert_range(set: &mut ConstraintSet, start: NaiveDate, end: NaiveDate, source: ConstraintSource) {
    if set.contains(ConstraintKey::DateStart) || set.contains(ConstraintKey::DateEnd) || end < start {
        return;
    }
    set.insert(ConstraintKey::DateStart, ConstraintValue::Date(start), source.clone());
    set.insert(ConstraintKey::DateEnd, ConstraintValue::Date(end), source);
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn explicit_dates(question: &str, set: &mut ConstraintSet) {
    let dates: Vec<NaiveDate> = ISO_DATE
        .captures_iter(question)
        .filter_map(|c| parse_date(&c[1]))
        .collect();
    match dates.as_slice() {
        [] => {}
        [single] => insert_range(set, *single, *single, ConstraintSource::Question),
        [first, second, ..] => {
            let (start, end) = if first <= second { (*first, *second) } else { (*second, *first) };
            insert_range(set, start, end, ConstraintSource::Question);
        }
    }
}

fn month_year(text: &str, set: &mut ConstraintSet) {
    for c in MONTH_YEAR.captures_iter(text) {
        let name = c[1].to_ascii_lowercase();
        let Some(month) = MONTHS.iter().find(|(m, _)| *m == name).map(|(_, n)| *n) else {
            continue;
        };
        let Ok(year) = c[2].parse::<i32>() else {
            continue;
        };
        if let Some((start, end)) = month_bounds(year, month) {
            insert_range(set, start, end, ConstraintSource::Question);
            return;
        }
    }
}

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

fn named_period(question: &str, fragments: &RankedFragmentSet, set: &mut ConstraintSet) {
    let q = question.to_lowercase();
    for ranked in fragments.iter() {
        let title = ranked.fragment.title().to_lowercase();
        if title.is_empty() || !q.contains(&title) {
            continue;
        }
        let Some(c) = DATE_RANGE.captures(&ranked.fragment.text) else {
            continue;
        };
        if let (Some(start), Some(end)) = (parse_date(&c[1]), parse_date(&c[2])) {
            debug!(fragment = %ranked.fragment.id(), %start, %end, "named period resolved");
            insert_range(set, start, end, ConstraintSource::Fragment(ranked.fragment.id()));
            return;
        }
    }
}

fn bare_year(text: &str, set: &mut ConstraintSet) {
    let without_dates = ISO_DATE.replace_all(text, " ");
    if let Some(c) = YEAR.captures(&without_dates) {
        if let Ok(year) = c[1].parse::<i32>() {
            if let (Some(start), Some(end)) = (
                NaiveDate::from_ymd_opt(year, 1, 1),
                NaiveDate::from_ymd_opt(year, 12, 31),
            ) {
                insert_range(set, start, end, ConstraintSource::Question);
            }
        }
    }
}

/// A quoted category name, else the first category named outside quotes.
fn category(question: &str, unquoted: &str, set: &mut ConstraintSet) {
    let quoted = QUOTED.captures_iter(question).find_map(|c| {
        let inner = c.get(1).or_else(|| c.get(2))?.as_str().trim();
        CATEGORIES.iter().find(|cat| cat.eq_ignore_ascii_case(inner))
    });
    let found = quoted.or_else(|| {
        let lower = unquoted.to_lowercase();
        CATEGORIES
            .iter()
            .filter_map(|cat| find_word(&lower, &cat.to_lowercase()).map(|pos| (pos, cat)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, cat)| cat)
    });
    if let Some(cat) = found {
        set.insert(
            ConstraintKey::CategoryFilter,
            ConstraintValue::Text((*cat).to_string()),
            ConstraintSource::Question,
        );
    }
}

fn top_n(question: &str, set: &mut ConstraintSet) {
    let Some(c) = TOP_N.captures(question) else {
        return;
    };
    let raw = c[1].to_ascii_lowercase();
    let n = raw.parse::<u32>().ok().or_else(|| {
        NUMBER_WORDS
            .iter()
            .find(|(w, _)| *w == raw)
            .map(|(_, n)| *n)
    });
    if let Some(n) = n.filter(|n| *n > 0) {
        set.insert(ConstraintKey::TopN, ConstraintValue::Count(n), ConstraintSource::Question);
    }
}

fn kpi(question: &str, fragments: &RankedFragmentSet, set: &mut ConstraintSet) {
    let q = question.to_ascii_lowercase();
    let (name, markers): (&str, &[&str]) = if find_word(&q, "aov").is_some() || q.contains("average order value") {
        ("aov", &["aov", "average order value"])
    } else if q.contains("margin") {
        ("gross margin", &["gross margin", "gm"])
    } else {
        return;
    };
    set.insert(ConstraintKey::Kpi, ConstraintValue::Text(name.to_string()), ConstraintSource::Question);

    for ranked in fragments.iter() {
        let title = ranked.fragment.title().to_ascii_lowercase();
        let formula = ranked.fragment.text.lines().find(|line| {
            let l = line.to_ascii_lowercase();
            l.contains('=') && markers.iter().any(|m| find_word(&l, m).is_some() || find_word(&title, m).is_some())
        });
        if let Some(line) = formula {
            let formula = line.trim().trim_start_matches(['-', '*']).trim().to_string();
            set.insert(
                ConstraintKey::KpiFormula,
                ConstraintValue::Text(formula),
                ConstraintSource::Fragment(ranked.fragment.id()),
            );
            return;
        }
    }
}

/// Replace quoted spans with spaces so names inside them are not read as
/// filters.
fn mask_quoted(text: &str) -> String {
    QUOTED
        .replace_all(text, |c: &regex::Captures| " ".repeat(c[0].len()))
        .into_owned()
}

fn find_word(haystack: &str, word: &str) -> Option<usize> {
    haystack.match_indices(word).map(|(i, _)| i).find(|&i| {
        let before = haystack[..i].chars().next_back();
        let after = haystack[i + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
