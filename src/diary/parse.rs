use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Year rules in priority order: an explicitly marked year (`2024年`) beats a
/// positional match, which beats any bare 4-digit run. First acceptable match
/// wins; an out-of-range capture falls through to the next rule.
static YEAR_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d{4})年",
        r"^(\d{4})/",
        r"/(\d{4})/",
        r"(\d{4})[-_]",
        r"(\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("year rule is valid"))
    .collect()
});

/// Rules that capture year and month together, tried before falling back to
/// year-only extraction.
static YEAR_MONTH_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d{4})年(\d{1,2})月",
        r"(\d{4})[/-](\d{1,2})[/-]",
        r"(\d{4})年/(\d{1,2})月",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("year-month rule is valid"))
    .collect()
});

fn year_in_range(year: i32) -> bool {
    (MIN_YEAR..=MAX_YEAR).contains(&year)
}

/// Extract a calendar year from a slash-delimited document path. Returns
/// `None` when no rule yields an in-range year; never errors.
pub fn extract_year(path: &str) -> Option<i32> {
    for rule in YEAR_RULES.iter() {
        if let Some(caps) = rule.captures(path)
            && let Ok(year) = caps[1].parse::<i32>()
            && year_in_range(year)
        {
            return Some(year);
        }
    }
    None
}

/// Extract (year, month) from a document path. When only the year is
/// resolvable the month comes back as `None`.
pub fn extract_year_month(path: &str) -> (Option<i32>, Option<u32>) {
    for rule in YEAR_MONTH_RULES.iter() {
        if let Some(caps) = rule.captures(path)
            && let (Ok(year), Ok(month)) = (caps[1].parse::<i32>(), caps[2].parse::<u32>())
            && year_in_range(year)
            && (1..=12).contains(&month)
        {
            return (Some(year), Some(month));
        }
    }

    (extract_year(path), None)
}

/// One element of a natural sort key: digit runs compare as numbers, text
/// runs compare case-insensitively, and a number always sorts before text at
/// the same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NaturalPart {
    Num(u64),
    Text(String),
}

impl Ord for NaturalPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NaturalPart::Num(a), NaturalPart::Num(b)) => a.cmp(b),
            (NaturalPart::Text(a), NaturalPart::Text(b)) => a.cmp(b),
            (NaturalPart::Num(_), NaturalPart::Text(_)) => Ordering::Less,
            (NaturalPart::Text(_), NaturalPart::Num(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NaturalPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Split `text` into digit and non-digit runs so that "2024年2月" orders
/// before "2024年10月". Digit runs too long for u64 degrade to text.
pub fn natural_key(text: &str) -> Vec<NaturalPart> {
    let mut parts = Vec::new();
    let mut run = String::new();
    let mut run_is_digit = false;

    let mut flush = |run: &mut String, is_digit: bool, parts: &mut Vec<NaturalPart>| {
        if run.is_empty() {
            return;
        }
        let taken = std::mem::take(run);
        if is_digit {
            match taken.parse::<u64>() {
                Ok(n) => parts.push(NaturalPart::Num(n)),
                Err(_) => parts.push(NaturalPart::Text(taken)),
            }
        } else {
            parts.push(NaturalPart::Text(taken.to_lowercase()));
        }
    };

    for ch in text.chars() {
        let is_digit = ch.is_ascii_digit();
        if is_digit != run_is_digit {
            flush(&mut run, run_is_digit, &mut parts);
            run_is_digit = is_digit;
        }
        run.push(ch);
    }
    flush(&mut run, run_is_digit, &mut parts);

    parts
}
