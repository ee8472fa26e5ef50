use log::debug;
use std::collections::{BTreeMap, HashMap};

use crate::config::DEFAULT_ACRONYMS;

// A piece of a theme: some words, or one of the separators.
#[derive(Eq, PartialEq, Debug, Clone)]
enum Segment {
    Words(String),
    Separator(char),
}

const SEPARATORS: [char; 2] = ['/', '-'];

/// Canonicalizes free-text theme and sponsor labels.
///
/// ```
/// use proposal_records::ThemeNormalizer;
///
/// let normalizer = ThemeNormalizer::default();
/// assert_eq!(normalizer.normalize("  ai/iot   systems"), "AI / IoT Systems");
/// ```
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ThemeNormalizer {
    // Upper-cased acronym -> spelling to render.
    acronyms: HashMap<String, String>,
}

impl ThemeNormalizer {
    pub fn new<S: AsRef<str>>(acronyms: &[S]) -> ThemeNormalizer {
        ThemeNormalizer {
            acronyms: acronyms
                .iter()
                .map(|a| (a.as_ref().to_uppercase(), a.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn normalize(&self, theme: &str) -> String {
        let collapsed = collapse_whitespace(theme);

        let mut segments: Vec<Segment> = Vec::new();
        let mut current = String::new();
        for c in collapsed.chars() {
            if SEPARATORS.contains(&c) {
                segments.push(Segment::Words(std::mem::take(&mut current)));
                segments.push(Segment::Separator(c));
            } else {
                current.push(c);
            }
        }
        segments.push(Segment::Words(current));

        let mut res = String::new();
        for segment in segments.iter() {
            match segment {
                Segment::Words(s) => {
                    let words: Vec<String> =
                        s.split_whitespace().map(|w| self.case_word(w)).collect();
                    res.push_str(&words.join(" "));
                }
                Segment::Separator(c) => {
                    res.push(' ');
                    res.push(*c);
                    res.push(' ');
                }
            }
        }
        collapse_whitespace(&res)
    }

    fn case_word(&self, word: &str) -> String {
        if let Some(acronym) = self.acronyms.get(&word.to_uppercase()) {
            return acronym.clone();
        }
        let mut chars = word.chars();
        match chars.next() {
            Some(c) => {
                // Characters with a multi-character upper case (ß) stay as they are.
                let mut upper = c.to_uppercase();
                let head = match (upper.next(), upper.next()) {
                    (Some(u), None) => u,
                    _ => c,
                };
                let rest = chars.as_str().to_lowercase();
                std::iter::once(head).chain(rest.chars()).collect()
            }
            None => String::new(),
        }
    }
}

impl Default for ThemeNormalizer {
    fn default() -> Self {
        ThemeNormalizer::new(&DEFAULT_ACRONYMS)
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ThemeCount {
    pub theme: String,
    pub count: usize,
}

/// Collects the distinct themes of a column, with the number of rows for each.
///
/// Missing and blank values are skipped. Values are trimmed, and normalized
/// if a normalizer is provided. The themes are sorted.
pub fn catalog_themes<'a, I>(values: I, normalizer: Option<&ThemeNormalizer>) -> Vec<ThemeCount>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for raw in values.into_iter().flatten() {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let theme = match normalizer {
            Some(n) => n.normalize(raw),
            None => raw.to_string(),
        };
        *counts.entry(theme).or_insert(0) += 1;
    }
    debug!("catalog_themes: {} distinct themes", counts.len());
    counts
        .into_iter()
        .map(|(theme, count)| ThemeCount { theme, count })
        .collect()
}
