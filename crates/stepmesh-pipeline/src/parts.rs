use crate::engine::{Part, RawPart};
use std::collections::HashSet;

/// Turns document labels into unique file stems, in document order.
///
/// Bodies without a usable label are named after their 1-based position
/// (`Part1`, `Part2`, ...). A name that collides with an earlier one gets
/// the first free `_2`, `_3`, ... suffix. Collisions are detected without
/// regard to ASCII case so outputs never overwrite each other on
/// case-insensitive filesystems.
///
/// With reserved suffixes, claiming `name` also claims `name<suffix>` for
/// each of them, so derived files never share a stem with another part.
pub struct PartEnumerator<G> {
    raw: std::vec::IntoIter<RawPart<G>>,
    position: usize,
    reserved: Vec<String>,
    taken: HashSet<String>,
}

impl<G> PartEnumerator<G> {
    pub fn new(raw: Vec<RawPart<G>>) -> Self {
        Self {
            raw: raw.into_iter(),
            position: 0,
            reserved: Vec::new(),
            taken: HashSet::new(),
        }
    }

    pub fn reserving<I, S>(mut self, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reserved = suffixes
            .into_iter()
            .map(|suffix| suffix.as_ref().to_ascii_lowercase())
            .collect();
        self
    }

    fn stems(&self, name: &str) -> Vec<String> {
        let name = name.to_ascii_lowercase();
        let mut stems: Vec<String> = self
            .reserved
            .iter()
            .map(|suffix| format!("{name}{suffix}"))
            .collect();
        stems.push(name);
        stems
    }

    fn claim(&mut self, base: String) -> String {
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        loop {
            let stems = self.stems(&candidate);
            if stems.iter().all(|stem| !self.taken.contains(stem)) {
                self.taken.extend(stems);
                return candidate;
            }
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }
    }
}

impl<G> Iterator for PartEnumerator<G> {
    type Item = Part<G>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.raw.next()?;
        self.position += 1;
        let base = raw
            .label
            .as_deref()
            .and_then(sanitize_name)
            .unwrap_or_else(|| format!("Part{}", self.position));
        let name = self.claim(base);
        Some(Part {
            name,
            geometry: raw.geometry,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl<G> ExactSizeIterator for PartEnumerator<G> {}

/// Makes a document label usable as a file stem. Returns `None` for labels
/// that carry no name.
pub fn sanitize_name(label: &str) -> Option<String> {
    let label = label.trim();
    if label.is_empty() || label.eq_ignore_ascii_case("NONE") {
        return None;
    }

    let cleaned: String = label
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
