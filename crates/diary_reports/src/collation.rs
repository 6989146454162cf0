//! Locale-aware title ordering (German, case-insensitive).
//!
//! Primary comparison folds case and strips diacritics so that "Übelkeit" sorts
//! with the u's, and expands `ß` to `ss`. Titles equal at the primary level are
//! ordered unaccented-before-accented, then lowercase-before-uppercase, which
//! keeps the order total and therefore reproducible between requests.

use std::cmp::Ordering;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Clone, Copy, Debug, Default)]
pub struct TitleCollator;

impl TitleCollator {
    /// Case- and accent-folded sort key.
    pub fn primary_key(&self, title: &str) -> String {
        let mut key = String::with_capacity(title.len());
        for c in title.trim().nfd().filter(|c| !is_combining_mark(*c)) {
            match c {
                'ß' | 'ẞ' => key.push_str("ss"),
                c => key.extend(c.to_lowercase()),
            }
        }
        key
    }

    fn secondary_key(&self, title: &str) -> String {
        title.trim().to_lowercase()
    }

    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.primary_key(a)
            .cmp(&self.primary_key(b))
            .then_with(|| self.secondary_key(a).cmp(&self.secondary_key(b)))
            .then_with(|| b.cmp(a))
    }

    /// Stable sort of `items` by the title `title_of` returns.
    pub fn sort_by_title<T, F>(&self, items: &mut [T], title_of: F)
    where
        F: Fn(&T) -> &str,
    {
        items.sort_by(|a, b| self.compare(title_of(a), title_of(b)));
    }
}
