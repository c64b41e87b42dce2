use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::AnalyseError;

/// Splits a raw capture line into its key and the opaque remainder.
///
/// Trailing line terminators are dropped first. A line without the separator
/// is all key with an empty remainder; a blank line yields `None`.
pub fn split_line<'a>(line: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    Some(line.split_once(separator).unwrap_or((line, "")))
}

/// Distinct remainders per key, both in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct TopicGroups {
    index: HashMap<String, usize>,
    entries: Vec<(String, Vec<String>)>,
    messages: usize,
}

impl TopicGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I, separator: &str) -> Self
        where
            I: IntoIterator<Item = S>,
            S: AsRef<str>,
    {
        let mut groups = Self::new();
        for line in lines {
            if let Some((key, remainder)) = split_line(line.as_ref(), separator) {
                groups.insert(key, remainder);
            }
        }
        groups
    }

    pub fn from_file<P: AsRef<Path>>(path: P, separator: &str) -> Result<Self, AnalyseError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| AnalyseError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_lines(raw.lines(), separator))
    }

    /// Returns `false` when the remainder was already recorded for this key.
    pub fn insert(&mut self, key: &str, remainder: &str) -> bool {
        self.messages += 1;

        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.entries.push((key.to_string(), Vec::new()));
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        let values = &mut self.entries[slot].1;
        if values.iter().any(|v| v == remainder) {
            return false;
        }
        values.push(remainder.to_string());
        true
    }

    /// Drops every key containing `marker` and returns how many were dropped.
    ///
    /// Only keys are inspected: noise-looking payloads under an ordinary key
    /// are kept.
    pub fn remove_noise(&mut self, marker: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| !key.contains(marker));

        self.index = self.entries
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();

        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!("dropped {} noise keys", removed);
        }
        removed
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.index.get(key).map(|&slot| self.entries[slot].1.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(key, values)| (key.as_str(), values.as_slice()))
    }

    /// Keys in lexical order, for reports.
    pub fn sorted(&self) -> Vec<(&str, &[String])> {
        let mut entries = self.iter().collect::<Vec<_>>();
        entries.sort_by_key(|(key, _)| *key);
        entries
    }

    /// Lines seen so far, duplicates and noise included.
    pub fn messages(&self) -> usize {
        self.messages
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for TopicGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}

/// One `<count> <key> <values>` line per key, sorted by key.
impl fmt::Display for TopicGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} messages, {} keys", self.messages, self.entries.len())?;
        for (key, values) in self.sorted() {
            writeln!(f, "{} {} {:?}", values.len(), key, values)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line() {
        assert_eq!(split_line("k1 a b\n", " "), Some(("k1", "a b")));
        assert_eq!(split_line("lonely\r\n", " "), Some(("lonely", "")));
        assert_eq!(split_line("  \n", " "), None);
    }

    #[test]
    fn test_group_dedup_and_noise() {
        let mut groups = TopicGroups::from_lines(["k1 a\n", "k1 b\n", "k1 a\n", "noise1 z\n"], " ");
        assert_eq!(groups.len(), 2);

        let removed = groups.remove_noise("noise");
        assert_eq!(removed, 1);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.get("k1"), Some(&["a".to_string(), "b".to_string()][..]));
        assert_eq!(groups.get("noise1"), None);
    }

    #[test]
    fn test_noise_payload_under_plain_key_is_kept() {
        let mut groups = TopicGroups::from_lines(["sensor/3 noise burst"], " ");
        groups.remove_noise("noise");

        assert_eq!(groups.get("sensor/3"), Some(&["noise burst".to_string()][..]));
    }

    #[test]
    fn test_empty_and_all_noise_input() {
        let mut empty = TopicGroups::from_lines(Vec::<String>::new(), " ");
        empty.remove_noise("noise");
        assert!(empty.is_empty());

        let mut noisy = TopicGroups::from_lines(["noise/a 1", "noise/b 2", "x-noise 3"], " ");
        assert_eq!(noisy.remove_noise("noise"), 3);
        assert!(noisy.is_empty());
    }

    #[test]
    fn test_insert_after_noise_removal_keeps_index_consistent() {
        let mut groups = TopicGroups::from_lines(["noise a", "k1 a", "k2 b"], " ");
        groups.remove_noise("noise");

        assert!(groups.insert("k2", "c"));
        assert!(!groups.insert("k1", "a"));
        assert_eq!(groups.get("k2"), Some(&["b".to_string(), "c".to_string()][..]));
    }

    #[test]
    fn test_serialize_in_first_appearance_order() {
        let mut groups = TopicGroups::from_lines(["zz 1", "aa 2", "zz 3", "noise 4"], " ");
        groups.remove_noise("noise");

        let json = serde_json::to_string(&groups).unwrap();
        assert_eq!(json, r#"{"zz":["1","3"],"aa":["2"]}"#);
    }

    #[test]
    fn test_text_report_is_sorted_by_key() {
        let mut groups = TopicGroups::from_lines(["zz 1", "aa 2", "zz 3", "zz 1", "noise 4"], " ");
        groups.remove_noise("noise");

        assert_eq!(groups.messages(), 5);
        assert_eq!(groups.to_string(), "5 messages, 2 keys\n1 aa [\"2\"]\n2 zz [\"1\", \"3\"]\n");
    }
}
