//! Name normalization and index grouping.
//!
//! Artists are filed by a normalized form of their display name: trimmed,
//! lower-cased and with one leading article removed. The normalized name picks
//! the index group through an ordered list of prefix rules.

pub const DEFAULT_INDEX_GROUPS: &str = "A B C D E F G H I J K L M N O P Q R S T U V W X-Z(XYZ)";
pub const DEFAULT_IGNORED_ARTICLES: &str = "The El La Los Las Le Les Os As O A";

/// Group label for names that match no configured prefix.
pub const FALLBACK_GROUP: &str = "#";

/// Leading words ignored when sorting and grouping artist names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Articles {
    words: Vec<String>,
}

impl Articles {
    /// Parses a space-separated article list, keeping the configured order.
    pub fn parse(list: &str) -> Self {
        let words = list
            .split_whitespace()
            .map(|word| word.to_lowercase())
            .collect();
        Self { words }
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Removes the first matching leading article. The article must be followed by
    /// whitespace, so "Theatre" keeps its name and a bare "The" stays as is.
    pub fn strip<'a>(&self, name: &'a str) -> &'a str {
        for article in &self.words {
            let head = match name.get(..article.len()) {
                Some(head) => head,
                None => continue,
            };
            if head.to_lowercase() != *article {
                continue;
            }
            let rest = &name[article.len()..];
            if rest.starts_with(char::is_whitespace) {
                return rest.trim_start();
            }
        }
        name
    }
}

impl Default for Articles {
    fn default() -> Self {
        Self::parse(DEFAULT_IGNORED_ARTICLES)
    }
}

/// Dedup and grouping key for an artist display name.
pub fn normalize_name(name: &str, articles: &Articles) -> String {
    let lowered = name.trim().to_lowercase();
    articles.strip(&lowered).trim().to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexRule {
    prefix: String,
    label: String,
}

impl IndexRule {
    pub fn new(prefix: &str, label: &str) -> Self {
        Self {
            prefix: prefix.to_lowercase(),
            label: label.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Ordered prefix → label rules. The first matching rule wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexGroups {
    rules: Vec<IndexRule>,
}

impl IndexGroups {
    pub fn new(rules: Vec<IndexRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| !rule.prefix.is_empty())
            .collect();
        Self { rules }
    }

    /// Parses a group definition such as `"A B C X-Z(XYZ)"`.
    ///
    /// A bare token is its own prefix and label. `LABEL(CHARS)` files every
    /// character of `CHARS` under `LABEL`.
    pub fn parse(definition: &str) -> Self {
        let mut rules = Vec::new();
        for token in definition.split_whitespace() {
            match token.split_once('(') {
                Some((label, chars)) if !label.is_empty() => {
                    let chars = chars.strip_suffix(')').unwrap_or(chars);
                    for ch in chars.chars() {
                        rules.push(IndexRule::new(&ch.to_string(), label));
                    }
                }
                _ => rules.push(IndexRule::new(token, token)),
            }
        }
        Self::new(rules)
    }

    pub fn rules(&self) -> &[IndexRule] {
        &self.rules
    }

    /// Group label for an already normalized name.
    pub fn group_for(&self, normalized: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| normalized.starts_with(rule.prefix.as_str()))
            .map(|rule| rule.label.as_str())
            .unwrap_or(FALLBACK_GROUP)
    }
}

impl Default for IndexGroups {
    fn default() -> Self {
        Self::parse(DEFAULT_INDEX_GROUPS)
    }
}
