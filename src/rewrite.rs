//! Randomized phrase substitution for feed content.
//!
//! A [`ContentTransformer`] holds an ordered table of rules. Each rule maps a
//! source word or phrase to candidate replacements; every whole-word,
//! case-insensitive occurrence is replaced by a candidate drawn uniformly at
//! random, independently per occurrence. Rules run in table order over the
//! output of the previous rule, so a later rule can rewrite text an earlier
//! rule introduced.
//!
//! The random source is a parameter, which lets tests pass a seeded
//! [`rand::rngs::StdRng`].

use rand::Rng;
use regex::{Captures, Regex, RegexBuilder};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Rewrite rule has an empty source phrase")]
    EmptyWord,

    #[error("Rewrite rule for '{0}' has no replacements")]
    NoReplacements(String),

    #[error("Invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// One entry of the transformation table, as written in the config file:
///
/// ```toml
/// [[rewrite_rules]]
/// word = "fast"
/// replacements = ["quick", "rapid"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RewriteRule {
    pub word: String,
    pub replacements: Vec<String>,
}

impl RewriteRule {
    pub fn new(word: &str, replacements: &[&str]) -> Self {
        Self {
            word: word.to_string(),
            replacements: replacements.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// The built-in table used when the config file does not define one.
pub fn default_rules() -> Vec<RewriteRule> {
    vec![
        RewriteRule::new("is", &["is a", "is actually"]),
        RewriteRule::new("are", &["are often", "are in fact"]),
        RewriteRule::new("to", &["to", "in order to"]),
        RewriteRule::new("for", &["for", "for the purpose of"]),
        RewriteRule::new("guide", &["complete guide", "ultimate guide", "tutorial"]),
        RewriteRule::new("best", &["top", "finest", "recommended"]),
        RewriteRule::new("tips", &["tricks", "strategies", "advice"]),
        RewriteRule::new("how to", &["how you can", "a guide on how to"]),
        RewriteRule::new("easy", &["simple", "straightforward"]),
        RewriteRule::new("fast", &["quick", "rapid"]),
    ]
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    replacements: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ContentTransformer {
    rules: Vec<CompiledRule>,
}

impl ContentTransformer {
    /// Compiles `rules` into whole-word, case-insensitive patterns.
    ///
    /// # Errors
    ///
    /// - [`TransformError::EmptyWord`] if a rule's source phrase is blank
    /// - [`TransformError::NoReplacements`] if a rule has no candidates
    pub fn new(rules: Vec<RewriteRule>) -> Result<Self, TransformError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let word = rule.word.trim();
                if word.is_empty() {
                    return Err(TransformError::EmptyWord);
                }
                if rule.replacements.is_empty() {
                    return Err(TransformError::NoReplacements(word.to_string()));
                }
                let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(word)))
                    .case_insensitive(true)
                    .build()?;
                Ok(CompiledRule {
                    pattern,
                    replacements: rule.replacements,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()?;

        Ok(Self { rules })
    }

    /// Transformer over [`default_rules`].
    pub fn with_default_rules() -> Result<Self, TransformError> {
        Self::new(default_rules())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Rewrites `content`, drawing one candidate per occurrence from `rng`.
    ///
    /// Output is not deterministic across calls unless `rng` is.
    pub fn transform<R: Rng + ?Sized>(&self, content: &str, rng: &mut R) -> String {
        let mut out = content.to_string();

        for rule in &self.rules {
            out = rule
                .pattern
                .replace_all(&out, |_: &Captures<'_>| {
                    let pick = rng.gen_range(0..rule.replacements.len());
                    rule.replacements[pick].clone()
                })
                .into_owned();
        }
        out
    }
}
