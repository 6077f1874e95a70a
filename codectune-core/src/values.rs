//! Parsed option value assignments.
//!
//! An [`OptionValueSet`] is an immutable assignment of values to the options
//! of one codec, parsed from a command-line-style token string and serialized
//! back to a canonical form. The canonical form is what the cache hashes, so
//! two semantically identical configurations collapse to one cache entry.
//!
//! All mutation operations return a new instance; the receiver is never
//! changed in place.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::options::{EncoderOption, OptionFormatter, OptionSet};

/// One token recognized by the tokenizer.
enum Token {
    /// `<prefix><name><infix><value>` with a registered name.
    Assignment { name: String, value: String },
    /// A bare `<prefix><flag>` matching a choice option member.
    ChoiceFlag { name: String, value: String },
    /// Anything else, preserved verbatim.
    Unrecognized(String),
}

/// Values for a set of options.
#[derive(Debug, Clone)]
pub struct OptionValueSet {
    option_set: Arc<OptionSet>,
    formatter: OptionFormatter,
    values: BTreeMap<String, String>,
    other_parts: Vec<String>,
}

impl OptionValueSet {
    /// Parses a token string like `--name=value --flag` against an option
    /// set. Tokens that match no registered option are preserved verbatim.
    ///
    /// Fails if a restricted option is assigned an illegal value, or if a
    /// mandatory option ends up with no value.
    pub fn parse(
        option_set: Arc<OptionSet>,
        input: &str,
        formatter: OptionFormatter,
    ) -> CoreResult<Self> {
        let mut values = BTreeMap::new();
        let mut other_parts = Vec::new();

        for token in tokenize(&option_set, input, &formatter) {
            match token {
                Token::Assignment { name, value } => {
                    let option = option_set
                        .option(&name)
                        .ok_or_else(|| CoreError::UnknownOption(name.clone()))?;
                    if !option.accepts_value(&value) {
                        return Err(CoreError::Parse(format!(
                            "illegal value {value} for option {name}"
                        )));
                    }
                    values.insert(name, value);
                }
                Token::ChoiceFlag { name, value } => {
                    values.insert(name, value);
                }
                Token::Unrecognized(part) => other_parts.push(part),
            }
        }

        for option in option_set.all_options() {
            if option.is_mandatory() && !values.contains_key(option.name()) {
                return Err(CoreError::Parse(format!(
                    "mandatory option {} is missing",
                    option.name()
                )));
            }
        }

        Ok(Self {
            option_set,
            formatter,
            values,
            other_parts,
        })
    }

    pub fn option_set(&self) -> &Arc<OptionSet> {
        &self.option_set
    }

    pub fn formatter(&self) -> &OptionFormatter {
        &self.formatter
    }

    /// The value assigned to an option, if any.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of explicitly assigned options. Used by the optimizer's
    /// short-configuration score penalty.
    pub fn assigned_len(&self) -> usize {
        self.values.len()
    }

    /// Returns a copy with the given option assigned a new value.
    pub fn change_value(&self, name: &str, value: &str) -> CoreResult<Self> {
        if !self.option_set.has_option(name) {
            return Err(CoreError::UnknownOption(name.to_string()));
        }
        let mut new_set = self.clone();
        new_set.values.insert(name.to_string(), value.to_string());
        Ok(new_set)
    }

    /// Returns a copy without the given option's assignment.
    pub fn remove_value(&self, name: &str) -> CoreResult<Self> {
        let option = self
            .option_set
            .option(name)
            .ok_or_else(|| CoreError::UnknownOption(name.to_string()))?;
        if option.is_mandatory() {
            return Err(CoreError::CannotRemoveMandatory(name.to_string()));
        }
        let mut new_set = self.clone();
        new_set.values.remove(name);
        Ok(new_set)
    }

    /// Returns a copy with a new value for `option`, different from the
    /// current one (or from the empty string when unassigned).
    pub fn randomly_patch_option<R: Rng + ?Sized>(
        &self,
        option: &EncoderOption,
        rng: &mut R,
    ) -> CoreResult<Self> {
        let current = self.value(option.name()).unwrap_or("");
        let new_value = option.pick_another(current, rng)?;
        self.change_value(option.name(), &new_value)
    }

    /// Returns a copy with one randomly chosen changeable option patched.
    pub fn randomly_patch_config<R: Rng + ?Sized>(&self, rng: &mut R) -> CoreResult<Self> {
        let options = self.option_set.all_changeable_options();
        let option = *options.choose(rng).ok_or_else(|| {
            CoreError::Precondition("no changeable options in option set".to_string())
        })?;
        self.randomly_patch_option(option, rng)
    }

    /// Returns a copy with one randomly chosen assigned, non-mandatory
    /// option removed, or `None` if there is no such option.
    pub fn randomly_remove_parameter<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Self> {
        let removable: Vec<&String> = self
            .values
            .keys()
            .filter(|name| {
                self.option_set
                    .option(name)
                    .is_some_and(|option| !option.is_mandatory())
            })
            .collect();
        let name = removable.choose(rng)?.to_string();
        let mut new_set = self.clone();
        new_set.values.remove(&name);
        Some(new_set)
    }
}

impl fmt::Display for OptionValueSet {
    /// The canonical serialization: every rendered assignment plus every
    /// preserved token, sorted lexicographically, joined by single spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self
            .values
            .iter()
            .filter_map(|(name, value)| {
                self.option_set
                    .option(name)
                    .map(|option| option.format(value, &self.formatter))
            })
            .collect();
        parts.extend(self.other_parts.iter().cloned());
        parts.sort();
        write!(f, "{}", parts.join(" "))
    }
}

impl PartialEq for OptionValueSet {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for OptionValueSet {}

/// Splits the input into assignment, choice-flag and unrecognized tokens.
///
/// When the formatter's infix is whitespace, an assignment spans two
/// whitespace-separated tokens (`--name value`); otherwise it lives in a
/// single token (`--name=value`).
fn tokenize(option_set: &OptionSet, input: &str, formatter: &OptionFormatter) -> Vec<Token> {
    let raw: Vec<&str> = input.split_whitespace().collect();
    let infix_is_space = formatter.infix.trim().is_empty();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < raw.len() {
        let part = raw[i];
        i += 1;

        let Some(stripped) = part.strip_prefix(&formatter.prefix) else {
            tokens.push(Token::Unrecognized(part.to_string()));
            continue;
        };

        if !infix_is_space {
            if let Some((name, value)) = stripped.split_once(&formatter.infix) {
                if option_set.has_option(name) {
                    tokens.push(Token::Assignment {
                        name: name.to_string(),
                        value: value.to_string(),
                    });
                    continue;
                }
            }
        } else if option_set.has_option(stripped) {
            // The next token is the value unless it is itself a registered
            // option or flag; a bare prefix match is not enough, since a
            // single-dash prefix would swallow negative values like `-1`.
            let next_is_option = raw.get(i).map_or(false, |next| {
                next.strip_prefix(&formatter.prefix).map_or(false, |name| {
                    option_set.has_option(name) || option_set.find_flag_option(name).is_some()
                })
            });
            if let Some(value) = raw.get(i).filter(|_| !next_is_option) {
                tokens.push(Token::Assignment {
                    name: stripped.to_string(),
                    value: (*value).to_string(),
                });
                i += 1;
                continue;
            }
        }

        if let Some(option) = option_set.find_flag_option(stripped) {
            tokens.push(Token::ChoiceFlag {
                name: option.name().to_string(),
                value: stripped.to_string(),
            });
            continue;
        }

        tokens.push(Token::Unrecognized(part.to_string()));
    }

    tokens
}
