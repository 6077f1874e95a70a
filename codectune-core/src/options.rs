//! Codec option declarations.
//!
//! An option declares a named, finite value domain for one encoder parameter
//! and knows how it renders into a command-line token. A set of options
//! constitutes all the variation dimensions the optimizer may search over
//! for one codec.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{CoreError, CoreResult};

/// How an option behaves beyond the plain `--name=value` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionKind {
    /// Rendered as `<prefix><name><infix><value>`.
    Plain,
    /// A set of mutually exclusive bare flags (e.g. `--good`, `--best`).
    /// Rendered as `<prefix><value>`; the option name is display-only.
    Choice,
    /// A plain option whose domain is an inclusive integer range.
    Integer { min: i64, max: i64 },
    /// Accepts any value via explicit assignment, but is never chosen
    /// by random mutation.
    Dummy,
}

/// One tunable encoder parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderOption {
    name: String,
    values: Vec<String>,
    kind: OptionKind,
    mandatory: bool,
}

impl EncoderOption {
    /// A plain option with an explicit value domain.
    pub fn new(name: &str, values: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            kind: OptionKind::Plain,
            mandatory: false,
        }
    }

    /// A set of mutually exclusive flags. The name is the flags joined
    /// with `/`, for display only.
    pub fn choice(flags: &[&str]) -> Self {
        Self {
            name: flags.join("/"),
            values: flags.iter().map(|v| v.to_string()).collect(),
            kind: OptionKind::Choice,
            mandatory: false,
        }
    }

    /// An option whose domain is every integer in `min..=max`.
    pub fn integer(name: &str, min: i64, max: i64) -> Self {
        Self {
            name: name.to_string(),
            values: (min..=max).map(|v| v.to_string()).collect(),
            kind: OptionKind::Integer { min, max },
            mandatory: false,
        }
    }

    /// An option with no domain restriction that random search leaves alone.
    pub fn dummy(name: &str) -> Self {
        Self {
            name: name.to_string(),
            values: Vec::new(),
            kind: OptionKind::Dummy,
            mandatory: false,
        }
    }

    /// Marks the option as mandatory: parsing fails when it is absent and
    /// it can never be removed.
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn kind(&self) -> &OptionKind {
        &self.kind
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// True if random mutation can pick a different value for this option.
    pub fn can_change(&self) -> bool {
        self.kind != OptionKind::Dummy && self.values.len() > 1
    }

    /// Picks a value different from `not_this`, uniformly at random.
    /// `not_this` does not have to be a member of the domain.
    pub fn pick_another<R: Rng + ?Sized>(&self, not_this: &str, rng: &mut R) -> CoreResult<String> {
        let rest: Vec<&String> = self.values.iter().filter(|v| *v != not_this).collect();
        rest.choose(rng)
            .map(|v| (*v).to_string())
            .ok_or_else(|| {
                CoreError::Precondition(format!("option {} has no other value to pick", self.name))
            })
    }

    /// True if `value` is a legal assignment for this option.
    pub fn accepts_value(&self, value: &str) -> bool {
        match self.kind {
            OptionKind::Dummy => true,
            _ => self.values.iter().any(|v| v == value),
        }
    }

    /// True if a bare flag token can represent a value of this option.
    pub fn flag_is_valid_value(&self, flag: &str) -> bool {
        self.kind == OptionKind::Choice && self.values.iter().any(|v| v == flag)
    }

    /// Renders one assigned value as a command-line token.
    pub fn format(&self, value: &str, formatter: &OptionFormatter) -> String {
        match self.kind {
            OptionKind::Choice => formatter.format(value, None),
            _ => formatter.format(&self.name, Some(value)),
        }
    }
}

/// The command-line form of an option: `<prefix><name><infix><value>`.
///
/// Codec-specific; e.g. x264 wants `--name value` while vpxenc wants
/// `--name=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionFormatter {
    pub prefix: String,
    pub infix: String,
}

impl OptionFormatter {
    pub fn new(prefix: &str, infix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            infix: infix.to_string(),
        }
    }

    pub fn format(&self, name: &str, value: Option<&str>) -> String {
        match value {
            Some(value) => format!("{}{}{}{}", self.prefix, name, self.infix, value),
            None => format!("{}{}", self.prefix, name),
        }
    }
}

impl Default for OptionFormatter {
    fn default() -> Self {
        Self::new("--", "=")
    }
}

/// A registry of option definitions for one codec.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    options: BTreeMap<String, EncoderOption>,
}

impl OptionSet {
    pub fn new(options: Vec<EncoderOption>) -> Self {
        let mut set = Self::default();
        for option in options {
            set.register(option);
        }
        set
    }

    pub fn register(&mut self, option: EncoderOption) {
        self.options.insert(option.name().to_string(), option);
    }

    pub fn option(&self, name: &str) -> Option<&EncoderOption> {
        self.options.get(name)
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }

    pub fn all_options(&self) -> impl Iterator<Item = &EncoderOption> {
        self.options.values()
    }

    pub fn all_changeable_options(&self) -> Vec<&EncoderOption> {
        self.options.values().filter(|o| o.can_change()).collect()
    }

    /// Finds the choice option (if any) for which `flag` is a member.
    pub fn find_flag_option(&self, flag: &str) -> Option<&EncoderOption> {
        self.options.values().find(|o| o.flag_is_valid_value(flag))
    }

    /// Reduces an option's domain to a single value and marks it mandatory.
    /// The reduction is permanent for this set instance.
    pub fn lock_option(&mut self, name: &str, value: &str) -> CoreResult<()> {
        let option = self
            .options
            .get_mut(name)
            .ok_or_else(|| CoreError::UnknownOption(name.to_string()))?;
        if !option.accepts_value(value) {
            return Err(CoreError::Parse(format!(
                "cannot lock option {name} to illegal value {value}"
            )));
        }
        option.values = vec![value.to_string()];
        option.mandatory = true;
        Ok(())
    }
}
