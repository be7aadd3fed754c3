//! Multi-valued, inheritable configuration fields.
//!
//! A [`Property`] holds every candidate value a node file declares for one
//! key, plus an optional default. Loading distinguishes three situations,
//! captured by [`Declared`]:
//!
//! - the key is absent, so the node inherits from its parent;
//! - the key is present but empty, which stops inheritance;
//! - the key holds values.
//!
//! Choosing among several values is delegated to a [`Selector`], so loading
//! and resolving stay free of terminal input.
//!
//! ```yaml
//! CREDENTIAL:
//!   - USER: ops
//!     PASSWORD: secret
//!   - USER: admin
//!     SECRETS_HOOK: ["pass-hook", "admin"]
//!   - DEFAULT: 1
//! ```

use crate::error::{JumplineError, Result};
use dialoguer::Input;
use dialoguer::console::Term;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::sync::Mutex;
use tracing::debug;

/// Key of the marker element designating the default value.
pub const DEFAULT_KEY: &str = "DEFAULT";

/// How a value is shown when the operator has to pick one.
pub trait Labeled {
    fn label(&self) -> String;
}

impl Labeled for String {
    fn label(&self) -> String {
        self.clone()
    }
}

/// A named list of candidate values with an optional default.
#[derive(Debug, Clone, PartialEq)]
pub struct Property<T> {
    name: &'static str,
    values: Vec<T>,
    default_index: Option<usize>,
    prompt: Option<String>,
}

/// Result of loading one key from a node file.
#[derive(Debug, Clone, PartialEq)]
pub enum Declared<T> {
    /// Key absent: inherit from the parent.
    Unset,
    /// Key present but without values: resolves to no value, never inherits.
    Empty,
    /// Key present with at least one value.
    Values(Property<T>),
}

impl<T> Default for Declared<T> {
    fn default() -> Self {
        Declared::Unset
    }
}

impl<T> Declared<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Declared::Unset)
    }
}

impl<T: DeserializeOwned> Property<T> {
    /// Load the raw YAML value of key `name`.
    ///
    /// `raw` is `None` when the key is absent. A scalar or record that is not
    /// wrapped in a list is treated as a one-element list.
    ///
    /// # Errors
    ///
    /// Returns a message naming the element that could not be decoded.
    pub fn load(name: &'static str, raw: Option<&Value>) -> std::result::Result<Declared<T>, String> {
        let elements = match raw {
            None => return Ok(Declared::Unset),
            Some(Value::Null) => return Ok(Declared::Empty),
            Some(Value::Sequence(seq)) => seq.as_slice(),
            Some(single) => std::slice::from_ref(single),
        };

        let mut values = Vec::with_capacity(elements.len());
        let mut default_index = None;
        for (i, element) in elements.iter().enumerate() {
            if let Some(index) = default_marker(element) {
                default_index = index;
                continue;
            }
            let value = serde_yaml::from_value(element.clone())
                .map_err(|e| format!("{}[{}]: {}", name, i, e))?;
            values.push(value);
        }

        if values.is_empty() {
            return Ok(Declared::Empty);
        }
        let default_index = default_index.filter(|&i| i < values.len());
        Ok(Declared::Values(Property {
            name,
            values,
            default_index,
            prompt: None,
        }))
    }
}

/// `Some(index)` when `element` is a `{DEFAULT: k}` marker. The inner option
/// is `None` for a marker whose index is not a non-negative integer.
fn default_marker(element: &Value) -> Option<Option<usize>> {
    let map = element.as_mapping()?;
    if map.len() != 1 {
        return None;
    }
    let index = map.get(DEFAULT_KEY)?;
    Some(index.as_u64().and_then(|i| usize::try_from(i).ok()))
}

impl<T> Property<T> {
    /// Build a property directly from values.
    pub fn new(name: &'static str, values: Vec<T>) -> Self {
        Self {
            name,
            values,
            default_index: None,
            prompt: None,
        }
    }

    /// Set the question shown when the operator has to choose.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn default_index(&self) -> Option<usize> {
        self.default_index
    }

    /// The question for the operator, `select a value for NAME:` by default.
    pub fn prompt(&self) -> String {
        self.prompt
            .clone()
            .unwrap_or_else(|| format!("select a value for {}:", self.name))
    }

    /// Value at the default index, or the first value.
    pub fn default_value(&self) -> Option<&T> {
        self.values.get(self.default_index.unwrap_or(0))
    }

    /// Pick one value.
    ///
    /// An in-range `candidate` wins, a single value is returned as is, and
    /// otherwise `selector` asks the operator. Returns `Ok(None)` only when
    /// there are no values, and [`JumplineError::InvalidSelection`] when the
    /// selector answers out of range.
    pub fn select_one(
        &self,
        node: &str,
        candidate: Option<usize>,
        selector: &dyn Selector,
    ) -> Result<Option<&T>>
    where
        T: Labeled,
    {
        if self.values.is_empty() {
            return Ok(None);
        }
        if let Some(value) = candidate.and_then(|i| self.values.get(i)) {
            return Ok(Some(value));
        }
        if self.values.len() == 1 {
            return Ok(self.values.first());
        }

        let prompt = self.prompt();
        let choice = Choice {
            node,
            prompt: &prompt,
            labels: self.values.iter().map(Labeled::label).collect(),
            default_index: self.default_index.unwrap_or(0),
        };
        let index = selector.select(&choice)?;
        match self.values.get(index) {
            Some(value) => Ok(Some(value)),
            None => Err(JumplineError::InvalidSelection {
                node: node.to_string(),
                index,
            }),
        }
    }
}

/// One disambiguation request handed to a [`Selector`].
#[derive(Debug, Clone, PartialEq)]
pub struct Choice<'a> {
    /// Identifier of the node being resolved.
    pub node: &'a str,
    /// Question to show.
    pub prompt: &'a str,
    /// Display labels, numbered from 0.
    pub labels: Vec<String>,
    /// Index returned on blank input.
    pub default_index: usize,
}

/// Picks one of several values. Must return an index within `choice.labels`.
pub trait Selector: Sync {
    fn select(&self, choice: &Choice<'_>) -> Result<usize>;
}

/// Asks the operator on the terminal, numbering every value from 0.
///
/// Chains logging in side by side may ask at the same time, so questions
/// are asked one at a time.
pub struct PromptSelector {
    term: Mutex<Term>,
}

impl PromptSelector {
    pub fn new() -> Self {
        Self {
            term: Mutex::new(Term::stderr()),
        }
    }
}

impl Default for PromptSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Menu shown above the question.
fn menu(choice: &Choice<'_>) -> String {
    let mut menu = format!("\n==={}===\n{}\n", choice.node, choice.prompt);
    for (i, label) in choice.labels.iter().enumerate() {
        menu.push_str(&format!("{}: {}\n", i, label));
    }
    menu.push_str(&format!("default: {}\n", choice.default_index));
    menu
}

/// Read an answer: blank means the default, anything else must be an
/// index into `choice.labels`.
fn parse_choice(input: &str, choice: &Choice<'_>) -> std::result::Result<usize, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(choice.default_index);
    }
    match input.parse::<usize>() {
        Ok(i) if i < choice.labels.len() => Ok(i),
        Ok(_) => Err(format!(
            "Please input a number between 0 and {}!",
            choice.labels.len().saturating_sub(1)
        )),
        Err(_) => Err("Please input a number!".to_string()),
    }
}

impl Selector for PromptSelector {
    fn select(&self, choice: &Choice<'_>) -> Result<usize> {
        let term = match self.term.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        term.write_str(&menu(choice))?;

        let answer = Input::<String>::new()
            .with_prompt("Your choice is")
            .default(choice.default_index.to_string())
            .validate_with(|input: &String| parse_choice(input, choice).map(|_| ()))
            .interact_text_on(&term)
            .map_err(|e| {
                debug!(node = choice.node, error = %e, "selection prompt closed");
                JumplineError::SelectionAborted(choice.node.to_string())
            })?;
        parse_choice(&answer, choice).map_err(|_| JumplineError::SelectionAborted(choice.node.to_string()))
    }
}
