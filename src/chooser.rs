use std::{
    collections::BTreeMap,
    io::{self, IsTerminal},
};

use dialoguer::{theme::ColorfulTheme, Select};
use log::warn;
use thiserror::Error;

/// Resolved values keyed by the name they were found under. Sorted by name.
pub type Candidates = BTreeMap<String, String>;

#[derive(Error, Debug)]
pub enum ChooseError {
    #[error("No candidate found")]
    NotFound,
    #[error("Ambiguous choice between {}", .candidates.join(", "))]
    Ambiguous { candidates: Vec<String> },
    #[error("Selection failed: {0}")]
    Selection(#[from] io::Error),
}

/// Picks one of several `(name, value)` items, or none.
pub trait Selector {
    fn choose_one(&self, prompt: &str, items: &[(&str, &str)]) -> io::Result<Option<usize>>;
}

/// Reduces `candidates` to a single `(name, value)` pair. The selector is
/// only consulted when there is more than one candidate.
pub fn choose(
    candidates: &Candidates,
    prompt: &str,
    selector: &dyn Selector,
) -> Result<(String, String), ChooseError> {
    let items: Vec<(&str, &str)> = candidates
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .collect();

    match items.as_slice() {
        [] => Err(ChooseError::NotFound),
        [(name, value)] => Ok((name.to_string(), value.to_string())),
        _ => match selector.choose_one(prompt, &items)? {
            Some(index) if index < items.len() => {
                let (name, value) = items[index];
                Ok((name.to_owned(), value.to_owned()))
            }
            _ => Err(ChooseError::Ambiguous {
                candidates: candidates.keys().cloned().collect(),
            }),
        },
    }
}

/// Prompts on the terminal. Chooses nothing when stdin is not a terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSelector;

impl Selector for TerminalSelector {
    fn choose_one(&self, prompt: &str, items: &[(&str, &str)]) -> io::Result<Option<usize>> {
        if !io::stdin().is_terminal() {
            log_candidates(items);
            return Ok(None);
        }

        let labels: Vec<String> = items
            .iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();

        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(&labels[..])
            .default(0)
            .interact_opt()
            .map_err(io::Error::other)
    }
}

/// Never chooses; reports the candidates instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Selector for NonInteractive {
    fn choose_one(&self, _prompt: &str, items: &[(&str, &str)]) -> io::Result<Option<usize>> {
        log_candidates(items);
        Ok(None)
    }
}

fn log_candidates(items: &[(&str, &str)]) {
    for (name, value) in items {
        warn!("Candidate {}: {}", name, value);
    }
}
