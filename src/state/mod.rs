//! Configuration state engine: which options are enabled, plus the tokens
//! under the tracked keys that no option claims.
//!
//! Enabling runs the full protocol (availability, confirmation, conflict
//! resolution, dependency cascade). Disabling only clears the one flag.

mod confirm;

use crate::error::ToggleError;
use crate::registry::{Category, DeviceRevision, Registry};
use crate::uenv::{Token, UenvFile};

pub use confirm::{AcceptAll, Confirm};

#[cfg(test)]
pub use confirm::MockConfirm;

/// Successful result of [`ConfigState::toggle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The option was enabled.
    Enabled {
        /// Dependencies that were switched on along with it, in pre-order.
        dependencies: Vec<usize>,
        /// Conflicting options that were switched off, in registry order.
        disabled_conflicts: Vec<usize>,
    },
    /// The option was disabled.
    Disabled,
}

/// Enabled flags for every registry option plus the preserved unknown tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigState<'r> {
    registry: &'r Registry,
    enabled: Vec<bool>,
    unknown_interface: Vec<Token>,
    unknown_ext: Vec<Token>,
}

impl<'r> ConfigState<'r> {
    /// Build the state from the tokens found under the two tracked keys.
    ///
    /// A token enables the option with the same identifier when that option
    /// belongs to the token's category; anything else is kept as an unknown
    /// token (first occurrence only, original order, bytes untouched).
    #[must_use]
    pub fn from_tokens(registry: &'r Registry, interface: &[Token], ext: &[Token]) -> Self {
        let mut state = Self {
            registry,
            enabled: vec![false; registry.len()],
            unknown_interface: Vec::new(),
            unknown_ext: Vec::new(),
        };
        state.absorb(Category::Interface, interface);
        state.absorb(Category::Extension, ext);
        state
    }

    /// Build the state from a loaded file.
    ///
    /// `revision` does not gate loading: an option that is enabled in the
    /// file stays enabled even if the device no longer supports it.
    #[must_use]
    pub fn init(registry: &'r Registry, file: &UenvFile, revision: DeviceRevision) -> Self {
        let state = Self::from_tokens(
            registry,
            file.tokens(Category::Interface),
            file.tokens(Category::Extension),
        );
        tracing::debug!(
            %revision,
            enabled = state.enabled.iter().filter(|&&e| e).count(),
            unknown_interface = state.unknown_interface.len(),
            unknown_ext = state.unknown_ext.len(),
            "state initialised"
        );
        state
    }

    fn absorb(&mut self, category: Category, tokens: &[Token]) {
        for token in tokens {
            let known = token
                .to_str()
                .and_then(|id| self.registry.find_in(id, category));
            if let Some(idx) = known {
                if let Some(flag) = self.enabled.get_mut(idx) {
                    *flag = true;
                }
                continue;
            }
            let unknown = self.unknown_mut(category);
            if !unknown.contains(token) {
                unknown.push(token.clone());
            }
        }
    }

    const fn unknown_mut(&mut self, category: Category) -> &mut Vec<Token> {
        match category {
            Category::Interface => &mut self.unknown_interface,
            Category::Extension => &mut self.unknown_ext,
        }
    }

    /// Registry this state is bound to.
    #[must_use]
    pub const fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Whether the option at `index` is enabled (`false` when out of range).
    #[must_use]
    pub fn is_enabled(&self, index: usize) -> bool {
        self.enabled.get(index).copied().unwrap_or(false)
    }

    /// Tokens under `category` that matched no option, in first-seen order.
    #[must_use]
    pub fn unknown_tokens(&self, category: Category) -> &[Token] {
        match category {
            Category::Interface => &self.unknown_interface,
            Category::Extension => &self.unknown_ext,
        }
    }

    /// Flip the option at `index`.
    ///
    /// Disabling is unconditional and does not cascade. Enabling:
    ///
    /// 1. rejects an option (or any transitive dependency) unavailable on
    ///    `revision`;
    /// 2. asks `confirm` to approve the option, then to disable each
    ///    enabled conflict; every answer is collected before anything
    ///    changes, so a single "no" leaves the state untouched;
    /// 3. disables the conflicts, silently enables missing dependencies,
    ///    and finally the option itself.
    ///
    /// Without an oracle no prompt is shown; an enabled conflict then yields
    /// [`ToggleError::ConfirmationRequired`].
    ///
    /// # Errors
    ///
    /// Returns a [`ToggleError`]; the state is unchanged in every error case.
    pub fn toggle(
        &mut self,
        index: usize,
        revision: DeviceRevision,
        confirm: Option<&mut (dyn Confirm + '_)>,
    ) -> Result<ToggleOutcome, ToggleError> {
        let registry = self.registry;
        let item = registry
            .get(index)
            .ok_or_else(|| ToggleError::Internal(format!("option index {index} out of range")))?;

        if self.is_enabled(index) {
            self.set(index, false);
            tracing::debug!(option = %item.id, "disabled");
            return Ok(ToggleOutcome::Disabled);
        }

        if !item.is_available(revision) {
            return Err(ToggleError::Unavailable {
                option: item.id.clone(),
            });
        }

        let closure = registry
            .dependency_closure(index)
            .map_err(|e| ToggleError::Internal(e.to_string()))?;
        for &dep in &closure {
            let dep_item = registry
                .get(dep)
                .ok_or_else(|| ToggleError::Internal(format!("option index {dep} out of range")))?;
            if !dep_item.is_available(revision) {
                return Err(ToggleError::Unavailable {
                    option: dep_item.id.clone(),
                });
            }
        }

        let conflicts: Vec<usize> = registry
            .conflicts_of(index)
            .into_iter()
            .filter(|&c| self.is_enabled(c))
            .collect();

        match confirm {
            Some(oracle) => {
                let prompt = format!("Option {}:\nDescription:\n{}", item.id, item.help);
                if !oracle.confirm("Confirm", &prompt) {
                    return Err(ToggleError::UserRejected {
                        option: item.id.clone(),
                    });
                }
                for &c in &conflicts {
                    let cid = registry.get(c).map_or("?", |it| it.id.as_str());
                    let prompt = format!("Enabling {} conflicts with {cid}.\nDisable {cid}?", item.id);
                    if !oracle.confirm("Conflict", &prompt) {
                        return Err(ToggleError::UserRejected {
                            option: item.id.clone(),
                        });
                    }
                }
            }
            None => {
                if let Some(&c) = conflicts.first() {
                    return Err(ToggleError::ConfirmationRequired {
                        option: item.id.clone(),
                        conflict: registry.get(c).map_or_else(String::new, |it| it.id.clone()),
                    });
                }
            }
        }

        for &c in &conflicts {
            self.set(c, false);
        }
        let dependencies: Vec<usize> = closure
            .into_iter()
            .filter(|&d| !self.is_enabled(d))
            .collect();
        for &d in &dependencies {
            self.set(d, true);
        }
        self.set(index, true);

        tracing::debug!(
            option = %item.id,
            dependencies = dependencies.len(),
            disabled_conflicts = conflicts.len(),
            "enabled"
        );
        Ok(ToggleOutcome::Enabled {
            dependencies,
            disabled_conflicts: conflicts,
        })
    }

    fn set(&mut self, index: usize, value: bool) {
        if let Some(flag) = self.enabled.get_mut(index) {
            *flag = value;
        }
    }

    /// Tokens to write under `category`: enabled options in registry order,
    /// then the unknown tokens in their original order.
    ///
    /// The result depends only on the enabled set, never on the order in
    /// which toggles were applied.
    #[must_use]
    pub fn build_tokens(&self, category: Category) -> Vec<Token> {
        self.registry
            .in_category(category)
            .filter(|&(i, _)| self.is_enabled(i))
            .map(|(_, it)| Token::from(it.id.as_str()))
            .chain(self.unknown_tokens(category).iter().cloned())
            .collect()
    }
}
