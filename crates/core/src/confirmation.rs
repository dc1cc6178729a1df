use std::collections::BTreeSet;

/// Names of capabilities that must never execute without explicit approval.
///
/// Membership is fixed at build time; changing it is a deployment-time edit.
/// The orchestration layer consults this set before dispatch, never inside the
/// dispatcher, so a denied confirmation never reaches execution.
#[derive(Clone, Debug, Default)]
pub struct ConfirmationSet {
    names: BTreeSet<&'static str>,
}

impl ConfirmationSet {
    pub fn from_names(names: &[&'static str]) -> Self {
        Self { names: names.iter().copied().collect() }
    }

    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.names.iter().copied()
    }
}
