use std::{collections::BTreeMap, sync::Arc};

use shared::protocol::CodeListItem;

use crate::actions::{Action, Outcome};

/// Code list name -> items, filled by `getCodeListItems` responses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeLists {
    lists: BTreeMap<String, Arc<Vec<CodeListItem>>>,
}

impl CodeLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Vec<CodeListItem>>> {
        self.lists.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.lists.keys().map(String::as_str)
    }

    /// Display name for `code` in list `name`.
    pub fn label(&self, name: &str, code: &str) -> Option<&str> {
        self.lists
            .get(name)?
            .iter()
            .find(|item| item.code == code)
            .map(|item| item.name.as_str())
    }
}

/// Stores a fetched list under its name, replacing any earlier copy. Every other action is a no-op.
pub fn reduce_code_lists(state: &CodeLists, action: &Action) -> CodeLists {
    match action {
        Action::Success {
            outcome: Outcome::CodeList { name, items },
            ..
        } => {
            let mut next = state.clone();
            next.lists.insert(name.clone(), Arc::new(items.clone()));
            next
        }
        _ => state.clone(),
    }
}
