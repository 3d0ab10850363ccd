use serde::{Deserialize, Serialize};

/// Display mapping for one coded value of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueLabel {
    pub variable_name: String,
    pub value: String,
    pub label: String,
}

/// All value labels of a dataset, linked to variables by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueLabelSet {
    labels: Vec<ValueLabel>,
}

impl From<Vec<ValueLabel>> for ValueLabelSet {
    fn from(labels: Vec<ValueLabel>) -> Self {
        Self { labels }
    }
}

impl ValueLabelSet {
    pub fn all(&self) -> &[ValueLabel] {
        &self.labels
    }

    pub fn for_variable<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ValueLabel> + 'a {
        self.labels.iter().filter(move |l| l.variable_name == name)
    }

    pub fn label_for(&self, name: &str, value: &str) -> Option<&str> {
        let value = value.trim();
        self.labels
            .iter()
            .find(|l| l.variable_name == name && l.value == value)
            .map(|l| l.label.as_str())
    }

    pub fn set_for(&mut self, name: &str, labels: Vec<(String, String)>) {
        self.remove_variable(name);
        self.labels.extend(labels.into_iter().map(|(value, label)| ValueLabel {
            variable_name: name.to_string(),
            value,
            label,
        }));
    }

    pub fn rename_variable(&mut self, old: &str, new: &str) {
        for label in self.labels.iter_mut().filter(|l| l.variable_name == old) {
            label.variable_name = new.to_string();
        }
    }

    pub fn remove_variable(&mut self, name: &str) {
        self.labels.retain(|l| l.variable_name != name);
    }
}
