use serde::{Deserialize, Serialize};

/// A single addressable entry as served by the API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub name: String,
    pub address: String,
}

impl Record {
    pub fn field(&self, field: EditField) -> &str {
        match field {
            EditField::Name => &self.name,
            EditField::Address => &self.address,
        }
    }

    pub fn set_field(&mut self, field: EditField, value: String) {
        match field {
            EditField::Name => self.name = value,
            EditField::Address => self.address = value,
        }
    }
}

/// The two editable record fields. Everything else is rejected,
/// both client-side and by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditField {
    Name,
    Address,
}

impl EditField {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "name" => Some(Self::Name),
            "address" => Some(Self::Address),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
        }
    }
}

/// In-memory record list fetched from the API at startup. Empty when the
/// fetch failed; every view degrades gracefully against an empty list.
#[derive(Clone, Debug, Default)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Linear scan by id. Not-found is a sentinel, never an error.
    pub fn find_by_id(&self, id: i64) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Optimistic local update; returns false when the id is unknown.
    /// Callers submit the remote edit regardless of what the server
    /// will answer.
    pub fn apply_edit(&mut self, id: i64, field: EditField, value: &str) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.set_field(field, value.to_string());
                true
            }
            None => false,
        }
    }

    /// Records whose name or address contains the filter, case-insensitive.
    /// An empty filter matches everything.
    pub fn filtered(&self, filter: &str) -> Vec<&Record> {
        let needle = filter.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || format!("{} {}", r.name, r.address)
                        .to_lowercase()
                        .contains(&needle)
            })
            .collect()
    }
}
