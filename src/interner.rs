/// String Interner for TripStats
///
/// Station names, user types and genders repeat on almost every row of a city
/// dataset. String columns store a 32-bit ID per cell and the interner keeps each
/// distinct string once.
///
/// Tables are append-only, so the interner never frees IDs. IDs are handed out in
/// first-interned order, which makes them usable as dense counter indices during
/// aggregation.
///
/// # Examples
///
/// ```
/// use tripstats::StringInterner;
///
/// let mut interner = StringInterner::new();
///
/// let id1 = interner.intern("Canal St & Adams St");
/// let id2 = interner.intern("Clinton St & Madison St");
/// let id3 = interner.intern("Canal St & Adams St");
///
/// assert_eq!(id1, id3);
/// assert_ne!(id1, id2);
/// assert_eq!(interner.resolve(id1), Some("Canal St & Adams St"));
/// ```

use std::collections::HashMap;

/// Interned string ID type
pub type StringId = u32;

#[derive(Debug, Clone, Default)]
pub struct StringInterner {
    string_to_id: HashMap<String, StringId>,
    /// Stores strings by ID (index = ID)
    id_to_string: Vec<String>,
    /// Number of cells that interned each string
    occurrences: Vec<u32>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        StringInterner {
            string_to_id: HashMap::with_capacity(capacity),
            id_to_string: Vec::with_capacity(capacity),
            occurrences: Vec::with_capacity(capacity),
        }
    }

    /// Intern a string, returning its ID.
    /// A string seen before keeps its ID and has its occurrence count bumped.
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&id) = self.string_to_id.get(s) {
            self.occurrences[id as usize] += 1;
            return id;
        }

        let id = self.id_to_string.len() as StringId;
        self.id_to_string.push(s.to_string());
        self.occurrences.push(1);
        self.string_to_id.insert(s.to_string(), id);
        id
    }

    /// Look up an already interned string without recording an occurrence.
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        self.string_to_id.get(s).copied()
    }

    pub fn resolve(&self, id: StringId) -> Option<&str> {
        self.id_to_string.get(id as usize).map(|s| s.as_str())
    }

    /// Number of cells (across every column sharing this interner) holding `id`.
    pub fn occurrences(&self, id: StringId) -> u32 {
        self.occurrences.get(id as usize).copied().unwrap_or(0)
    }

    /// Returns the number of unique strings interned
    pub fn len(&self) -> usize {
        self.id_to_string.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_string.is_empty()
    }

    pub fn stats(&self) -> InternerStats {
        InternerStats {
            unique_strings: self.len(),
            total_references: self.occurrences.iter().map(|&r| r as u64).sum(),
        }
    }
}

/// Statistics about the string interner
#[derive(Debug, Clone)]
pub struct InternerStats {
    pub unique_strings: usize,
    /// Total number of cells referring to any interned string
    pub total_references: u64,
}
