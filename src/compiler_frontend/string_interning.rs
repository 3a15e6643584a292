use rustc_hash::FxHashMap;

// Declarations, functions and debug variables rarely need more than this for a single module
pub const MINIMUM_STRING_TABLE_CAPACITY: usize = 32;

/// A unique identifier for an interned string, represented as a u32 for memory efficiency.
/// This provides type safety to prevent mixing string IDs with other integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StringId(u32);

impl StringId {
    /// Compare this interned string with a string slice without allocating.
    #[inline]
    pub fn eq_str(self, table: &StringTable, other: &str) -> bool {
        table.resolve(self) == other
    }
}

impl std::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StringId({})", self.0)
    }
}

/// Stores every declaration, function and debug variable name of a module once.
///
/// - Vec<Box<str>> for O(1) ID→string resolution
/// - FxHashMap<Box<str>, StringId> for O(1) string→ID lookup during interning
#[derive(Debug, Clone)]
pub struct StringTable {
    strings: Vec<Box<str>>,
    string_to_id: FxHashMap<Box<str>, StringId>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            strings: Vec::with_capacity(MINIMUM_STRING_TABLE_CAPACITY),
            string_to_id: FxHashMap::default(),
        }
    }

    /// Intern a string slice, returning its unique ID.
    /// If the string already exists, returns the existing ID.
    #[inline]
    pub fn intern(&mut self, s: &str) -> StringId {
        if let Some(&existing_id) = self.string_to_id.get(s) {
            return existing_id;
        }

        self.intern_new(s)
    }

    #[cold]
    #[inline(never)]
    fn intern_new(&mut self, s: &str) -> StringId {
        let new_id = StringId(self.strings.len() as u32);
        self.strings.push(Box::from(s));
        self.string_to_id.insert(Box::from(s), new_id);
        new_id
    }

    /// Resolve an interned string ID back to its string content.
    ///
    /// StringIds are only created by this StringTable,
    /// so handing it an ID from another table is a bug in the caller.
    #[inline]
    pub fn resolve(&self, id: StringId) -> &str {
        &self.strings[id.0 as usize]
    }

    /// Check if a string is already interned without interning it.
    #[inline]
    pub fn get_existing(&self, s: &str) -> Option<StringId> {
        self.string_to_id.get(s).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::StringTable;

    #[test]
    fn interning_the_same_name_twice_returns_the_same_id() {
        let mut table = StringTable::new();
        let first = table.intern("count");
        let second = table.intern("count");
        let other = table.intern("inner");

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(other), "inner");
        assert!(first.eq_str(&table, "count"));
        assert_eq!(table.get_existing("missing"), None);
    }
}
