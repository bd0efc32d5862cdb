use logos::Span;

use std::collections::HashMap;

/// Mapping from label names to cell addresses, built during the assembler's
/// first pass.
///
/// Each label may be defined exactly once. Label names are case sensitive.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    inner: HashMap<String, SymbolTableEntry>,
}

#[derive(Debug, Clone)]
pub struct SymbolTableEntry {
    /// Address of the cell the label is bound to.
    pub address: i64,

    /// Location of the definition in the source text.
    pub defined: Span,
}

impl SymbolTable {
    pub(crate) fn new() -> Self {
        SymbolTable {
            inner: HashMap::new(),
        }
    }

    /// Bind `label` to `address`.
    ///
    /// Returns the span of the previous definition if the label already has
    /// one, in which case the table is left unchanged.
    pub(crate) fn define_symbol(&mut self, span: Span, label: &str, address: i64)
        -> Result<(), Span>
    {
        if let Some(existing) = self.inner.get(label) {
            return Err(existing.defined.clone());
        }

        self.inner.insert(label.to_string(), SymbolTableEntry {
            address,
            defined: span,
        });

        Ok(())
    }

    /// Shift every binding by `base` once the size of the entry prologue is
    /// known.
    pub(crate) fn relocate(&mut self, base: i64) {
        for entry in self.inner.values_mut() {
            entry.address += base;
        }
    }

    /// Returns the address bound to `label`, if it has a definition.
    pub fn address_of<S: AsRef<str>>(&self, label: S) -> Option<i64> {
        self.inner.get(label.as_ref()).map(|entry| entry.address)
    }

    pub fn get<S: AsRef<str>>(&self, label: S) -> Option<&SymbolTableEntry> {
        self.inner.get(label.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolTableEntry)> {
        self.inner.iter().map(|(label, entry)| (label.as_str(), entry))
    }
}
