//! Per-category state stores.
//!
//! Every store supports the same three steps: capture the value a candidate
//! would displace, apply the candidate, and revert to the captured value.
//! [`Stores`] bundles the six of them and dispatches on [`Category`].

use indexmap::IndexMap;

use crate::classify::Category;

/// Definitions keyed by symbol name, iterated in first-insertion order.
///
/// Redefining a symbol replaces its text but keeps its position, so the
/// declaration order of the rendered program never depends on edit history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolStore {
    defs: IndexMap<String, String>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.defs.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.defs.values().map(String::as_str)
    }

    /// The definition a new value for `symbol` would displace.
    pub fn capture(&self, symbol: &str) -> Option<String> {
        self.defs.get(symbol).cloned()
    }

    /// Insert or overwrite in place.
    pub fn apply(&mut self, symbol: &str, text: &str) {
        self.defs.insert(symbol.to_string(), text.to_string());
    }

    /// Restore `previous`, or forget the symbol entirely if it was new.
    pub fn revert(&mut self, symbol: &str, previous: Option<String>) {
        match previous {
            Some(text) => {
                self.defs.insert(symbol.to_string(), text);
            }
            None => {
                self.defs.shift_remove(symbol);
            }
        }
    }
}

/// Statement blocks in program order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementLog {
    blocks: Vec<String>,
}

impl StatementLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Rendered blocks, each indented for the body of `main`.
    pub fn blocks(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().map(String::as_str)
    }

    pub fn apply(&mut self, text: &str) {
        self.blocks.push(indent_block(text));
    }

    /// Drop the most recently appended block.
    pub fn revert(&mut self) {
        self.blocks.pop();
    }
}

fn indent_block(text: &str) -> String {
    format!("    {}\n", text.replace('\n', "\n    "))
}

/// Holds at most one expression for the duration of a single build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpressionSlot {
    pending: Option<String>,
}

impl ExpressionSlot {
    pub fn get(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    pub fn capture(&self) -> Option<String> {
        self.pending.clone()
    }

    pub fn apply(&mut self, text: &str) {
        self.pending = Some(text.to_string());
    }

    pub fn revert(&mut self, previous: Option<String>) {
        self.pending = previous;
    }
}

/// What it takes to undo one `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Undo {
    Symbol {
        category: Category,
        symbol: String,
        previous: Option<String>,
    },
    Statement,
    Expression {
        previous: Option<String>,
    },
}

/// The accumulated program state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stores {
    pub uses: SymbolStore,
    pub imports: SymbolStore,
    pub typedefs: SymbolStore,
    pub functions: SymbolStore,
    pub statements: StatementLog,
    pub expression: ExpressionSlot,
}

impl Default for Stores {
    fn default() -> Self {
        Self::new()
    }
}

impl Stores {
    /// Empty stores, with `Array` already in use.
    pub fn new() -> Self {
        let mut uses = SymbolStore::new();
        uses.apply("Array", "use Array: all;");
        Self {
            uses,
            imports: SymbolStore::new(),
            typedefs: SymbolStore::new(),
            functions: SymbolStore::new(),
            statements: StatementLog::new(),
            expression: ExpressionSlot::default(),
        }
    }

    /// The symbol store backing `category`, if it is symbol-keyed.
    pub fn symbols(&self, category: Category) -> Option<&SymbolStore> {
        match category {
            Category::Use => Some(&self.uses),
            Category::Import => Some(&self.imports),
            Category::Typedef => Some(&self.typedefs),
            Category::Function => Some(&self.functions),
            Category::Statement | Category::Expression => None,
        }
    }

    fn symbols_mut(&mut self, category: Category) -> Option<&mut SymbolStore> {
        match category {
            Category::Use => Some(&mut self.uses),
            Category::Import => Some(&mut self.imports),
            Category::Typedef => Some(&mut self.typedefs),
            Category::Function => Some(&mut self.functions),
            Category::Statement | Category::Expression => None,
        }
    }

    /// Capture the displaced value, then merge `text` into the store for
    /// `category`.
    ///
    /// Returns `None` without touching anything when a symbol-keyed category
    /// is given no symbol.
    pub fn apply(&mut self, category: Category, symbol: Option<&str>, text: &str) -> Option<Undo> {
        if category.is_symbol_keyed() {
            let symbol = symbol?;
            let store = self.symbols_mut(category)?;
            let previous = store.capture(symbol);
            store.apply(symbol, text);
            return Some(Undo::Symbol {
                category,
                symbol: symbol.to_string(),
                previous,
            });
        }
        if category == Category::Expression {
            let previous = self.expression.capture();
            self.expression.apply(text);
            return Some(Undo::Expression { previous });
        }
        self.statements.apply(text);
        Some(Undo::Statement)
    }

    /// Undo exactly the mutation recorded in `undo`.
    pub fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Statement => self.statements.revert(),
            Undo::Expression { previous } => self.expression.revert(previous),
            Undo::Symbol {
                category,
                symbol,
                previous,
            } => {
                if let Some(store) = self.symbols_mut(category) {
                    store.revert(&symbol, previous);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stores_seed_array() {
        let stores = Stores::new();
        assert_eq!(stores.uses.get("Array"), Some("use Array: all;"));
        assert!(stores.imports.is_empty());
        assert!(stores.statements.is_empty());
        assert!(stores.expression.is_empty());
    }

    #[test]
    fn test_redefinition_keeps_position() {
        let mut store = SymbolStore::new();
        store.apply("f", "int f() { return 1; }");
        store.apply("g", "int g() { return 2; }");
        store.apply("f", "int f() { return 3; }");

        let symbols: Vec<&str> = store.symbols().collect();
        assert_eq!(symbols, vec!["f", "g"]);
        assert_eq!(store.get("f"), Some("int f() { return 3; }"));
    }

    #[test]
    fn test_revert_new_symbol_leaves_no_trace() {
        let mut stores = Stores::new();
        let before = stores.clone();
        let undo = stores
            .apply(Category::Function, Some("f"), "int f() { return 1; }")
            .unwrap();
        assert_eq!(stores.functions.len(), 1);
        stores.revert(undo);
        assert_eq!(stores, before);
    }

    #[test]
    fn test_revert_redefinition_restores_text_and_order() {
        let mut stores = Stores::new();
        stores.apply(Category::Typedef, Some("a"), "typedef int a;");
        stores.apply(Category::Typedef, Some("b"), "typedef int b;");
        let before = stores.clone();

        let undo = stores
            .apply(Category::Typedef, Some("a"), "typedef double a;")
            .unwrap();
        assert_eq!(stores.typedefs.get("a"), Some("typedef double a;"));
        stores.revert(undo);

        assert_eq!(stores, before);
        let symbols: Vec<&str> = stores.typedefs.symbols().collect();
        assert_eq!(symbols, vec!["a", "b"]);
    }

    #[test]
    fn test_revert_for_every_category() {
        for category in Category::ALL {
            let mut stores = Stores::new();
            stores.apply(Category::Statement, None, "x = 1;");
            stores.apply(Category::Use, Some("StdIO"), "use StdIO: all;");
            let before = stores.clone();

            let undo = stores.apply(category, Some("sym"), "text").unwrap();
            assert_ne!(stores, before, "{} apply changed nothing", category);
            stores.revert(undo);
            assert_eq!(stores, before, "{} revert was not exact", category);
        }
    }

    #[test]
    fn test_statement_blocks_are_indented() {
        let mut log = StatementLog::new();
        log.apply("a = 1;");
        log.apply("if (a == 1) {\n  a = 2;\n}");
        let blocks: Vec<&str> = log.blocks().collect();
        assert_eq!(blocks[0], "    a = 1;\n");
        assert_eq!(blocks[1], "    if (a == 1) {\n      a = 2;\n    }\n");
    }

    #[test]
    fn test_statement_revert_pops_only_last() {
        let mut log = StatementLog::new();
        log.apply("a = 1;");
        log.apply("b = 2;");
        log.revert();
        let blocks: Vec<&str> = log.blocks().collect();
        assert_eq!(blocks, vec!["    a = 1;\n"]);
    }

    #[test]
    fn test_symbol_keyed_apply_requires_symbol() {
        let mut stores = Stores::new();
        let before = stores.clone();
        assert!(stores.apply(Category::Import, None, "import StdIO: all;").is_none());
        assert_eq!(stores, before);
    }

    #[test]
    fn test_expression_slot_round_trip() {
        let mut stores = Stores::new();
        let undo = stores.apply(Category::Expression, None, "1 + 1").unwrap();
        assert_eq!(stores.expression.get(), Some("1 + 1"));
        stores.revert(undo);
        assert!(stores.expression.is_empty());
    }
}
