//! Range-bound symbol tables.
//!
//! The resolver opens one scope per statement and one for each nested
//! construct (subqueries, WHERE, VALUES, ...). Scopes live in an arena so the
//! tree can be kept after resolution and queried by cursor position.

use std::collections::HashMap;

use smallvec::SmallVec;
use sqlfront_error::{Pos, Range};
use sqlfront_types::{ColumnId, TableId};

/// Handle to a scope within its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const ROOT: Self = Self(0);
}

/// What one lowercase name means inside a scope. A name may denote a table
/// and a column at the same time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Symbol {
    pub tables: SmallVec<[TableId; 1]>,
    pub columns: SmallVec<[ColumnId; 2]>,
}

#[derive(Debug, Clone)]
pub struct Scope {
    /// Half-open `[start, end)` region of source text.
    pub range: Range,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(&name.to_ascii_lowercase())
    }

    /// Names bound directly in this scope, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Arena of nested scopes rooted at one module scope.
#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// A tree holding only the module scope covering `range`.
    #[must_use]
    pub fn new(range: Range) -> Self {
        Self {
            scopes: vec![Scope {
                range,
                parent: None,
                children: Vec::new(),
                symbols: HashMap::new(),
            }],
        }
    }

    /// Open a child of `parent`. The range is clipped to the parent's so a
    /// child never extends past it.
    pub fn push(&mut self, parent: ScopeId, range: Range) -> ScopeId {
        let outer = self.get(parent).range;
        let start = range.start.clamp(outer.start, outer.end);
        let end = range.end.clamp(start, outer.end);
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            range: Range::new(start, end),
            parent: Some(parent),
            children: Vec::new(),
            symbols: HashMap::new(),
        });
        self.scopes[parent.0 as usize].children.push(id);
        id
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        // The module scope always exists.
        false
    }

    pub fn bind_table(&mut self, scope: ScopeId, name: &str, table: TableId) {
        let symbol = self.symbol_mut(scope, name);
        if !symbol.tables.contains(&table) {
            symbol.tables.push(table);
        }
    }

    pub fn bind_column(&mut self, scope: ScopeId, name: &str, column: ColumnId) {
        let symbol = self.symbol_mut(scope, name);
        if !symbol.columns.contains(&column) {
            symbol.columns.push(column);
        }
    }

    fn symbol_mut(&mut self, scope: ScopeId, name: &str) -> &mut Symbol {
        self.scopes[scope.0 as usize]
            .symbols
            .entry(name.to_ascii_lowercase())
            .or_default()
    }

    /// Innermost scope, starting at `scope` and walking outwards, that binds
    /// `name` to something accepted by `wanted`.
    #[must_use]
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        wanted: impl Fn(&Symbol) -> bool,
    ) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        self.ancestors(scope)
            .filter_map(|id| self.get(id).symbols.get(&key))
            .find(|symbol| wanted(symbol))
    }

    /// `scope` followed by each of its ancestors up to the module scope.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(scope), |&id| self.get(id).parent)
    }

    /// Every name visible from `scope`, inner bindings shadowing outer ones.
    #[must_use]
    pub fn visible(&self, scope: ScopeId) -> Vec<(&str, &Symbol)> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for id in self.ancestors(scope) {
            for (name, symbol) in &self.get(id).symbols {
                if seen.insert(name.as_str()) {
                    out.push((name.as_str(), symbol));
                }
            }
        }
        out.sort_unstable_by(|a, b| a.0.cmp(b.0));
        out
    }

    /// The innermost scope containing `pos`. Falls back to the module scope.
    ///
    /// The end of each range is inclusive here, so a cursor just past the
    /// last character of a query still sees that query's names. When `pos`
    /// is the end of one sibling and the start of the next, the later sibling
    /// wins, which matches half-open containment wherever the two disagree.
    /// Among overlapping siblings the smallest one wins.
    #[must_use]
    pub fn scope_at(&self, pos: Pos) -> ScopeId {
        let mut current = ScopeId::ROOT;
        loop {
            let next = self
                .get(current)
                .children
                .iter()
                .copied()
                .filter(|&c| self.get(c).range.touches(pos))
                .min_by(|&a, &b| {
                    let (ra, rb) = (self.get(a).range, self.get(b).range);
                    rb.start.cmp(&ra.start).then_with(|| ra.end.cmp(&rb.end))
                });
            match next {
                Some(child) => current = child,
                None => return current,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(a: (u32, u32), b: (u32, u32)) -> Range {
        Range::new(Pos::new(a.0, a.1), Pos::new(b.0, b.1))
    }

    #[test]
    fn scope_at_finds_innermost() {
        let mut tree = ScopeTree::new(range((0, 0), (30, 0)));
        let stmt = tree.push(ScopeId::ROOT, range((10, 0), (20, 5)));
        let sub = tree.push(stmt, range((12, 4), (14, 0)));
        assert_eq!(tree.scope_at(Pos::new(13, 0)), sub);
        assert_eq!(tree.scope_at(Pos::new(15, 0)), stmt);
        assert_eq!(tree.scope_at(Pos::new(25, 0)), ScopeId::ROOT);
    }

    #[test]
    fn scope_at_range_boundaries() {
        let mut tree = ScopeTree::new(range((0, 0), (9, 0)));
        let first = tree.push(ScopeId::ROOT, range((0, 0), (0, 20)));
        let second = tree.push(ScopeId::ROOT, range((0, 20), (0, 40)));
        let sub = tree.push(second, range((0, 25), (0, 30)));
        assert_eq!(tree.scope_at(Pos::new(0, 19)), first);
        assert_eq!(tree.scope_at(Pos::new(0, 20)), second);
        assert_eq!(tree.scope_at(Pos::new(0, 30)), sub);
        assert_eq!(tree.scope_at(Pos::new(0, 31)), second);
        assert_eq!(tree.scope_at(Pos::new(0, 40)), second);
        assert_eq!(tree.scope_at(Pos::new(0, 41)), ScopeId::ROOT);
    }

    #[test]
    fn children_are_clipped_to_parent() {
        let mut tree = ScopeTree::new(range((0, 0), (5, 0)));
        let stmt = tree.push(ScopeId::ROOT, range((1, 0), (3, 0)));
        let wide = tree.push(stmt, range((0, 0), (9, 0)));
        assert_eq!(tree.get(wide).range, range((1, 0), (3, 0)));
    }

    #[test]
    fn lookup_walks_outwards_case_insensitively() {
        let mut tree = ScopeTree::new(range((0, 0), (9, 0)));
        let outer = tree.push(ScopeId::ROOT, range((0, 0), (9, 0)));
        let inner = tree.push(outer, range((1, 0), (2, 0)));
        tree.bind_table(outer, "Customers", TableId(0));
        tree.bind_column(inner, "id", ColumnId(3));

        let found = tree.lookup(inner, "CUSTOMERS", |s| !s.tables.is_empty());
        assert_eq!(found.unwrap().tables.as_slice(), &[TableId(0)]);
        assert!(tree.lookup(outer, "id", |s| !s.columns.is_empty()).is_none());
        assert_eq!(tree.visible(inner).len(), 2);
    }

    #[test]
    fn same_name_can_bind_table_and_column() {
        let mut tree = ScopeTree::new(range((0, 0), (1, 0)));
        tree.bind_table(ScopeId::ROOT, "t", TableId(1));
        tree.bind_column(ScopeId::ROOT, "t", ColumnId(7));
        let symbol = tree.get(ScopeId::ROOT).symbol("t").unwrap();
        assert_eq!(symbol.tables.len(), 1);
        assert_eq!(symbol.columns.len(), 1);
    }
}
