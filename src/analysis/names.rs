//! Canonical qualified names for namespaces and types.

use crate::model::{SymbolId, SymbolTree};

/// Build the canonical qualified name of `symbol`.
///
/// The name is assembled right to left from the symbol's own metadata name
/// up its containment chain, stopping at the global namespace. Nested types
/// are joined with `+`, everything else with `.`, so namespace `App.Models`
/// containing `Outer` containing `Inner` yields `App.Models.Outer+Inner`.
///
/// `None` and the global namespace resolve to the empty string.
pub fn qualified_name<M: SymbolTree + ?Sized>(tree: &M, symbol: Option<SymbolId>) -> String {
    let Some(symbol) = symbol else {
        return String::new();
    };
    if tree.is_global_namespace(symbol) {
        return String::new();
    }

    let mut segments: Vec<&str> = vec![tree.simple_name(symbol)];
    let mut last = symbol;
    let mut cursor = tree.containing_symbol(symbol);

    while let Some(container) = cursor {
        if tree.is_global_namespace(container) {
            break;
        }
        let separator = if tree.is_type(container) && tree.is_type(last) {
            "+"
        } else {
            "."
        };
        segments.push(separator);
        segments.push(tree.display_name(container));
        last = container;
        cursor = tree.containing_symbol(container);
    }

    segments.iter().rev().copied().collect()
}
