//! Program synthesis from the accumulated stores.

use crate::classify::Category;
use crate::store::{Stores, SymbolStore};

/// Stands in for the pending expression when the program is shown to the user.
pub const PRINT_PLACEHOLDER: &str = "    /* StdIO::print ( your expression here ); */\n";

/// Render the complete program for the current state.
///
/// Sections appear in fixed order: uses, imports, typedefs, functions, then
/// `main` with every statement, the pending expression (or `placeholder` if
/// there is none) and the closing `return`. Pure and deterministic.
pub fn synthesize(stores: &Stores, placeholder: &str) -> String {
    let mut program = String::new();

    for category in Category::ALL {
        if let Some(store) = stores.symbols(category) {
            section(&mut program, category, store);
        }
    }

    program.push_str("\nint main () {\n");
    for block in stores.statements.blocks() {
        program.push_str(block);
    }

    match stores.expression.get() {
        Some(expr) => {
            program.push_str("\n    StdIO::print (");
            program.push_str(expr);
            program.push_str(");\n");
        }
        None => program.push_str(placeholder),
    }

    program.push_str("    return 0;\n}");
    program
}

fn section(program: &mut String, category: Category, store: &SymbolStore) {
    program.push_str(&format!("\n// {}s\n", category));
    let values: Vec<&str> = store.values().collect();
    program.push_str(&values.join("\n"));
    program.push('\n');
}
