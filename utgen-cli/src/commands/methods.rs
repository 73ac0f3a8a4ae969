//! List the methods of a class

use anyhow::Result;
use colored::*;
use std::path::Path;
use utgen_engine::{all_methods, load_class, MethodUnderTest};

pub fn list(file: &Path) -> Result<()> {
    let class = load_class(file)?;
    let methods = all_methods(&class);

    println!("{} {}", "→".blue().bold(), class.qualified_name().bold());
    if methods.is_empty() {
        println!("  {} No methods declared", "!".yellow());
        return Ok(());
    }
    for method in &methods {
        println!("  {}", describe(method));
    }

    let synthesizable = methods.iter().filter(|m| m.is_synthesizable()).count();
    println!(
        "\n  {} of {} methods accept generated inputs",
        synthesizable,
        methods.len()
    );
    Ok(())
}

fn describe(method: &MethodUnderTest) -> String {
    let unsupported = method.unsupported_params();
    let status = if unsupported.is_empty() {
        "ok".green().to_string()
    } else {
        let types: Vec<String> = unsupported.iter().map(|ty| ty.to_string()).collect();
        format!("unsupported: {}", types.join(", ")).red().to_string()
    };
    format!(
        "[{}] {}{} {}  {}",
        method.ordinal(),
        if method.is_static() { "static " } else { "" },
        method.return_type(),
        method.signature(),
        status
    )
}
