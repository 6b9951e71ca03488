//! Check field mapping declarations and show how each one projects onto the attribute tree.
//!
//! Usage:
//!   scim_tag [OPTIONS] [DECLARATION ...]
//!   scim_tag < declarations.txt
//!
//! Arguments are declarations for a field named `field`. On stdin, each non-empty line is
//! `IDENT [DECLARATION]`; lines starting with `#` are skipped. A line with only an identifier
//! shows the default mapping of that field.
//!
//! Options:
//!   --human, -H  Human-readable output
//!
//! Exits with status 1 if any declaration is rejected. Set `RUST_LOG=debug` to see
//! options that were ignored.

use scim_marshal::{FieldSpec, Index, Shape};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

fn shape_id(shape: Shape) -> &'static str {
    match shape {
        Shape::Simple => "simple",
        Shape::SimpleMultiValued => "simple-multi-valued",
        Shape::Complex => "complex",
        Shape::ComplexMultiValued => "complex-multi-valued",
    }
}

fn format_indexes(indexes: &[Index]) -> String {
    indexes
        .iter()
        .map(|i| match i {
            Index::At(n) => n.to_string(),
            Index::All => "all".to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn print_spec(location: &str, spec: &FieldSpec, style: OutputStyle) {
    let mut flags = Vec::new();
    if spec.multi_valued {
        flags.push("mV");
    }
    if spec.allow_zero {
        flags.push("zero");
    }
    if spec.ignore {
        flags.push("ignore");
    }
    match style {
        OutputStyle::Compact => {
            let mut line = format!("{}: {} {}", location, shape_id(spec.shape()), spec.name);
            if let Some(sub) = &spec.sub {
                line.push('.');
                line.push_str(&sub.name);
                if sub.multi_valued {
                    line.push_str(" _mV");
                }
                if !sub.indexes.is_empty() {
                    line.push_str(&format!(" _i={}", format_indexes(&sub.indexes)));
                }
            }
            for flag in &flags {
                line.push(' ');
                line.push_str(flag);
            }
            if !spec.indexes.is_empty() {
                line.push_str(&format!(" i={}", format_indexes(&spec.indexes)));
            }
            println!("{}", line);
        }
        OutputStyle::Human => {
            println!("  {}", location);
            println!("    attribute: {}", spec.name);
            println!("    shape:     {}", shape_id(spec.shape()));
            if let Some(sub) = &spec.sub {
                println!(
                    "    sub:       {}{}",
                    sub.name,
                    if sub.multi_valued { " (multi-valued)" } else { "" }
                );
                if !sub.indexes.is_empty() {
                    println!("    sub slots: {}", format_indexes(&sub.indexes));
                }
            }
            if !flags.is_empty() {
                println!("    flags:     {}", flags.join(", "));
            }
            if !spec.indexes.is_empty() {
                println!("    slots:     {}", format_indexes(&spec.indexes));
            }
        }
    }
}

/// Parses one declaration and prints the outcome. Returns false if it was rejected.
fn check(location: &str, ident: &str, decl: Option<&str>, style: OutputStyle) -> bool {
    match FieldSpec::parse(ident, decl) {
        Ok(spec) => {
            print_spec(location, &spec, style);
            true
        }
        Err(e) => {
            println!("{}: error: {}", location, e);
            false
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };

    let mut checked = 0usize;
    let mut rejected = 0usize;

    if args.is_empty() {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        for (n, line) in src.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (ident, decl) = match line.split_once(char::is_whitespace) {
                Some((ident, decl)) => (ident, Some(decl.trim())),
                None => (line, None),
            };
            checked += 1;
            if !check(&format!("<stdin>:{}", n + 1), ident, decl, style) {
                rejected += 1;
            }
        }
    } else {
        for decl in &args {
            checked += 1;
            if !check(&format!("{:?}", decl), "field", Some(decl), style) {
                rejected += 1;
            }
        }
    }

    if rejected > 0 {
        eprintln!("scim_tag: {} of {} declaration(s) rejected", rejected, checked);
        std::process::exit(1);
    }
    Ok(())
}
