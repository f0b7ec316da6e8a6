//! usdc CLI - Tool for inspecting USD Crate (.usdc) files.

use std::env;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use usdc::crate_file::{CrateFile, ReadOptions};
use usdc::sdf::{CompositionPolicy, Layer, PrimSpec, SpecObject, SpecType, TokenRegistry};

/// Install the fmt subscriber. `RUST_LOG` wins over the flag-derived level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let prog = args.first().map(String::as_str).unwrap_or("usdc");

    // Parse global flags
    let mut level = "warn";
    let mut json_output = false;
    let mut options = ReadOptions::default();
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in args.iter().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            "--info" => level = "info",
            "--json" => json_output = true,
            "--no-mmap" => options = options.with_mmap(false),
            "--strict" => options = options.with_composition(CompositionPolicy::Strict),
            _ => filtered_args.push(arg),
        }
    }
    init_logging(level);

    if filtered_args.is_empty() {
        print_usage(prog);
        return;
    }

    let result = match filtered_args[0] {
        "info" | "i" => with_file(&filtered_args, "info", |file| cmd_info(file, &options)),
        "tree" | "t" => with_file(&filtered_args, "tree", |file| cmd_tree(file, &options, json_output)),
        "sections" | "s" => with_file(&filtered_args, "sections", |file| cmd_sections(file, &options)),
        "version" | "-V" | "--version" => {
            println!("usdc {} (built {})", env!("CARGO_PKG_VERSION"), usdc::BUILD_STAMP);
            Ok(())
        }
        "help" | "h" | "-h" | "--help" => {
            print_usage(prog);
            Ok(())
        }
        other => {
            // Assume it's a file path
            if Path::new(other).exists() {
                cmd_info(other, &options)
            } else {
                eprintln!("Unknown command: {}", other);
                print_usage(prog);
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn with_file(
    args: &[&str],
    command: &str,
    run: impl FnOnce(&str) -> usdc::Result<()>,
) -> usdc::Result<()> {
    match args.get(1) {
        Some(file) => run(file),
        None => {
            eprintln!("Error: missing file argument");
            eprintln!("Usage: usdc {} <file.usdc>", command);
            std::process::exit(1);
        }
    }
}

fn print_usage(prog: &str) {
    println!("usdc - Inspect USD Crate files");
    println!();
    println!("Usage: {} [options] <command> <file.usdc>", prog);
    println!();
    println!("Commands:");
    println!("  i, info      Show version, sections and table sizes");
    println!("  t, tree      Show the prim hierarchy");
    println!("  s, sections  Show the table of contents");
    println!("  version      Show version and build date");
    println!("  h, help      Show this help");
    println!();
    println!("Options:");
    println!("  -v, --verbose  Debug output");
    println!("  -vv, --trace   Trace output (very verbose)");
    println!("  -q, --quiet    Errors only");
    println!("  --json         JSON output for tree");
    println!("  --no-mmap      Read the file into memory instead of mapping it");
    println!("  --strict       Fail on specs that are not prims");
}

fn read_crate(path: &str, options: &ReadOptions) -> usdc::Result<CrateFile> {
    info!("Opening crate: {}", path);
    CrateFile::open_opts(path, options, TokenRegistry::shared())
}

fn cmd_info(path: &str, options: &ReadOptions) -> usdc::Result<()> {
    let file = read_crate(path, options)?;
    let layer = Layer::from_crate(&file, options)?;
    debug!("Layer composed");

    let prims = layer.traverse().count() - 1;
    let mut by_type: Vec<(SpecType, usize)> = Vec::new();
    for object in layer.objects() {
        let ty = object.spec_type();
        match by_type.iter_mut().find(|(t, _)| *t == ty) {
            Some((_, n)) => *n += 1,
            None => by_type.push((ty, 1)),
        }
    }

    println!("File:      {}", path);
    println!("Version:   {}", file.version());
    println!("Sections:  {}", file.sections().len());
    println!("Tokens:    {}", file.tokens().len());
    println!("Strings:   {}", file.string_indices().len());
    println!("Fields:    {}", file.fields().len());
    println!("FieldSets: {}", file.field_sets().map_or(0, |s| s.len()));
    println!("Paths:     {}", file.paths().len());
    println!("Specs:     {}", file.specs().len());
    println!("Prims:     {}", prims);
    for (ty, n) in by_type {
        println!("  {:<20} {}", ty, n);
    }
    Ok(())
}

fn cmd_sections(path: &str, options: &ReadOptions) -> usdc::Result<()> {
    let file = read_crate(path, options)?;
    println!("{:<16} {:>12} {:>12}", "NAME", "START", "END");
    for section in file.sections() {
        let marker = if section.is_known() { "" } else { "  (skipped)" };
        println!(
            "{:<16} {:>#12x} {:>#12x}{}",
            section.name, section.start, section.end, marker
        );
    }
    Ok(())
}

fn cmd_tree(path: &str, options: &ReadOptions, json_output: bool) -> usdc::Result<()> {
    let file = read_crate(path, options)?;
    let layer = Layer::from_crate(&file, options)?;

    if json_output {
        let tree = prim_json(&layer, layer.pseudo_root());
        match serde_json::to_string_pretty(&tree) {
            Ok(text) => println!("{}", text),
            Err(e) => return Err(usdc::Error::other(e.to_string())),
        }
        return Ok(());
    }

    print_prim(&layer, layer.pseudo_root(), 0);
    Ok(())
}

fn print_prim(layer: &Layer, prim: &PrimSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    if prim.is_pseudo_root() {
        println!("/");
    } else {
        println!("{}{} {} ({} fields)", indent, prim.specifier(), prim.name(), prim.spec().fields().len());
    }
    print_properties(layer, prim, depth + 1);
    for child in layer.name_children(prim) {
        print_prim(layer, child, depth + 1);
    }
}

/// Recorded non-prim specs directly under `prim`.
fn properties_of<'a>(layer: &'a Layer, prim: &'a PrimSpec) -> impl Iterator<Item = &'a SpecObject> + 'a {
    layer.objects().iter().filter(move |object| {
        matches!(object, SpecObject::Other(_))
            && object.path().parent().as_ref() == Some(prim.path())
    })
}

fn print_properties(layer: &Layer, prim: &PrimSpec, depth: usize) {
    let indent = "  ".repeat(depth);
    for object in properties_of(layer, prim) {
        println!("{}.{} [{}]", indent, object.path().name(), object.spec_type());
    }
}

fn prim_json(layer: &Layer, prim: &PrimSpec) -> Value {
    let properties: Vec<Value> = properties_of(layer, prim)
        .map(|object| {
            json!({
                "name": object.path().name(),
                "type": object.spec_type().name(),
            })
        })
        .collect();
    let children: Vec<Value> = layer
        .name_children(prim)
        .map(|child| prim_json(layer, child))
        .collect();
    let fields: Vec<&str> = prim.spec().list_fields().map(|t| t.as_str()).collect();

    json!({
        "name": prim.name(),
        "path": prim.path().as_str(),
        "specifier": prim.specifier().keyword(),
        "fields": fields,
        "properties": properties,
        "children": children,
    })
}
