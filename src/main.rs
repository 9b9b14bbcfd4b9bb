//! Filterstack CLI - replay a saved filter stack against an image.
//!
//! `run` commits every request in the stack file, writes the composed image
//! to `--output` (default `<image>.out.png`) and prints its size, the stack
//! fingerprint and cache statistics.
//!
//! A stack file is a JSON array of filter requests, the same shape the
//! editor's dialogs emit:
//!
//! ```json
//! [
//!   {"library": "opencv", "name": "gaussian", "parameter": {"kernel_size": 5}},
//!   {"library": "opencv", "name": "threshold", "parameter": {"method": "Otsu's Binarization"}}
//! ]
//! ```

use anyhow::{bail, Context, Result};
use filterstack::prelude::*;
use std::path::{Path, PathBuf};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("filterstack");

    if args.len() < 2 {
        print_usage(program);
        return;
    }

    let result = match args[1].as_str() {
        "list" => list_filters(args.get(2).map(String::as_str)),
        "info" => match (args.get(2), args.get(3)) {
            (Some(library), Some(name)) => filter_info(library, name),
            _ => Err(anyhow::anyhow!("usage: {} info <library> <name>", program)),
        },
        "fingerprint" => match args.get(2) {
            Some(path) => fingerprint(Path::new(path)),
            None => Err(anyhow::anyhow!("usage: {} fingerprint <stack.json>", program)),
        },
        "run" => run(&args[2..]),
        "help" | "--help" | "-h" => {
            print_usage(program);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage(program);
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        std::process::exit(1);
    }
}

fn print_usage(program: &str) {
    println!("Filterstack v{}", filterstack::VERSION);
    println!();
    println!("Usage: {} <command> [options]", program);
    println!();
    println!("Commands:");
    println!("  list [library]                 List available filters");
    println!("  info <library> <name>          Show parameters of a filter");
    println!("  fingerprint <stack.json>       Print the cache key of a stack");
    println!("  run <image> <stack.json>       Apply a stack to an image");
    println!("  help                           Show this help message");
    println!();
    println!("Run options:");
    println!("  --output <path>     Where to write the result (default: <image>.out.png)");
    println!("  --config <path>     TOML editor configuration");
    println!("  --color             Keep color instead of loading as grayscale");
}

fn list_filters(library: Option<&str>) -> Result<()> {
    let registry = FilterRegistry::with_builtins();
    let libraries: Vec<Library> = match library {
        Some(name) => vec![name.parse()?],
        None => registry.libraries().collect(),
    };

    println!("Available filters ({} total):", registry.len());
    for library in libraries {
        println!();
        println!("[{}]", library);
        let grouped = registry.grouped_by_category(library);
        if grouped.is_empty() {
            println!("  (no filters)");
        }
        for (category, filters) in grouped {
            println!("  {}", category.display_name());
            for metadata in filters {
                println!("    {:<26} {}", metadata.name, metadata.description);
            }
        }
    }
    Ok(())
}

fn filter_info(library: &str, name: &str) -> Result<()> {
    let registry = FilterRegistry::with_builtins();
    let library: Library = library.parse()?;
    let metadata = registry
        .get_metadata(library, &name.to_lowercase())
        .with_context(|| format!("filter not found: {}/{} (use 'list' to see available filters)", library, name))?;

    println!("Filter: {}", metadata.display_name);
    println!("Library: {}", metadata.library);
    println!("Name: {}", metadata.name);
    println!("Category: {}", metadata.category.display_name());
    println!("Signal: {}", metadata.signal());
    println!();
    println!("Description:");
    println!("  {}", metadata.description);

    if !metadata.parameters.is_empty() {
        println!();
        println!("Parameters:");
        for param in &metadata.parameters {
            println!("  {} [{}] = {}", param.name, param.default_value.type_name(), param.default_value);
            if !param.description.is_empty() {
                println!("    {}", param.description);
            }
        }
    }
    Ok(())
}

fn load_stack(path: &Path) -> Result<Vec<FilterRequest>> {
    let source = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let requests: Vec<FilterRequest> =
        serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))?;
    Ok(requests)
}

fn fingerprint(path: &Path) -> Result<()> {
    let specs = load_stack(path)?
        .into_iter()
        .map(FilterSpec::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", Fingerprint::of(&specs));
    Ok(())
}

fn run(args: &[String]) -> Result<()> {
    if args.len() < 2 {
        bail!("usage: run <image> <stack.json> [--output <path>] [--config <path>] [--color]");
    }
    let input = PathBuf::from(&args[0]);
    let stack_path = PathBuf::from(&args[1]);

    let mut output: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut color = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--output" if i + 1 < args.len() => {
                output = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                config_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--color" => {
                color = true;
                i += 1;
            }
            other => bail!("unknown option: {}", other),
        }
    }

    let mut config = match &config_path {
        Some(path) => EditorConfig::from_path(path)?,
        None => EditorConfig::default(),
    };
    if color {
        config.load.grayscale = false;
    }

    let requests = load_stack(&stack_path)?;
    let mut workspace = Workspace::with_config(FilterRegistry::with_builtins().into_shared(), config);
    let doc = workspace
        .open_path(&input)
        .with_context(|| format!("opening {}", input.display()))?;

    for request in requests {
        let label = format!("{}/{}", request.library, request.name);
        workspace
            .dispatch(doc, SessionEvent::Apply(request))
            .with_context(|| format!("applying {}", label))?;
        println!("  applied {}", label);
    }

    let document = workspace
        .document(doc)
        .with_context(|| format!("document {} disappeared", doc))?;
    let stack = document.stack();
    let output = output.unwrap_or_else(|| input.with_extension("out.png"));
    stack
        .current_image()
        .image()
        .save(&output)
        .with_context(|| format!("writing {}", output.display()))?;

    let image = stack.current_image();
    let stats = stack.cache_stats();
    println!("Wrote {} ({}x{})", output.display(), image.width(), image.height());
    println!("  stages:      {}", stack.len());
    println!("  fingerprint: {}", stack.fingerprint());
    println!(
        "  cache:       {} entries, {} hits, {} misses ({:.0}% hit ratio)",
        stack.cache_len(),
        stats.hits,
        stats.misses,
        stats.hit_ratio() * 100.0
    );
    Ok(())
}
