//! motto – command-line template → PDF renderer.
//!
//! Usage:
//!   motto <template.html> [data.json] [output.pdf] [--font PATH]... [--system-fonts]
//!         [--resources DIR] [--list-fonts]
//!
//! The top-level object of `data.json` is merged into the template. If
//! `output.pdf` is omitted the PDF is written next to the template with the
//! same stem (e.g. `record.html` → `record.pdf`).

use std::{env, fs, path::PathBuf, process};

use motto_html::{BuilderConfig, DocumentBuilder, FontRegistry};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut positionals: Vec<PathBuf> = Vec::new();
    let mut fonts: Vec<String> = Vec::new();
    let mut system_fonts = false;
    let mut list_fonts = false;
    let mut resources: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--font" | "-f" => match iter.next() {
                Some(v) => fonts.push(v.clone()),
                None => fail(&args[0], "--font needs a path"),
            },
            "--resources" | "-r" => match iter.next() {
                Some(v) => resources = Some(PathBuf::from(v)),
                None => fail(&args[0], "--resources needs a directory"),
            },
            "--system-fonts" => system_fonts = true,
            "--list-fonts" => list_fonts = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => fail(&args[0], &format!("Unknown flag: {other}")),
            path => {
                if positionals.len() == 3 {
                    fail(&args[0], &format!("Unexpected argument: {path}"));
                }
                positionals.push(PathBuf::from(path));
            }
        }
    }

    let registry = FontRegistry::global();
    if system_fonts {
        registry.load_preinstalled_fonts();
    }
    for font in &fonts {
        if let Err(e) = registry.add_font(font) {
            eprintln!("Error loading font '{font}': {e}");
            process::exit(1);
        }
    }

    if list_fonts {
        for family in registry.list_font_family() {
            println!("{family}");
        }
        if positionals.is_empty() {
            return;
        }
    }

    let mut positionals = positionals.into_iter();
    let template = match positionals.next() {
        Some(p) => p,
        None => fail(&args[0], "Error: no template file specified."),
    };
    // A second positional ending in .pdf is the output; anything else is data.
    let (data, output) = match (positionals.next(), positionals.next()) {
        (Some(a), None) if is_pdf(&a) => (None, Some(a)),
        (a, b) => (a, b),
    };

    let output = output.unwrap_or_else(|| {
        let mut o = template.clone();
        o.set_extension("pdf");
        o
    });

    let data = match data {
        Some(path) => match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(v) => Some(v),
                Err(e) => {
                    eprintln!("Error parsing '{}': {e}", path.display());
                    process::exit(1);
                }
            },
            Err(e) => {
                eprintln!("Error reading '{}': {e}", path.display());
                process::exit(1);
            }
        },
        None => None,
    };

    let template_dir = template
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let template_name = match template.file_name().and_then(|s| s.to_str()) {
        Some(name) => name.to_string(),
        None => fail(&args[0], "Error: template path has no file name."),
    };
    let config = BuilderConfig::default()
        .with_template_root(&template_dir)
        .with_resource_root(resources.unwrap_or(template_dir));

    let mut builder = DocumentBuilder::with_config(config);
    let loaded = builder.load_template(&template_name).and_then(|b| match data {
        Some(v) => b.merge_json(v),
        None => Ok(b),
    });
    if let Err(e) = loaded {
        eprintln!("Error loading '{}': {e}", template.display());
        process::exit(1);
    }

    match builder.render_pdf() {
        Ok(bytes) => {
            // Create output directory if necessary.
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        eprintln!("Error creating output directory: {e}");
                        process::exit(1);
                    }
                }
            }
            if let Err(e) = fs::write(&output, &bytes) {
                eprintln!("Error writing '{}': {e}", output.display());
                process::exit(1);
            }
            eprintln!("Wrote '{}' ({} bytes)", output.display(), bytes.len());
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

fn is_pdf(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn fail(prog: &str, msg: &str) -> ! {
    eprintln!("{msg}");
    print_usage(prog);
    process::exit(1);
}

fn print_usage(prog: &str) {
    eprintln!("motto – Handlebars template to PDF renderer (motto-html)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <template.html> [data.json] [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <template.html>  Handlebars template to render");
    eprintln!("  [data.json]      JSON object whose entries are merged into the template");
    eprintln!("  [output.pdf]     Output path  (default: same stem as template with .pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --font, -f PATH       Register a font file (PATH,INDEX for collections); repeatable");
    eprintln!("  --system-fonts        Register every font installed on this machine");
    eprintln!("  --resources, -r DIR   Root for resources:// images (default: template directory)");
    eprintln!("  --list-fonts          Print registered font families");
    eprintln!("  --help                Print this message");
}
