//! beagle-layout - print the runtime's ABI layouts
//!
//! Usage: beagle-layout [--json | --c-header] [-o FILE]

use std::fs;
use std::path::PathBuf;

use beagle::{layout, logging};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    CHeader,
}

#[derive(Debug)]
struct Options {
    format: Format,
    output: Option<PathBuf>,
}

fn usage(program: &str) -> String {
    format!(
        "Usage: {} [OPTIONS]\n\nOptions:\n  \
         --json         Emit the layout table as JSON (default)\n  \
         --c-header     Emit a C header with static assertions\n  \
         -o, --output F Write to F instead of stdout",
        program
    )
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let program = args.first().map(String::as_str).unwrap_or("beagle-layout");
    let mut options = Options {
        format: Format::Json,
        output: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--json" => options.format = Format::Json,
            "--c-header" => options.format = Format::CHeader,
            "-o" | "--output" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires an argument", args[i - 1]))?;
                options.output = Some(PathBuf::from(path));
            }
            "-h" | "--help" => return Err(usage(program)),
            other => return Err(format!("Unknown option: {}\n\n{}", other, usage(program))),
        }
        i += 1;
    }

    Ok(options)
}

fn run(options: &Options) -> Result<(), Box<dyn std::error::Error>> {
    let rendered = match options.format {
        Format::Json => layout::to_json()?,
        Format::CHeader => layout::render_c_header(),
    };

    match &options.output {
        Some(path) => {
            fs::write(path, rendered)?;
            tracing::info!(path = %path.display(), format = ?options.format, "layout written");
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&options) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("beagle-layout")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_to_json_on_stdout() {
        let options = parse_args(&args(&[])).unwrap();
        assert_eq!(options.format, Format::Json);
        assert!(options.output.is_none());
    }

    #[test]
    fn header_to_file() {
        let options = parse_args(&args(&["--c-header", "-o", "beagle.h"])).unwrap();
        assert_eq!(options.format, Format::CHeader);
        assert_eq!(options.output, Some(PathBuf::from("beagle.h")));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse_args(&args(&["--output"])).is_err());
        assert!(parse_args(&args(&["--yaml"])).is_err());
    }

    #[test]
    fn writes_the_requested_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beagle.h");
        run(&Options {
            format: Format::CHeader,
            output: Some(path.clone()),
        })
        .unwrap();
        assert!(fs::read_to_string(path).unwrap().contains("beagle_frame"));
    }
}
