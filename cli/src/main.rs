//! depmatch CLI: driving adapter for the depmatch pattern engine.
//!
//! Subcommands:
//! - `match <pattern> <value>...`: compile one segment and test values against it
//! - `check <config>`: validate a projection-set config
//! - `project <config> [--strategy S] [--side left|right] [items-file]`: project items
//!
//! Logging goes to stderr, filtered by `RUST_LOG`.

use std::io::{self, BufRead, BufReader, Write};
use std::process;

use depmatch::{
    compile_segment, PatternError, PatternRegistry, ProjectionSet, ProjectionSetConfig,
    ProjectorStrategy, RegistryBuilder, SegmentOptions, Side,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "match" => cmd_match(&args[2..]),
        "check" => cmd_check(&args[2..]),
        "project" => cmd_project(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("error: unknown command \"{other}\"");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Commands
// ═══════════════════════════════════════════════════════════════════════════════

fn cmd_match(args: &[String]) -> Result<(), String> {
    let (options, rest) = parse_match_args(args)?;
    let Some((pattern, values)) = rest.split_first() else {
        return Err("match requires a pattern".into());
    };

    let matcher = compile_segment(pattern, &options).map_err(|e| e.to_string())?;
    println!("kind:   {}", matcher.kind());
    println!("prefix: {:?}", matcher.known_fixed_prefix());
    println!("suffix: {:?}", matcher.known_fixed_suffix());
    println!("groups: {}", matcher.group_count());

    for value in values {
        let result = matcher.matches(value, &[]);
        if result.success {
            println!("{value}\tmatch\t{:?}", result.groups);
        } else {
            println!("{value}\tno match");
        }
    }
    Ok(())
}

fn cmd_check(args: &[String]) -> Result<(), String> {
    let [config_path] = args else {
        return Err("check requires exactly one config file path".into());
    };

    let config = load_config(config_path)?;
    debug!(path = %config_path, projections = config.projections.len(), "loaded config");
    let set = build_registry()
        .load_projection_set(config)
        .map_err(|e| format!("config invalid: {e}"))?;

    println!(
        "Config valid: {} projections from {} to {} ({})",
        set.len(),
        set.source_type(),
        set.target_type(),
        set.strategy()
    );
    Ok(())
}

fn cmd_project(args: &[String]) -> Result<(), String> {
    let opts = parse_project_args(args)?;

    let mut config = load_config(&opts.config)?;
    if let Some(strategy) = opts.strategy {
        config.strategy = strategy;
    }
    let mut set = build_registry()
        .load_projection_set(config)
        .map_err(|e| format!("config load failed: {e}"))?;

    let reader: Box<dyn BufRead> = match &opts.items {
        Some(path) => Box::new(BufReader::new(
            std::fs::File::open(path).map_err(|e| format!("failed to open \"{path}\": {e}"))?,
        )),
        None => Box::new(io::stdin().lock()),
    };

    let summary = project_lines(&mut set, reader, opts.side, &mut io::stdout().lock())?;
    info!(
        items = summary.items,
        projected = summary.projected,
        strategy = %set.strategy(),
        "projection finished"
    );
    Ok(())
}

/// Counts reported at the end of a `project` run.
#[derive(Debug, Default, PartialEq, Eq)]
struct ProjectSummary {
    items: usize,
    projected: usize,
}

/// Project one item per non-blank line, writing `item<TAB>target` lines.
fn project_lines(
    set: &mut ProjectionSet,
    reader: impl BufRead,
    side: Side,
    out: &mut impl Write,
) -> Result<ProjectSummary, String> {
    let mut summary = ProjectSummary::default();
    for line in reader.lines() {
        let line = line.map_err(|e| format!("failed to read items: {e}"))?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        summary.items += 1;
        let item = set.parse_item(text);
        let written = match set.project(&item, side) {
            Some(target) => {
                summary.projected += 1;
                debug!(item = text, target = %target, "projected");
                writeln!(out, "{text}\t{target}")
            }
            None => {
                debug!(item = text, "no projection");
                writeln!(out, "{text}\t(no projection)")
            }
        };
        written.map_err(|e| format!("failed to write output: {e}"))?;
    }
    Ok(summary)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry assembly (composition root)
// ═══════════════════════════════════════════════════════════════════════════════

/// Item types come from the config file itself.
fn build_registry() -> PatternRegistry {
    RegistryBuilder::new().build()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Config loading
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(path: &str) -> Result<ProjectionSetConfig, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("failed to read \"{path}\": {e}"))?;

    let is_json = std::path::Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content).map_err(|e| format!("JSON parse error: {e}"))
    } else {
        // Default to YAML (handles .yaml and .yml)
        serde_yaml::from_str(&content).map_err(|e| format!("YAML parse error: {e}"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Argument parsing
// ═══════════════════════════════════════════════════════════════════════════════

fn parse_match_args(args: &[String]) -> Result<(SegmentOptions, &[String]), String> {
    let mut options = SegmentOptions::default();
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        match arg.as_str() {
            "--ignore-case" | "-i" => options = options.ignore_case(true),
            _ if arg.starts_with("--") => return Err(format!("unexpected argument \"{arg}\"")),
            _ => break,
        }
        i += 1;
    }
    Ok((options, &args[i..]))
}

#[derive(Debug, PartialEq, Eq)]
struct ProjectArgs {
    config: String,
    strategy: Option<ProjectorStrategy>,
    side: Side,
    items: Option<String>,
}

fn parse_project_args(args: &[String]) -> Result<ProjectArgs, String> {
    let mut positional = Vec::new();
    let mut strategy = None;
    let mut side = Side::Left;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--strategy" => {
                let value = iter.next().ok_or("--strategy requires a value")?;
                strategy = Some(value.parse().map_err(|e: PatternError| e.to_string())?);
            }
            "--side" => {
                let value = iter.next().ok_or("--side requires a value")?;
                side = value.parse().map_err(|e: PatternError| e.to_string())?;
            }
            _ if arg.starts_with("--") => return Err(format!("unexpected argument \"{arg}\"")),
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let config = positional
        .next()
        .ok_or("project requires a config file path")?;
    let items = positional.next();
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument \"{extra}\""));
    }

    Ok(ProjectArgs {
        config,
        strategy,
        side,
        items,
    })
}

fn print_usage() {
    eprintln!(
        "Usage: depmatch <command> [options]

Commands:
  match [-i] <pattern> <value>...          Compile one segment and test values
  check <config>                           Validate a projection-set config
  project <config> [items-file]            Project items (stdin when no file)
      --strategy simple|first_letter|prefix_trie
      --side left|right                    (default: left)
  help                                     Show this help

Set RUST_LOG=debug to see compilation details."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn parse_match_plain() {
        let a = args(&["Acme.**", "Acme.Core"]);
        let (options, rest) = parse_match_args(&a).unwrap();
        assert_eq!(options, SegmentOptions::default());
        assert_eq!(rest, &a[..]);
    }

    #[test]
    fn parse_match_ignore_case() {
        let a = args(&["-i", "acme"]);
        let (options, rest) = parse_match_args(&a).unwrap();
        assert!(options.ignore_case);
        assert_eq!(rest, &a[1..]);
    }

    #[test]
    fn parse_match_unknown_flag() {
        assert!(parse_match_args(&args(&["--fast", "x"])).is_err());
    }

    #[test]
    fn parse_project_defaults() {
        let parsed = parse_project_args(&args(&["rules.yaml"])).unwrap();
        assert_eq!(
            parsed,
            ProjectArgs {
                config: "rules.yaml".into(),
                strategy: None,
                side: Side::Left,
                items: None,
            }
        );
    }

    #[test]
    fn parse_project_all_options() {
        let parsed = parse_project_args(&args(&[
            "rules.json",
            "--strategy",
            "first-letter",
            "--side",
            "used",
            "items.txt",
        ]))
        .unwrap();
        assert_eq!(parsed.strategy, Some(ProjectorStrategy::FirstLetter));
        assert_eq!(parsed.side, Side::Right);
        assert_eq!(parsed.items.as_deref(), Some("items.txt"));
    }

    #[test]
    fn parse_project_errors() {
        assert!(parse_project_args(&[]).is_err());
        assert!(parse_project_args(&args(&["rules.yaml", "--strategy"])).is_err());
        assert!(parse_project_args(&args(&["rules.yaml", "--strategy", "fastest"])).is_err());
        assert!(parse_project_args(&args(&["a", "b", "c"])).is_err());
    }

    #[test]
    fn project_lines_counts_and_formats() {
        let config: ProjectionSetConfig = serde_yaml::from_str(
            r"
item_types:
  - name: CLASS
    fields: [NAMESPACE, NAME]
  - name: MODULE
    fields: [NAME]
source_type: CLASS
target_type: MODULE
projections:
  - pattern: 'Acme.(*).**:*'
    target: '\1'
  - pattern: 'System.**:*'
    target: runtime
    side: right
",
        )
        .unwrap();
        let mut set = build_registry().load_projection_set(config).unwrap();

        let input = "Acme.Billing.Model:Invoice\n\n  System.IO:File  \n";
        let mut out = Vec::new();
        let summary = project_lines(&mut set, input.as_bytes(), Side::Left, &mut out).unwrap();

        assert_eq!(summary, ProjectSummary { items: 2, projected: 1 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Acme.Billing.Model:Invoice\tBilling\nSystem.IO:File\t(no projection)\n"
        );
    }

    #[test]
    fn load_config_missing_file() {
        let err = load_config("/nonexistent/rules.yaml").unwrap_err();
        assert!(err.contains("failed to read"));
    }
}
