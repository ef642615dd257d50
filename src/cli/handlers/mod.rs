mod init;
pub use init::cmd_init;

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io::load_config;
use crate::io::fixer::CommandFixer;
use crate::model::config::ItineraConfig;
use crate::model::itinerary::ItineraryDocument;
use crate::ops::enforce::{Enforcer, TextFixer};
use crate::ops::pipeline::{PipelineHooks, run_pipeline};
use crate::ops::{check, extract, guardrail, rationalize, sanitize};
use crate::parse::{parse_itinerary, render};

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Init(args) => cmd_init(args),
        Commands::Validate(args) => cmd_validate(args, json),
        Commands::Show(args) => cmd_show(args, json),
        Commands::Extract(args) => cmd_extract(args, &config, json),
        Commands::Render(args) => cmd_render(args),
        Commands::Rationalize(args) => cmd_rationalize(args, &config, json),
        Commands::Pois(args) => cmd_pois(args, json),
        Commands::Guard(args) => cmd_guard(args, &config, json),
        Commands::Sanitize(args) => cmd_sanitize(args, &config, json),
        Commands::Enforce(args) => cmd_enforce(args, config, json),
        Commands::Run(args) => cmd_run(args, &config, json),
    }
}

// ---------------------------------------------------------------------------
// Input helpers
// ---------------------------------------------------------------------------

/// Read a file argument, or stdin when it is absent or `-`
fn read_input(file: Option<&Path>) -> Result<String, Box<dyn std::error::Error>> {
    match file {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).map_err(|e| format!("could not read {}: {}", path.display(), e).into())
        }
        _ => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Parse canonical markdown, refusing anything the grammar rejects
fn read_document(file: Option<&Path>) -> Result<ItineraryDocument, Box<dyn std::error::Error>> {
    let markdown = read_input(file)?;
    let parsed = parse_itinerary(&markdown);
    if let Some(first) = parsed.errors.first() {
        return Err(format!(
            "input is not valid itinerary markdown ({} error(s)); first: {}",
            parsed.errors.len(),
            first
        )
        .into());
    }
    Ok(parsed.document)
}

fn print_document(doc: &ItineraryDocument, appended: Option<usize>, json: bool) -> CmdResult {
    let markdown = render(doc);
    if json {
        let out = DocumentJson {
            markdown: &markdown,
            document: doc,
            appended,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", markdown);
    }
    Ok(())
}

fn configured_fixer(config: &ItineraConfig, no_fix: bool) -> Option<CommandFixer> {
    if no_fix {
        return None;
    }
    CommandFixer::from_config(&config.enforcer)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_validate(args: InputArgs, json: bool) -> CmdResult {
    let markdown = read_input(args.file.as_deref())?;
    let result = check::validate(&markdown);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        for line in format_validation(&result) {
            println!("{}", line);
        }
    }
    if !result.valid {
        return Err(format!("{} grammar error(s)", result.errors.len()).into());
    }
    Ok(())
}

fn cmd_show(args: InputArgs, json: bool) -> CmdResult {
    let doc = read_document(args.file.as_deref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for line in format_agenda(&doc) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_extract(args: InputArgs, config: &ItineraConfig, json: bool) -> CmdResult {
    let source = read_input(args.file.as_deref())?;
    let doc = extract::extract(&source, &config.extract);
    print_document(&doc, None, json)
}

fn cmd_render(args: InputArgs) -> CmdResult {
    let text = read_input(args.file.as_deref())?;
    let doc: ItineraryDocument =
        serde_json::from_str(&text).map_err(|e| format!("could not parse document JSON: {}", e))?;
    print!("{}", render(&doc));
    Ok(())
}

fn cmd_rationalize(args: ReferenceArgs, config: &ItineraConfig, json: bool) -> CmdResult {
    let doc = read_document(args.file.as_deref())?;
    let reference = match args.reference {
        Some(path) => Some(read_input(Some(&path))?),
        None => None,
    };
    let options = rationalize::RationalizeOptions {
        schedule: &config.schedule,
        durations: &config.durations,
        reference: reference.as_deref(),
    };
    print_document(&rationalize::rationalize(&doc, &options), None, json)
}

fn cmd_pois(args: InputArgs, json: bool) -> CmdResult {
    let text = read_input(args.file.as_deref())?;
    let pois = guardrail::extract_pois_by_day(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&pois_json(&pois))?);
    } else {
        for line in format_pois(&pois) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_guard(args: GuardArgs, config: &ItineraConfig, json: bool) -> CmdResult {
    let mut doc = read_document(args.file.as_deref())?;
    let reference = read_input(Some(&args.reference))?;
    let pois = guardrail::extract_pois_by_day(&reference);
    let appended = guardrail::ensure_contains_all_pois(&mut doc, &pois, &config.schedule);
    if !json && appended > 0 {
        eprintln!("appended {} missing POI(s)", appended);
    }
    print_document(&doc, Some(appended), json)
}

fn cmd_sanitize(args: InputArgs, config: &ItineraConfig, json: bool) -> CmdResult {
    let mut doc = read_document(args.file.as_deref())?;
    sanitize::sanitize_times(&mut doc, &config.schedule);
    print_document(&doc, None, json)
}

fn cmd_enforce(args: EnforceArgs, mut config: ItineraConfig, json: bool) -> CmdResult {
    let candidate = read_input(args.file.as_deref())?;
    let source = match args.source {
        Some(path) => read_input(Some(&path))?,
        None => candidate.clone(),
    };
    if let Some(max) = args.max_attempts {
        config.enforcer.max_attempts = max;
    }

    let fixer = configured_fixer(&config, args.no_fix);
    let mut enforcer = Enforcer::new(&config.enforcer).with_extract_config(config.extract.clone());
    if let Some(fixer) = &fixer {
        enforcer = enforcer.with_fixer(fixer as &dyn TextFixer);
    }
    let outcome = enforcer.enforce(&candidate, &source);

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        if let Some(reason) = outcome.fallback_reason {
            eprintln!("fell back after {} attempt(s): {:?}", outcome.attempts, reason);
        }
        print!("{}", with_newline(&outcome.markdown));
    }
    Ok(())
}

fn cmd_run(args: RunArgs, config: &ItineraConfig, json: bool) -> CmdResult {
    let source = read_input(args.file.as_deref())?;
    let draft = match args.draft {
        Some(path) => Some(read_input(Some(&path))?),
        None => None,
    };

    let fixer = configured_fixer(config, args.no_fix);
    let hooks = PipelineHooks {
        draft: draft.as_deref(),
        fixer: fixer.as_ref().map(|f| f as &dyn TextFixer),
        cancel: None,
    };
    let out = run_pipeline(&source, config, hooks);

    if json {
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", with_newline(&out.markdown));
    }
    Ok(())
}

fn with_newline(markdown: &str) -> String {
    if markdown.ends_with('\n') {
        markdown.to_string()
    } else {
        format!("{}\n", markdown)
    }
}
