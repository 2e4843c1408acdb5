// Copyright 2025 IRuby Developers
// SPDX-License-Identifier: Apache-2.0

//! Session adapter diagnostics.
//!
//! Probes every built-in backend, prints why each one is or is not usable and
//! which one a kernel started with the same configuration would pick. With
//! `--bind` it also binds the five kernel channels and prints the resulting
//! connection info. Exits 1 when resolution fails.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use iruby_config::{load_config, validate_config};
use iruby_observability::{debug_flags_help, init_logging, parse_debug_flags};
use iruby_session_adapter::{select_adapter_class, AdapterRegistry, KernelChannels};

struct Args {
    config: Option<PathBuf>,
    adapter: Option<String>,
    bind: bool,
}

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: session_adapters [--config <path>] [--adapter <name>] [--bind]\n\n\
         Options:\n\
         - config: iruby_configuration.toml to load (default: search)\n\
         - adapter: force a backend, as IRUBY_SESSION_ADAPTER would\n\
         - bind: bind all kernel channels and print the connection info\n\n\
         {}",
        debug_flags_help()
    );
    process::exit(2);
}

fn parse_args() -> Args {
    let mut parsed = Args {
        config: None,
        adapter: None,
        bind: false,
    };

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.config = Some(PathBuf::from(v));
            }
            "--adapter" => {
                let v = args.next().unwrap_or_else(|| usage_and_exit());
                parsed.adapter = Some(v);
            }
            "--bind" => parsed.bind = true,
            "-h" | "--help" => usage_and_exit(),
            // read again by parse_debug_flags
            debug if debug.starts_with("--debug-") => {}
            other => {
                eprintln!("Unknown argument: {other}");
                usage_and_exit();
            }
        }
    }

    parsed
}

fn run(args: Args) -> anyhow::Result<bool> {
    let mut cli = HashMap::new();
    if let Some(adapter) = args.adapter {
        cli.insert("session_adapter".to_string(), adapter);
    }

    let config = load_config(args.config.as_deref(), Some(&cli)).context("loading configuration")?;
    validate_config(&config).context("validating configuration")?;
    init_logging(&config.logging, &parse_debug_flags())?;

    let registry = AdapterRegistry::builtin();
    println!("Session adapters (priority order):");
    for status in registry.report() {
        println!("  {:<10} {}", status.name, status.availability);
    }
    println!();

    let class = match select_adapter_class(registry, config.session.adapter.as_deref()) {
        Ok(class) => class,
        Err(e) => {
            eprintln!("Resolution failed: {e}");
            return Ok(false);
        }
    };
    match &config.session.adapter {
        Some(requested) => println!("Selected: {} (requested {})", class.name(), requested),
        None => println!("Selected: {}", class.name()),
    }

    if args.bind {
        let mut adapter = class.instantiate(std::sync::Arc::new(config.connection.clone()))?;
        let channels = KernelChannels::bind(adapter.as_mut())?;
        println!();
        println!("{}", channels.resolved_connection().to_json()?);
    }

    Ok(true)
}

fn main() {
    let args = parse_args();
    match run(args) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(2);
        }
    }
}
