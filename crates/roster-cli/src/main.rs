// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use config::Config;
use roster_api::Client;
use roster_app::RosterState;
use roster_tui::ShellOptions;
use runtime::{DemoRuntime, HttpRuntime};
use std::env;
use std::path::PathBuf;

const DEMO_SEED: u64 = 2026;
const DEMO_ROSTER_SIZE: usize = 40;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    let backend = match options.action {
        Action::Help => {
            print_help();
            return Ok(());
        }
        Action::PrintConfigPath => {
            println!("{}", options.config_path.display());
            return Ok(());
        }
        Action::PrintExampleConfig => {
            print!("{}", Config::example_config(&options.config_path));
            return Ok(());
        }
        Action::Check(backend) | Action::Launch(backend) => backend,
    };

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `roster --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;
    let startup = Startup::resolve(&config, backend).with_context(|| {
        format!(
            "invalid startup settings in {}",
            options.config_path.display()
        )
    })?;
    if matches!(options.action, Action::Check(_)) {
        println!("{}", startup.summary());
        return Ok(());
    }

    logging::init(&startup.log_path, config.log_filter())?;
    tracing::info!(
        event = "roster.cli.started",
        backend = %startup.backend_label(),
        config = %options.config_path.display()
    );

    let mut state = RosterState::default();
    match startup.client {
        Some(client) => {
            let mut runtime = HttpRuntime::new(client, startup.export_dir);
            roster_tui::run_app(&mut state, &mut runtime, startup.shell_options)
        }
        None => {
            let mut runtime = DemoRuntime::seeded(DEMO_SEED, DEMO_ROSTER_SIZE, startup.export_dir);
            roster_tui::run_app(&mut state, &mut runtime, startup.shell_options)
        }
    }
}

/// Where API requests go once the shell starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    Http,
    Demo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Help,
    PrintConfigPath,
    PrintExampleConfig,
    Check(Backend),
    Launch(Backend),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    action: Action,
}

/// Settings resolved from config before the terminal is taken over. A demo
/// startup carries no HTTP client.
struct Startup {
    client: Option<Client>,
    export_dir: PathBuf,
    log_path: PathBuf,
    shell_options: ShellOptions,
}

impl Startup {
    fn resolve(config: &Config, backend: Backend) -> Result<Self> {
        let client = match backend {
            Backend::Http => {
                let api_config = config
                    .api_config()
                    .context("fix [api] base_url/timeout values")?;
                Some(Client::new(api_config)?)
            }
            Backend::Demo => None,
        };
        Ok(Self {
            client,
            export_dir: config.export_dir()?,
            log_path: config.log_path()?,
            shell_options: ShellOptions {
                toast_duration: config.toast_duration()?,
            },
        })
    }

    fn backend_label(&self) -> String {
        match &self.client {
            Some(client) => client.base_url().to_owned(),
            None => format!("demo ({DEMO_ROSTER_SIZE} generated students)"),
        }
    }

    fn summary(&self) -> String {
        format!(
            "config ok\n  backend: {}\n  export dir: {}\n  log file: {}\n  toast: {:?}",
            self.backend_label(),
            self.export_dir.display(),
            self.log_path.display(),
            self.shell_options.toast_duration
        )
    }
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut config_path = default_config_path;
    let mut demo = false;
    let mut help = false;
    let mut modes: Vec<&'static str> = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                config_path = PathBuf::from(value.as_ref());
            }
            "--demo" => demo = true,
            "--help" | "-h" => help = true,
            "--print-config-path" => push_mode(&mut modes, "--print-config-path"),
            "--print-example-config" => push_mode(&mut modes, "--print-example-config"),
            "--check" => push_mode(&mut modes, "--check"),
            unknown => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options");
            }
        }
    }

    let backend = if demo { Backend::Demo } else { Backend::Http };
    let action = if help {
        Action::Help
    } else {
        match modes.as_slice() {
            [] => Action::Launch(backend),
            ["--check"] => Action::Check(backend),
            [print] if demo => {
                bail!("--demo only applies when launching or with --check, not with {print}")
            }
            ["--print-config-path"] => Action::PrintConfigPath,
            [_] => Action::PrintExampleConfig,
            [first, second, ..] => bail!("{first} and {second} cannot be combined"),
        }
    };

    Ok(CliOptions {
        config_path,
        action,
    })
}

fn push_mode(modes: &mut Vec<&'static str>, flag: &'static str) {
    if !modes.contains(&flag) {
        modes.push(flag);
    }
}

fn print_help() {
    println!("roster: student records dashboard");
    println!("usage: roster [--config <path>] [--demo] [--check]");
    println!();
    println!("  --config <path>          Read settings from <path> instead of the default");
    println!("  --demo                   Serve a generated in-memory roster instead of [api].base_url");
    println!("  --check                  Resolve startup settings, print them, and exit");
    println!("  --print-config-path      Print the config path that would be read");
    println!("  --print-example-config   Print a v1 config template");
    println!("  -h, --help               Show this help");
}
