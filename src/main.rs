use cereal::config::{self, ConfigError, SiteConfig};
use cereal::site::Builder;
use cereal::{output, serve, watch};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cereal")]
#[command(about = "Static site generator driven by tagged YAML content")]
#[command(long_about = "\
Static site generator driven by tagged YAML content

Every .yaml file under the content directory is rendered through the layout
it names; every other file is copied to the same place in the output.

Project structure:

  cereal.toml                 # Optional config (see `cereal gen-config`)
  content/
  ├── index.yaml              # → out/index.html
  ├── blog/post.yaml          # → out/blog/post.html
  └── style.css               # → out/style.css (copied)
  layout/
  ├── base.html               # minijinja templates named by `layout:`
  └── macros.html             # base template for !j2 fragments

Field tags (chain with commas, applied left to right):

  !md            Markdown to HTML
  !j2            render as a template fragment
  !join          join a list of lines
  !code(lang)    syntax-highlight source code
  !py            run Python, use what it prints
  e.g. body: !join,md [\"# Title\", \"Text\"]")]
#[command(version)]
struct Cli {
    /// Project root holding cereal.toml and the content and layout directories
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Content directory, relative to the root (default: content)
    #[arg(long, global = true)]
    content: Option<String>,

    /// Layout directory, relative to the root (default: layout)
    #[arg(long, global = true)]
    layout: Option<String>,

    /// Output directory, relative to the root (default: out)
    #[arg(long, global = true)]
    output: Option<String>,

    /// Symlink passthrough files instead of copying them
    #[arg(short, long, global = true)]
    symlink: bool,

    /// Log progress, not just problems
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the site once
    Build {
        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build, then rebuild on every change and serve the output directory
    #[command(alias = "runserver")]
    Watch {
        /// Port to serve on (default: 8000)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a stock cereal.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// `--verbose` enables INFO, otherwise RUST_LOG or WARN.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Build { json } => {
            let config = resolve_config(&cli, None)?;
            let report = Builder::new(&cli.root, config)?.build()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                output::print_build_report(&report);
            }
        }
        Command::Watch { port } => {
            let config = resolve_config(&cli, port)?;
            let builder = Builder::new(&cli.root, config)?;
            output::print_build_report(&builder.build()?);

            let output_dir = builder.output_dir();
            let server = builder.config().serve.clone();
            let watcher = watch::spawn(builder)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(serve::serve(&output_dir, &server.host, server.port))?;
            let rebuilds = watcher.stop();
            println!("Stopped after {rebuilds} rebuild(s)");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }
    Ok(())
}

/// `cereal.toml` under the root, with command-line overrides applied.
fn resolve_config(cli: &Cli, port: Option<u16>) -> Result<SiteConfig, ConfigError> {
    let mut config = config::load_config(&cli.root)?;
    if let Some(content) = &cli.content {
        config.content_dir = content.clone();
    }
    if let Some(layout) = &cli.layout {
        config.layout_dir = layout.clone();
    }
    if let Some(output) = &cli.output {
        config.output_dir = output.clone();
    }
    if cli.symlink {
        config.symlink = true;
    }
    if let Some(port) = port {
        config.serve.port = port;
    }
    config.validate()?;
    Ok(config)
}
