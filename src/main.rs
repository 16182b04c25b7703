use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use gitreadme::{
    logging, Config, GenerationMethod, GenerationRequest, GitHubSource, LocalSource,
    ReadmeGenerator, RepoSource,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// GitHub repository URL
    #[arg(short, long, conflicts_with = "path", required_unless_present = "path")]
    url: Option<String>,

    /// Local repository directory
    #[arg(short, long)]
    path: Option<String>,

    /// Generation method
    #[arg(short, long, value_enum, default_value_t = MethodArg::Standard)]
    method: MethodArg,

    /// Write the README to this file instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    /// Summary plus a fixed section template
    Standard,
    /// Summary plus similar reference READMEs
    Examples,
}

impl From<MethodArg> for GenerationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Standard => GenerationMethod::Standard,
            MethodArg::Examples => GenerationMethod::WithExamples,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log_level)?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    let config = Arc::new(config);

    let (location, source): (String, Arc<dyn RepoSource>) = match (cli.url, cli.path) {
        (Some(url), _) => (
            url,
            Arc::new(GitHubSource::new(config.github_token.as_deref())?) as Arc<dyn RepoSource>,
        ),
        (None, Some(path)) => (path, Arc::new(LocalSource::new()) as Arc<dyn RepoSource>),
        (None, None) => anyhow::bail!("either --url or --path is required"),
    };

    let generator = ReadmeGenerator::from_config(config, source)
        .context("failed to initialize the README generator")?;
    let request = GenerationRequest::new(location, cli.method.into());

    let pb = create_progress_bar()?;
    pb.set_message(format!("Generating {} for {}", request.method, request.location));
    let result = generator.generate(&request).await;
    pb.finish_and_clear();

    if !result.success {
        eprintln!("{} {}", "Generation failed:".bright_red().bold(), result.error_message);
        process::exit(1);
    }

    match cli.out {
        Some(path) => {
            tokio::fs::write(&path, &result.readme_content)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("{} {}", "README written to".bright_green(), path.display());
        }
        None => println!("{}", result.readme_content),
    }

    Ok(())
}

fn create_progress_bar() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?
            .tick_strings(&["-", "\\", "|", "/", "-", "\\", "|", "/"]),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}
