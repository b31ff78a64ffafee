//! Command-line arguments for `codegram`.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use codegram::{AnalysisMethod, DiagramFormat, DiagramType};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codegram", author, version, about, long_about = None)]
pub struct Args {
    /// Client configuration file (JSON)
    #[arg(long, global = true, env = "CODEGRAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the generation service
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Generation request timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// PlantUML rendering server
    #[arg(long, global = true)]
    pub plantuml_server: Option<String>,

    /// Debug logging (otherwise `CODEGRAM_LOG`, default `warn`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a diagram from a local directory or a GitHub repository
    Generate(GenerateArgs),
    /// Render an existing diagram file
    Render(RenderArgs),
    /// Print the PlantUML payload and image URL for a diagram
    Encode {
        /// Diagram file, or `-` for stdin
        input: String,
    },
    /// List the files a directory would submit
    Scan {
        dir: PathBuf,
    },
    /// Check that the generation service answers
    Ping,
}

#[derive(ClapArgs, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["dir", "repo"])))]
pub struct GenerateArgs {
    /// Directory with the source code to analyse
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// GitHub repository URL
    #[arg(long)]
    pub repo: Option<String>,

    #[arg(long, default_value = "class", value_parser = parse_diagram_type)]
    pub diagram_type: DiagramType,

    #[arg(long, default_value = "mermaid", value_parser = parse_format)]
    pub format: DiagramFormat,

    #[arg(long, default_value = "llm_direct", value_parser = parse_analysis)]
    pub analysis: AnalysisMethod,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Copy the diagram code or the LLM analysis to the clipboard
    #[arg(long, value_enum)]
    pub copy: Option<CopyTarget>,

    /// Do not write the diagram code or rendered files
    #[arg(long)]
    pub no_save: bool,
}

#[derive(ClapArgs, Debug)]
pub struct RenderArgs {
    /// Diagram file, or `-` for stdin
    pub input: String,

    /// Diagram format; guessed from the file extension when omitted
    #[arg(long, value_parser = parse_format)]
    pub format: Option<DiagramFormat>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(ClapArgs, Debug)]
pub struct OutputArgs {
    /// Directory for saved files
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also export the rendered diagram as an image (png, jpeg)
    #[arg(long)]
    pub export: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CopyTarget {
    Code,
    Analysis,
}

fn parse_format(s: &str) -> Result<DiagramFormat, String> {
    s.parse::<DiagramFormat>().map_err(|e| e.to_string())
}

fn parse_diagram_type(s: &str) -> Result<DiagramType, String> {
    s.parse::<DiagramType>().map_err(|e| e.to_string())
}

fn parse_analysis(s: &str) -> Result<AnalysisMethod, String> {
    s.parse::<AnalysisMethod>().map_err(|e| e.to_string())
}
