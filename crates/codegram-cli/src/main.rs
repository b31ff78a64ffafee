mod args;

use args::{Args, Command, CopyTarget, GenerateArgs, OutputArgs, RenderArgs};
use clap::Parser;
use codegram::api::{ApiClient, GenerationRequest};
use codegram::collect::FileCollection;
use codegram::render::{Dispatcher, ExportError, ExportTarget, RenderResult, Surface};
use codegram::{ClientConfig, DiagramFormat, DiagramSource, encode_plantuml};
use futures::executor::block_on;
use std::io::Read;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum CliError {
    Usage(String),
    Io(std::io::Error),
    Client(codegram::Error),
    Export(ExportError),
    Clipboard(arboard::Error),
    /// The diagram could not be drawn; the message already names the fallback.
    Render(String),
    Unreachable(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Client(err) => write!(f, "{err}"),
            CliError::Export(err) => write!(f, "Export failed: {err}"),
            CliError::Clipboard(err) => write!(f, "Could not copy to the clipboard: {err}"),
            CliError::Render(msg) => write!(f, "{msg}"),
            CliError::Unreachable(url) => write!(f, "No generation service answered at {url}"),
        }
    }
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::Render(_) => 3,
            _ => 1,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<codegram::error::CoreError> for CliError {
    fn from(value: codegram::error::CoreError) -> Self {
        Self::Client(value.into())
    }
}

impl From<codegram::Error> for CliError {
    fn from(value: codegram::Error) -> Self {
        Self::Client(value)
    }
}

impl From<ExportError> for CliError {
    fn from(value: ExportError) -> Self {
        Self::Export(value)
    }
}

impl From<arboard::Error> for CliError {
    fn from(value: arboard::Error) -> Self {
        Self::Clipboard(value)
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("error: {err}");
        std::process::exit(err.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().filter_or("CODEGRAM_LOG", "warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    match args.command {
        Command::Generate(generate) => cmd_generate(&config, generate),
        Command::Render(render) => cmd_render(&config, render),
        Command::Encode { input } => cmd_encode(&config, &input),
        Command::Scan { dir } => cmd_scan(&config, &dir),
        Command::Ping => cmd_ping(&config),
    }
}

/// File (or defaults), then command-line overrides, then validation.
fn load_config(args: &Args) -> Result<ClientConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.api_url {
        config.api.set_base_url(url);
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.api.timeout_ms = timeout_ms;
    }
    if let Some(server) = &args.plantuml_server {
        config.plantuml.server_url = server.trim().to_string();
    }
    config.validate()?;
    Ok(config)
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

fn cmd_generate(config: &ClientConfig, args: GenerateArgs) -> Result<(), CliError> {
    let request = match (&args.dir, &args.repo) {
        (Some(dir), _) => {
            let files = FileCollection::from_dir(dir, &config.files)?;
            let info = files.directory_info();
            eprintln!(
                "{}: {} code files found ({} files total)",
                info.path,
                info.file_count,
                files.total_files()
            );
            GenerationRequest::from_files(
                files.into_files(),
                args.diagram_type,
                args.format,
                args.analysis,
            )
        }
        (None, Some(repo)) => {
            GenerationRequest::from_repo(repo, args.diagram_type, args.format, args.analysis)?
        }
        (None, None) => return Err(CliError::Usage("either --dir or --repo is required".into())),
    };

    let client = ApiClient::new(config.api.clone());
    let diagram = client.generate(&request)?;

    for line in diagram.metadata.summary_lines() {
        println!("{line}");
    }
    if let Some(analysis) = diagram.metadata.analysis() {
        println!("\nLLM analysis:\n{analysis}");
    }

    if !args.no_save {
        let path = write_output(
            &args.output.out_dir,
            &diagram.source.file_name(),
            diagram.source.text().as_bytes(),
        )?;
        println!("Diagram code saved to {}", path.display());
    }

    match args.copy {
        Some(CopyTarget::Code) => copy_to_clipboard(diagram.source.text())?,
        Some(CopyTarget::Analysis) => {
            let analysis = diagram.metadata.analysis().ok_or_else(|| {
                CliError::Usage("the response carried no LLM analysis to copy".into())
            })?;
            copy_to_clipboard(analysis)?;
        }
        None => {}
    }

    render_and_present(config, diagram.source, &args.output, !args.no_save)
}

fn cmd_render(config: &ClientConfig, args: RenderArgs) -> Result<(), CliError> {
    let format = match args.format {
        Some(format) => format,
        None => Path::new(&args.input)
            .extension()
            .and_then(|ext| DiagramFormat::from_extension(&ext.to_string_lossy()))
            .ok_or_else(|| {
                CliError::Usage(format!(
                    "cannot tell the diagram format of `{}`; pass --format",
                    args.input
                ))
            })?,
    };
    let text = read_input(&args.input)?;
    render_and_present(config, DiagramSource::new(text, format), &args.output, true)
}

fn cmd_encode(config: &ClientConfig, input: &str) -> Result<(), CliError> {
    let text = read_input(input)?;
    let payload = encode_plantuml(&text)?;
    println!("{payload}");
    println!(
        "{}/{}/{}",
        config.plantuml.server(),
        config.plantuml.image_format,
        payload
    );
    Ok(())
}

fn cmd_scan(config: &ClientConfig, dir: &Path) -> Result<(), CliError> {
    let files = FileCollection::from_dir(dir, &config.files)?;
    for path in files.selected_files().keys() {
        println!("{path}");
    }
    let info = files.directory_info();
    eprintln!(
        "{} code files found ({} files total), extensions: {}",
        info.file_count,
        files.total_files(),
        info.extensions.join(" ")
    );
    Ok(())
}

fn cmd_ping(config: &ClientConfig) -> Result<(), CliError> {
    let client = ApiClient::new(config.api.clone());
    if client.test_connection() {
        println!("ok: {}", client.base_url());
        Ok(())
    } else {
        Err(CliError::Unreachable(client.base_url().to_string()))
    }
}

fn render_and_present(
    config: &ClientConfig,
    source: DiagramSource,
    output: &OutputArgs,
    save: bool,
) -> Result<(), CliError> {
    let export = output
        .export
        .as_deref()
        .map(str::parse::<ExportTarget>)
        .transpose()?;

    let dispatcher = Dispatcher::with_defaults(config);
    let result = block_on(dispatcher.render(source));

    match &result {
        RenderResult::Rendered { surface } => present(config, surface, &output.out_dir, save)?,
        RenderResult::Failed(failure) => {
            tracing::debug!(kind = ?failure.kind, "render failed");
            eprintln!("Diagram source:\n{}\n", failure.raw_source);
            return Err(CliError::Render(failure.message.clone()));
        }
    }

    if let Some(target) = export {
        let blob = block_on(dispatcher.export_current(Some(target)))?;
        let path = write_output(&output.out_dir, &blob.file_name(), &blob.bytes)?;
        println!("Image exported to {} ({})", path.display(), blob.mime);
    }
    Ok(())
}

fn present(
    config: &ClientConfig,
    surface: &Surface,
    out_dir: &Path,
    save: bool,
) -> Result<(), CliError> {
    match surface {
        Surface::Svg { markup, .. } => {
            if save {
                let path = write_output(out_dir, "diagram.svg", markup.as_bytes())?;
                println!("Rendered SVG written to {}", path.display());
            } else {
                println!("{markup}");
            }
        }
        Surface::RemoteImage { url, .. } => {
            println!("PlantUML image: {url}");
        }
        Surface::Viewer { url, .. } => {
            println!("draw.io preview: {url}");
            println!(
                "If the preview does not load, import the saved XML into {}",
                config.drawio.editor_url
            );
        }
    }
    Ok(())
}

fn write_output(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, CliError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, bytes)?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote output file");
    Ok(path)
}

fn copy_to_clipboard(text: &str) -> Result<(), CliError> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_string())?;
    eprintln!("Copied to clipboard");
    Ok(())
}
