use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueHint};
use log::{error, info};
use snapbeautify_renderer::{
    AspectRatio, BackgroundMode, CodeSubject, DEFAULT_PRESET_KEY, EditorError, EditorSession,
    ExportFormat, FileDownload, SizeF, Subject,
};
use thiserror::Error;

/// Frame a screenshot or code snippet on a gradient background and export it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Screenshot to beautify. Without one, a code snippet is rendered.
    #[arg(value_hint = ValueHint::FilePath, conflicts_with = "code")]
    input: Option<PathBuf>,

    /// Text file to render as a code block
    #[arg(long, value_hint = ValueHint::FilePath)]
    code: Option<PathBuf>,

    /// Output file; defaults to snapbeautify-export.<ext> in the current directory
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// JSON settings file. Fields it sets replace the defaults chosen for the
    /// loaded subject; flags below take precedence over it.
    #[arg(long, value_hint = ValueHint::FilePath)]
    settings: Option<PathBuf>,

    #[arg(long)]
    padding: Option<f32>,

    /// Shadow intensity (0-30)
    #[arg(long)]
    shadow: Option<f32>,

    /// Corner radius (0-40)
    #[arg(long)]
    radius: Option<f32>,

    #[arg(long, value_enum)]
    aspect: Option<AspectRatio>,

    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Built-in preset key, e.g. "midnight"
    #[arg(long, conflicts_with_all = ["custom", "gradient"])]
    preset: Option<String>,

    /// Generated preset key, e.g. "custom3"
    #[arg(long, conflicts_with = "gradient")]
    custom: Option<String>,

    /// Index of the gradient extracted from the screenshot
    #[arg(long)]
    gradient: Option<usize>,

    /// Device pixel ratio of the export
    #[arg(long, default_value_t = 2.0)]
    dpr: f32,

    /// Width of the preview viewport in logical pixels
    #[arg(long, default_value_t = 1280.0)]
    viewport_width: f32,

    /// Height of the preview viewport in logical pixels
    #[arg(long, default_value_t = 800.0)]
    viewport_height: f32,

    /// Copy the result to the clipboard instead of writing a file
    #[cfg(feature = "clipboard")]
    #[arg(long)]
    copy: bool,

    /// Print the settings as JSON and exit
    #[arg(long)]
    print_settings: bool,
}

/// Failures of the command line front-end.
#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings file {}: {source}", .path.display())]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Print(#[source] serde_json::Error),

    #[error(transparent)]
    Editor(#[from] EditorError),
}

impl CliError {
    fn user_message(&self) -> String {
        match self {
            Self::Read { path, .. } => format!("Could not read {}", path.display()),
            Self::Settings { path, source } => {
                format!("Settings file {} is invalid: {source}", path.display())
            }
            Self::Print(_) => "Could not print the current settings".to_string(),
            Self::Editor(err) => err.user_message(),
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let session = build_session(&cli)?;

    if cli.print_settings {
        let json = session.settings().to_json_pretty().map_err(CliError::Print)?;
        println!("{json}");
        return Ok(());
    }

    let layout = session.measure(SizeF::new(cli.viewport_width, cli.viewport_height));

    #[cfg(feature = "clipboard")]
    if cli.copy {
        let mut clipboard = snapbeautify_renderer::SystemClipboard;
        session.copy_to_clipboard(&layout, cli.dpr, &mut clipboard)?;
        return Ok(());
    }

    let mut sink = match &cli.output {
        Some(path) => FileDownload::to_path(path),
        None => FileDownload::in_dir("."),
    };
    session.export(&layout, cli.dpr, &mut sink)?;
    Ok(())
}

/// Loads the subject, then overlays the settings file, then the flags.
fn build_session(cli: &Cli) -> Result<EditorSession, CliError> {
    let mut session = EditorSession::new();
    load_subject(&mut session, cli)?;

    if let Some(path) = &cli.settings {
        let json = read_text(path)?;
        let settings = session
            .settings()
            .with_json_overrides(&json)
            .map_err(|source| CliError::Settings {
                path: path.clone(),
                source,
            })?;
        session.apply_settings(settings);
    }

    apply_flags(&mut session, cli);
    Ok(session)
}

fn load_subject(session: &mut EditorSession, cli: &Cli) -> Result<(), CliError> {
    match (&cli.input, &cli.code) {
        (Some(path), _) => {
            let bytes = fs::read(path).map_err(|source| CliError::Read {
                path: path.clone(),
                source,
            })?;
            session.load_image(&bytes)?;
            info!("loaded {}", path.display());
        }
        (None, Some(path)) => {
            session.show_code(Some(CodeSubject::new(read_text(path)?)));
        }
        (None, None) => {
            session.show_code(None);
        }
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_flags(session: &mut EditorSession, cli: &Cli) {
    if let Some(padding) = cli.padding {
        session.set_padding(padding);
    }
    if let Some(shadow) = cli.shadow {
        session.set_shadow_intensity(shadow);
    }
    if let Some(radius) = cli.radius {
        session.set_corner_radius(radius);
    }
    if let Some(aspect) = cli.aspect {
        session.set_aspect_ratio(aspect);
    }
    if let Some(format) = cli.format {
        session.set_export_format(format);
    }

    if let Some(key) = &cli.preset {
        session.select_preset(key.clone());
    } else if let Some(key) = &cli.custom {
        session.select_custom_preset(key.clone());
    } else if let Some(index) = cli.gradient {
        session.select_extracted_gradient(index);
    } else if session.settings().background_mode == BackgroundMode::ImageExtracted
        && !session.subject().is_some_and(Subject::is_image)
    {
        // Code blocks have no extracted palettes.
        session.select_preset(DEFAULT_PRESET_KEY);
    }
}
