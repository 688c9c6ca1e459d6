use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qistyle::export::DEFAULT_DIR;
use qistyle::form::{Configurator, ControlEvent, ControlId, FormState, FormValues};
use qistyle::options::Extension;
use qistyle::renderer::QrStyler;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Generate styled QR codes from form values.
#[derive(Debug, Parser)]
#[command(name = "qistyle", version, about)]
struct Cli {
    /// JSON object of initial control values, keyed by control id.
    #[arg(long, value_name = "PATH")]
    form: Option<PathBuf>,

    /// Initial control value, e.g. `width-range=400`. Overrides --form.
    #[arg(long = "set", value_name = "ID=VALUE")]
    set: Vec<String>,

    /// Control change applied in order after the first render, e.g. `corner-type-select=dot`.
    #[arg(long = "change", value_name = "ID=VALUE")]
    changes: Vec<String>,

    /// Logo image to embed.
    #[arg(long, value_name = "PATH")]
    logo: Option<PathBuf>,

    /// Output format; repeat for several.
    #[arg(long = "format", value_name = "FORMAT", default_value = "svg")]
    formats: Vec<Extension>,

    /// Directory the files are written to.
    #[arg(long, default_value = DEFAULT_DIR)]
    out_dir: PathBuf,

    /// Print the final SVG to stdout.
    #[arg(long)]
    print: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_form(cli: &Cli) -> Result<FormValues> {
    let mut form = match &cli.form {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            FormValues::from_json(&json)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => FormValues::new(),
    };
    for id in form.unknown_ids() {
        warn!(control = id, "ignoring unknown control in form file");
    }
    for pair in &cli.set {
        form.set_pair(pair).with_context(|| format!("invalid --set {pair:?}"))?;
    }
    Ok(form)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let form = load_form(&cli)?;
    let state = FormState::read(&form);
    let renderer = QrStyler::new(state.to_options()).context("failed to render QR code")?;
    let mut configurator = Configurator::new(renderer, &state);

    if let Some(path) = &cli.logo {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read logo {}", path.display()))?;
        configurator
            .handle(ControlEvent::Logo(bytes))
            .context("failed to apply logo")?;
    }

    for change in &cli.changes {
        let (id, value) = change
            .split_once('=')
            .map_or((change.as_str(), ""), |(id, value)| (id, value));
        let id: ControlId = id.parse()?;
        let event = ControlEvent::parse(id, value)
            .with_context(|| format!("invalid --change {change:?}"))?;
        configurator
            .handle(event)
            .with_context(|| format!("failed to apply {change:?}"))?;
    }

    info!(
        width = %configurator.width_label(),
        height = %configurator.height_label(),
        "QR code ready"
    );

    if cli.print {
        println!("{}", configurator.renderer().svg().to_document());
    }

    for &extension in &cli.formats {
        let path = configurator
            .download(extension, &cli.out_dir)
            .with_context(|| format!("failed to export {extension}"))?;
        println!("{}", path.display());
    }

    Ok(())
}
