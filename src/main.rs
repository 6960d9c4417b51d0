use anyhow::Context;
use bpmn_render::{RenderReport, RenderRequest};
use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

/// Render a BPMN 2.0 diagram to PNG without a browser.
///
/// Invalid option values fall back to their defaults.
#[derive(Parser, Debug)]
#[command(name = "bpmn-render", version)]
struct Cli {
    /// BPMN 2.0 XML file to render
    input: Option<PathBuf>,

    /// PNG file to write
    output: Option<PathBuf>,

    /// Magnification factor, a positive number [default: 1]
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    scale: Option<String>,

    /// Smallest output size in logical pixels [default: 800x600]
    #[arg(long = "min-dimensions", value_name = "WxH", allow_hyphen_values = true)]
    min_dimensions: Option<String>,

    /// Space around the diagram on each side [default: 20]
    #[arg(long, value_name = "N", allow_hyphen_values = true)]
    padding: Option<String>,

    /// Print the render report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn request(&self, input: PathBuf, output: PathBuf) -> RenderRequest {
        let mut request = RenderRequest::new(input, output);
        if let Some(raw) = &self.scale {
            request = request.with_scale(raw);
        }
        if let Some(raw) = &self.min_dimensions {
            request = request.with_min_dimensions(raw);
        }
        if let Some(raw) = &self.padding {
            request = request.with_padding(raw);
        }
        request
    }
}

fn main() -> ExitCode {
    if std::env::args_os().len() <= 1 {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // help and version go to stdout and are not failures
            let failed = e.use_stderr();
            let _ = e.print();
            return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    let (Some(input), Some(output)) = (cli.input.clone(), cli.output.clone()) else {
        eprintln!("Error: both <INPUT> and <OUTPUT> are required");
        eprintln!();
        eprintln!("{}", Cli::command().render_usage());
        return ExitCode::FAILURE;
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let request = cli.request(input, output);
    match runtime.block_on(run(&request, cli.json)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(request: &RenderRequest, json: bool) -> anyhow::Result<()> {
    let report = bpmn_render::render(request)
        .await
        .with_context(|| format!("could not render {}", request.input.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &RenderReport) {
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    println!(
        "Rendered {} ({} bytes, {}x{} px)",
        report.output.display(),
        report.bytes,
        report.pixel_width,
        report.pixel_height
    );
}
