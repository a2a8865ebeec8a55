use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use nexus_scan_common::{
    COMPONENT_NAME, init_tracer,
    metrics::{component_info_metric, describe_metrics},
    tracer::TracerOptions,
};
use nexus_scan_writer::{
    NexusHdf5File, NexusScanFile, description::ScanDescription, validation::validation_enabled,
};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{info, level_filters::LevelFilter};

#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Cli {
    /// JSON description of the scan.
    #[clap(long)]
    scan: PathBuf,

    /// Path of the NeXus file to write, instead of the one in the description.
    #[clap(long)]
    output: Option<PathBuf>,

    /// Write the tree to disk on a background thread.
    #[clap(long)]
    async_write: bool,

    /// Switch the file to single-writer multiple-reader mode once its tree is written.
    #[clap(long)]
    swmr: bool,

    /// Validate the structure of the file before closing it.
    #[clap(long, env = "VALIDATE_NEXUS")]
    validate: bool,

    /// JSON template applied to the file, after those in the description.
    #[clap(long = "template")]
    templates: Vec<PathBuf>,

    /// Endpoint on which to serve Prometheus metrics.
    #[clap(long)]
    observability_address: Option<SocketAddr>,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    let _tracer = init_tracer!(TracerOptions::new(LevelFilter::INFO))?;

    if let Some(address) = args.observability_address {
        PrometheusBuilder::new()
            .with_http_listener(address)
            .install()?;
    }
    describe_metrics();
    component_info_metric(COMPONENT_NAME);

    let mut model = ScanDescription::load(&args.scan)?.into_model();
    if let Some(output) = &args.output {
        model = model.with_file_path(output);
    }
    for template in &args.templates {
        model = model.with_template_file(template);
    }

    let mut scan_file = NexusScanFile::<NexusHdf5File>::new(model)
        .with_validation(args.validate || validation_enabled());
    scan_file.create_nexus_file(args.async_write, args.swmr)?;
    scan_file.flush()?;
    scan_file.scan_finished()?;

    info!("Wrote {}", scan_file.model().file_path().display());
    for path in scan_file.external_file_paths() {
        info!("External file: {}", path.display());
    }
    Ok(())
}
