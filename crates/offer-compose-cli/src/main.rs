use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use offer_compose::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "ocomp", about = "Offer document composer", version)]
struct Cli {
    /// Log debug output (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where templates come from
#[derive(Args)]
struct TemplateArgs {
    /// Directory holding one subdirectory per template
    #[arg(long)]
    templates: PathBuf,

    /// Template id (subdirectory name)
    #[arg(long)]
    template: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a template's pages and tokens
    Inspect {
        #[command(flatten)]
        source: TemplateArgs,
    },

    /// Compose one document from a job file
    Render {
        #[command(flatten)]
        source: TemplateArgs,

        /// Job file (JSON)
        #[arg(short, long)]
        job: PathBuf,

        /// Output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Render options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Directory with attachment PDFs named `<id>.pdf`
        #[arg(long)]
        attachments: Option<PathBuf>,
    },

    /// Compose one document per recipient into a zip archive
    Batch {
        #[command(flatten)]
        source: TemplateArgs,

        /// Batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,

        /// Recipient list (CSV)
        #[arg(short, long)]
        recipients: PathBuf,

        /// Output zip archive
        #[arg(short, long)]
        output: PathBuf,

        /// Also write the outcome report here
        #[arg(long)]
        report: Option<PathBuf>,

        /// Render options (JSON)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Batch options (JSON); flags below override it
        #[arg(long)]
        batch_options: Option<PathBuf>,

        /// Directory with attachment PDFs named `<id>.pdf`
        #[arg(long)]
        attachments: Option<PathBuf>,

        /// Documents generated concurrently
        #[arg(long)]
        workers: Option<usize>,

        /// Per-document timeout in seconds
        #[arg(long)]
        timeout_secs: Option<f64>,

        /// Price increase per recipient position (0.05 = 5%)
        #[arg(long)]
        escalation_rate: Option<f64>,

        /// Product rotation step for all categories
        #[arg(long)]
        rotation_step: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Inspect { source } => {
            let template = load_template(&source).await?;
            println!("Template '{}'", template.id);
            println!(
                "  Page size: {:.1} x {:.1} pt",
                template.page_size.width, template.page_size.height
            );
            println!("  Pages: {}", template.page_count());
            for page in &template.pages {
                println!("  Page {}:", page.index);
                for (token, placeholder) in page.map.iter() {
                    let r = placeholder.rect;
                    let kind = match placeholder.chart {
                        Some(chart) => format!(" [{:?}]", chart),
                        None => String::new(),
                    };
                    println!(
                        "    {}{} at ({:.1}, {:.1}) {:.1} x {:.1}",
                        token, kind, r.x, r.y, r.width, r.height
                    );
                }
            }
        }

        Commands::Render {
            source,
            job,
            output,
            options,
            attachments,
        } => {
            let template = Arc::new(load_template(&source).await?);
            let job = JobFile::load(&job)
                .await
                .with_context(|| format!("loading job {}", job.display()))?;
            let context = shared_context(options.as_deref(), attachments).await?;

            let doc = compose_document(template, job, context, Deadline::none()).await?;
            tokio::fs::write(&output, &doc.bytes)
                .await
                .with_context(|| format!("writing {}", output.display()))?;

            for warning in &doc.warnings {
                println!("  warning: {}", warning);
            }
            println!(
                "Composed {} pages ({} fixed, {} flow) → {}",
                doc.page_count,
                doc.fixed_pages,
                doc.flow_pages,
                output.display()
            );
        }

        Commands::Batch {
            source,
            batch,
            recipients,
            output,
            report,
            options,
            batch_options,
            attachments,
            workers,
            timeout_secs,
            escalation_rate,
            rotation_step,
        } => {
            let template = Arc::new(load_template(&source).await?);
            let context = shared_context(options.as_deref(), attachments).await?;

            let mut batch_opts = match &batch_options {
                Some(path) => BatchOptions::load(path).await?,
                None => BatchOptions::default(),
            };
            if let Some(workers) = workers {
                batch_opts.workers = workers;
            }
            if let Some(timeout) = timeout_secs {
                batch_opts.timeout_secs = timeout;
            }
            if let Some(rate) = escalation_rate {
                batch_opts.escalation_rate = rate;
            }
            if let Some(step) = rotation_step {
                batch_opts.rotation_step = step;
            }

            let factory = CatalogJobFactory::load(&batch)
                .await
                .with_context(|| format!("loading batch {}", batch.display()))?;
            let list = load_recipients_csv(&recipients)
                .await
                .with_context(|| format!("loading recipients {}", recipients.display()))?;
            if list.is_empty() {
                bail!("{} lists no recipients", recipients.display());
            }

            let orchestrator =
                Orchestrator::new(template, Arc::new(factory), context, batch_opts)?;
            let result = orchestrator.run(list, &BatchCancel::new()).await;

            if let Some(path) = &report {
                result.report.save(path).await?;
            }
            if let Some(error) = &result.archive_error {
                bail!("writing the archive failed: {}", error);
            }
            tokio::fs::write(&output, &result.archive)
                .await
                .with_context(|| format!("writing {}", output.display()))?;

            println!("Batch Summary:");
            println!("  Recipients: {}", result.report.total);
            println!("  Succeeded: {}", result.report.succeeded);
            println!("  Failed: {}", result.report.failed);
            for failure in result.report.failures() {
                println!(
                    "    {} (#{}): {}",
                    failure.recipient_id,
                    failure.position + 1,
                    failure.reason.as_deref().unwrap_or("unknown")
                );
            }
            println!("Archive → {}", output.display());
        }
    }

    Ok(())
}

async fn load_template(source: &TemplateArgs) -> Result<TemplateSet> {
    TemplateLoader::new(&source.templates)
        .load(&source.template)
        .await
        .with_context(|| format!("loading template '{}'", source.template))
}

async fn shared_context(
    options: Option<&Path>,
    attachments: Option<PathBuf>,
) -> Result<SharedContext> {
    let options = match options {
        Some(path) => RenderOptions::load(path)
            .await
            .with_context(|| format!("loading options {}", path.display()))?,
        None => RenderOptions::default(),
    };
    let mut context = SharedContext::new(options);
    if let Some(dir) = attachments {
        context = context.with_documents(Arc::new(DirectoryStore::new(dir)));
    }
    Ok(context)
}
