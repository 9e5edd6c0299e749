use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use command_shim::fixture::{self, FixturePage};
use command_shim::{demo_scope, run_demo, DemoReport};

use crate::cli::context::CliContext;
use crate::cli::output::{render, OutputFormat};

const READY_COMMAND: &str = "waitForReady";
const DEFAULT_READY_RETRIES: u32 = 3;

#[derive(Args, Clone, Debug)]
pub struct DemoArgs {
    /// Number of times `waitForReady` fails before the page reports ready
    #[arg(long, default_value_t = 2)]
    pub not_ready: u32,

    /// Retry budget for `waitForReady`; defaults to the configured budget,
    /// or 3 when the configuration gives it none
    #[arg(long)]
    pub ready_retries: Option<u32>,

    /// Log every command through the built-in command log hooks
    #[arg(long)]
    pub trace_commands: bool,
}

pub async fn cmd_demo(args: DemoArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let mut config = ctx.config().clone();
    let ready_retries = args.ready_retries.unwrap_or_else(|| match config.limit_for(READY_COMMAND) {
        0 => DEFAULT_READY_RETRIES,
        configured => configured,
    });
    config
        .retry
        .commands
        .insert(READY_COMMAND.to_string(), ready_retries);
    if args.trace_commands {
        config.hooks.log_commands = true;
    }
    config.validate().context("Invalid demo configuration")?;

    let page = Arc::new(FixturePage::search_form().not_ready_for(args.not_ready));
    let catalogs = fixture::catalogs(&page);
    let scope = demo_scope(&config, &catalogs);
    let report = run_demo(&scope, &catalogs)
        .await
        .context("Demo command chain failed")?;

    match render(&report, &output)? {
        Some(rendered) => println!("{rendered}"),
        None => print_human(&report),
    }
    Ok(())
}

fn print_human(report: &DemoReport) {
    println!("Session:        {}", report.session);
    println!("Title:          {}", report.title);
    println!(
        "Ready after:    {} check(s), {} retr(ies)",
        report.ready_checks,
        report.retries.unwrap_or(0)
    );
    println!("Links:          {}", report.link_count);
    println!("Tags:           {}", report.tags.join(", "));
    println!("Submit text:    {}", report.submit_text);
    println!("Clicked:        {:?}", report.clicked);
    if let Some(err) = &report.iteration_error {
        println!("Iteration:      {err}");
    }
}
