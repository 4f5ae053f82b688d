use std::io;
use std::path::PathBuf;

use clap::Parser;

use rfpageconfig::{get_control_flag, Doc, PageConfigResolver, Result, StreamingDoc};

/// Discover a page's subscription configuration from HTML markup.
#[derive(Parser)]
#[command(name = "rfpageconfig", version)]
struct Args {
    /// Path to an HTML document; reads stdin when omitted
    path: Option<PathBuf>,

    /// Print the subscriptions-control flag instead of resolving a config
    #[arg(long)]
    control_flag: bool,
}

async fn run(args: Args) -> Result<()> {
    let source = match &args.path {
        Some(path) => std::fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };
    let doc = StreamingDoc::complete(&source);

    if args.control_flag {
        match doc.with_html(get_control_flag) {
            Some(flag) => println!("{}", flag),
            None => {
                eprintln!("rfpageconfig: no control flag present");
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let resolver = PageConfigResolver::new(&doc);
    let config = resolver.resolve_config().await?;
    let json = serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string());
    println!("{}", json);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    if let Err(e) = run(args).await {
        eprintln!("rfpageconfig: {}", e);
        std::process::exit(1);
    }
}
