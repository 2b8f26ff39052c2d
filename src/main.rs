use anyhow::Result;
use botlabel::{merge_dumps, prepare_model_matrix, BotLabelPipeline};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DATA_ROOT: &str = "./data";

#[derive(Parser, Debug)]
#[command(name = "botlabel", version, about = "Per-user features and heuristic bot labels for reddit activity tables")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the feature table and the label table.
    Run(RunArgs),
    /// Concatenate raw per-subreddit dumps into the three merged input tables.
    Merge {
        #[arg(long)]
        raw_dir: PathBuf,
        #[arg(long, default_value = DATA_ROOT)]
        out_dir: PathBuf,
    },
    /// Turn a feature table and a label table into a numeric model matrix.
    Prepare {
        #[arg(long)]
        features: PathBuf,
        #[arg(long)]
        labels: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    #[arg(long, default_value = DATA_ROOT)]
    data_dir: PathBuf,
    #[arg(long)]
    comments: Option<PathBuf>,
    #[arg(long)]
    posts: Option<PathBuf>,
    #[arg(long)]
    users: Option<PathBuf>,
    #[arg(long)]
    features_out: Option<PathBuf>,
    #[arg(long)]
    labels_out: Option<PathBuf>,
    /// Comments in the population sample for all_users_similarity.
    #[arg(long, default_value_t = 5000)]
    sample_size: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Worker threads (defaults to all cores).
    #[arg(long)]
    threads: Option<usize>,
    /// Also compute avg_score, avg_num_replies and avg_stickied.
    #[arg(long)]
    engagement: bool,
    #[arg(long)]
    no_progress: bool,
}

fn run(args: RunArgs) -> Result<()> {
    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(8);

    let mut pipeline = BotLabelPipeline::new()
        .data_dir(&args.data_dir)
        .sample(args.sample_size, args.seed)
        .engagement_features(args.engagement)
        .parallelism(args.threads.unwrap_or(hw))
        .progress(!args.no_progress);
    if let Some(p) = &args.comments {
        pipeline = pipeline.comments_path(p);
    }
    if let Some(p) = &args.posts {
        pipeline = pipeline.posts_path(p);
    }
    if let Some(p) = &args.users {
        pipeline = pipeline.users_path(p);
    }
    if let Some(p) = &args.features_out {
        pipeline = pipeline.features_out(p);
    }
    if let Some(p) = &args.labels_out {
        pipeline = pipeline.labels_out(p);
    }

    let summary = pipeline.run()?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    match Cli::parse().command {
        Command::Run(args) => run(args)?,
        Command::Merge { raw_dir, out_dir } => {
            let merged = merge_dumps(&raw_dir, &out_dir)?;
            println!("users:    {}", merged.users.display());
            println!("comments: {}", merged.comments.display());
            println!("posts:    {}", merged.posts.display());
        }
        Command::Prepare { features, labels, out } => {
            let matrix = prepare_model_matrix(&features, &labels, &out)?;
            println!("Wrote {} rows x {} columns to {}", matrix.n_rows, matrix.columns.len(), out.display());
        }
    }
    Ok(())
}
