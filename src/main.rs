use clap::{Parser, Subcommand};
use colored::Colorize;
use log::{error, info};
use std::time::Instant;

use mamdb::{
    params,
    query::{self, Op},
    repo::{self, FacadeAutoIncrement, FacadeError, FacadeModel},
    types::{Filetime, Kitten},
    utils,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "mamdb", about = "Kitten records over a document store")]
struct Args {
    /// Connection uri (`memory://`, `file:///path.json`, `postgres://...`),
    /// defaults to the value of `MAM_DATABASE_URL`
    #[arg(long)]
    uri: Option<String>,

    /// Number of random kittens inserted before running the command
    #[arg(long, default_value_t = 0)]
    seed: usize,

    /// Do not register the `idx` auto-increment
    #[arg(long, default_value_t = false)]
    no_auto_increment: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every kitten
    List,
    /// Find kittens by name
    Find {
        name: String,
        /// Only return the first match
        #[arg(long, default_value_t = false)]
        first: bool,
    },
    /// Count kittens within height and birth bounds (inclusive)
    Count {
        #[arg(long)]
        height_min: Option<i64>,
        #[arg(long)]
        height_max: Option<i64>,
        /// FILETIME ticks
        #[arg(long)]
        birth_min: Option<i64>,
        /// FILETIME ticks
        #[arg(long)]
        birth_max: Option<i64>,
    },
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("unable to start runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(args)) {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), FacadeError> {
    let uri = match &args.uri {
        Some(uri) => uri.as_str(),
        None => params::configurables().database_url.as_str(),
    };
    let repo = repo::connect(uri).await?;

    let res = execute(&repo, &args).await;

    repo::disconnect(&repo).await;
    res
}

async fn execute(repo: &repo::Repository, args: &Args) -> Result<(), FacadeError> {
    let kittens = FacadeModel::<Kitten>::new(repo.clone())?;

    if !args.no_auto_increment {
        FacadeAutoIncrement::new(repo.clone(), kittens.collection().clone())
            .register(params::DEFAULT_SEQUENCE_START, params::DEFAULT_SEQUENCE_INCREMENT)
            .await?;
    }

    if args.seed > 0 {
        let records = utils::dummy_kittens(&mut rand::rng(), args.seed);
        let start = Instant::now();
        let inserted = kittens.insert_many(records).await?;
        info!(
            "seeded {} kittens in {:.2?}",
            inserted.len(),
            start.elapsed()
        );
    }

    let start = Instant::now();

    match &args.command {
        Command::List => {
            let found = kittens.find_all().await?;
            print_kittens(&found);
            info!("list took {:.2?}", start.elapsed());
        }
        Command::Find { name, first } => {
            let found = if *first {
                kittens
                    .find_one_by_field("name", name.as_str())
                    .await?
                    .into_iter()
                    .collect()
            } else {
                kittens.find_all_by_field("name", name.as_str()).await?
            };
            print_kittens(&found);
            info!("find took {:.2?}", start.elapsed());
        }
        Command::Count {
            height_min,
            height_max,
            birth_min,
            birth_max,
        } => {
            let filter = query::Filter::new();
            let filter = bounded(filter, "height", *height_min, *height_max)?;
            let filter = bounded(filter, "birth", *birth_min, *birth_max)?;

            let count = kittens.count_in_range(&filter).await?;
            println!("{} {}", "count:".bold(), count.to_string().green());
            info!("count took {:.2?}", start.elapsed());
        }
    }

    Ok(())
}

/// Adds the constraints for whichever bounds are set.
fn bounded(
    filter: query::Filter,
    field: &str,
    min: Option<i64>,
    max: Option<i64>,
) -> Result<query::Filter, FacadeError> {
    let filter = match (min, max) {
        (Some(min), Some(max)) => filter.between(field, min, max)?,
        (Some(min), None) => filter.and(field, Op::Geq(min.into()))?,
        (None, Some(max)) => filter.and(field, Op::Leq(max.into()))?,
        (None, None) => filter,
    };
    Ok(filter)
}

fn print_kittens(kittens: &[Kitten]) {
    if kittens.is_empty() {
        println!("{}", "no kittens found".yellow());
        return;
    }

    for k in kittens {
        let idx = k
            .idx
            .map(|i| i.to_string())
            .unwrap_or_else(|| "-".to_owned());
        let birth = k
            .birth
            .as_ref()
            .map(Filetime::to_string)
            .unwrap_or_else(|| "-".to_owned());

        println!(
            "{:>6}  {:<12} age: {:<3} height: {:<4} birth: {}",
            idx.cyan(),
            k.name.bold(),
            k.age.map(|a| a.to_string()).unwrap_or_default(),
            k.height.map(|h| h.to_string()).unwrap_or_default(),
            birth.dimmed(),
        );
        println!("        {}", k.greeting().italic());
    }
}
