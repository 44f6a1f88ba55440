use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use comfy_table::Table;
use tracing::info;

use temperpool::alphabet;
use temperpool::comm::Cluster;
use temperpool::config::PoolParams;
use temperpool::corpus::CountMatrix;
use temperpool::kernel::CipherModel;
use temperpool::runner::run_decipher;
use temperpool::words::{refine_key, score_text, WordDict};
use temperpool::TpResult;

#[derive(Args, Debug, Clone)]
pub struct DecipherArgs {
    #[command(flatten)]
    pub pool: PoolParams,

    /// Reference corpus used to build the bigram transition matrix.
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Input text. Treated as ciphertext unless --scramble is set.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the deciphered text.
    #[arg(short, long, default_value = "deciphered.txt")]
    pub output: PathBuf,

    /// Treat the input as plaintext and scramble it with a random key
    /// first (demo mode: the run then tries to recover that key).
    #[arg(long, default_value_t = false)]
    pub scramble: bool,

    /// Optional word-frequency list (one word per line, most common first)
    /// enabling the local refinement pass.
    #[arg(long)]
    pub dictionary: Option<PathBuf>,

    #[arg(long, default_value_t = 20_000)]
    pub refine_attempts: usize,
}

pub fn run(args: DecipherArgs) -> TpResult<()> {
    args.pool.validate()?;
    info!("🔧 Pool params: {}", serde_json::to_string(&args.pool)?);

    let dim = alphabet::ALPHABET_SIZE;
    let mut rng = match args.pool.seed {
        Some(s) => fastrand::Rng::with_seed(s ^ 0x5eed),
        None => fastrand::Rng::new(),
    };

    info!("📂 Loading reference corpus: {}", args.reference.display());
    let reference_text = fs::read_to_string(&args.reference)?;

    info!("📂 Loading input: {}", args.input.display());
    let input_text = fs::read_to_string(&args.input)?;

    let ciphered = if args.scramble {
        let key = alphabet::random_key(dim, &mut rng);
        info!("🔀 Scrambling input with a random key");
        alphabet::apply_key(&input_text, &key)
    } else {
        input_text
    };

    let reference = CountMatrix::from_text(&reference_text, dim);
    let coded = Arc::new(CountMatrix::from_text(&ciphered, dim));
    let model = CipherModel::new(&reference, coded);

    let layout = args.pool.layout();
    let ladder = args.pool.build_ladder();

    info!(
        "🚀 Launching {} ranks, {} chains, {} iterations x {} steps",
        args.pool.ranks, args.pool.chains, args.pool.iterations, args.pool.steps
    );

    let outcomes = Cluster::launch(args.pool.ranks, |comm| {
        run_decipher(
            &model,
            comm,
            layout,
            &ladder,
            args.pool.iterations,
            args.pool.steps,
            args.pool.seed,
        )
    })?;

    // The broadcast guarantees every rank carries the same key; rank 0
    // additionally carries the best-value bookkeeping.
    let outcome = &outcomes[0];
    let total_exchanges: usize = outcomes.iter().map(|o| o.exchanges).sum();

    let decipher_key = alphabet::invert_key(&outcome.key);
    let mut plaintext = alphabet::apply_key(&ciphered, &decipher_key);

    let mut match_summary = None;
    if let Some(dict_path) = &args.dictionary {
        info!("📖 Loading dictionary: {}", dict_path.display());
        let dict = WordDict::load(dict_path)?;

        let before = score_text(&plaintext, &dict);
        let (refined, after) = refine_key(
            &decipher_key,
            &ciphered,
            &dict,
            args.refine_attempts,
            &mut rng,
        );
        plaintext = alphabet::apply_key(&ciphered, &refined);
        match_summary = Some((before, after));
    }

    fs::write(&args.output, &plaintext)?;
    info!("💾 Deciphered text written to {}", args.output.display());

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Best log-target".to_string(), format!("{:.2}", outcome.best_value)]);
    table.add_row(vec!["Accepted exchanges".to_string(), total_exchanges.to_string()]);
    if let Some((before, after)) = match_summary {
        table.add_row(vec![
            "Word match (raw)".to_string(),
            format!("{:.1}%", before.matched_fraction * 100.0),
        ]);
        table.add_row(vec![
            "Word match (refined)".to_string(),
            format!("{:.1}%", after.matched_fraction * 100.0),
        ]);
    }
    println!("{table}");

    Ok(())
}
