use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use product_passport_script::config::{PROOF_MODE_ENV, PROVE_TIMEOUT_ENV};
use product_passport_script::utils::*;
use product_passport_script::{
    CancellationToken, ProofMode, ProveRequest, Prover, ProverConfig, RequestError,
};

/// Prove that a product passport is backed by a valid licence chain
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the mining authority's public key (JWK)
    #[arg(long)]
    path_to_mining_authority_pk: PathBuf,

    /// Path to the signed product passport
    #[arg(long)]
    passport_file_path: PathBuf,

    /// Path to the signed mining licence
    #[arg(short, long)]
    licence_file_path: PathBuf,

    /// Path to the conflict zones JSON file
    #[arg(short, long)]
    conflict_zones_file_path: PathBuf,

    /// Where to write the receipt
    #[arg(short, long)]
    receipt_file_path: PathBuf,

    /// Proof mode. `development` receipts are not zero-knowledge proofs
    #[arg(long, value_enum, env = PROOF_MODE_ENV, default_value_t = ProofMode::Secure)]
    mode: ProofMode,

    /// Give up after this many seconds
    #[arg(long, env = PROVE_TIMEOUT_ENV)]
    timeout_secs: Option<u64>,

    /// Reject passports issued after this Unix time
    #[arg(long)]
    verification_epoch: Option<i64>,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    setup_logger();
    let args = Args::parse();

    print_banner();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("error[{}]: {}", e.kind(), e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(args: &Args) -> Result<(), RequestError> {
    let mut config = ProverConfig::new(args.mode);
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    print_divider();
    print_step("Initializing prover...");
    print_info("Mode", args.mode.as_str());
    if args.mode.is_insecure() {
        print_warning("Development mode: this receipt is NOT a zero-knowledge proof");
    }
    let prover = Prover::new(config)?;

    let request = ProveRequest {
        passport_path: args.passport_file_path.clone(),
        licence_path: args.licence_file_path.clone(),
        authority_key_path: args.path_to_mining_authority_pk.clone(),
        conflict_zones_path: args.conflict_zones_file_path.clone(),
        receipt_path: args.receipt_file_path.clone(),
        verification_epoch: args.verification_epoch,
    };

    print_divider();
    print_step("Generating proof (this may take a while)...");
    let start = Instant::now();
    let outcome = request.execute(&prover, &CancellationToken::new())?;
    print_success(&format!("Proof generated in {:.2?}", start.elapsed()));

    print_divider();
    let journal = outcome.receipt.journal();
    print_step("Public outputs:");
    print_info("Chain valid", &journal.valid.to_string());
    print_info("Authority fingerprint", &journal.authority_key_fingerprint.to_string());
    print_info("Shipment", &journal.shipment_id);
    print_info(
        "Zone list commitment",
        &hex::encode(outcome.receipt.outputs().conflict_zone_commitment),
    );
    if let Some(epoch) = args.verification_epoch {
        let at = chrono::DateTime::from_timestamp(epoch, 0)
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| epoch.to_string());
        print_info("Verification epoch", &at);
    }
    if let Some(failure) = &outcome.preflight.failure {
        print_info("Failed check", failure.kind());
    }
    print_success(&format!(
        "Receipt saved to {}",
        args.receipt_file_path.display()
    ));
    print_divider();
    Ok(())
}
