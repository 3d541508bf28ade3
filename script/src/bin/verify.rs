use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use product_passport_script::config::PROOF_MODE_ENV;
use product_passport_script::utils::*;
use product_passport_script::{ProofMode, Verdict, VerifierConfig, VerifyRequest};

/// Verify a product passport receipt
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the receipt
    receipt_file_path: PathBuf,

    /// Check the receipt was produced against this conflict zones file
    #[arg(short, long)]
    conflict_zones_file_path: Option<PathBuf>,

    /// Check the receipt was produced for this authority key
    #[arg(short, long)]
    authority_key_file_path: Option<PathBuf>,

    /// `secure` refuses development receipts
    #[arg(long, value_enum, env = PROOF_MODE_ENV, default_value_t = ProofMode::Secure)]
    mode: ProofMode,

    /// Give up after this many seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    setup_logger();
    let args = Args::parse();

    let request = VerifyRequest {
        receipt_path: args.receipt_file_path,
        conflict_zones_path: args.conflict_zones_file_path,
        authority_key_path: args.authority_key_file_path,
    };
    let config =
        VerifierConfig::new(args.mode).with_timeout(Duration::from_secs(args.timeout_secs));

    match request.execute(config) {
        Ok(verification) => {
            let journal = verification.journal();
            match verification.verdict {
                Verdict::Accepted => print_success("chain valid"),
                Verdict::RejectedInvalidChain => print_warning("chain invalid"),
            }
            print_info("Backend", verification.backend.as_str());
            print_info("Authority fingerprint", &journal.authority_key_fingerprint.to_string());
            print_info("Shipment", &journal.shipment_id);
            print_info(
                "Zone list commitment",
                &hex::encode(verification.outputs.conflict_zone_commitment),
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&format!("error[{}]: {}", e.kind(), e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
