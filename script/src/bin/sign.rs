use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use product_passport_lib::{ClaimSet, ClaimSetKind, Credential, Key};
use product_passport_script::request::{read_text, write};
use product_passport_script::utils::*;
use product_passport_script::RequestError;

/// Issue a signed claim set
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the signing key: Ed25519 or RSA private JWK, or RSA PEM
    #[arg(short, long)]
    signing_key_file_path: PathBuf,

    /// Path to the claims JSON, `{"claims":[{"key":..,"value":..}]}`
    #[arg(short, long)]
    custom_claims_file_path: PathBuf,

    /// Where to save the signed token
    #[arg(short, long)]
    token_file_path: PathBuf,

    /// `mining-licence` or `product-passport`
    #[arg(short, long)]
    kind: String,
}

fn main() -> ExitCode {
    setup_logger();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_error(&format!("error[{}]: {}", e.kind(), e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(args: &Args) -> Result<(), RequestError> {
    let invalid = |path: &PathBuf, reason: String| RequestError::InvalidInput {
        path: path.clone(),
        reason,
    };

    let kind = ClaimSetKind::parse(&args.kind).ok_or_else(|| {
        invalid(
            &args.custom_claims_file_path,
            format!("unknown claim set kind `{}`", args.kind),
        )
    })?;

    let key = Key::from_text(&read_text(&args.signing_key_file_path)?)
        .map_err(|e| invalid(&args.signing_key_file_path, e.to_string()))?;

    let claims: ClaimSet = serde_json::from_str(&read_text(&args.custom_claims_file_path)?)
        .map_err(|e| invalid(&args.custom_claims_file_path, e.to_string()))?;
    let credential = Credential::from_claim_set(kind, &claims)
        .map_err(|e| invalid(&args.custom_claims_file_path, e.to_string()))?;

    let token = credential
        .issue(&key)
        .map_err(|e| invalid(&args.signing_key_file_path, e.to_string()))?
        .to_token();
    write(&args.token_file_path, token.as_bytes())?;

    print_success(&format!("{} signed", kind));
    print_info("Signer", &key.fingerprint().to_string());
    print_info("Token", &args.token_file_path.display().to_string());
    Ok(())
}
