use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use product_passport_lib::keys::fingerprint_of_raw;
use product_passport_script::request::read_text;
use product_passport_script::utils::print_error;

/// Print the fingerprint committed for a public key
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the key (JWK)
    key_file_path: PathBuf,

    /// Print hex instead of base64url
    #[arg(long)]
    hex: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match read_text(&args.key_file_path) {
        Ok(key) => {
            let fingerprint = fingerprint_of_raw(&key);
            if args.hex {
                println!("{}", fingerprint.to_hex());
            } else {
                println!("{fingerprint}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_error(&format!("error[{}]: {}", e.kind(), e));
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
